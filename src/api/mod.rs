pub mod auth;
pub mod dashboard;
pub mod entries;
pub mod positions;
pub mod routes;
pub mod trades;
pub mod upload;
