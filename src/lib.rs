pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod persistence;
pub mod reconcile;
pub mod statement;
pub mod stats;
pub mod types;
