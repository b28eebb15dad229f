pub mod entry;
pub mod execution;
pub mod position;
pub mod trade;
