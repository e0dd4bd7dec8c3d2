pub mod api;
pub mod compactor;
pub mod config;
pub mod engine;
pub mod limits;
pub mod message;
pub mod model;
pub mod notify;
pub mod observability;
pub mod session;
pub mod timeofday;
pub mod wal;
