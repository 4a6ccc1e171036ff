pub mod api;
pub mod auth;
pub mod calendar;
pub mod compactor;
pub mod config;
pub mod engine;
pub mod model;
pub mod notify;
pub mod observability;
pub mod store;
pub mod wal;
