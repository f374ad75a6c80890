pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod objective;
pub mod server;
pub mod store;
pub mod telemetry;
