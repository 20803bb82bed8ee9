pub mod config;
pub mod error;
pub mod output;
pub mod record;
pub mod render;
pub mod server;
pub mod store;
