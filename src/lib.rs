pub mod client;
pub mod codec;
pub mod commands;
pub mod config;
pub mod connection;
pub mod pool;
pub mod protocol;
pub mod ring;
pub mod server;
pub mod store;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
