pub mod codec;
pub mod commands;
pub mod config;
pub mod connection;
pub mod game;
pub mod pool;
pub mod reply;
pub mod report;
pub mod score;
pub mod server;
pub mod store;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
