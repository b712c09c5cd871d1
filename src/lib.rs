// Core modules
pub mod api;
pub mod config;
pub mod cycle;
pub mod error;
pub mod execution;
pub mod models;
pub mod staking;
pub mod strategy;

// Re-export commonly used types
pub use config::Config;
pub use error::{BotError, Result};
pub use models::*;
