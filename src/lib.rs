pub mod app;
pub mod arbiter;
pub mod config;
pub mod detector;
pub mod http;
pub mod interval;
pub mod models;
pub mod plugins;
pub mod price;
pub mod scheduler;
pub mod search;
pub mod store;
pub mod utils;
pub mod watcher;

// Re-export commonly used types
pub use config::AppConfig;
pub use utils::error::{AppError, Result};
