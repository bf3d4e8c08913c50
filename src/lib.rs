pub mod accounts;
pub mod config;
pub mod error;
pub mod setup;
pub mod web;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
