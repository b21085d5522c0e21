//! HTTP bootstrap: configuration, module registry assembly and routing.

pub mod app;
pub mod config;
pub mod error;

pub use config::{AppConfig, ConfigError};
pub use error::StartupError;
