//! Shared data model, configuration and error types for the r6stats collector.

pub mod app_config;
pub mod background;
pub mod config;
pub mod metadata;
pub mod point;
pub mod profile;

pub use app_config::AppConfig;
pub use background::{error_channel, BackgroundError, BoxError, ErrorReceiver, ErrorSender};
pub use config::load_app_config_from_env;
pub use metadata::{Metadata, Season};
pub use point::{FieldValue, MetricPoint};
pub use profile::Profile;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
