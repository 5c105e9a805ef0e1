use thiserror::Error;

use crate::types::StatsKind;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The body did not match the payload shape expected from `context`.
    #[error("could not decode response from {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("provider returned 404 for {url}")]
    NotFound { url: String },

    #[error("provider returned status {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The username does not map to any account.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("expected {expected} stats payload, got {actual}")]
    UnexpectedPayload {
        expected: StatsKind,
        actual: StatsKind,
    },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
