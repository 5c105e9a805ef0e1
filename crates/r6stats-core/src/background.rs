//! Process-wide channel for errors raised outside the collection cycle.

use thiserror::Error;
use tokio::sync::mpsc;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error from background work. None of these terminate the process.
#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("background metadata refresh failed: {0}")]
    MetadataRefresh(#[source] BoxError),

    #[error("metric sink delivery failed: {0}")]
    SinkDelivery(#[source] BoxError),
}

pub type ErrorSender = mpsc::UnboundedSender<BackgroundError>;
pub type ErrorReceiver = mpsc::UnboundedReceiver<BackgroundError>;

/// Creates the single outbound error channel shared by all background tasks.
#[must_use]
pub fn error_channel() -> (ErrorSender, ErrorReceiver) {
    mpsc::unbounded_channel()
}
