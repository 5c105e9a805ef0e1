use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("InfluxDB rejected write with status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("could not decode {context} response: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("sink reports unhealthy status \"{status}\": {message}")]
    Unhealthy { status: String, message: String },

    #[error("invalid sink URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}
