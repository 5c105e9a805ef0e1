use std::time::Duration;

use r6stats_provider::ProviderError;
use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The username could not be mapped to an account; the user is skipped
    /// for this cycle.
    #[error("could not resolve profile for {username}: {source}")]
    Resolve {
        username: String,
        #[source]
        source: ProviderError,
    },

    #[error("metadata fetch failed: {0}")]
    Metadata(#[source] ProviderError),

    #[error("metadata contains no seasons")]
    EmptySeasons,

    #[error("metadata refresh interval {interval:?} is below the minimum of {minimum:?}")]
    RefreshIntervalTooShort {
        interval: Duration,
        minimum: Duration,
    },

    #[error("scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),
}

/// Terminal error of one stat category within one cycle.
#[derive(Debug, Error)]
pub enum CategoryError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("metadata has no current season")]
    NoCurrentSeason,

    #[error("got no ranked history for user {username}")]
    NoRankedHistory { username: String },

    #[error("malformed rank slug \"{0}\"")]
    MalformedRankSlug(String),

    #[error("timed out after {after:?}")]
    TimedOut { after: Duration },

    #[error("category task panicked")]
    Panicked,
}
