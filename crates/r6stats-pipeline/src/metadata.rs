//! Season metadata held as an atomically swapped snapshot.
//!
//! Readers take an `Arc<Metadata>` and keep it for as long as they need; a
//! refresh builds a complete new snapshot and swaps the pointer, so nobody
//! ever observes a half-written value.

use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use r6stats_core::{BackgroundError, ErrorSender, Metadata};
use r6stats_provider::StatsProvider;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::PipelineError;

/// Smallest accepted background refresh interval.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

pub struct MetadataRefresher {
    provider: Arc<dyn StatsProvider>,
    current: ArcSwap<Metadata>,
    refresh_lock: Mutex<()>,
}

impl MetadataRefresher {
    /// Seeds the snapshot with one synchronous refresh, then refreshes every
    /// `interval` in the background. Background failures are sent to
    /// `errors` and leave the previous snapshot in place.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::RefreshIntervalTooShort`] if `interval` is below
    ///   [`MIN_REFRESH_INTERVAL`]. The provider is not called.
    /// - [`PipelineError::Metadata`] or [`PipelineError::EmptySeasons`] if
    ///   the seed refresh fails.
    pub async fn start(
        provider: Arc<dyn StatsProvider>,
        interval: Duration,
        errors: ErrorSender,
    ) -> Result<Arc<Self>, PipelineError> {
        let refresher = Self::seed(provider, interval).await?;
        refresher.spawn_refresh_loop(interval, errors);
        Ok(refresher)
    }

    /// Validates the interval and performs the seed refresh without starting
    /// the background timer.
    ///
    /// # Errors
    ///
    /// Same as [`MetadataRefresher::start`].
    pub async fn seed(
        provider: Arc<dyn StatsProvider>,
        interval: Duration,
    ) -> Result<Arc<Self>, PipelineError> {
        if interval < MIN_REFRESH_INTERVAL {
            return Err(PipelineError::RefreshIntervalTooShort {
                interval,
                minimum: MIN_REFRESH_INTERVAL,
            });
        }

        let metadata = fetch_valid(provider.as_ref()).await?;
        tracing::info!(
            seasons = metadata.seasons.len(),
            current = metadata.current_season().map_or("", |s| s.slug.as_str()),
            "metadata: seeded"
        );

        Ok(Arc::new(Self {
            provider,
            current: ArcSwap::from_pointee(metadata),
            refresh_lock: Mutex::new(()),
        }))
    }

    /// The latest good snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Metadata> {
        self.current.load_full()
    }

    /// Fetches metadata once and swaps it in if valid. Concurrent refreshes
    /// run one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Metadata`] if the fetch fails or
    /// [`PipelineError::EmptySeasons`] if the result has no seasons. The
    /// current snapshot is untouched in both cases.
    pub async fn refresh(&self) -> Result<(), PipelineError> {
        let _guard = self.refresh_lock.lock().await;
        let metadata = fetch_valid(self.provider.as_ref()).await?;
        tracing::debug!(seasons = metadata.seasons.len(), "metadata: refreshed");
        self.current.store(Arc::new(metadata));
        Ok(())
    }

    fn spawn_refresh_loop(self: &Arc<Self>, interval: Duration, errors: ErrorSender) {
        let refresher: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(refresher) = refresher.upgrade() else {
                    break;
                };
                if let Err(e) = refresher.refresh().await {
                    tracing::warn!(
                        error = %e,
                        "metadata: background refresh failed; keeping last snapshot"
                    );
                    let _ = errors.send(BackgroundError::MetadataRefresh(Box::new(e)));
                }
            }
        });
    }
}

async fn fetch_valid(provider: &dyn StatsProvider) -> Result<Metadata, PipelineError> {
    let metadata = provider
        .get_metadata()
        .await
        .map_err(PipelineError::Metadata)?;
    if metadata.seasons.is_empty() {
        return Err(PipelineError::EmptySeasons);
    }
    Ok(metadata)
}
