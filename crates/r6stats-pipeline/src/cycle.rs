//! One complete collection pass over the roster.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use futures::stream::{self, StreamExt};
use r6stats_core::Metadata;
use r6stats_provider::StatsProvider;
use r6stats_sink::MetricSink;

use crate::cache::ProfileCache;
use crate::collector::{Collector, TaskContext, UserReport};
use crate::error::PipelineError;
use crate::metadata::MetadataRefresher;

/// Summary of one cycle, also logged on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub users: usize,
    pub failed_users: Vec<String>,
    pub points_written: usize,
    /// `(username, category)` pairs that ended in an error.
    pub failed_categories: Vec<(String, &'static str)>,
}

impl CycleReport {
    fn new(timestamp: DateTime<Utc>, users: usize) -> Self {
        Self {
            timestamp,
            users,
            failed_users: Vec::new(),
            points_written: 0,
            failed_categories: Vec::new(),
        }
    }

    fn record(&mut self, outcome: Result<UserReport, PipelineError>) {
        match outcome {
            Ok(user) => {
                self.points_written += user.points;
                self.failed_categories.extend(
                    user.failed_categories
                        .into_iter()
                        .map(|category| (user.username.clone(), category)),
                );
            }
            Err(PipelineError::Resolve { username, .. }) => self.failed_users.push(username),
            Err(e) => tracing::error!(error = %e, "cycle: unexpected user failure"),
        }
    }
}

/// Roster and concurrency settings for [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub usernames: Vec<String>,
    pub max_concurrent_users: usize,
}

/// Wires the profile cache, metadata snapshot, collector and sink into
/// collection cycles.
pub struct Pipeline {
    provider: Arc<dyn StatsProvider>,
    cache: Arc<ProfileCache>,
    metadata: Arc<MetadataRefresher>,
    collector: Collector,
    sink: Arc<dyn MetricSink>,
    config: PipelineConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        provider: Arc<dyn StatsProvider>,
        cache: Arc<ProfileCache>,
        metadata: Arc<MetadataRefresher>,
        collector: Collector,
        sink: Arc<dyn MetricSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            metadata,
            collector,
            sink,
            config,
        }
    }

    /// Collects every user and flushes the sink once at the end.
    ///
    /// Per-user and per-category failures are logged and counted in the
    /// report; they never abort the cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let timestamp = Utc::now().trunc_subsecs(0);
        let metadata = self.metadata.current();
        let started = std::time::Instant::now();
        tracing::info!(
            users = self.config.usernames.len(),
            categories = ?self.collector.category_names(),
            "cycle: starting"
        );

        let outcomes: Vec<Result<UserReport, PipelineError>> =
            stream::iter(self.config.usernames.clone())
                .map(|username| {
                    let metadata = Arc::clone(&metadata);
                    async move { self.collect_user(&username, metadata, timestamp).await }
                })
                .buffer_unordered(self.config.max_concurrent_users.max(1))
                .collect()
                .await;

        self.sink.flush().await;

        let mut report = CycleReport::new(timestamp, self.config.usernames.len());
        for outcome in outcomes {
            report.record(outcome);
        }

        tracing::info!(
            users = report.users,
            failed_users = report.failed_users.len(),
            points = report.points_written,
            failed_categories = report.failed_categories.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "cycle: complete"
        );
        report
    }

    async fn collect_user(
        &self,
        username: &str,
        metadata: Arc<Metadata>,
        timestamp: DateTime<Utc>,
    ) -> Result<UserReport, PipelineError> {
        let profile = match self.cache.resolve(username).await {
            Ok(profile) => profile,
            Err(source) => {
                tracing::error!(
                    username,
                    error = %source,
                    "cycle: profile resolution failed; skipping user"
                );
                return Err(PipelineError::Resolve {
                    username: username.to_owned(),
                    source,
                });
            }
        };

        let ctx = TaskContext {
            provider: Arc::clone(&self.provider),
            profile,
            metadata,
            timestamp,
        };
        Ok(self.collector.collect_user(ctx, self.sink.as_ref()).await)
    }
}

#[cfg(test)]
#[path = "cycle_test.rs"]
mod tests;
