//! In-memory fakes shared by the pipeline unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures::future::{BoxFuture, FutureExt};
use r6stats_core::{Metadata, MetricPoint, Profile, Season};
use r6stats_provider::{
    MapStats, OperatorStats, ProviderError, SeasonStats, StatsKind, StatsPayload, StatsProvider,
    SummarizedStats,
};
use r6stats_sink::MetricSink;

use crate::cache::ProfileCache;
use crate::collector::{CategoryCollector, Collector};
use crate::cycle::{Pipeline, PipelineConfig};
use crate::metadata::MetadataRefresher;

pub(crate) fn sample_metadata() -> Metadata {
    Metadata::new(vec![
        Season {
            id: 30,
            slug: "y8s2".to_owned(),
            name: "Dread Factor".to_owned(),
        },
        Season {
            id: 31,
            slug: "y8s3".to_owned(),
            name: "Heavy Mettle".to_owned(),
        },
    ])
}

pub(crate) fn cycle_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// A pipeline over the given fakes with an hour-long cache and refresh.
pub(crate) async fn test_pipeline(
    provider: &Arc<FakeProvider>,
    sink: &Arc<RecordingSink>,
    usernames: &[&str],
    categories: Vec<Arc<dyn CategoryCollector>>,
) -> Pipeline {
    const HOUR: Duration = Duration::from_secs(3600);
    let provider_dyn: Arc<dyn StatsProvider> = Arc::clone(provider) as Arc<dyn StatsProvider>;
    let cache = Arc::new(ProfileCache::new(Arc::clone(&provider_dyn), HOUR));
    let metadata = MetadataRefresher::seed(Arc::clone(&provider_dyn), HOUR)
        .await
        .unwrap();
    Pipeline::new(
        provider_dyn,
        cache,
        metadata,
        Collector::new(categories, Duration::from_secs(60)),
        Arc::clone(sink) as Arc<dyn MetricSink>,
        PipelineConfig {
            usernames: usernames.iter().map(|u| (*u).to_owned()).collect(),
            max_concurrent_users: 2,
        },
    )
}

fn server_error(what: &str) -> ProviderError {
    ProviderError::UnexpectedStatus {
        status: 500,
        url: format!("fake://{what}"),
    }
}

#[derive(Default)]
pub(crate) struct FakeProvider {
    users: HashMap<String, String>,
    resolve_calls: Mutex<HashMap<String, usize>>,
    metadata: Mutex<VecDeque<Option<Metadata>>>,
    metadata_calls: AtomicUsize,
    summary: SummarizedStats,
    operators: OperatorStats,
    maps: MapStats,
    ranked: Vec<SeasonStats>,
    failing: Vec<StatsKind>,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_user(mut self, name: &str, profile_id: &str) -> Self {
        self.users.insert(name.to_owned(), profile_id.to_owned());
        self
    }

    /// Queues one `get_metadata` response; `None` fails the call. Once the
    /// queue is empty, [`sample_metadata`] is returned.
    pub(crate) fn with_metadata(self, response: Option<Metadata>) -> Self {
        self.metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
        self
    }

    pub(crate) fn with_summary(mut self, summary: SummarizedStats) -> Self {
        self.summary = summary;
        self
    }

    pub(crate) fn with_operators(mut self, operators: OperatorStats) -> Self {
        self.operators = operators;
        self
    }

    pub(crate) fn with_maps(mut self, maps: MapStats) -> Self {
        self.maps = maps;
        self
    }

    pub(crate) fn with_ranked(mut self, ranked: Vec<SeasonStats>) -> Self {
        self.ranked = ranked;
        self
    }

    pub(crate) fn failing(mut self, kind: StatsKind) -> Self {
        self.failing.push(kind);
        self
    }

    pub(crate) fn resolve_calls(&self, name: &str) -> usize {
        self.resolve_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

impl StatsProvider for FakeProvider {
    fn resolve_user<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, Result<Profile, ProviderError>> {
        async move {
            *self
                .resolve_calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(username.to_owned())
                .or_default() += 1;
            self.users
                .get(username)
                .map(|id| Profile::new(username, id.as_str()))
                .ok_or_else(|| ProviderError::UnknownUser(username.to_owned()))
        }
        .boxed()
    }

    fn get_metadata(&self) -> BoxFuture<'_, Result<Metadata, ProviderError>> {
        async move {
            self.metadata_calls.fetch_add(1, Ordering::SeqCst);
            let queued = self
                .metadata
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            match queued {
                Some(Some(metadata)) => Ok(metadata),
                Some(None) => Err(server_error("metadata")),
                None => Ok(sample_metadata()),
            }
        }
        .boxed()
    }

    fn get_stats<'a>(
        &'a self,
        _profile: &'a Profile,
        _season_slug: &'a str,
        kind: StatsKind,
    ) -> BoxFuture<'a, Result<StatsPayload, ProviderError>> {
        async move {
            if self.failing.contains(&kind) {
                return Err(server_error(kind.as_str()));
            }
            Ok(match kind {
                StatsKind::Summary => StatsPayload::Summary(self.summary.clone()),
                StatsKind::Operators => StatsPayload::Operators(self.operators.clone()),
                StatsKind::Maps => StatsPayload::Maps(self.maps.clone()),
            })
        }
        .boxed()
    }

    fn get_ranked_history<'a>(
        &'a self,
        _profile: &'a Profile,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<SeasonStats>, ProviderError>> {
        async move {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            Ok(self.ranked.iter().take(limit).cloned().collect())
        }
        .boxed()
    }
}

/// Sink that keeps every written point and counts flushes.
#[derive(Default)]
pub(crate) struct RecordingSink {
    points: Mutex<Vec<MetricPoint>>,
    flushes: AtomicUsize,
}

impl RecordingSink {
    pub(crate) fn points(&self) -> Vec<MetricPoint> {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl MetricSink for RecordingSink {
    fn write(&self, point: MetricPoint) {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(point);
    }

    fn flush(&self) -> BoxFuture<'_, ()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        async {}.boxed()
    }
}
