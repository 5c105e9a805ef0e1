//! Builds the collector's components from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use r6stats_core::{AppConfig, ErrorSender};
use r6stats_pipeline::{
    default_set, Collector, MetadataRefresher, Pipeline, PipelineConfig, ProfileCache,
};
use r6stats_provider::{HttpStatsProvider, StatsProvider, TabStatsClient};
use r6stats_sink::{InfluxSink, InfluxSinkConfig, MetricSink};

/// Whether metadata keeps refreshing after the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MetadataMode {
    Background,
    SeedOnly,
}

pub(crate) struct Components {
    pub(crate) pipeline: Arc<Pipeline>,
    pub(crate) sink: InfluxSink,
}

/// Constructs clients, checks sink health and seeds metadata.
///
/// # Errors
///
/// Fails if a client cannot be built, the sink reports unhealthy, or the
/// metadata seed fails. All of these are fatal at startup.
pub(crate) async fn build(
    config: &AppConfig,
    errors: ErrorSender,
    mode: MetadataMode,
) -> anyhow::Result<Components> {
    let provider: Arc<dyn StatsProvider> = Arc::new(
        HttpStatsProvider::with_base_url(
            &config.provider_url,
            config.provider_token.as_deref(),
            config.request_timeout_secs,
            &config.user_agent,
        )
        .context("building stats provider client")?,
    );

    let tabstats = config
        .tabstats_url
        .as_deref()
        .map(|url| {
            TabStatsClient::with_base_url(url, config.request_timeout_secs, &config.user_agent)
                .map(Arc::new)
        })
        .transpose()
        .context("building tab-stats client")?;

    let sink = InfluxSink::new(
        InfluxSinkConfig {
            url: config.influx_url.clone(),
            token: config.influx_token.clone(),
            org: config.influx_org.clone(),
            bucket: config.influx_bucket.clone(),
            batch_size: config.sink_batch_size,
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
        },
        errors.clone(),
    )
    .context("building InfluxDB sink")?;
    let health = sink
        .check_health()
        .await
        .context("InfluxDB health check failed")?;
    tracing::info!(
        version = health.version.as_deref().unwrap_or("unknown"),
        "sink: InfluxDB is healthy"
    );

    let refresh_interval = Duration::from_secs(config.metadata_refresh_secs);
    let metadata = match mode {
        MetadataMode::Background => {
            MetadataRefresher::start(Arc::clone(&provider), refresh_interval, errors).await
        }
        MetadataMode::SeedOnly => {
            MetadataRefresher::seed(Arc::clone(&provider), refresh_interval).await
        }
    }
    .context("seeding season metadata")?;

    let ttl = Duration::from_secs(config.profile_cache_ttl_secs);
    let cache = Arc::new(ProfileCache::new(Arc::clone(&provider), ttl));
    if mode == MetadataMode::Background {
        cache.spawn_janitor(ttl);
    }

    let collector = Collector::new(
        default_set(tabstats),
        Duration::from_secs(config.category_timeout_secs),
    );
    let pipeline = Pipeline::new(
        provider,
        cache,
        metadata,
        collector,
        Arc::new(sink.clone()) as Arc<dyn MetricSink>,
        PipelineConfig {
            usernames: config.usernames.clone(),
            max_concurrent_users: config.max_concurrent_users,
        },
    );

    Ok(Components {
        pipeline: Arc::new(pipeline),
        sink,
    })
}
