//! Buffered InfluxDB v2 writer.
//!
//! Points accumulate in memory. Once `batch_size` points are buffered, the
//! full batch is handed to a background delivery task; `flush` delivers the
//! remainder and waits for every in-flight delivery. Failures go to the
//! background error channel.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use r6stats_core::{BackgroundError, ErrorSender, MetricPoint};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::error::SinkError;
use crate::line::encode_point;
use crate::sink::MetricSink;

pub struct InfluxSinkConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthInfo {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// [`MetricSink`] writing line protocol to an InfluxDB v2 bucket.
#[derive(Clone)]
pub struct InfluxSink {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    write_url: Url,
    health_url: Url,
    token: String,
    batch_size: usize,
    buffer: Mutex<Vec<MetricPoint>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    errors: ErrorSender,
}

impl InfluxSink {
    /// # Errors
    ///
    /// Returns [`SinkError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`SinkError::InvalidUrl`] if `config.url` is not a hierarchical URL.
    pub fn new(config: InfluxSinkConfig, errors: ErrorSender) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;

        let base = Url::parse(&config.url).map_err(|e| SinkError::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(SinkError::InvalidUrl {
                url: config.url,
                reason: "URL cannot be a base".to_owned(),
            });
        }

        let mut write_url = with_segments(&base, &["api", "v2", "write"]);
        write_url
            .query_pairs_mut()
            .append_pair("org", &config.org)
            .append_pair("bucket", &config.bucket)
            .append_pair("precision", "s");
        let health_url = with_segments(&base, &["health"]);

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                write_url,
                health_url,
                token: config.token,
                batch_size: config.batch_size.max(1),
                buffer: Mutex::new(Vec::new()),
                in_flight: Mutex::new(Vec::new()),
                errors,
            }),
        })
    }

    /// Checks that the server reports a passing health status.
    ///
    /// # Errors
    ///
    /// - [`SinkError::Http`] on network failure.
    /// - [`SinkError::Deserialize`] if the body is not a health document.
    /// - [`SinkError::Unhealthy`] if the status is anything but `"pass"`.
    pub async fn check_health(&self) -> Result<HealthInfo, SinkError> {
        let url = self.inner.health_url.clone();
        let body = self.inner.client.get(url.clone()).send().await?.text().await?;
        let health: HealthInfo =
            serde_json::from_str(&body).map_err(|e| SinkError::Deserialize {
                context: url.to_string(),
                source: e,
            })?;

        if health.status != "pass" {
            return Err(SinkError::Unhealthy {
                status: health.status,
                message: health.message.unwrap_or_default(),
            });
        }
        Ok(health)
    }

    /// Number of points waiting in the buffer.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl MetricSink for InfluxSink {
    fn write(&self, point: MetricPoint) {
        let full_batch = {
            let mut buffer = self
                .inner
                .buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            buffer.push(point);
            if buffer.len() >= self.inner.batch_size {
                Some(std::mem::take(&mut *buffer))
            } else {
                None
            }
        };

        if let Some(batch) = full_batch {
            let inner = Arc::clone(&self.inner);
            let handle = tokio::spawn(async move { inner.deliver(batch).await });
            self.inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(handle);
        }
    }

    fn flush(&self) -> BoxFuture<'_, ()> {
        async move {
            let pending = std::mem::take(
                &mut *self
                    .inner
                    .buffer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            for chunk in pending.chunks(self.inner.batch_size) {
                self.inner.deliver(chunk.to_vec()).await;
            }

            let handles = std::mem::take(
                &mut *self
                    .inner
                    .in_flight
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "sink: background delivery task failed");
                }
            }
        }
        .boxed()
    }
}

impl Inner {
    /// Delivers one batch, reporting any failure on the error channel.
    async fn deliver(&self, batch: Vec<MetricPoint>) {
        let count = batch.len();
        match self.post_lines(&batch).await {
            Ok(0) => {}
            Ok(lines) => tracing::debug!(points = count, lines, "sink: batch delivered"),
            Err(e) => {
                tracing::warn!(points = count, error = %e, "sink: batch delivery failed");
                // The receiver only disappears during shutdown.
                let _ = self.errors.send(BackgroundError::SinkDelivery(Box::new(e)));
            }
        }
    }

    async fn post_lines(&self, batch: &[MetricPoint]) -> Result<usize, SinkError> {
        let lines: Vec<String> = batch.iter().filter_map(encode_point).collect();
        if lines.is_empty() {
            return Ok(0);
        }

        let response = self
            .client
            .post(self.write_url.clone())
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .body(lines.join("\n"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(lines.len())
    }
}

fn with_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
