//! HTTP client for a JSON stats gateway.
//!
//! Endpoints:
//! - `GET /profiles?name=<username>`
//! - `GET /metadata`
//! - `GET /profiles/{profile_id}/stats/{season_slug}/{kind}`
//! - `GET /profiles/{profile_id}/ranked?limit=<n>`

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use r6stats_core::{Metadata, Profile};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::ProviderError;
use crate::provider::StatsProvider;
use crate::types::{SeasonStats, StatsKind, StatsPayload};

/// [`StatsProvider`] backed by a stats gateway over HTTP.
pub struct HttpStatsProvider {
    client: Client,
    token: Option<String>,
    base_url: Url,
}

impl HttpStatsProvider {
    /// Creates a client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ProviderError::InvalidBaseUrl`] if
    /// `base_url` does not parse as a hierarchical URL.
    pub fn with_base_url(
        base_url: &str,
        token: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let base_url = parse_base_url(base_url)?;

        Ok(Self {
            client,
            token: token.map(ToOwned::to_owned),
            base_url,
        })
    }

    /// Builds an endpoint URL from percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `parse_base_url` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends a GET request and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::NotFound`] on HTTP 404.
    /// - [`ProviderError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ProviderError::Http`] on network failure.
    /// - [`ProviderError::Deserialize`] if the body does not match `T`.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(url = %url, status = status.as_u16(), "provider: response received");
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "provider: non-success status");
            return Err(ProviderError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

impl StatsProvider for HttpStatsProvider {
    fn resolve_user<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, Result<Profile, ProviderError>> {
        async move {
            let mut url = self.endpoint(&["profiles"]);
            url.query_pairs_mut().append_pair("name", username);
            match self.get_json::<Profile>(url).await {
                Err(ProviderError::NotFound { .. }) => {
                    Err(ProviderError::UnknownUser(username.to_owned()))
                }
                other => other,
            }
        }
        .boxed()
    }

    fn get_metadata(&self) -> BoxFuture<'_, Result<Metadata, ProviderError>> {
        async move { self.get_json::<Metadata>(self.endpoint(&["metadata"])).await }.boxed()
    }

    fn get_stats<'a>(
        &'a self,
        profile: &'a Profile,
        season_slug: &'a str,
        kind: StatsKind,
    ) -> BoxFuture<'a, Result<StatsPayload, ProviderError>> {
        async move {
            let url = self.endpoint(&[
                "profiles",
                &profile.profile_id,
                "stats",
                season_slug,
                kind.as_str(),
            ]);
            let payload = match kind {
                StatsKind::Summary => StatsPayload::Summary(self.get_json(url).await?),
                StatsKind::Operators => StatsPayload::Operators(self.get_json(url).await?),
                StatsKind::Maps => StatsPayload::Maps(self.get_json(url).await?),
            };
            Ok(payload)
        }
        .boxed()
    }

    fn get_ranked_history<'a>(
        &'a self,
        profile: &'a Profile,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<SeasonStats>, ProviderError>> {
        async move {
            let mut url = self.endpoint(&["profiles", &profile.profile_id, "ranked"]);
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
            self.get_json::<Vec<SeasonStats>>(url).await
        }
        .boxed()
    }
}

/// Parses a base URL, rejecting forms that cannot carry path segments.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ProviderError> {
    let url = Url::parse(raw).map_err(|e| ProviderError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ProviderError::InvalidBaseUrl {
            url: raw.to_owned(),
            reason: "URL cannot be a base".to_owned(),
        });
    }
    Ok(url)
}
