//! Client for the secondary tab-stats profile endpoint.
//!
//! `GET {base}/{profile_id}?update=false` returns the player's current-season
//! ranked record, including an MMR figure the primary provider does not expose.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::client::parse_base_url;
use crate::error::ProviderError;

#[derive(Debug, Clone, Deserialize)]
pub struct TabStats {
    #[serde(rename = "current_season_records")]
    pub current_season: CurrentSeasonRecords,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentSeasonRecords {
    pub ranked: TabRankedRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TabRankedRecord {
    pub mmr: i64,
    pub real_mmr: i64,
    /// `"<season id>-<rank name>"`, e.g. `"31-gold-2"`.
    pub rank_slug: String,
}

pub struct TabStatsClient {
    client: Client,
    base_url: Url,
}

impl TabStatsClient {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ProviderError::InvalidBaseUrl`] for a malformed base URL.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Fetches the tab-stats record for one profile.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::Http`] on network failure.
    /// - [`ProviderError::UnexpectedStatus`] on a non-2xx status.
    /// - [`ProviderError::Deserialize`] if the body does not match [`TabStats`].
    pub async fn fetch(&self, profile_id: &str) -> Result<TabStats, ProviderError> {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(profile_id);
        }
        url.query_pairs_mut().append_pair("update", "false");

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
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
