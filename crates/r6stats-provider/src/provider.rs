use futures::future::BoxFuture;
use r6stats_core::{Metadata, Profile};

use crate::error::ProviderError;
use crate::types::{SeasonStats, StatsKind, StatsPayload};

/// The upstream stats source the collection pipeline reads from.
///
/// Methods return boxed futures so the pipeline can hold the provider as
/// `Arc<dyn StatsProvider>` and share it across spawned category tasks.
pub trait StatsProvider: Send + Sync {
    /// Maps a display name to a stable account identifier.
    fn resolve_user<'a>(&'a self, username: &'a str)
        -> BoxFuture<'a, Result<Profile, ProviderError>>;

    /// Fetches the season reference data.
    fn get_metadata(&self) -> BoxFuture<'_, Result<Metadata, ProviderError>>;

    /// Fetches one category-specific stats payload for a season.
    fn get_stats<'a>(
        &'a self,
        profile: &'a Profile,
        season_slug: &'a str,
        kind: StatsKind,
    ) -> BoxFuture<'a, Result<StatsPayload, ProviderError>>;

    /// Fetches up to `limit` seasons of ranked history, most recent first.
    fn get_ranked_history<'a>(
        &'a self,
        profile: &'a Profile,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<SeasonStats>, ProviderError>>;
}
