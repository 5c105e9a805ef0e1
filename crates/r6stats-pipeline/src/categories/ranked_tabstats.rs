use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use r6stats_provider::TabStatsClient;

use crate::collector::{CategoryCollector, PointEmitter, TaskContext};
use crate::error::CategoryError;

/// Current-season ranked record from the secondary tab-stats endpoint.
pub struct RankedTabStatsCategory {
    client: Arc<TabStatsClient>,
}

impl RankedTabStatsCategory {
    #[must_use]
    pub fn new(client: Arc<TabStatsClient>) -> Self {
        Self { client }
    }
}

/// Splits `"<season id>-<rank>"` on the first `-`, e.g. `"31-gold-2"` into
/// `(31, "gold-2")`.
///
/// # Errors
///
/// Returns [`CategoryError::MalformedRankSlug`] when there is no `-`, the
/// rank is empty or the season id is not a number.
pub fn parse_rank_slug(slug: &str) -> Result<(u32, &str), CategoryError> {
    let malformed = || CategoryError::MalformedRankSlug(slug.to_owned());
    let (season, rank) = slug.split_once('-').ok_or_else(malformed)?;
    let season_id = season.parse::<u32>().map_err(|_| malformed())?;
    if rank.is_empty() {
        return Err(malformed());
    }
    Ok((season_id, rank))
}

impl CategoryCollector for RankedTabStatsCategory {
    fn name(&self) -> &'static str {
        "ranked_tabstats"
    }

    fn collect<'a>(
        &'a self,
        ctx: &'a TaskContext,
        out: &'a PointEmitter,
    ) -> BoxFuture<'a, Result<(), CategoryError>> {
        async move {
            let season = ctx.current_season()?;
            let stats = self.client.fetch(&ctx.profile.profile_id).await?;
            let record = &stats.current_season.ranked;
            let (season_id, rank) = parse_rank_slug(&record.rank_slug)?;

            let point = ctx
                .season_point("ranked_tabstats", season)
                .tag("season_id", season_id.to_string())
                .field("rank_slug", rank)
                .field("mmr", record.mmr)
                .field("real_mmr", record.real_mmr);
            out.emit(point).await;
            Ok(())
        }
        .boxed()
    }
}
