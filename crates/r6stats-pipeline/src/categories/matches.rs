use futures::future::{BoxFuture, FutureExt};
use r6stats_provider::StatsKind;

use crate::collector::{CategoryCollector, PointEmitter, TaskContext};
use crate::error::CategoryError;

/// Match counts per game mode for the current season.
pub struct MatchesCategory;

impl CategoryCollector for MatchesCategory {
    fn name(&self) -> &'static str {
        "matches"
    }

    fn collect<'a>(
        &'a self,
        ctx: &'a TaskContext,
        out: &'a PointEmitter,
    ) -> BoxFuture<'a, Result<(), CategoryError>> {
        async move {
            let season = ctx.current_season()?;
            let summary = ctx
                .provider
                .get_stats(&ctx.profile, &season.slug, StatsKind::Summary)
                .await?
                .into_summary()?;

            for (gamemode, stats) in summary.iter() {
                let point = ctx
                    .season_point("matches", season)
                    .tag("gamemode", gamemode)
                    .field("matches_played", stats.matches_played)
                    .field("matches_won", stats.matches_won)
                    .field("matches_lost", stats.matches_lost);
                out.emit(point).await;
            }
            Ok(())
        }
        .boxed()
    }
}
