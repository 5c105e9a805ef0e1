use futures::future::{BoxFuture, FutureExt};
use r6stats_provider::StatsKind;

use crate::collector::{CategoryCollector, PointEmitter, TaskContext};
use crate::error::CategoryError;

/// Per-map stats plus, where the payload has them, per-bombsite stats.
pub struct MapsCategory;

impl CategoryCollector for MapsCategory {
    fn name(&self) -> &'static str {
        "maps"
    }

    fn collect<'a>(
        &'a self,
        ctx: &'a TaskContext,
        out: &'a PointEmitter,
    ) -> BoxFuture<'a, Result<(), CategoryError>> {
        async move {
            let season = ctx.current_season()?;
            let maps = ctx
                .provider
                .get_stats(&ctx.profile, &season.slug, StatsKind::Maps)
                .await?
                .into_maps()?;

            for (gamemode, by_map) in maps.iter() {
                for (map, details) in by_map {
                    let point = ctx
                        .season_point("maps", season)
                        .tag("gamemode", gamemode)
                        .tag("map", map.as_str())
                        .field("matches_played", details.matches.matches_played)
                        .field("matches_won", details.matches.matches_won)
                        .field("matches_lost", details.matches.matches_lost)
                        .fields(details.stats.to_fields());
                    out.emit(point).await;

                    let Some(bombsites) = &details.bombsites else {
                        continue;
                    };
                    for (role, sites) in bombsites.iter() {
                        for site in sites {
                            let point = ctx
                                .season_point("bombsites", season)
                                .tag("gamemode", gamemode)
                                .tag("map", map.as_str())
                                .tag("role", role)
                                .tag("bombsite", site.name.as_str())
                                .fields(site.stats.to_fields());
                            out.emit(point).await;
                        }
                    }
                }
            }
            Ok(())
        }
        .boxed()
    }
}
