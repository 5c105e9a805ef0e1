use futures::future::{BoxFuture, FutureExt};

use crate::collector::{CategoryCollector, PointEmitter, TaskContext};
use crate::error::CategoryError;

/// Latest ranked-history entry. Season labels come from the entry's own
/// season id rather than the current season.
pub struct RankedCategory;

impl CategoryCollector for RankedCategory {
    fn name(&self) -> &'static str {
        "ranked"
    }

    fn collect<'a>(
        &'a self,
        ctx: &'a TaskContext,
        out: &'a PointEmitter,
    ) -> BoxFuture<'a, Result<(), CategoryError>> {
        async move {
            let history = ctx.provider.get_ranked_history(&ctx.profile, 1).await?;
            let Some(latest) = history.first() else {
                return Err(CategoryError::NoRankedHistory {
                    username: ctx.profile.name.clone(),
                });
            };

            let slug = ctx.metadata.season_slug(latest.season_id).unwrap_or_default();
            let name = ctx.metadata.season_name(latest.season_id).unwrap_or_default();
            let point = ctx
                .point("ranked", slug, name)
                .field("mmr", latest.mmr)
                .field("rank", latest.rank)
                .field("skill_mean", latest.skill_mean)
                .field("skill_stdev", latest.skill_stdev);
            out.emit(point).await;
            Ok(())
        }
        .boxed()
    }
}
