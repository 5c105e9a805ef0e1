use futures::future::{BoxFuture, FutureExt};
use r6stats_provider::StatsKind;

use crate::collector::{CategoryCollector, PointEmitter, TaskContext};
use crate::error::CategoryError;

/// Per-operator round stats, measurement `actions`.
pub struct OperatorsCategory;

impl CategoryCollector for OperatorsCategory {
    fn name(&self) -> &'static str {
        "operators"
    }

    fn collect<'a>(
        &'a self,
        ctx: &'a TaskContext,
        out: &'a PointEmitter,
    ) -> BoxFuture<'a, Result<(), CategoryError>> {
        async move {
            let season = ctx.current_season()?;
            let operators = ctx
                .provider
                .get_stats(&ctx.profile, &season.slug, StatsKind::Operators)
                .await?
                .into_operators()?;

            for (gamemode, roles) in operators.iter() {
                for (role, entries) in roles.iter() {
                    for operator in entries {
                        let point = ctx
                            .season_point("actions", season)
                            .tag("gamemode", gamemode)
                            .tag("role", role)
                            .tag("operator", operator.name.as_str())
                            .fields(operator.stats.to_fields());
                        out.emit(point).await;
                    }
                }
            }
            Ok(())
        }
        .boxed()
    }
}
