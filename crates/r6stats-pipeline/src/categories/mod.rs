//! The static set of stat categories collected for every user.

mod maps;
mod matches;
mod operators;
mod ranked;
mod ranked_tabstats;

use std::sync::Arc;

use r6stats_provider::TabStatsClient;

pub use maps::MapsCategory;
pub use matches::MatchesCategory;
pub use operators::OperatorsCategory;
pub use ranked::RankedCategory;
pub use ranked_tabstats::{parse_rank_slug, RankedTabStatsCategory};

use crate::collector::CategoryCollector;

/// Categories run every cycle. `ranked_tabstats` is included only when a
/// tab-stats client is configured.
#[must_use]
pub fn default_set(tabstats: Option<Arc<TabStatsClient>>) -> Vec<Arc<dyn CategoryCollector>> {
    let mut categories: Vec<Arc<dyn CategoryCollector>> = vec![
        Arc::new(MatchesCategory),
        Arc::new(OperatorsCategory),
        Arc::new(MapsCategory),
        Arc::new(RankedCategory),
    ];
    if let Some(client) = tabstats {
        categories.push(Arc::new(RankedTabStatsCategory::new(client)));
    }
    categories
}

#[cfg(test)]
#[path = "categories_test.rs"]
mod tests;
