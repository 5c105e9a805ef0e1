//! Season reference data shared by every collection cycle.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: u32,
    pub slug: String,
    pub name: String,
}

/// Snapshot of the provider's season list, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub seasons: Vec<Season>,
}

impl Metadata {
    #[must_use]
    pub fn new(seasons: Vec<Season>) -> Self {
        Self { seasons }
    }

    /// The current season is the last entry of the list.
    #[must_use]
    pub fn current_season(&self) -> Option<&Season> {
        self.seasons.last()
    }

    #[must_use]
    pub fn season_by_id(&self, id: u32) -> Option<&Season> {
        self.seasons.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn season_slug(&self, id: u32) -> Option<&str> {
        self.season_by_id(id).map(|s| s.slug.as_str())
    }

    #[must_use]
    pub fn season_name(&self, id: u32) -> Option<&str> {
        self.season_by_id(id).map(|s| s.name.as_str())
    }
}
