//! Stat payload shapes returned by the provider.
//!
//! Every numeric field defaults to zero so a sparse payload still decodes.

use std::collections::BTreeMap;

use r6stats_core::FieldValue;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Which stats payload a `get_stats` call should populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsKind {
    Summary,
    Operators,
    Maps,
}

impl StatsKind {
    /// Path segment used by the HTTP provider.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StatsKind::Summary => "summary",
            StatsKind::Operators => "operators",
            StatsKind::Maps => "maps",
        }
    }
}

impl std::fmt::Display for StatsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-game-mode container. Modes missing from the payload are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameModes<T> {
    #[serde(default)]
    pub all: Option<T>,
    #[serde(default)]
    pub casual: Option<T>,
    #[serde(default)]
    pub unranked: Option<T>,
    #[serde(default)]
    pub ranked: Option<T>,
}

impl<T> GameModes<T> {
    /// Present game modes in the fixed order `all, casual, unranked, ranked`.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &T)> {
        [
            ("all", self.all.as_ref()),
            ("casual", self.casual.as_ref()),
            ("unranked", self.unranked.as_ref()),
            ("ranked", self.ranked.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, stats)| stats.map(|s| (name, s)))
    }
}

/// Per-team-role lists, used for operators and bombsites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRoles<T> {
    #[serde(default)]
    pub all: Vec<T>,
    #[serde(default)]
    pub attack: Vec<T>,
    #[serde(default)]
    pub defence: Vec<T>,
}

impl<T> TeamRoles<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[T])> {
        [
            ("all", self.all.as_slice()),
            ("attack", self.attack.as_slice()),
            ("defence", self.defence.as_slice()),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSummary {
    pub matches_played: i64,
    pub matches_won: i64,
    pub matches_lost: i64,
}

/// Round-level performance numbers shared by operator, map and bombsite stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailedStats {
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub melee_kills: i64,
    pub team_kills: i64,
    pub trades: i64,
    pub revives: i64,
    pub headshots: i64,
    pub rounds_played: i64,
    pub rounds_won: i64,
    pub rounds_lost: i64,
    pub minutes_played: i64,
    pub kills_per_round: f64,
    pub headshot_percentage: f64,
    pub entry_deaths: i64,
    pub entry_death_trades: i64,
    pub entry_kills: i64,
    pub entry_kill_trades: i64,
    pub rounds_survived: f64,
    pub rounds_with_kill: f64,
    pub rounds_with_multikill: f64,
    pub rounds_with_ace: f64,
    pub rounds_with_clutch: f64,
    pub rounds_with_kost: f64,
    pub rounds_with_entry_death: f64,
    pub rounds_with_entry_kill: f64,
    pub distance_per_round: f64,
    pub distance_total: f64,
    pub time_alive_per_match: f64,
    pub time_dead_per_match: f64,
}

impl DetailedStats {
    /// Flattens the stats into point fields keyed by their JSON names.
    #[must_use]
    pub fn to_fields(&self) -> BTreeMap<String, FieldValue> {
        let ints = [
            ("kills", self.kills),
            ("deaths", self.deaths),
            ("assists", self.assists),
            ("melee_kills", self.melee_kills),
            ("team_kills", self.team_kills),
            ("trades", self.trades),
            ("revives", self.revives),
            ("headshots", self.headshots),
            ("rounds_played", self.rounds_played),
            ("rounds_won", self.rounds_won),
            ("rounds_lost", self.rounds_lost),
            ("minutes_played", self.minutes_played),
            ("entry_deaths", self.entry_deaths),
            ("entry_death_trades", self.entry_death_trades),
            ("entry_kills", self.entry_kills),
            ("entry_kill_trades", self.entry_kill_trades),
        ];
        let floats = [
            ("kills_per_round", self.kills_per_round),
            ("headshot_percentage", self.headshot_percentage),
            ("rounds_survived", self.rounds_survived),
            ("rounds_with_kill", self.rounds_with_kill),
            ("rounds_with_multikill", self.rounds_with_multikill),
            ("rounds_with_ace", self.rounds_with_ace),
            ("rounds_with_clutch", self.rounds_with_clutch),
            ("rounds_with_kost", self.rounds_with_kost),
            ("rounds_with_entry_death", self.rounds_with_entry_death),
            ("rounds_with_entry_kill", self.rounds_with_entry_kill),
            ("distance_per_round", self.distance_per_round),
            ("distance_total", self.distance_total),
            ("time_alive_per_match", self.time_alive_per_match),
            ("time_dead_per_match", self.time_dead_per_match),
        ];

        ints.into_iter()
            .map(|(k, v)| (k.to_string(), FieldValue::Int(v)))
            .chain(
                floats
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), FieldValue::Float(v))),
            )
            .collect()
    }
}

/// Stats for a named entity (operator or bombsite).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedStats {
    pub name: String,
    #[serde(flatten)]
    pub stats: DetailedStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapDetails {
    #[serde(flatten)]
    pub matches: MatchSummary,
    #[serde(flatten)]
    pub stats: DetailedStats,
    #[serde(default)]
    pub bombsites: Option<TeamRoles<NamedStats>>,
}

pub type SummarizedStats = GameModes<MatchSummary>;
pub type OperatorStats = GameModes<TeamRoles<NamedStats>>;
pub type MapStats = GameModes<BTreeMap<String, MapDetails>>;

/// One season of ranked history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonStats {
    pub season_id: u32,
    pub mmr: i64,
    pub rank: i64,
    pub skill_mean: f64,
    pub skill_stdev: f64,
}

/// The category-specific payload returned by `get_stats`.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsPayload {
    Summary(SummarizedStats),
    Operators(OperatorStats),
    Maps(MapStats),
}

impl StatsPayload {
    #[must_use]
    pub fn kind(&self) -> StatsKind {
        match self {
            StatsPayload::Summary(_) => StatsKind::Summary,
            StatsPayload::Operators(_) => StatsKind::Operators,
            StatsPayload::Maps(_) => StatsKind::Maps,
        }
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::UnexpectedPayload`] for any other payload kind.
    pub fn into_summary(self) -> Result<SummarizedStats, ProviderError> {
        match self {
            StatsPayload::Summary(s) => Ok(s),
            other => Err(mismatch(StatsKind::Summary, &other)),
        }
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::UnexpectedPayload`] for any other payload kind.
    pub fn into_operators(self) -> Result<OperatorStats, ProviderError> {
        match self {
            StatsPayload::Operators(s) => Ok(s),
            other => Err(mismatch(StatsKind::Operators, &other)),
        }
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::UnexpectedPayload`] for any other payload kind.
    pub fn into_maps(self) -> Result<MapStats, ProviderError> {
        match self {
            StatsPayload::Maps(s) => Ok(s),
            other => Err(mismatch(StatsKind::Maps, &other)),
        }
    }
}

fn mismatch(expected: StatsKind, actual: &StatsPayload) -> ProviderError {
    ProviderError::UnexpectedPayload {
        expected,
        actual: actual.kind(),
    }
}
