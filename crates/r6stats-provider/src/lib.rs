//! Upstream stats provider: the [`StatsProvider`] seam, payload types and
//! the HTTP clients that implement it.

pub mod client;
pub mod error;
pub mod provider;
pub mod tabstats;
pub mod types;

pub use client::HttpStatsProvider;
pub use error::ProviderError;
pub use provider::StatsProvider;
pub use tabstats::{TabStats, TabStatsClient};
pub use types::{
    DetailedStats, GameModes, MapDetails, MapStats, MatchSummary, NamedStats, OperatorStats,
    SeasonStats, StatsKind, StatsPayload, SummarizedStats, TeamRoles,
};
