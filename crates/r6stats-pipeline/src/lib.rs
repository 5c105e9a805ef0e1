//! The scheduled collection pipeline: profile cache, metadata snapshot,
//! per-user category fan-out and cycle scheduling.

pub mod cache;
pub mod categories;
pub mod collector;
pub mod cycle;
pub mod error;
pub mod metadata;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use cache::ProfileCache;
pub use categories::default_set;
pub use collector::{
    CategoryCollector, CollectionResult, Collector, PointEmitter, TaskContext, UserReport,
};
pub use cycle::{CycleReport, Pipeline, PipelineConfig};
pub use error::{CategoryError, PipelineError};
pub use metadata::{MetadataRefresher, MIN_REFRESH_INTERVAL};
pub use scheduler::{CycleScheduler, SingletonGuard};
