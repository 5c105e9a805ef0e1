//! Per-user fan-out over stat categories with fan-in through one channel.
//!
//! Every category runs as its own task and reports on a bounded channel:
//! any number of [`CollectionResult::Point`]s followed by exactly one
//! [`CollectionResult::Done`] or [`CollectionResult::Failed`]. The
//! aggregation loop forwards points to the sink as they arrive and stops
//! once it has seen one terminal signal per category.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use r6stats_core::{Metadata, MetricPoint, Profile, Season};
use r6stats_provider::StatsProvider;
use r6stats_sink::MetricSink;
use tokio::sync::mpsc;

use crate::error::CategoryError;

const CHANNEL_CAPACITY: usize = 64;

/// What one category task reports on the completion channel.
#[derive(Debug)]
pub enum CollectionResult {
    Point(MetricPoint),
    Done,
    Failed(CategoryError),
}

#[derive(Debug)]
struct Signal {
    category: &'static str,
    result: CollectionResult,
}

/// Inputs shared by every category task of one user in one cycle.
#[derive(Clone)]
pub struct TaskContext {
    pub provider: Arc<dyn StatsProvider>,
    pub profile: Profile,
    pub metadata: Arc<Metadata>,
    pub timestamp: DateTime<Utc>,
}

impl TaskContext {
    /// # Errors
    ///
    /// Returns [`CategoryError::NoCurrentSeason`] if the snapshot has no
    /// seasons.
    pub fn current_season(&self) -> Result<&Season, CategoryError> {
        self.metadata
            .current_season()
            .ok_or(CategoryError::NoCurrentSeason)
    }

    /// A point carrying the cycle timestamp and the base labels
    /// `season_slug`, `season_name` and `username`.
    #[must_use]
    pub fn point(&self, measurement: &str, season_slug: &str, season_name: &str) -> MetricPoint {
        MetricPoint::new(measurement, self.timestamp)
            .tag("season_slug", season_slug)
            .tag("season_name", season_name)
            .tag("username", self.profile.name.as_str())
    }

    /// [`TaskContext::point`] labelled with `season`.
    #[must_use]
    pub fn season_point(&self, measurement: &str, season: &Season) -> MetricPoint {
        self.point(measurement, &season.slug, &season.name)
    }
}

/// Sending half handed to a category; points go out tagged with the
/// category's name.
pub struct PointEmitter {
    category: &'static str,
    tx: mpsc::Sender<Signal>,
}

impl PointEmitter {
    pub async fn emit(&self, point: MetricPoint) {
        // The receiver only goes away once every category has reported.
        let _ = self
            .tx
            .send(Signal {
                category: self.category,
                result: CollectionResult::Point(point),
            })
            .await;
    }
}

/// One independent class of statistics.
pub trait CategoryCollector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches this category's data and emits its points. Returning `Err`
    /// ends the category; points already emitted are kept.
    fn collect<'a>(
        &'a self,
        ctx: &'a TaskContext,
        out: &'a PointEmitter,
    ) -> BoxFuture<'a, Result<(), CategoryError>>;
}

/// Outcome of one user's collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserReport {
    pub username: String,
    pub points: usize,
    pub completed: usize,
    pub failed_categories: Vec<&'static str>,
}

pub struct Collector {
    categories: Vec<Arc<dyn CategoryCollector>>,
    task_timeout: Duration,
}

impl Collector {
    #[must_use]
    pub fn new(categories: Vec<Arc<dyn CategoryCollector>>, task_timeout: Duration) -> Self {
        Self {
            categories,
            task_timeout,
        }
    }

    #[must_use]
    pub fn category_names(&self) -> Vec<&'static str> {
        self.categories.iter().map(|c| c.name()).collect()
    }

    /// Runs every category for one user and streams the points into `sink`.
    ///
    /// Category failures are logged and recorded in the report; they never
    /// cancel sibling categories.
    pub async fn collect_user(&self, ctx: TaskContext, sink: &dyn MetricSink) -> UserReport {
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        for category in &self.categories {
            spawn_category(Arc::clone(category), ctx.clone(), tx.clone(), self.task_timeout);
        }
        drop(tx);

        let username = ctx.profile.name;
        let mut report = UserReport {
            username: username.clone(),
            ..UserReport::default()
        };
        let mut outstanding = self.categories.len();

        while outstanding > 0 {
            let Some(signal) = rx.recv().await else {
                tracing::error!(
                    username = %username,
                    outstanding,
                    "collector: completion channel closed before every category reported"
                );
                break;
            };
            match signal.result {
                CollectionResult::Point(point) => {
                    sink.write(point);
                    report.points += 1;
                }
                CollectionResult::Done => {
                    outstanding -= 1;
                    report.completed += 1;
                }
                CollectionResult::Failed(e) => {
                    outstanding -= 1;
                    tracing::error!(
                        username = %username,
                        category = signal.category,
                        error = %e,
                        "collector: category failed"
                    );
                    report.failed_categories.push(signal.category);
                }
            }
        }
        rx.close();

        tracing::debug!(
            username = %username,
            points = report.points,
            failed = report.failed_categories.len(),
            "collector: user complete"
        );
        report
    }
}

fn spawn_category(
    category: Arc<dyn CategoryCollector>,
    ctx: TaskContext,
    tx: mpsc::Sender<Signal>,
    timeout: Duration,
) {
    tokio::spawn(async move {
        let name = category.name();
        let emitter = PointEmitter {
            category: name,
            tx: tx.clone(),
        };
        let run = AssertUnwindSafe(category.collect(&ctx, &emitter)).catch_unwind();
        let result = match tokio::time::timeout(timeout, run).await {
            Ok(Ok(Ok(()))) => CollectionResult::Done,
            Ok(Ok(Err(e))) => CollectionResult::Failed(e),
            Ok(Err(_)) => CollectionResult::Failed(CategoryError::Panicked),
            Err(_) => CollectionResult::Failed(CategoryError::TimedOut { after: timeout }),
        };
        let _ = tx.send(Signal { category: name, result }).await;
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::testing::{cycle_time, sample_metadata, FakeProvider, RecordingSink};

    /// Emits `points` points, then hangs, fails or finishes.
    struct ScriptedCategory {
        name: &'static str,
        points: usize,
        fail: bool,
        hang: bool,
        runs: AtomicUsize,
    }

    impl ScriptedCategory {
        fn emitting(name: &'static str, points: usize) -> Arc<Self> {
            Arc::new(Self {
                name,
                points,
                fail: false,
                hang: false,
                runs: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str, points: usize) -> Arc<Self> {
            Arc::new(Self {
                name,
                points,
                fail: true,
                hang: false,
                runs: AtomicUsize::new(0),
            })
        }

        fn hanging(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                points: 0,
                fail: false,
                hang: true,
                runs: AtomicUsize::new(0),
            })
        }
    }

    impl CategoryCollector for ScriptedCategory {
        fn name(&self) -> &'static str {
            self.name
        }

        fn collect<'a>(
            &'a self,
            ctx: &'a TaskContext,
            out: &'a PointEmitter,
        ) -> BoxFuture<'a, Result<(), CategoryError>> {
            async move {
                self.runs.fetch_add(1, Ordering::SeqCst);
                for i in 0..self.points {
                    out.emit(
                        ctx.point(self.name, "y8s3", "Heavy Mettle")
                            .field("n", i64::try_from(i).unwrap()),
                    )
                    .await;
                }
                if self.hang {
                    futures::future::pending::<()>().await;
                }
                if self.fail {
                    return Err(CategoryError::NoRankedHistory {
                        username: ctx.profile.name.clone(),
                    });
                }
                Ok(())
            }
            .boxed()
        }
    }

    fn context() -> TaskContext {
        TaskContext {
            provider: Arc::new(FakeProvider::new()),
            profile: Profile::new("Alpha", "pid-a"),
            metadata: Arc::new(sample_metadata()),
            timestamp: cycle_time(),
        }
    }

    fn collector(categories: Vec<Arc<ScriptedCategory>>) -> Collector {
        Collector::new(
            categories
                .into_iter()
                .map(|c| c as Arc<dyn CategoryCollector>)
                .collect(),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn observes_one_terminal_signal_per_category() {
        let sink = RecordingSink::default();
        let collector = collector(vec![
            ScriptedCategory::emitting("none", 0),
            ScriptedCategory::emitting("one", 1),
            ScriptedCategory::emitting("many", 500),
        ]);

        let report = collector.collect_user(context(), &sink).await;

        assert_eq!(report.completed, 3);
        assert!(report.failed_categories.is_empty());
        assert_eq!(report.points, 501);
        assert_eq!(sink.points().len(), 501);
    }

    #[tokio::test]
    async fn failing_category_does_not_affect_siblings() {
        let sink = RecordingSink::default();
        let collector = collector(vec![
            ScriptedCategory::emitting("a", 2),
            ScriptedCategory::failing("b", 1),
            ScriptedCategory::emitting("c", 3),
        ]);

        let report = collector.collect_user(context(), &sink).await;

        assert_eq!(report.completed, 2);
        assert_eq!(report.failed_categories, vec!["b"]);
        let points = sink.points();
        assert_eq!(points.iter().filter(|p| p.measurement == "a").count(), 2);
        assert_eq!(points.iter().filter(|p| p.measurement == "c").count(), 3);
        // Points emitted before the failure are kept.
        assert_eq!(points.iter().filter(|p| p.measurement == "b").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_category_times_out_alone() {
        let sink = RecordingSink::default();
        let collector = collector(vec![
            ScriptedCategory::hanging("stuck"),
            ScriptedCategory::emitting("fine", 1),
        ]);

        let report = collector.collect_user(context(), &sink).await;

        assert_eq!(report.failed_categories, vec!["stuck"]);
        assert_eq!(report.completed, 1);
        assert_eq!(sink.points().len(), 1);
    }

    #[tokio::test]
    async fn points_share_cycle_timestamp_and_base_labels() {
        let sink = RecordingSink::default();
        let collector = collector(vec![
            ScriptedCategory::emitting("a", 2),
            ScriptedCategory::emitting("b", 2),
        ]);

        collector.collect_user(context(), &sink).await;

        for point in sink.points() {
            assert_eq!(point.timestamp, cycle_time());
            assert_eq!(point.tags["username"], "Alpha");
            assert_eq!(point.tags["season_slug"], "y8s3");
        }
    }

    #[tokio::test]
    async fn each_category_runs_once_per_user() {
        let sink = RecordingSink::default();
        let a = ScriptedCategory::emitting("a", 0);
        let collector = collector(vec![Arc::clone(&a)]);

        collector.collect_user(context(), &sink).await;
        collector.collect_user(context(), &sink).await;

        assert_eq!(a.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn no_categories_completes_immediately() {
        let sink = RecordingSink::default();
        let report = collector(Vec::new()).collect_user(context(), &sink).await;

        assert_eq!(report.username, "Alpha");
        assert_eq!(report.completed, 0);
        assert!(sink.points().is_empty());
    }
}
