//! Cron-driven cycle scheduling in singleton mode.
//!
//! A trigger that fires while a cycle is still running is dropped, never
//! queued. The first cycle starts immediately rather than at the first cron
//! boundary.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::cycle::Pipeline;
use crate::error::PipelineError;

/// At-most-one-running guard shared by every trigger.
#[derive(Clone, Default)]
pub struct SingletonGuard {
    running: Arc<Mutex<()>>,
}

impl SingletonGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the run slot, or `None` if a run is in progress.
    #[must_use]
    pub fn try_acquire(&self) -> Option<OwnedMutexGuard<()>> {
        Arc::clone(&self.running).try_lock_owned().ok()
    }

    /// Runs `work` unless another run holds the slot, in which case `work`
    /// is dropped unpolled and `None` is returned.
    pub async fn run_exclusive<F: Future>(&self, work: F) -> Option<F::Output> {
        let _slot = self.try_acquire()?;
        Some(work.await)
    }

    /// Waits until no run holds the slot.
    pub async fn wait_idle(&self) {
        drop(self.running.lock().await);
    }
}

/// One cron trigger: runs a cycle if the slot is free. Returns whether a
/// cycle ran.
async fn run_triggered(pipeline: Arc<Pipeline>, guard: SingletonGuard) -> bool {
    let ran = guard.run_exclusive(pipeline.run_cycle()).await.is_some();
    if !ran {
        tracing::warn!("scheduler: previous cycle still running; skipping trigger");
    }
    ran
}

pub struct CycleScheduler {
    scheduler: JobScheduler,
    guard: SingletonGuard,
}

impl CycleScheduler {
    /// Registers the cycle job on `cron`, starts the scheduler and kicks off
    /// the first cycle right away.
    ///
    /// The returned handle must be kept alive; [`CycleScheduler::shutdown`]
    /// stops further triggers and waits for the running cycle.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Scheduler`] if the cron expression is invalid
    /// or the scheduler cannot be started.
    pub async fn start(pipeline: Arc<Pipeline>, cron: &str) -> Result<Self, PipelineError> {
        let guard = SingletonGuard::new();
        let scheduler = JobScheduler::new().await?;

        let job = {
            let pipeline = Arc::clone(&pipeline);
            let guard = guard.clone();
            Job::new_async(cron, move |_uuid, _lock| {
                let pipeline = Arc::clone(&pipeline);
                let guard = guard.clone();
                Box::pin(async move {
                    run_triggered(pipeline, guard).await;
                })
            })?
        };
        scheduler.add(job).await?;
        tracing::info!(cron, "scheduler: registered collection job");

        // Claim the slot before the scheduler starts so no cron trigger can
        // overtake the startup cycle.
        if let Some(slot) = guard.try_acquire() {
            tokio::spawn(async move {
                let _slot = slot;
                tracing::info!("scheduler: running startup cycle");
                pipeline.run_cycle().await;
            });
        }

        scheduler.start().await?;
        Ok(Self { scheduler, guard })
    }

    /// Starts the scheduler and blocks until `shutdown` resolves, then stops
    /// it and waits for the running cycle.
    ///
    /// # Errors
    ///
    /// Same as [`CycleScheduler::start`] and [`CycleScheduler::shutdown`].
    pub async fn run_until<S>(
        pipeline: Arc<Pipeline>,
        cron: &str,
        shutdown: S,
    ) -> Result<(), PipelineError>
    where
        S: Future<Output = ()>,
    {
        let scheduler = Self::start(pipeline, cron).await?;
        shutdown.await;
        scheduler.shutdown().await
    }

    /// Stops all future triggers, then waits for an in-flight cycle to
    /// finish, including its own sink flush.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Scheduler`] if the scheduler fails to stop.
    pub async fn shutdown(mut self) -> Result<(), PipelineError> {
        self.scheduler.shutdown().await?;
        self.guard.wait_idle().await;
        tracing::info!("scheduler: stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::future::{BoxFuture, FutureExt};
    use tokio::sync::oneshot;

    use super::*;
    use crate::collector::{CategoryCollector, PointEmitter, TaskContext};
    use crate::error::CategoryError;
    use crate::testing::{test_pipeline, FakeProvider, RecordingSink};

    /// Midnight on January 1st, so only the startup cycle runs in a test.
    const RARE_CRON: &str = "0 0 0 1 1 *";

    /// Sleeps, then emits one point; tracks how many runs overlap.
    #[derive(Default)]
    struct SlowCategory {
        delay: Duration,
        runs: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl SlowCategory {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                ..Self::default()
            })
        }
    }

    impl CategoryCollector for SlowCategory {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn collect<'a>(
            &'a self,
            ctx: &'a TaskContext,
            out: &'a PointEmitter,
        ) -> BoxFuture<'a, Result<(), CategoryError>> {
            async move {
                self.runs.fetch_add(1, Ordering::SeqCst);
                let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_active.fetch_max(active, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                out.emit(ctx.point("slow", "y8s3", "Heavy Mettle").field("n", 1_i64))
                    .await;
                self.active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
            .boxed()
        }
    }

    async fn slow_pipeline(
        delay: Duration,
    ) -> (Arc<Pipeline>, Arc<SlowCategory>, Arc<RecordingSink>) {
        let provider = Arc::new(FakeProvider::new().with_user("alpha", "pid-a"));
        let sink = Arc::new(RecordingSink::default());
        let category = SlowCategory::new(delay);
        let pipeline = test_pipeline(
            &provider,
            &sink,
            &["alpha"],
            vec![Arc::clone(&category) as Arc<dyn CategoryCollector>],
        )
        .await;
        (Arc::new(pipeline), category, sink)
    }

    async fn wait_for_flushes(sink: &RecordingSink, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while sink.flushes() < n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("cycle did not flush in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn first_cycle_runs_immediately_on_start() {
        let (pipeline, category, sink) = slow_pipeline(Duration::ZERO).await;

        let scheduler = CycleScheduler::start(pipeline, RARE_CRON).await.unwrap();
        wait_for_flushes(&sink, 1).await;
        scheduler.shutdown().await.unwrap();

        assert_eq!(sink.flushes(), 1);
        assert_eq!(category.runs.load(Ordering::SeqCst), 1);
        assert_eq!(sink.points().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_waits_for_in_flight_cycle() {
        let (pipeline, _category, sink) = slow_pipeline(Duration::from_millis(300)).await;

        let scheduler = CycleScheduler::start(pipeline, RARE_CRON).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown().await.unwrap();

        assert_eq!(sink.flushes(), 1, "startup cycle flushed before shutdown returned");
        assert_eq!(sink.points().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn trigger_is_dropped_while_startup_cycle_runs() {
        let (pipeline, category, sink) = slow_pipeline(Duration::from_millis(300)).await;

        let scheduler = CycleScheduler::start(Arc::clone(&pipeline), RARE_CRON)
            .await
            .unwrap();
        let ran = run_triggered(Arc::clone(&pipeline), scheduler.guard.clone()).await;
        scheduler.shutdown().await.unwrap();

        assert!(!ran);
        assert_eq!(category.runs.load(Ordering::SeqCst), 1);
        assert_eq!(sink.flushes(), 1);

        // Once idle, the same trigger path runs a cycle.
        let guard = SingletonGuard::new();
        assert!(run_triggered(pipeline, guard).await);
        assert_eq!(sink.flushes(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cron_triggers_never_overlap() {
        let (pipeline, category, _sink) = slow_pipeline(Duration::from_millis(1500)).await;

        let scheduler = CycleScheduler::start(pipeline, "* * * * * *").await.unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        scheduler.shutdown().await.unwrap();

        assert_eq!(category.max_active.load(Ordering::SeqCst), 1);
        let runs = category.runs.load(Ordering::SeqCst);
        assert!(runs >= 2, "cron fired after the startup cycle, got {runs} runs");
        assert!(runs <= 3, "busy triggers were dropped, got {runs} runs");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_until_blocks_until_shutdown_and_drains() {
        let (pipeline, _category, sink) = slow_pipeline(Duration::from_millis(200)).await;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            CycleScheduler::run_until(pipeline, RARE_CRON, async {
                let _ = stop_rx.await;
            })
            .await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(sink.flushes(), 1);
        assert_eq!(sink.points().len(), 1);
    }

    #[tokio::test]
    async fn overlapping_run_is_skipped() {
        let guard = SingletonGuard::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (started_tx, started_rx) = oneshot::channel::<()>();

        let first = {
            let guard = guard.clone();
            let runs = Arc::clone(&runs);
            tokio::spawn(async move {
                guard
                    .run_exclusive(async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                    })
                    .await
            })
        };
        started_rx.await.unwrap();

        let second = guard
            .run_exclusive(async {
                runs.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert!(second.is_none(), "second run must be dropped while first is active");
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        release_tx.send(()).unwrap();
        assert!(first.await.unwrap().is_some());

        let third = guard
            .run_exclusive(async {
                runs.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert!(third.is_some(), "slot is free once the first run finishes");
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn slot_is_released_when_guard_drops() {
        let guard = SingletonGuard::new();
        let slot = guard.try_acquire();
        assert!(slot.is_some());
        assert!(guard.try_acquire().is_none());
        drop(slot);
        assert!(guard.try_acquire().is_some());
    }
}
