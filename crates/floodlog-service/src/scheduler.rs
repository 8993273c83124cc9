//! Scheduled sync cycles.

use std::future::Future;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use floodlog_core::{Blobstore, ReadingsSource, SyncEngine, SyncOutcome, SyncReport};

/// Consecutive failures logged at warn level before escalating.
const WARN_FAILURES: u32 = 3;

/// How a failed cycle should be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureLevel {
    Warn,
    Error,
    Silent,
}

/// Counts consecutive failed cycles.
///
/// The first few failures are warnings, the next one is an error, and the
/// rest are quiet until a cycle succeeds again.
#[derive(Debug, Default)]
pub struct FailureTracker {
    consecutive: u32,
}

impl FailureTracker {
    pub fn record_failure(&mut self) -> FailureLevel {
        self.consecutive += 1;
        if self.consecutive <= WARN_FAILURES {
            FailureLevel::Warn
        } else if self.consecutive == WARN_FAILURES + 1 {
            FailureLevel::Error
        } else {
            FailureLevel::Silent
        }
    }

    /// Reset after a successful cycle. Returns the failures that preceded it.
    pub fn record_success(&mut self) -> u32 {
        std::mem::take(&mut self.consecutive)
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

/// Totals for one run of the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub cycles: u64,
    pub failures: u64,
    pub readings_added: u64,
}

/// Runs a sync cycle on every tick of a fixed interval.
pub struct Scheduler<S, B> {
    engine: SyncEngine<S, B>,
    period: Duration,
}

impl<S: ReadingsSource, B: Blobstore> Scheduler<S, B> {
    pub fn new(engine: SyncEngine<S, B>, period: Duration) -> Self {
        Self { engine, period }
    }

    pub fn engine(&self) -> &SyncEngine<S, B> {
        &self.engine
    }

    /// Run cycles until `shutdown` completes.
    ///
    /// The first cycle starts immediately. Ticks missed while a cycle runs
    /// are skipped, so cycles never overlap or bunch up. A failed cycle is
    /// logged and the next tick starts over from whatever the archive holds.
    pub async fn run_until<F>(&self, shutdown: F) -> RunStats
    where
        F: Future<Output = ()>,
    {
        info!("Starting scheduled sync every {}s", self.period.as_secs());

        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut failures = FailureTracker::default();
        let mut stats = RunStats::default();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = timer.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Shutdown requested during a sync cycle");
                    break;
                }
                result = self.engine.run_cycle_now() => result,
            };

            stats.cycles += 1;
            match result {
                Ok(report) => {
                    let previous = failures.record_success();
                    if previous > 0 {
                        info!("Sync recovered after {} failed cycle(s)", previous);
                    }
                    stats.readings_added += report.readings_added() as u64;
                    log_report(&report);
                }
                Err(e) => {
                    stats.failures += 1;
                    match failures.record_failure() {
                        FailureLevel::Warn => warn!(
                            "Sync cycle failed: {} (attempt {})",
                            e,
                            failures.consecutive()
                        ),
                        FailureLevel::Error => error!(
                            "Sync cycle failed {} times in a row, will continue trying silently: {}",
                            failures.consecutive(),
                            e
                        ),
                        FailureLevel::Silent => debug!("Sync cycle failed: {}", e),
                    }
                }
            }
        }

        info!(
            "Scheduler stopped after {} cycle(s), {} failed",
            stats.cycles, stats.failures
        );
        stats
    }
}

fn log_report(report: &SyncReport) {
    match report.outcome {
        SyncOutcome::Bootstrapped { since } => info!(
            "Seeded archive from {} with {} reading(s) over {} day(s)",
            since,
            report.readings_added(),
            report.days.len()
        ),
        SyncOutcome::Synced { cursor } => info!(
            "Synced {} new reading(s) since {}",
            report.readings_added(),
            cursor
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use floodlog_core::{DayfileStore, MockSource, Reading, SyncOptions};
    use floodlog_store::MemoryBlobstore;
    use floodlog_types::{format_api_timestamp, today_utc};

    const PERIOD: Duration = Duration::from_secs(900);

    type TestScheduler = Scheduler<MockSource, Arc<MemoryBlobstore>>;

    fn scheduler(source: MockSource) -> (Arc<MemoryBlobstore>, TestScheduler) {
        let yesterday = today_utc().previous_day().unwrap();
        let blobs = Arc::new(MemoryBlobstore::new());
        let engine = SyncEngine::new(
            source,
            DayfileStore::new(Arc::clone(&blobs)),
            SyncOptions::default().bootstrap_from(yesterday),
        );
        (blobs, Scheduler::new(engine, PERIOD))
    }

    #[test]
    fn test_failure_levels() {
        let mut tracker = FailureTracker::default();
        let levels: Vec<_> = (0..6).map(|_| tracker.record_failure()).collect();
        assert_eq!(
            levels,
            vec![
                FailureLevel::Warn,
                FailureLevel::Warn,
                FailureLevel::Warn,
                FailureLevel::Error,
                FailureLevel::Silent,
                FailureLevel::Silent,
            ]
        );

        assert_eq!(tracker.record_success(), 6);
        assert_eq!(tracker.consecutive(), 0);
        assert_eq!(tracker.record_failure(), FailureLevel::Warn);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_then_keeps_syncing() {
        let midnight = today_utc().previous_day().unwrap().midnight();
        let readings = (0..4)
            .map(|i| {
                let ts = midnight + time::Duration::minutes(15 * i);
                Reading::new(format_api_timestamp(ts), 0.5)
            })
            .collect();
        let (blobs, scheduler) = scheduler(MockSource::new().with_readings(readings));

        // Ticks at 0s, 900s and 1800s
        let stats = scheduler
            .run_until(tokio::time::sleep(PERIOD * 2 + Duration::from_secs(1)))
            .await;

        assert_eq!(stats.cycles, 3);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.readings_added, 3);

        let cursor = midnight + time::Duration::minutes(45);
        assert_eq!(
            scheduler.engine().source().calls().await,
            vec![midnight, cursor, cursor]
        );
        assert_eq!(blobs.keys().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_the_loop() {
        let source = MockSource::new();
        source.set_should_fail(true);
        let (blobs, scheduler) = scheduler(source);

        let stats = scheduler
            .run_until(tokio::time::sleep(PERIOD * 4 + Duration::from_secs(1)))
            .await;

        assert_eq!(stats.cycles, 5);
        assert_eq!(stats.failures, 5);
        assert_eq!(scheduler.engine().source().fetch_count(), 5);
        assert!(blobs.keys().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_shutdown_runs_nothing() {
        let (_, scheduler) = scheduler(MockSource::new());
        let stats = scheduler.run_until(std::future::ready(())).await;
        assert_eq!(stats, RunStats::default());
    }
}
