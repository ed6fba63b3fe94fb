//! Interval-driven background tasks with cooperative shutdown
//!
//! Each task runs in its own loop on its own timer. Cancellation is only
//! observed between cycles: a cycle that has started always runs to
//! completion.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait ScheduledTask: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// One cycle. Errors are logged; the task keeps its schedule.
    async fn run(&self) -> anyhow::Result<()>;
}

pub struct TaskScheduler {
    cancel_token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self {
            cancel_token: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// Token that stops every task spawned by this scheduler
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start `task`. The first cycle runs immediately.
    pub fn spawn(&mut self, task: Arc<dyn ScheduledTask>) {
        let cancel_token = self.cancel_token.clone();

        tracing::info!(
            task = task.name(),
            interval_secs = task.interval().as_secs(),
            "Background task started"
        );

        self.handles.push(tokio::spawn(async move {
            let mut ticker = interval(task.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let start = std::time::Instant::now();
                        match task.run().await {
                            Ok(()) => tracing::debug!(
                                task = task.name(),
                                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                                "Background task cycle completed"
                            ),
                            Err(e) => tracing::error!(
                                task = task.name(),
                                error = %e,
                                "Background task cycle failed"
                            ),
                        }
                    }
                }
            }
            tracing::info!(task = task.name(), "Background task stopped");
        }));
    }

    /// Signal every task and wait for in-flight cycles to finish
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Background task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;

    struct Counter {
        runs: AtomicUsize,
        every: Duration,
    }

    #[async_trait]
    impl ScheduledTask for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn interval(&self) -> Duration {
            self.every
        }

        async fn run(&self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("failures do not stop the schedule")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_on_each_tick_until_shutdown() {
        let task = Arc::new(Counter {
            runs: AtomicUsize::new(0),
            every: Duration::from_secs(60),
        });
        let mut scheduler = TaskScheduler::new();
        scheduler.spawn(task.clone());

        // Immediate first tick plus three more
        tokio::time::sleep(Duration::from_secs(190)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), 4);

        scheduler.shutdown().await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), 4);
    }

    /// Blocks inside its cycle until released
    struct Slow {
        started: Notify,
        release: Notify,
        finished: AtomicUsize,
    }

    #[async_trait]
    impl ScheduledTask for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(3600)
        }

        async fn run(&self) -> anyhow::Result<()> {
            self.started.notify_one();
            self.release.notified().await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_running_cycle() {
        let task = Arc::new(Slow {
            started: Notify::new(),
            release: Notify::new(),
            finished: AtomicUsize::new(0),
        });
        let mut scheduler = TaskScheduler::new();
        scheduler.spawn(task.clone());
        task.started.notified().await;

        let shutdown = tokio::spawn(scheduler.shutdown());
        tokio::task::yield_now().await;
        assert!(!shutdown.is_finished());

        task.release.notify_one();
        shutdown.await.unwrap();
        assert_eq!(task.finished.load(Ordering::SeqCst), 1);
    }
}
