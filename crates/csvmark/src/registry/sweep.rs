//! Periodic removal of old jobs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::registry::JobRegistry;

/// Runs [`JobRegistry::sweep`] on a fixed interval until stopped.
pub struct SweepScheduler {
    registry: Arc<JobRegistry>,
    interval: Duration,
    max_age: chrono::Duration,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl SweepScheduler {
    pub fn new(registry: Arc<JobRegistry>, interval: Duration, max_age: chrono::Duration) -> Self {
        Self {
            registry,
            interval,
            max_age,
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Start the sweep loop on the current tokio runtime.
    ///
    /// The first sweep happens one full interval after starting.
    pub fn start(&self) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let shutdown = Arc::clone(&self.shutdown);
        let wake = Arc::clone(&self.wake);
        let interval = self.interval;
        let max_age = self.max_age;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.tick().await; // skip immediate first tick

            loop {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                tokio::select! {
                    _ = interval_timer.tick() => {},
                    _ = wake.notified() => {},
                }

                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                let removed = registry.sweep(max_age);
                if removed > 0 {
                    log::info!("Job sweep removed {} job(s)", removed);
                } else {
                    log::debug!("Job sweep: nothing to remove");
                }
            }

            log::info!("Job sweep scheduler stopped");
        })
    }

    /// Signal the loop to stop. It exits without running another sweep.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wake.notify_one();
    }
}

impl Drop for SweepScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
