use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, error, info};
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;

use crate::registry::JobId;
use crate::worker::runner::TransformWorker;

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Counts a dispatched run until dropped.
struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn new(in_flight: Arc<InFlight>) -> Self {
        in_flight.count.fetch_add(1, Ordering::SeqCst);
        Self(in_flight)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Launches worker runs detached from the caller.
///
/// Each run executes on tokio's blocking pool. Callers may drop the returned
/// handle; completion is observed through the registry.
pub struct Dispatcher {
    worker: Arc<TransformWorker>,
    runtime: Handle,
    limit: Option<Arc<Semaphore>>,
    in_flight: Arc<InFlight>,
}

impl Dispatcher {
    /// Creates an unbounded dispatcher on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime.
    pub fn new(worker: Arc<TransformWorker>) -> Self {
        Self::with_handle(worker, Handle::current())
    }

    pub fn with_handle(worker: Arc<TransformWorker>, runtime: Handle) -> Self {
        Self {
            worker,
            runtime,
            limit: None,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Caps how many runs execute at once. `0` keeps dispatch unbounded.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.limit = (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent)));
        if max_concurrent > 0 {
            info!("Dispatcher limited to {} concurrent jobs", max_concurrent);
        }
        self
    }

    pub fn dispatch(&self, job_id: JobId) -> JoinHandle<()> {
        let guard = InFlightGuard::new(Arc::clone(&self.in_flight));
        let worker = Arc::clone(&self.worker);
        let limit = self.limit.clone();

        debug!("Dispatching job {}", job_id);

        self.runtime.spawn(async move {
            let _guard = guard;
            let _permit = match limit {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };

            let runner = Arc::clone(&worker);
            let outcome = tokio::task::spawn_blocking(move || runner.run(&job_id)).await;

            if let Err(e) = outcome {
                let detail = if e.is_panic() {
                    "worker panicked"
                } else {
                    "worker was cancelled"
                };
                error!("Job {}: {}", job_id, detail);
                if let Err(mark_err) = worker.registry().mark_failed(&job_id, detail) {
                    debug!("Could not record failure for job {}: {}", job_id, mark_err);
                }
            }
        })
    }

    /// Number of dispatched runs that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Resolves once no dispatched run is outstanding.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}
