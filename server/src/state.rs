use std::sync::Arc;

use csvmark::{ArtifactStore, Dispatcher, JobRegistry, Settings, TransformWorker};

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<JobRegistry>,
    pub store: Arc<dyn ArtifactStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wires a worker and dispatcher around `registry` and `store`.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime.
    pub fn new(registry: Arc<JobRegistry>, store: Arc<dyn ArtifactStore>, settings: Settings) -> Self {
        let worker = Arc::new(TransformWorker::new(Arc::clone(&registry), Arc::clone(&store)));
        let dispatcher =
            Dispatcher::new(worker).with_max_concurrent(settings.max_concurrent_jobs);

        Self {
            registry,
            store,
            dispatcher: Arc::new(dispatcher),
            settings: Arc::new(settings),
        }
    }
}
