mod dispatcher;
mod runner;

pub use dispatcher::Dispatcher;
pub use runner::TransformWorker;
