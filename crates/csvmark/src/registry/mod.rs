mod clock;
mod job;
mod store;
mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use job::{Job, JobId, JobStatus};
pub use store::JobRegistry;
pub use sweep::SweepScheduler;
