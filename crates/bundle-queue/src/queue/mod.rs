pub mod job;
pub mod service;
pub mod store;

pub use job::{ConversionJob, JobStatus};
pub use service::{ConversionQueue, JobUpdates, GENERIC_FAILURE};
pub use store::{JobCounts, JobStore};
