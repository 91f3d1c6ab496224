// Job submission boundary

pub mod jobs;
pub mod workers;

pub use jobs::{GenerationJob, GenerationMode, JobOutcome};
pub use workers::Worker;
