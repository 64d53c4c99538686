//! Shared data model: requests, results, and renderer parameters.

mod enums;
mod jobs;
mod params;

pub use enums::{ParsePrintModeError, PrintMode};
pub use jobs::{JobRequest, JobResult};
pub use params::{ParamMap, ParamValue};
