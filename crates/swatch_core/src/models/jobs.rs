//! Job-related data structures (requests and results).

use std::path::PathBuf;

use crate::models::enums::PrintMode;
use crate::models::params::ParamMap;
use crate::orchestrator::JobError;
use crate::presets::PendingPreset;

/// Immutable input to one pipeline run.
///
/// Created once per descriptor file at batch start and owned by its
/// pipeline for the duration of the job.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Path to the filament descriptor JSON.
    pub source: PathBuf,
    /// How many models to produce and which suppression parameters to pass.
    pub print_mode: PrintMode,
    /// Caller-supplied parameters, applied before derivation.
    pub overrides: ParamMap,
    /// Consult the preset store before finalizing parameters.
    pub read_presets: bool,
    /// Record the resolved parameters for the end-of-batch preset flush.
    pub write_presets: bool,
}

impl JobRequest {
    /// Create a request with no overrides and presets disabled.
    pub fn new(source: impl Into<PathBuf>, print_mode: PrintMode) -> Self {
        Self {
            source: source.into(),
            print_mode,
            overrides: ParamMap::new(),
            read_presets: false,
            write_presets: false,
        }
    }

    /// Enable preset store consultation (builder pattern).
    pub fn with_presets(mut self, read: bool, write: bool) -> Self {
        self.read_presets = read;
        self.write_presets = write;
        self
    }
}

/// Result of one job pipeline run.
///
/// Every job produces exactly one of these, success or not. At most one
/// error is surfaced; when a two-render job fails twice, only the body
/// failure is retained here.
#[derive(Debug)]
pub struct JobResult {
    /// The descriptor file this job was created from.
    pub source: PathBuf,
    /// Stable tag derived from vendor/material/color, once resolved.
    pub tag: Option<String>,
    /// Resolved parameter snapshot for reporting.
    pub params: Option<ParamMap>,
    /// Body model path, recorded only if its own render succeeded.
    pub body_model: Option<PathBuf>,
    /// Label model path, recorded only if its own render succeeded.
    pub label_model: Option<PathBuf>,
    /// Parameters to persist to the preset store at end of batch.
    pub preset_write: Option<PendingPreset>,
    /// The surfaced failure, if any.
    pub error: Option<JobError>,
}

impl JobResult {
    /// Result for a job that failed before any render was attempted.
    pub fn failed(source: PathBuf, error: JobError) -> Self {
        Self {
            source,
            tag: None,
            params: None,
            body_model: None,
            label_model: None,
            preset_write: None,
            error: Some(error),
        }
    }

    /// Result synthesized for a job whose pipeline died without reporting.
    pub fn fault(source: PathBuf, message: impl Into<String>) -> Self {
        Self::failed(source, JobError::Fault(message.into()))
    }

    /// Whether the job completed without any failure.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
