//! Error model for job execution.
//!
//! Every failure a job can hit is captured here and carried inside its
//! result. Nothing crosses the pipeline boundary unstructured; the only
//! errors that can stop the batch are defects in the admission loop
//! itself.

use thiserror::Error;

use crate::descriptor::ResolveError;
use crate::presets::PresetError;
use crate::render::RenderError;

/// A failure local to one job.
#[derive(Error, Debug)]
pub enum JobError {
    /// The external renderer failed.
    #[error("{0}")]
    Render(#[from] RenderError),

    /// The item descriptor could not be resolved into parameters.
    #[error("{0}")]
    Resolve(#[from] ResolveError),

    /// The preset store could not be consulted.
    #[error("{0}")]
    Preset(#[from] PresetError),

    /// Anything not anticipated above, including a panic inside the
    /// pipeline task.
    #[error("{0}")]
    Fault(String),
}

impl JobError {
    /// Short failure kind shown in the report.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Render(_) => "renderer",
            Self::Resolve(_) => "descriptor",
            Self::Preset(_) => "preset store",
            Self::Fault(_) => "fault",
        }
    }

    /// Multi-line diagnostic detail, when the failure carries any.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Render(RenderError::Failed(failure)) => Some(failure.detail()),
            Self::Render(err @ RenderError::Launch { .. }) => source_chain(err),
            Self::Resolve(err) => source_chain(err),
            Self::Preset(err) => source_chain(err),
            Self::Fault(_) => None,
        }
    }
}

fn source_chain(err: &dyn std::error::Error) -> Option<String> {
    let mut lines = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("    caused by: {cause}"));
        source = cause.source();
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
