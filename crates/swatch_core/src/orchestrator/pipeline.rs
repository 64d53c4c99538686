//! Per-item job pipeline: resolve, consult presets, render, merge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::descriptor::{self, ResolvedSwatch};
use crate::models::{JobRequest, JobResult, ParamMap, ParamValue};
use crate::presets::{PendingPreset, PresetStore, HAND_TUNED_MARKER};
use crate::render::Render;

use super::errors::JobError;

/// Pipeline that turns one job request into one job result.
///
/// All failure paths end in the result's error field; `run_job` has no
/// error channel of its own, so a job can never take the batch down with
/// it.
pub struct JobPipeline {
    renderer: Arc<dyn Render>,
    presets: PresetStore,
    output_dir: PathBuf,
    /// Global render slots shared with every other job in the batch. Each
    /// invocation holds one slot for its full duration, so a split job
    /// counts twice against the batch limit.
    slots: Arc<Semaphore>,
}

impl JobPipeline {
    /// Create a pipeline writing models into `output_dir`.
    pub fn new(
        renderer: Arc<dyn Render>,
        presets: PresetStore,
        output_dir: impl Into<PathBuf>,
        slots: Arc<Semaphore>,
    ) -> Self {
        Self {
            renderer,
            presets,
            output_dir: output_dir.into(),
            slots,
        }
    }

    /// Run one job to completion.
    pub async fn run_job(&self, request: &JobRequest) -> JobResult {
        let resolved = match descriptor::resolve(request) {
            Ok(resolved) => resolved,
            Err(err) => return JobResult::failed(request.source.clone(), err.into()),
        };

        let (mut params, preset_write) = match self.consult_presets(request, &resolved) {
            Ok(consulted) => consulted,
            Err(err) => return JobResult::failed(request.source.clone(), err),
        };
        params.insert(
            "print_mode".to_string(),
            ParamValue::str(request.print_mode.label()),
        );

        let mut result = JobResult {
            source: request.source.clone(),
            tag: Some(resolved.tag.clone()),
            params: Some(params.clone()),
            body_model: None,
            label_model: None,
            preset_write,
            error: None,
        };

        if request.print_mode.is_split() {
            self.render_split(&resolved.tag, &params, &mut result).await;
        } else {
            self.render_mono(&resolved.tag, &params, &mut result).await;
        }
        result
    }

    /// Apply the preset read/write flags around the resolved parameters.
    ///
    /// Only an entry carrying the hand-tuned marker overrides the derived
    /// parameters, and such an entry is never queued for re-writing.
    fn consult_presets(
        &self,
        request: &JobRequest,
        resolved: &ResolvedSwatch,
    ) -> Result<(ParamMap, Option<PendingPreset>), JobError> {
        let mut params = resolved.params.clone();
        let mut write = request.write_presets;

        if request.read_presets {
            if let Some(stored) = self.presets.read_entry(&resolved.tag)? {
                if stored.contains_key(HAND_TUNED_MARKER) {
                    tracing::debug!("using hand-tuned preset for {}", resolved.tag);
                    params = stored;
                    write = false;
                }
            }
        }

        let pending = write.then(|| PendingPreset {
            tag: resolved.tag.clone(),
            params: params.clone(),
        });
        Ok((params, pending))
    }

    async fn render_mono(&self, tag: &str, params: &ParamMap, result: &mut JobResult) {
        let output = self.output_dir.join(format!("swatch-mono-{tag}.stl"));
        match self.render_one(&output, params.clone()).await {
            Ok(()) => result.body_model = Some(output),
            Err(err) => result.error = Some(err),
        }
    }

    async fn render_split(&self, tag: &str, params: &ParamMap, result: &mut JobResult) {
        let body_output = self.output_dir.join(format!("swatch-{tag}-body.stl"));
        let label_output = self.output_dir.join(format!("swatch-{tag}-label.stl"));

        let mut body_params = params.clone();
        body_params.insert("no_label".to_string(), ParamValue::Bool(true));
        let mut label_params = params.clone();
        label_params.insert("no_body".to_string(), ParamValue::Bool(true));

        // The two renders are independent; run them together so the job's
        // latency is one render, not two, whenever slots allow.
        let (body, label) = tokio::join!(
            self.render_one(&body_output, body_params),
            self.render_one(&label_output, label_params),
        );

        match body {
            Ok(()) => result.body_model = Some(body_output),
            Err(err) => result.error = Some(err),
        }
        match label {
            Ok(()) => result.label_model = Some(label_output),
            Err(err) => {
                if result.error.is_none() {
                    result.error = Some(err);
                } else {
                    // Only the body failure is surfaced in the report.
                    tracing::error!(
                        "multiple failures for {}; this one is not in the summary: {}",
                        result.source.display(),
                        err
                    );
                }
            }
        }
    }

    async fn render_one(&self, output: &Path, params: ParamMap) -> Result<(), JobError> {
        let _slot = self
            .slots
            .acquire()
            .await
            .map_err(|_| JobError::Fault("render slots closed".to_string()))?;
        self.renderer.render(output, &params).await?;
        Ok(())
    }
}
