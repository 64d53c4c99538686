//! Bounded-concurrency admission loop.
//!
//! The scheduler owns a FIFO queue of pending jobs and an active set capped
//! at the configured width. Completions free capacity immediately (the
//! active set is a [`FuturesUnordered`], so the loop wakes on the first
//! finished job rather than polling), and the head of the queue is admitted
//! in its place. A failing job never stops admission of the rest.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};

use crate::models::{JobRequest, JobResult};

use super::pipeline::JobPipeline;

/// Resolve a requested concurrency width to an effective one.
///
/// Zero and negative requests mean "one render process per available
/// processing unit".
pub fn normalize_limit(requested: i64) -> usize {
    if requested > 0 {
        requested as usize
    } else {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

/// Drives job pipelines to completion under a concurrency cap.
pub struct Scheduler {
    limit: usize,
}

impl Scheduler {
    /// Create a scheduler with the given admission width.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is zero; callers normalize user input with
    /// [`normalize_limit`] first.
    pub fn new(limit: usize) -> Self {
        assert!(limit >= 1, "concurrency limit must be at least 1");
        Self { limit }
    }

    /// The admission width.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run every request to completion and return one result per request,
    /// in completion order.
    ///
    /// At most `limit` jobs are admitted at a time; the render-slot
    /// semaphore inside the pipeline additionally caps concurrent renderer
    /// processes at the same width, so a split job spends two slots while
    /// both of its renders are in flight. A pipeline task that dies without
    /// reporting (a panic) is converted into a fault result rather than
    /// aborting the batch.
    pub async fn run(
        &self,
        pipeline: Arc<JobPipeline>,
        requests: Vec<JobRequest>,
    ) -> Vec<JobResult> {
        let total = requests.len();
        let mut pending: VecDeque<JobRequest> = requests.into();
        let mut active = FuturesUnordered::new();
        let mut results = Vec::with_capacity(total);

        loop {
            // Admission: the only place new work enters concurrency.
            while active.len() < self.limit {
                let Some(request) = pending.pop_front() else {
                    break;
                };
                let source = request.source.clone();
                tracing::debug!(
                    "admitting {} ({} active, {} pending)",
                    source.display(),
                    active.len(),
                    pending.len()
                );
                let job = Arc::clone(&pipeline);
                let handle = tokio::spawn(async move { job.run_job(&request).await });
                active.push(async move { (source, handle.await) });
            }

            let Some((source, joined)) = active.next().await else {
                break;
            };
            match joined {
                Ok(result) => {
                    match &result.error {
                        Some(err) => {
                            tracing::warn!("job {} failed: {}", source.display(), err)
                        }
                        None => tracing::info!(
                            "job {} finished ({}/{} done)",
                            source.display(),
                            results.len() + 1,
                            total
                        ),
                    }
                    results.push(result);
                }
                Err(join_err) => {
                    // The pipeline never reports through this path; reaching
                    // it means the task died. The job still gets its row.
                    tracing::error!("job {} aborted: {}", source.display(), join_err);
                    results.push(JobResult::fault(source, join_err.to_string()));
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParamMap, PrintMode};
    use crate::orchestrator::JobError;
    use crate::presets::PresetStore;
    use crate::render::{Render, RenderError, RenderFailure};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Renderer double that tracks how many renders overlap in time.
    struct TrackingRender {
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
        delay: Duration,
        fail_matching: Vec<&'static str>,
        panic_matching: Option<&'static str>,
    }

    impl TrackingRender {
        fn new(delay_ms: u64) -> Self {
            Self {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(delay_ms),
                fail_matching: Vec::new(),
                panic_matching: None,
            }
        }

        fn failing(delay_ms: u64, patterns: &[&'static str]) -> Self {
            Self {
                fail_matching: patterns.to_vec(),
                ..Self::new(delay_ms)
            }
        }

        fn panicking(delay_ms: u64, pattern: &'static str) -> Self {
            Self {
                panic_matching: Some(pattern),
                ..Self::new(delay_ms)
            }
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Render for TrackingRender {
        async fn render(&self, output: &Path, _params: &ParamMap) -> Result<(), RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let name = output.to_string_lossy();
            if let Some(pattern) = self.panic_matching {
                if name.contains(pattern) {
                    panic!("renderer double panicked for {name}");
                }
            }
            if self.fail_matching.iter().any(|pat| name.contains(pat)) {
                return Err(RenderError::Failed(RenderFailure {
                    exit_code: 1,
                    stdout: Vec::new(),
                    stderr: b"boom".to_vec(),
                    elapsed: self.delay,
                    cmdline: vec!["renderer".to_string(), name.to_string()],
                }));
            }
            Ok(())
        }
    }

    fn write_descriptors(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("filament-{i}.json"));
                let mut file = std::fs::File::create(&path).unwrap();
                write!(
                    file,
                    r##"{{
                        "filament_vendor": ["Vendor{i}"],
                        "filament_type": ["PLA"],
                        "name": "Vendor{i} PLA Shade {i} @Generic",
                        "default_filament_colour": ["#11223{i}"],
                        "filament_cost": ["19.50"],
                        "nozzle_temperature_range_low": ["190"],
                        "nozzle_temperature_range_high": ["230"],
                        "chamber_temperatures": ["0"]
                    }}"##
                )
                .unwrap();
                path
            })
            .collect()
    }

    fn pipeline_with(renderer: Arc<dyn Render>, dir: &Path, limit: usize) -> Arc<JobPipeline> {
        Arc::new(JobPipeline::new(
            renderer,
            PresetStore::new(dir.join("presets.json")),
            dir.join("out"),
            Arc::new(Semaphore::new(limit)),
        ))
    }

    fn requests_for(files: &[PathBuf], mode: PrintMode) -> Vec<JobRequest> {
        files
            .iter()
            .map(|file| JobRequest::new(file.clone(), mode))
            .collect()
    }

    async fn run_batch(
        dir: &Path,
        renderer: Arc<TrackingRender>,
        mode: PrintMode,
        count: usize,
        limit: usize,
    ) -> Vec<JobResult> {
        let files = write_descriptors(dir, count);
        let pipeline = pipeline_with(renderer, dir, limit);
        Scheduler::new(limit)
            .run(pipeline, requests_for(&files, mode))
            .await
    }

    #[tokio::test]
    async fn every_job_is_reported_exactly_once() {
        for limit in [1, 2, 4] {
            let dir = tempfile::tempdir().unwrap();
            let renderer = Arc::new(TrackingRender::new(5));
            let results =
                run_batch(dir.path(), renderer, PrintMode::Mono, 4, limit).await;

            assert_eq!(results.len(), 4);
            let sources: HashSet<_> = results.iter().map(|r| r.source.clone()).collect();
            assert_eq!(sources.len(), 4, "duplicate or missing source at limit {limit}");
            assert!(results.iter().all(JobResult::is_success));
        }
    }

    #[tokio::test]
    async fn concurrent_renders_never_exceed_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(TrackingRender::new(20));
        let results =
            run_batch(dir.path(), renderer.clone(), PrintMode::Mono, 6, 2).await;

        assert_eq!(results.len(), 6);
        assert!(renderer.peak() <= 2, "peak {} exceeded limit", renderer.peak());
        assert_eq!(renderer.calls(), 6);
    }

    #[tokio::test]
    async fn split_jobs_count_each_render_against_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(TrackingRender::new(20));
        let results = run_batch(dir.path(), renderer.clone(), PrintMode::Mmu, 3, 2).await;

        assert_eq!(results.len(), 3);
        assert_eq!(renderer.calls(), 6);
        assert!(renderer.peak() <= 2, "peak {} exceeded limit", renderer.peak());
    }

    #[tokio::test]
    async fn split_renders_overlap_when_capacity_allows() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(TrackingRender::new(30));
        let results = run_batch(dir.path(), renderer.clone(), PrintMode::Mmu, 1, 4).await;

        assert_eq!(results.len(), 1);
        assert_eq!(renderer.calls(), 2);
        assert_eq!(renderer.peak(), 2, "body and label should run together");
    }

    #[tokio::test]
    async fn split_renders_serialize_under_a_single_slot() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(TrackingRender::new(10));
        let results = run_batch(dir.path(), renderer.clone(), PrintMode::Manual, 2, 1).await;

        assert_eq!(results.len(), 2);
        assert_eq!(renderer.calls(), 4);
        assert_eq!(renderer.peak(), 1);
    }

    #[tokio::test]
    async fn a_failing_job_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(TrackingRender::failing(5, &["Vendor1"]));
        let results = run_batch(dir.path(), renderer, PrintMode::Mono, 4, 2).await;

        assert_eq!(results.len(), 4);
        let failed: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0]
            .source
            .to_string_lossy()
            .contains("filament-1"));
    }

    #[tokio::test]
    async fn a_panicking_pipeline_yields_a_fault_result() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(TrackingRender::panicking(5, "Vendor2"));
        let results = run_batch(dir.path(), renderer, PrintMode::Mono, 4, 2).await;

        assert_eq!(results.len(), 4);
        let faulted: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
        assert_eq!(faulted.len(), 1);
        assert!(matches!(faulted[0].error, Some(JobError::Fault(_))));
        assert!(faulted[0].source.to_string_lossy().contains("filament-2"));
    }

    #[tokio::test]
    async fn empty_batch_returns_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(Arc::new(TrackingRender::new(1)), dir.path(), 2);
        let results = Scheduler::new(2).run(pipeline, Vec::new()).await;
        assert!(results.is_empty());
    }

    #[test]
    fn limits_normalize_to_a_positive_width() {
        assert!(normalize_limit(0) >= 1);
        assert!(normalize_limit(-3) >= 1);
        assert_eq!(normalize_limit(5), 5);
    }

    #[test]
    #[should_panic(expected = "concurrency limit")]
    fn zero_limit_is_rejected() {
        let _ = Scheduler::new(0);
    }
}
