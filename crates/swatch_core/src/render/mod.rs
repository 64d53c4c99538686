//! Renderer invocation boundary.
//!
//! Builds the fixed-shape command line for the external geometry compiler
//! and runs it as a child process, capturing exit status, output streams,
//! and elapsed wall-clock time. The rest of the crate only sees the
//! [`Render`] trait, so tests can substitute the process entirely.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::models::ParamMap;

/// Failure detail from an invocation that ran and exited non-zero.
#[derive(Debug)]
pub struct RenderFailure {
    /// Child exit code; -1 when the child was terminated by a signal.
    pub exit_code: i32,
    /// Captured standard output (empty when streams were inherited).
    pub stdout: Vec<u8>,
    /// Captured standard error (empty when streams were inherited).
    pub stderr: Vec<u8>,
    /// Wall-clock duration of the invocation.
    pub elapsed: Duration,
    /// Exact argument list, program first.
    pub cmdline: Vec<String>,
}

impl RenderFailure {
    /// Multi-line diagnostic block for the report.
    pub fn detail(&self) -> String {
        format!(
            "    arguments: {}\n    stderr: {}\n    stdout: {}",
            self.cmdline[1..].join(" "),
            indent_stream(&self.stderr),
            indent_stream(&self.stdout),
        )
    }
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "renderer returned error code {} in {}",
            self.exit_code,
            format_elapsed(self.elapsed)
        )
    }
}

fn indent_stream(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .collect::<Vec<_>>()
        .join("\n\t")
}

/// Format a duration for diagnostics: milliseconds for short runs,
/// seconds otherwise.
pub fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_millis(1200) {
        format!("{:.0}ms", elapsed.as_secs_f64() * 1000.0)
    } else {
        format!("{:.3}s", elapsed.as_secs_f64())
    }
}

/// Errors from one renderer invocation.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The renderer binary could not be started at all.
    #[error("failed to launch renderer '{program}'")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The renderer ran and reported failure.
    #[error("{0}")]
    Failed(RenderFailure),
}

/// Boundary trait for the external geometry renderer.
#[async_trait]
pub trait Render: Send + Sync {
    /// Render `params` into the model file at `output`.
    ///
    /// Success means the renderer exited zero; by its contract the output
    /// file exists afterwards.
    async fn render(&self, output: &Path, params: &ParamMap) -> Result<(), RenderError>;
}

/// OpenSCAD-backed renderer.
#[derive(Debug, Clone)]
pub struct OpenScadRenderer {
    program: String,
    template: PathBuf,
    capture_output: bool,
}

impl OpenScadRenderer {
    /// Renderer invoking `program` on the given template source.
    pub fn new(program: impl Into<String>, template: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            template: template.into(),
            capture_output: true,
        }
    }

    /// Whether to capture the child's stdout/stderr.
    ///
    /// When disabled the child inherits our streams, and failure outcomes
    /// carry empty stream fields.
    pub fn with_captured_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Build the full argument list, program first.
    pub fn build_cmdline(&self, output: &Path, params: &ParamMap) -> Vec<String> {
        let mut cmdline = vec![
            self.program.clone(),
            self.template.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        for (name, value) in params {
            cmdline.push("-D".to_string());
            cmdline.push(format!("{}={}", name, value.render()));
        }
        cmdline
    }
}

#[async_trait]
impl Render for OpenScadRenderer {
    async fn render(&self, output: &Path, params: &ParamMap) -> Result<(), RenderError> {
        let cmdline = self.build_cmdline(output, params);
        tracing::debug!("executing: {}", cmdline.join(" "));

        let mut command = Command::new(&cmdline[0]);
        command.args(&cmdline[1..]);

        let launch_error = |source| RenderError::Launch {
            program: self.program.clone(),
            source,
        };

        let started = Instant::now();
        let (status, stdout, stderr) = if self.capture_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
            let out = command.output().await.map_err(launch_error)?;
            (out.status, out.stdout, out.stderr)
        } else {
            let status = command.status().await.map_err(launch_error)?;
            (status, Vec::new(), Vec::new())
        };
        let elapsed = started.elapsed();

        tracing::debug!(
            "output={}, rc={:?}, elapsed={}",
            output.display(),
            status.code(),
            format_elapsed(elapsed)
        );

        if status.success() {
            Ok(())
        } else {
            Err(RenderError::Failed(RenderFailure {
                exit_code: status.code().unwrap_or(-1),
                stdout,
                stderr,
                elapsed,
                cmdline,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParamValue;

    fn sample_params() -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("material".into(), ParamValue::str("PLA"));
        params.insert("no_label".into(), ParamValue::Bool(true));
        params.insert("nozzle_temp_range".into(), ParamValue::int_range(190, 230));
        params
    }

    #[test]
    fn cmdline_has_fixed_shape() {
        let renderer = OpenScadRenderer::new("openscad", "labeled-swatch.scad");
        let cmdline = renderer.build_cmdline(Path::new("out/s.stl"), &sample_params());

        assert_eq!(
            &cmdline[..4],
            &[
                "openscad".to_string(),
                "labeled-swatch.scad".to_string(),
                "-o".to_string(),
                "out/s.stl".to_string(),
            ]
        );
        assert!(cmdline.contains(&"material=\"PLA\"".to_string()));
        assert!(cmdline.contains(&"no_label=true".to_string()));
        assert!(cmdline.contains(&"nozzle_temp_range=[190, 230]".to_string()));
        // one -D per parameter
        assert_eq!(cmdline.iter().filter(|t| *t == "-D").count(), 3);
    }

    #[tokio::test]
    async fn zero_exit_is_success() {
        let renderer = OpenScadRenderer::new("true", "template.scad");
        let result = renderer.render(Path::new("ignored.stl"), &ParamMap::new()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_failure_with_cmdline() {
        let renderer = OpenScadRenderer::new("false", "template.scad");
        let err = renderer
            .render(Path::new("ignored.stl"), &ParamMap::new())
            .await
            .unwrap_err();
        match err {
            RenderError::Failed(failure) => {
                assert_eq!(failure.exit_code, 1);
                assert_eq!(failure.cmdline[0], "false");
                assert!(failure.detail().contains("arguments: template.scad"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_error() {
        let renderer = OpenScadRenderer::new("definitely-not-a-renderer", "t.scad");
        let err = renderer
            .render(Path::new("ignored.stl"), &ParamMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Launch { .. }));
    }

    #[test]
    fn elapsed_formats_switch_units() {
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250ms");
        assert_eq!(format_elapsed(Duration::from_millis(2500)), "2.500s");
    }
}
