//! Final batch report rendering.

use std::fmt::Write as _;
use std::path::Path;

use crate::models::{JobResult, ParamMap};

const FILENAME_WIDTH: usize = 40;

/// Render the consolidated batch report.
///
/// One row per job, in the order given (completion order; callers wanting
/// input order sort beforehand). Failing jobs show the failure kind and
/// message in place of the data columns, with diagnostic detail underneath
/// when the failure carries any.
pub fn render(results: &[JobResult]) -> String {
    let mut out = String::new();
    out.push_str("Generated swatch files:\n");
    let _ = writeln!(
        out,
        "{:>40} {:>15} {:>6} {:>7} {:<12} {:>7} {:>7}",
        "filename", "vendor", "type", "rgb", "color", "price", "print settings"
    );

    for result in results {
        let name = display_name(&result.source);
        match &result.error {
            Some(err) => {
                let _ = writeln!(out, "{:>40}  {} error: {}", name, err.kind(), err);
                if let Some(detail) = err.detail() {
                    out.push_str(&detail);
                    out.push('\n');
                }
            }
            None => {
                let params = result.params.as_ref();
                let _ = writeln!(
                    out,
                    "{:>40} {:>15} {:>6} {:>7} {:<12} {:>7} {:>7}",
                    name,
                    param(params, "manufacturer"),
                    param(params, "material"),
                    param(params, "color_code"),
                    param(params, "color_name"),
                    format!("${}/kg", param(params, "cost_per_kg")),
                    param(params, "nozzle_temp_range"),
                );
            }
        }
    }
    out
}

fn param(params: Option<&ParamMap>, key: &str) -> String {
    params
        .and_then(|p| p.get(key))
        .map(|value| value.to_string())
        .unwrap_or_default()
}

/// Basename of the source, ellipsis-truncated for the filename column.
fn display_name(source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| source.display().to_string());
    if name.chars().count() > FILENAME_WIDTH {
        let head: String = name.chars().take(FILENAME_WIDTH - 1).collect();
        format!("{head}…")
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParamValue, ParamMap};
    use crate::orchestrator::JobError;
    use crate::render::{RenderError, RenderFailure};
    use std::path::PathBuf;
    use std::time::Duration;

    fn success_result() -> JobResult {
        let mut params = ParamMap::new();
        params.insert("manufacturer".into(), ParamValue::str("Polymaker"));
        params.insert("material".into(), ParamValue::str("PLA"));
        params.insert("color_code".into(), ParamValue::str("#ABC"));
        params.insert("color_name".into(), ParamValue::str("Galaxy Black"));
        params.insert("cost_per_kg".into(), ParamValue::int(25));
        params.insert("nozzle_temp_range".into(), ParamValue::int_range(190, 230));
        JobResult {
            source: PathBuf::from("/profiles/Polymaker PLA @base.json"),
            tag: Some("Polymaker-PLA-GalaxyBlack".into()),
            params: Some(params),
            body_model: Some(PathBuf::from("swatch-mono-Polymaker-PLA-GalaxyBlack.stl")),
            label_model: None,
            preset_write: None,
            error: None,
        }
    }

    #[test]
    fn success_row_shows_data_columns() {
        let report = render(&[success_result()]);
        let row = report.lines().nth(2).unwrap();
        assert!(row.contains("Polymaker"));
        assert!(row.contains("PLA"));
        assert!(row.contains("#ABC"));
        assert!(row.contains("Galaxy Black"));
        assert!(row.contains("$25/kg"));
        assert!(row.contains("[190, 230]"));
    }

    #[test]
    fn failure_row_shows_kind_and_detail() {
        let failure = RenderFailure {
            exit_code: 1,
            stdout: Vec::new(),
            stderr: b"ERROR: syntax error".to_vec(),
            elapsed: Duration::from_millis(80),
            cmdline: vec!["openscad".into(), "t.scad".into()],
        };
        let result = JobResult::failed(
            PathBuf::from("bad.json"),
            JobError::Render(RenderError::Failed(failure)),
        );

        let report = render(&[result]);
        assert!(report.contains("renderer error: renderer returned error code 1"));
        assert!(report.contains("stderr: ERROR: syntax error"));
    }

    #[test]
    fn long_filenames_are_truncated_with_ellipsis() {
        let mut result = success_result();
        result.source = PathBuf::from(format!("/p/{}.json", "x".repeat(60)));
        let report = render(&[result]);
        let row = report.lines().nth(2).unwrap();
        assert!(row.contains('…'));
        assert!(!row.contains(&"x".repeat(41)));
    }

    #[test]
    fn report_has_one_row_per_result() {
        let results = vec![
            success_result(),
            JobResult::fault(PathBuf::from("dead.json"), "task died"),
        ];
        let report = render(&results);
        // header (2 lines) + 2 rows
        assert_eq!(report.lines().count(), 4);
        assert!(report.contains("fault error: task died"));
    }
}
