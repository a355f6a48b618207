//! External tools that vet the sources of a release before it is archived.

use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use libhub_registry::RepoEntry;
use tempfile::TempDir;
use tracing::debug;

use crate::error::{CoreError, ErrorContext, Result};

/// A check run against the checked-out sources of a release.
///
/// `Err` rejects the release. `Ok(Some(report))` accepts it with an advisory report that is kept
/// in the release log.
pub trait ReleaseInspector: Send + Sync {
    fn name(&self) -> &str;

    fn inspect(&self, folder: &Path, entry: &RepoEntry) -> Result<Option<String>>;
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

fn spawn_error(tool: &str, err: std::io::Error) -> CoreError {
    CoreError::Scan {
        tool: tool.to_string(),
        message: format!("unable to run: {err}"),
        report: String::new(),
    }
}

/// Virus scan through the ClamAV daemon.
#[derive(Debug, Default)]
pub struct ClamAvScanner;

impl ClamAvScanner {
    const EXECUTABLE: &'static str = "clamdscan";
    const CLEAN_MARKER: &'static str = "Infected files: 0";
}

impl ReleaseInspector for ClamAvScanner {
    fn name(&self) -> &str {
        "clamav"
    }

    fn inspect(&self, folder: &Path, _entry: &RepoEntry) -> Result<Option<String>> {
        let output = Command::new(Self::EXECUTABLE)
            .args(["--fdpass", "-i"])
            .arg(folder)
            .env("LANG", "en")
            .output()
            .map_err(|err| spawn_error(self.name(), err))?;

        let report = combined_output(&output);
        if !output.status.success() || !report.contains(Self::CLEAN_MARKER) {
            return Err(CoreError::Scan {
                tool: self.name().to_string(),
                message: "security scan did not report a clean tree".to_string(),
                report,
            });
        }

        Ok(Some(report))
    }
}

/// Library lint through `arduino-lint`.
#[derive(Debug)]
pub struct ArduinoLint {
    path: PathBuf,
}

impl ArduinoLint {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
        }
    }
}

impl ReleaseInspector for ArduinoLint {
    fn name(&self) -> &str {
        "arduino-lint"
    }

    fn inspect(&self, folder: &Path, entry: &RepoEntry) -> Result<Option<String>> {
        let scratch =
            TempDir::new().with_context(|| "creating lint report folder".to_string())?;
        let report_file = scratch.path().join("report.json");

        let output = Command::new(&self.path)
            .args([
                "--compliance=permissive",
                "--format=text",
                "--project-type=library",
                "--recursive=false",
            ])
            .arg(format!("--report-file={}", report_file.display()))
            .arg(folder)
            .env("ARDUINO_LINT_LIBRARY_MANAGER_INDEXING", "true")
            .env("ARDUINO_LINT_OFFICIAL", entry.has_type("Arduino").to_string())
            .output()
            .map_err(|err| spawn_error(self.name(), err))?;

        let text = combined_output(&output);
        if !output.status.success() {
            return Err(CoreError::Scan {
                tool: self.name().to_string(),
                message: "found errors".to_string(),
                report: format_lint_report("found errors", &text),
            });
        }

        let json = std::fs::read_to_string(&report_file)
            .with_context(|| format!("reading lint report {}", report_file.display()))?;
        let warnings = warning_count(&json).ok_or_else(|| {
            CoreError::Scan {
                tool: self.name().to_string(),
                message: "unreadable JSON report".to_string(),
                report: json.clone(),
            }
        })?;
        debug!("lint found {warnings} warnings in {}", folder.display());

        if warnings > 0 {
            Ok(Some(format_lint_report(
                "has suggestions for possible improvements",
                &text,
            )))
        } else {
            Ok(None)
        }
    }
}

/// Reads `summary.warningCount` from a JSON lint report.
fn warning_count(json: &str) -> Option<u64> {
    let report: serde_json::Value = serde_json::from_str(json).ok()?;
    report.get("summary")?.get("warningCount")?.as_u64()
}

/// Wraps lint output into a collapsible block for the release log.
pub fn format_lint_report(verdict: &str, output: &str) -> String {
    format!(
        "<a href=\"https://arduino.github.io/arduino-lint/latest/\">Arduino Lint</a> {verdict}:\n\
         <details><summary>Click to expand Arduino Lint report</summary>\n\
         <hr>\n\
         {output}\n\
         <hr>\n\
         </details>"
    )
}
