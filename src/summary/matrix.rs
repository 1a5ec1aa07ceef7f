//! Verification matrix: one record per executed step plus the gate decision

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use super::status::{ExitCode, StepStatus};
use crate::checks::{CheckOutcome, CheckResult};
use crate::error::ErrorKind;

/// Schema version for the matrix JSON
pub const MATRIX_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for the matrix JSON
pub const MATRIX_SCHEMA_ID: &str = "release-gate/verification_matrix@1";

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub required: bool,
    pub status: StepStatus,
    pub ok: bool,
    pub duration_ms: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl StepRecord {
    pub fn from_result(
        name: impl Into<String>,
        required: bool,
        result: CheckResult,
        duration_ms: u64,
    ) -> Self {
        let mut record = Self {
            name: name.into(),
            required,
            status: StepStatus::Passed,
            ok: true,
            duration_ms,
            warnings: Vec::new(),
            skip_reason: None,
            error: None,
            error_kind: None,
        };
        match result {
            Ok(CheckOutcome::Passed { warnings }) => {
                if !warnings.is_empty() {
                    record.status = StepStatus::PassedWithWarnings;
                }
                record.warnings = warnings;
            }
            Ok(CheckOutcome::Skipped { reason }) => {
                record.status = StepStatus::Skipped;
                record.skip_reason = Some(reason);
            }
            Err(err) => {
                record.status = StepStatus::Failed;
                record.ok = false;
                record.error = Some(err.to_string());
                record.error_kind = Some(err.kind());
            }
        }
        record
    }
}

/// All step results of one gate run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMatrix {
    pub schema_version: u32,
    pub schema_id: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Release version under verification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_version: Option<String>,

    pub steps: Vec<StepRecord>,

    /// Gate decision: every required step is ok
    pub passed: bool,

    pub required_total: usize,
    pub required_passed: usize,
    pub optional_total: usize,
    pub optional_passed: usize,
    pub duration_ms: u64,
}

impl VerificationMatrix {
    pub fn new(steps: Vec<StepRecord>, started_at: DateTime<Utc>) -> Self {
        let count = |required: bool, ok_only: bool| {
            steps
                .iter()
                .filter(|s| s.required == required && (!ok_only || s.ok))
                .count()
        };
        let required_total = count(true, false);
        let required_passed = count(true, true);
        let optional_total = count(false, false);
        let optional_passed = count(false, true);
        let finished_at = Utc::now();

        Self {
            schema_version: MATRIX_SCHEMA_VERSION,
            schema_id: MATRIX_SCHEMA_ID.to_string(),
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at,
            finished_at,
            release_version: None,
            passed: required_passed == required_total,
            required_total,
            required_passed,
            optional_total,
            optional_passed,
            duration_ms: steps.iter().map(|s| s.duration_ms).sum(),
            steps,
        }
    }

    pub fn with_release_version(mut self, version: impl Into<String>) -> Self {
        self.release_version = Some(version.into());
        self
    }

    /// Names of the required steps
    pub fn required_names(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.required)
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.passed {
            ExitCode::Success
        } else {
            ExitCode::Blocked
        }
    }

    /// Human-readable matrix
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Verification matrix");
        if let Some(ref version) = self.release_version {
            let _ = writeln!(out, "Release: {}", version);
        }
        let _ = writeln!(out, "Run: {}", self.run_id);

        for (title, required) in [("REQUIRED", true), ("OPTIONAL", false)] {
            let steps: Vec<&StepRecord> = self.steps.iter().filter(|s| s.required == required).collect();
            if steps.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n{}", title);
            for step in steps {
                let _ = write!(
                    out,
                    "  [{}] {} ({} ms)",
                    step.status.label(),
                    step.name,
                    step.duration_ms
                );
                if let Some(ref reason) = step.skip_reason {
                    let _ = write!(out, ": {}", reason);
                }
                out.push('\n');
                if let Some(ref error) = step.error {
                    for line in error.lines() {
                        let _ = writeln!(out, "         {}", line.trim_start());
                    }
                }
                for warning in &step.warnings {
                    let _ = writeln!(out, "         warning: {}", warning);
                }
            }
        }

        let _ = writeln!(
            out,
            "\nRequired: {}/{} passed, Optional: {}/{} passed ({} ms)",
            self.required_passed,
            self.required_total,
            self.optional_passed,
            self.optional_total,
            self.duration_ms
        );
        let _ = writeln!(
            out,
            "Gate: {}",
            if self.passed {
                "PASS - release may be promoted"
            } else {
                "FAIL - promotion blocked"
            }
        );
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }
}
