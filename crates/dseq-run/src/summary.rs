//! Run summary and relocation ledger written next to the engine output.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use dseq_core::errors::{codes, DseqError, ErrorInfo};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::canonical::{stable_hash_string, to_canonical_json_bytes};
use crate::orchestrator::{RunReport, RunState};
use crate::relocate::{Relocation, RelocationMethod};

pub const SUMMARY_FILE: &str = "dseq_run_summary.json";
pub const LEDGER_FILE: &str = "relocations.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSummary {
    pub variant: Option<String>,
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    pub failed_in: Option<RunState>,
    pub failure: Option<ErrorInfo>,
    pub relocated_to: Vec<String>,
}

/// Deterministic summary of one orchestration. `id` hashes everything
/// except `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub created_at: String,
    pub simulation: String,
    pub succeeded: bool,
    pub variants: Vec<VariantSummary>,
    pub relocations: Vec<Relocation>,
    pub diagnostics: Vec<ErrorInfo>,
    pub restore_error: Option<ErrorInfo>,
}

impl RunSummary {
    pub fn from_report(report: &RunReport, simulation: &Path) -> Result<Self, DseqError> {
        let simulation = simulation.to_string_lossy().to_string();
        let variants: Vec<VariantSummary> = report
            .attempts
            .iter()
            .map(|attempt| VariantSummary {
                variant: attempt.variant_name().map(str::to_string),
                succeeded: attempt.succeeded,
                exit_code: attempt.exit_code,
                failed_in: attempt.failed_in,
                failure: attempt.failure.clone(),
                relocated_to: attempt
                    .relocations
                    .iter()
                    .map(|relocation| relocation.to.to_string_lossy().to_string())
                    .collect(),
            })
            .collect();
        let relocations: Vec<Relocation> = report.relocations().cloned().collect();
        let id = stable_hash_string(&(
            &simulation,
            report.succeeded,
            &variants,
            &relocations,
            &report.diagnostics,
            &report.restore_error,
        ))?;
        Ok(Self {
            id,
            created_at: Utc::now().to_rfc3339(),
            simulation,
            succeeded: report.succeeded,
            variants,
            relocations,
            diagnostics: report.diagnostics.clone(),
            restore_error: report.restore_error.clone(),
        })
    }

    /// Writes the summary as canonical JSON and the relocation ledger as CSV
    /// into `dir`, returning both paths.
    pub fn write_to(&self, dir: &Path) -> Result<(PathBuf, PathBuf), DseqError> {
        fs::create_dir_all(dir).map_err(|err| write_error(dir, err))?;
        let summary_path = dir.join(SUMMARY_FILE);
        let bytes = to_canonical_json_bytes(self)?;
        fs::write(&summary_path, bytes).map_err(|err| write_error(&summary_path, err))?;

        let ledger_path = dir.join(LEDGER_FILE);
        write_ledger(&self.relocations, &ledger_path)?;
        info!(
            summary = %summary_path.display(),
            ledger = %ledger_path.display(),
            id = %self.id,
            "run summary written"
        );
        Ok((summary_path, ledger_path))
    }
}

/// One CSV row per relocation: variant, from, to, method, attempts, swept.
pub fn write_ledger(relocations: &[Relocation], path: &Path) -> Result<(), DseqError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|err| write_error(path, err))?;
    wtr.write_record(["variant", "from", "to", "method", "attempts", "swept"])
        .map_err(|err| write_error(path, err))?;
    for relocation in relocations {
        let method = match relocation.method {
            RelocationMethod::Rename => "rename",
            RelocationMethod::CopyDelete => "copy-delete",
        };
        wtr.write_record([
            relocation.variant.clone(),
            relocation.from.to_string_lossy().to_string(),
            relocation.to.to_string_lossy().to_string(),
            method.to_string(),
            relocation.attempts.to_string(),
            relocation.swept.to_string(),
        ])
        .map_err(|err| write_error(path, err))?;
    }
    wtr.flush().map_err(|err| write_error(path, err))
}

fn write_error(path: &Path, err: impl ToString) -> DseqError {
    DseqError::Serde(
        ErrorInfo::new(codes::REPORT_WRITE, err.to_string())
            .with_context("path", path.display().to_string()),
    )
}
