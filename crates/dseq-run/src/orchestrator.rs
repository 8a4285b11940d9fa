//! Sequential per-variant engine runs.
//!
//! For each soil variant: patch the soil reference, run the single pass, run
//! the sequence pass, and qualify the produced output directories. A failed
//! variant is recorded and the loop moves on. After the loop a final sweep
//! qualifies leftovers with the last variant and the soil reference is
//! restored exactly once.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use dseq_core::errors::{DseqError, ErrorInfo};
use dseq_core::{Config, EngineConfig, RelocationConfig, SoilVariant};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::launcher::{EngineCommand, EngineLauncher};
use crate::relocate::{Relocation, RelocationPass, Relocator};
use crate::runlog::RunLog;
use crate::soil_ref::SoilReferenceGuard;
use crate::supervise::{supervise, LineProtocol, ProcessOutcome};

/// Orchestration state, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    Idle,
    PatchSoilReference,
    RunSingle,
    RunSequence,
    RelocateOutput,
    Failed,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::PatchSoilReference => "patch-soil-reference",
            RunState::RunSingle => "run-single",
            RunState::RunSequence => "run-sequence",
            RunState::RelocateOutput => "relocate-output",
            RunState::Failed => "failed",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Record of one variant iteration (or the only iteration when no variant
/// was discovered).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAttempt {
    pub variant: Option<SoilVariant>,
    pub output_root: PathBuf,
    pub steps: Vec<ProcessOutcome>,
    pub relocations: Vec<Relocation>,
    pub exit_code: Option<i32>,
    pub succeeded: bool,
    pub failed_in: Option<RunState>,
    pub failure: Option<ErrorInfo>,
}

impl RunAttempt {
    fn new(variant: Option<&SoilVariant>, output_root: PathBuf) -> Self {
        Self {
            variant: variant.cloned(),
            output_root,
            steps: Vec::new(),
            relocations: Vec::new(),
            exit_code: None,
            succeeded: false,
            failed_in: None,
            failure: None,
        }
    }

    pub fn variant_name(&self) -> Option<&str> {
        self.variant.as_ref().map(|variant| variant.name.as_str())
    }

    fn fail(&mut self, state: RunState, info: ErrorInfo) {
        error!(
            variant = self.variant_name().unwrap_or("-"),
            state = %state,
            error = %info,
            "variant failed"
        );
        self.succeeded = false;
        self.failed_in = Some(state);
        self.failure = Some(info);
    }
}

/// Overall result of an orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub attempts: Vec<RunAttempt>,
    /// Relocations from the final sweep.
    pub swept: Vec<Relocation>,
    /// Relocation failures and other soft diagnostics.
    pub diagnostics: Vec<ErrorInfo>,
    pub restore_error: Option<ErrorInfo>,
    pub succeeded: bool,
}

impl RunReport {
    /// Every relocation, per-variant first, then the sweep.
    pub fn relocations(&self) -> impl Iterator<Item = &Relocation> {
        self.attempts
            .iter()
            .flat_map(|attempt| attempt.relocations.iter())
            .chain(self.swept.iter())
    }

    pub fn failed_variants(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter(|attempt| !attempt.succeeded)
            .map(|attempt| attempt.variant_name().unwrap_or("default"))
            .collect()
    }
}

pub struct Orchestrator<L> {
    launcher: L,
    engine: EngineConfig,
    protocol: LineProtocol,
    relocator_policy: RelocationConfig,
    output_root: PathBuf,
    soil_reference: PathBuf,
    run_log: PathBuf,
}

impl<L: EngineLauncher> Orchestrator<L> {
    pub fn new(config: &Config, launcher: L) -> Self {
        Self {
            launcher,
            engine: config.engine.clone(),
            protocol: LineProtocol::with_rules(config.engine.line_rules.iter().cloned()),
            relocator_policy: config.relocation,
            output_root: config.paths.sequence_output_root(),
            soil_reference: config.paths.soil_reference_file(),
            run_log: config.run_log_path(),
        }
    }

    /// Runs every variant in order, or a single unpatched iteration when
    /// `variants` is empty.
    ///
    /// Returns an error only when the soil reference cannot be backed up;
    /// nothing has been run at that point.
    pub fn run(&self, variants: &[SoilVariant]) -> Result<RunReport, DseqError> {
        let mut log = RunLog::create(&self.run_log);
        transition(RunState::Idle, None);

        if variants.is_empty() {
            let mut attempt = RunAttempt::new(None, self.output_root.clone());
            self.run_engine(&mut attempt, &mut log);
            transition(RunState::Done, None);
            let succeeded = attempt.succeeded;
            return Ok(RunReport {
                attempts: vec![attempt],
                swept: Vec::new(),
                diagnostics: Vec::new(),
                restore_error: None,
                succeeded,
            });
        }

        let guard = SoilReferenceGuard::acquire(&self.soil_reference)?;
        let mut relocator = Relocator::new(&self.output_root, self.relocator_policy);
        let mut attempts = Vec::with_capacity(variants.len());
        let mut diagnostics = Vec::new();

        for (position, variant) in variants.iter().enumerate() {
            info!(
                variant = %variant.name,
                index = position + 1,
                total = variants.len(),
                "processing soil variant"
            );
            let mut attempt = RunAttempt::new(Some(variant), self.output_root.clone());

            transition(RunState::PatchSoilReference, Some(&variant.name));
            match guard.patch(&variant.name) {
                Ok(_) => self.run_engine(&mut attempt, &mut log),
                Err(err) => attempt.fail(RunState::PatchSoilReference, err.into_info()),
            }

            transition(RunState::RelocateOutput, Some(&variant.name));
            let RelocationPass {
                relocations,
                failures,
            } = relocator.qualify(&variant.name);
            attempt.relocations = relocations;
            diagnostics.extend(failures);
            attempts.push(attempt);
        }

        let mut swept = Vec::new();
        if let Some(last) = variants.last() {
            let pass = relocator.sweep(&last.name);
            if !pass.relocations.is_empty() {
                info!(
                    count = pass.relocations.len(),
                    variant = %last.name,
                    "final sweep qualified leftovers"
                );
            }
            swept = pass.relocations;
            diagnostics.extend(pass.failures);
        }
        for leftover in relocator.unqualified() {
            warn!(path = %leftover.display(), "output directory could not be qualified");
        }

        let restore_error = guard.restore().err().map(|err| {
            warn!(error = %err, "soil reference restore failed");
            err.into_info()
        });

        let succeeded = attempts.iter().all(|attempt| attempt.succeeded);
        transition(RunState::Done, None);
        Ok(RunReport {
            attempts,
            swept,
            diagnostics,
            restore_error,
            succeeded,
        })
    }

    /// Single pass then sequence pass; the sequence pass is skipped when the
    /// single pass fails.
    fn run_engine(&self, attempt: &mut RunAttempt, log: &mut RunLog) {
        let variant = attempt.variant_name().map(str::to_string);
        let variant = variant.as_deref();

        transition(RunState::RunSingle, variant);
        let single_timeout = Duration::from_secs(self.engine.single_run_timeout_secs);
        for command in self.launcher.single_run(self.engine.single_run_steps) {
            if !self.run_step(attempt, RunState::RunSingle, &command, single_timeout, log) {
                transition(RunState::Failed, variant);
                return;
            }
        }

        transition(RunState::RunSequence, variant);
        let sequence_timeout = Duration::from_secs(self.engine.sequence_timeout_secs);
        let command = self.launcher.sequence_run(self.engine.sequence_mode);
        if !self.run_step(attempt, RunState::RunSequence, &command, sequence_timeout, log) {
            transition(RunState::Failed, variant);
            return;
        }
        attempt.succeeded = true;
    }

    fn run_step(
        &self,
        attempt: &mut RunAttempt,
        state: RunState,
        command: &EngineCommand,
        timeout: Duration,
        log: &mut RunLog,
    ) -> bool {
        match supervise(command, &self.protocol, timeout, log) {
            Ok(outcome) => {
                attempt.exit_code = outcome.exit_code;
                let failure = outcome.failure();
                attempt.steps.push(outcome);
                match failure {
                    Some(info) => {
                        attempt.fail(state, info);
                        false
                    }
                    None => true,
                }
            }
            Err(err) => {
                attempt.fail(state, err.into_info());
                false
            }
        }
    }
}

fn transition(state: RunState, variant: Option<&str>) {
    info!(state = %state, variant = variant.unwrap_or("-"), "orchestrator state");
}
