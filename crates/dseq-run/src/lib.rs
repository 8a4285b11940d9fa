#![doc = "Sequential multi-variant DART runs: engine launching, console \
supervision, soil reference patching and output relocation."]

/// Canonical JSON encoding and hashing for reports.
pub mod canonical;
/// Engine invocation construction.
pub mod launcher;
/// Per-variant orchestration state machine.
pub mod orchestrator;
/// DART installation layout.
pub mod paths;
/// Pre-run environment checks.
pub mod preflight;
/// Output directory qualification.
pub mod relocate;
/// Engine output log file.
pub mod runlog;
/// Backup, patch and restore of the soil reference file.
pub mod soil_ref;
/// Run summary and relocation ledger.
pub mod summary;
/// Process supervision and the console line protocol.
pub mod supervise;

pub use launcher::{DartLauncher, EngineCommand, EngineLauncher};
pub use orchestrator::{Orchestrator, RunAttempt, RunReport, RunState};
pub use paths::DartPaths;
pub use preflight::{preflight, PreflightReport};
pub use relocate::{Relocation, Relocator};
pub use soil_ref::SoilReferenceGuard;
pub use summary::RunSummary;
pub use supervise::{LineProtocol, ProcessOutcome, Termination};
