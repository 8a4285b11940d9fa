//! Construction of engine invocations.
//!
//! [`EngineLauncher`] decides *what* to run for each phase; spawning and
//! supervision live in [`crate::supervise`]. Tests swap in a launcher that
//! points at shell scripts instead of a DART installation.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use dseq_core::errors::DseqError;
use dseq_core::{Config, SequenceMode, SingleRunSteps};

use crate::paths::{workspace_relative, DartPaths};

/// Launcher script extension for this platform.
pub const SCRIPT_EXTENSION: &str = if cfg!(windows) { "bat" } else { "sh" };

/// Descriptor file name the sequence runner is pointed at.
pub const SEQUENCE_FILE: &str = "sequence.xml";

/// One external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, OsString)>,
}

impl EngineCommand {
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl AsRef<OsStr>) -> Self {
        self.env.push((key.into(), value.as_ref().to_os_string()));
        self
    }

    /// A [`Command`] with all three standard streams piped.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Builds the invocations for the single pass and the sequence pass.
pub trait EngineLauncher {
    /// Commands of the single pass, executed in order until one fails.
    fn single_run(&self, steps: SingleRunSteps) -> Vec<EngineCommand>;

    /// Command of the interactive sequence pass.
    fn sequence_run(&self, mode: SequenceMode) -> EngineCommand;
}

/// Script stems of the single pass for the selected steps.
pub fn single_run_scripts(steps: SingleRunSteps) -> Vec<&'static str> {
    if steps.is_full() {
        return vec!["dart-full"];
    }
    [
        (steps.direction, "dart-directions"),
        (steps.phase, "dart-phase"),
        (steps.maket, "dart-maket"),
        (steps.dart, "dart-only"),
    ]
    .into_iter()
    .filter_map(|(enabled, stem)| enabled.then_some(stem))
    .collect()
}

/// Launches the scripts shipped in a DART installation's tools directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DartLauncher {
    paths: DartPaths,
    workspace: PathBuf,
}

impl DartLauncher {
    pub fn new(paths: DartPaths, workspace: impl Into<PathBuf>) -> Self {
        Self {
            paths,
            workspace: workspace.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, DseqError> {
        let paths = DartPaths::from_config(&config.paths)?;
        let workspace = workspace_relative(&config.paths.simulation_path)?;
        Ok(Self::new(paths, workspace))
    }

    pub fn paths(&self) -> &DartPaths {
        &self.paths
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    fn script(&self, stem: &str) -> EngineCommand {
        let script = format!("{stem}.{SCRIPT_EXTENSION}");
        let command = if cfg!(windows) {
            EngineCommand::new(stem, "cmd")
                .arg("/c")
                .arg(self.paths.tools.join(script))
        } else {
            EngineCommand::new(stem, "bash").arg(self.paths.tools.join(script))
        };
        command
            .current_dir(&self.paths.tools)
            .env("DART_HOME", &self.paths.home)
            .env("DART_LOCAL", &self.paths.local)
    }
}

impl EngineLauncher for DartLauncher {
    fn single_run(&self, steps: SingleRunSteps) -> Vec<EngineCommand> {
        single_run_scripts(steps)
            .into_iter()
            .map(|stem| self.script(stem).arg(&self.workspace))
            .collect()
    }

    fn sequence_run(&self, mode: SequenceMode) -> EngineCommand {
        self.script("dart-sequence")
            .arg(self.workspace.join(SEQUENCE_FILE))
            .arg(mode.flag())
    }
}
