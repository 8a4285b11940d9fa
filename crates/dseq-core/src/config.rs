//! Configuration document shared by the generator and the orchestrator.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{codes, DseqError, ErrorInfo};

/// Top-level configuration, mirroring the layout of `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of trials enumerated by the sequence descriptor.
    pub nbr_of_sequence: usize,
    /// Input and workspace locations.
    pub paths: PathsConfig,
    /// Flags selecting which parameter families vary.
    #[serde(default)]
    pub parameters_to_vary: ParameterFlags,
    /// Multi-soil and sequencer switches.
    #[serde(default)]
    pub simulation_settings: SimulationSettings,
    /// External engine invocation settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Output relocation retry policy.
    #[serde(default)]
    pub relocation: RelocationConfig,
    /// Overrides merged over the static sequencer preference block.
    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
    /// Overrides merged over the static LUT preference block.
    #[serde(default)]
    pub lut_preferences: BTreeMap<String, String>,
}

/// Filesystem locations used by every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Simulation directory inside the engine's `simulations/` tree.
    pub simulation_path: PathBuf,
    /// Fixed-width position source file.
    pub position_txt_path: PathBuf,
    /// Root directory holding one folder per soil variant.
    #[serde(default)]
    pub soil_factor_path: Option<PathBuf>,
    /// Engine installation root; derived from `simulation_path` when absent.
    #[serde(default)]
    pub dart_home: Option<PathBuf>,
    /// Engine user data root; derived from `simulation_path` when absent.
    #[serde(default)]
    pub dart_local: Option<PathBuf>,
    /// Soil reference file; defaults to `<simulation>/input/maket.xml`.
    #[serde(default)]
    pub soil_reference: Option<PathBuf>,
}

impl PathsConfig {
    /// Location of the spectral band manifest.
    pub fn spectral_manifest(&self) -> PathBuf {
        self.simulation_path.join("input").join("phase.xml")
    }

    /// Location of the soil reference file patched per variant.
    pub fn soil_reference_file(&self) -> PathBuf {
        self.soil_reference
            .clone()
            .unwrap_or_else(|| self.simulation_path.join("input").join("maket.xml"))
    }

    /// Location of the generated sequence descriptor.
    pub fn sequence_descriptor(&self) -> PathBuf {
        self.simulation_path.join("sequence.xml")
    }

    /// Root directory the engine writes sequence results into.
    pub fn sequence_output_root(&self) -> PathBuf {
        self.simulation_path.join("sequence")
    }
}

/// Boolean gates for each parameter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParameterFlags {
    /// Vary per-entity scale.
    #[serde(default)]
    pub scale: bool,
    /// Vary the shared soil temperature.
    #[serde(default)]
    pub soil_temperature: bool,
    /// Vary per-entity leaf and trunk temperatures.
    #[serde(default)]
    pub tree_temperature: bool,
    /// Vary per-entity chlorophyll content.
    #[serde(default, alias = "chlorophyl")]
    pub chlorophyll: bool,
    /// Vary per-entity water thickness.
    #[serde(default)]
    pub water_thickness: bool,
}

/// How strictly soil folders are validated during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoilValidation {
    /// Folder file count must equal the declared band count.
    #[default]
    Strict,
    /// Folder names are accepted without band validation.
    NamesOnly,
}

/// Switches controlling multi-soil mode and the sequencer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Enumerate one soil variant per valid soil folder.
    #[serde(default)]
    pub multi_sol: bool,
    /// Launch the engine after generating the descriptor.
    #[serde(default = "default_true")]
    pub run_sequencer: bool,
    /// Soil discovery validation mode.
    #[serde(default)]
    pub soil_validation: SoilValidation,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            multi_sol: false,
            run_sequencer: true,
            soil_validation: SoilValidation::Strict,
        }
    }
}

/// Steps executed by the single-pass runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleRunSteps {
    /// Run the direction computation.
    #[serde(default = "default_true")]
    pub direction: bool,
    /// Run the phase computation.
    #[serde(default = "default_true")]
    pub phase: bool,
    /// Run the scene (maket) computation.
    #[serde(default = "default_true")]
    pub maket: bool,
    /// Run the radiative transfer itself.
    #[serde(default = "default_true")]
    pub dart: bool,
}

impl Default for SingleRunSteps {
    fn default() -> Self {
        Self {
            direction: true,
            phase: true,
            maket: true,
            dart: true,
        }
    }
}

impl SingleRunSteps {
    /// Returns `true` when every step is enabled.
    pub fn is_full(&self) -> bool {
        self.direction && self.phase && self.maket && self.dart
    }
}

/// Whether the sequence runner starts fresh or continues a previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceMode {
    /// Pass `-start`.
    #[default]
    Start,
    /// Pass `-continue`.
    Continue,
}

impl SequenceMode {
    /// Command line flag understood by the sequence runner.
    pub fn flag(self) -> &'static str {
        match self {
            SequenceMode::Start => "-start",
            SequenceMode::Continue => "-continue",
        }
    }
}

/// Reaction to a recognised engine output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineAction {
    /// Write a newline to the engine's stdin.
    Acknowledge,
    /// Stop the engine; the phase completed.
    Terminate,
}

/// One entry of the engine line protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRule {
    /// Substring matched against each output line.
    pub pattern: String,
    /// Action taken when the pattern matches.
    pub action: LineAction,
}

impl LineRule {
    /// Creates a rule.
    pub fn new(pattern: impl Into<String>, action: LineAction) -> Self {
        Self {
            pattern: pattern.into(),
            action,
        }
    }
}

/// External engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wall-clock budget for the single pass, in seconds.
    #[serde(default = "default_single_timeout")]
    pub single_run_timeout_secs: u64,
    /// Wall-clock budget for the sequence pass, in seconds.
    #[serde(default = "default_sequence_timeout")]
    pub sequence_timeout_secs: u64,
    /// Steps of the single pass.
    #[serde(default)]
    pub single_run_steps: SingleRunSteps,
    /// Sequence runner start mode.
    #[serde(default)]
    pub sequence_mode: SequenceMode,
    /// Engine output log; relative paths resolve against the simulation directory.
    #[serde(default = "default_run_log")]
    pub run_log: PathBuf,
    /// Extra line rules appended after the built-in prompt table.
    #[serde(default)]
    pub line_rules: Vec<LineRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            single_run_timeout_secs: default_single_timeout(),
            sequence_timeout_secs: default_sequence_timeout(),
            single_run_steps: SingleRunSteps::default(),
            sequence_mode: SequenceMode::default(),
            run_log: default_run_log(),
            line_rules: Vec::new(),
        }
    }
}

/// Retry policy for output relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationConfig {
    /// Number of rename attempts per directory.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Delay between attempts and before the first one, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for RelocationConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            settle_ms: default_settle_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_single_timeout() -> u64 {
    600
}

fn default_sequence_timeout() -> u64 {
    1800
}

fn default_run_log() -> PathBuf {
    PathBuf::from("run.log")
}

fn default_attempts() -> u32 {
    3
}

fn default_settle_ms() -> u64 {
    2000
}

impl Config {
    /// Loads a configuration document, choosing YAML or JSON by extension.
    pub fn load(path: &Path) -> Result<Self, DseqError> {
        if !path.exists() {
            return Err(DseqError::source_not_found("configuration file", path));
        }
        let contents = fs::read_to_string(path).map_err(|err| {
            DseqError::Config(
                ErrorInfo::new(codes::CONFIG_READ, "failed to read configuration")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            _ => Self::from_json_str(&contents),
        }
        .map_err(|err| match err {
            DseqError::Config(info) => {
                DseqError::Config(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(contents: &str) -> Result<Self, DseqError> {
        let config: Config = serde_json::from_str(contents).map_err(|err| {
            DseqError::Config(
                ErrorInfo::new(codes::CONFIG_PARSE, "invalid JSON configuration")
                    .with_hint(err.to_string()),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a YAML configuration document.
    pub fn from_yaml_str(contents: &str) -> Result<Self, DseqError> {
        let config: Config = serde_yaml::from_str(contents).map_err(|err| {
            DseqError::Config(
                ErrorInfo::new(codes::CONFIG_PARSE, "invalid YAML configuration")
                    .with_hint(err.to_string()),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks structural requirements that serde cannot express.
    pub fn validate(&self) -> Result<(), DseqError> {
        if self.nbr_of_sequence == 0 {
            return Err(DseqError::Config(
                ErrorInfo::new(
                    codes::INVALID_TRIAL_COUNT,
                    "nbr_of_sequence must be a positive integer",
                )
                .with_context("nbr_of_sequence", "0"),
            ));
        }
        if self.relocation.attempts == 0 {
            return Err(DseqError::Config(
                ErrorInfo::new(codes::CONFIG_PARSE, "relocation.attempts must be at least 1")
                    .with_context("attempts", "0"),
            ));
        }
        Ok(())
    }

    /// Resolves the engine run log against the simulation directory.
    pub fn run_log_path(&self) -> PathBuf {
        if self.engine.run_log.is_absolute() {
            self.engine.run_log.clone()
        } else {
            self.paths.simulation_path.join(&self.engine.run_log)
        }
    }
}
