//! Structured error types shared across dseq crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error codes used in [`ErrorInfo::code`].
pub mod codes {
    /// A required input file does not exist.
    pub const SOURCE_NOT_FOUND: &str = "source-not-found";
    /// A position record could not be parsed; the line is skipped.
    pub const MALFORMED_RECORD: &str = "malformed-record";
    /// The position source yielded no qualifying records.
    pub const NO_POSITION_RECORDS: &str = "no-position-records";
    /// The configured trial count is not a positive integer.
    pub const INVALID_TRIAL_COUNT: &str = "invalid-trial-count";
    /// The spectral band manifest is missing, unreadable or declares no bands.
    pub const SPECTRAL_MANIFEST_UNAVAILABLE: &str = "spectral-manifest-unavailable";
    /// A soil folder does not hold one file per declared band.
    pub const VARIANT_MISMATCH: &str = "variant-mismatch";
    /// The external engine exceeded its wall-clock budget.
    pub const PROCESS_TIMEOUT: &str = "process-timeout";
    /// The external engine could not be started.
    pub const PROCESS_SPAWN: &str = "process-spawn";
    /// The external engine exited with a failure status.
    pub const PROCESS_EXIT: &str = "process-exit";
    /// An output directory could not be renamed or copied.
    pub const RELOCATION_FAILURE: &str = "relocation-failure";
    /// The soil reference file could not be restored from its backup.
    pub const CONFIG_RESTORE_FAILURE: &str = "config-restore-failure";
    /// The soil reference file could not be patched.
    pub const SOIL_REFERENCE_PATCH: &str = "soil-reference-patch";
    /// The configuration file could not be read.
    pub const CONFIG_READ: &str = "config-read";
    /// The configuration file could not be parsed or failed validation.
    pub const CONFIG_PARSE: &str = "config-parse";
    /// A markup document could not be written.
    pub const XML_WRITE: &str = "xml-write";
    /// A markup document could not be parsed.
    pub const XML_PARSE: &str = "xml-parse";
    /// A series length does not match its axis length.
    pub const SERIES_LENGTH: &str = "series-length";
    /// Engine installation directories could not be derived.
    pub const ENGINE_PATHS: &str = "engine-paths";
    /// A run report could not be encoded or written.
    pub const REPORT_WRITE: &str = "report-write";
}

/// Structured payload attached to every [`DseqError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, names, counts).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Returns `true` when the payload carries the given code.
    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

/// Canonical error type for the dseq tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum DseqError {
    /// Missing or unreadable input sources (position file, soil folders).
    #[error("source error: {0}")]
    Source(ErrorInfo),
    /// Configuration loading and validation errors.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Sequence descriptor assembly, writing and parsing errors.
    #[error("descriptor error: {0}")]
    Descriptor(ErrorInfo),
    /// Spectral band manifest errors.
    #[error("manifest error: {0}")]
    Manifest(ErrorInfo),
    /// External engine process errors.
    #[error("process error: {0}")]
    Process(ErrorInfo),
    /// Filesystem mutation errors (backup, restore, relocation).
    #[error("filesystem error: {0}")]
    Filesystem(ErrorInfo),
    /// Serialization errors for reports.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl DseqError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            DseqError::Source(info)
            | DseqError::Config(info)
            | DseqError::Descriptor(info)
            | DseqError::Manifest(info)
            | DseqError::Process(info)
            | DseqError::Filesystem(info)
            | DseqError::Serde(info) => info,
        }
    }

    /// Consumes the error and returns its payload.
    pub fn into_info(self) -> ErrorInfo {
        match self {
            DseqError::Source(info)
            | DseqError::Config(info)
            | DseqError::Descriptor(info)
            | DseqError::Manifest(info)
            | DseqError::Process(info)
            | DseqError::Filesystem(info)
            | DseqError::Serde(info) => info,
        }
    }

    /// Builds a [`codes::SOURCE_NOT_FOUND`] error for the given path.
    pub fn source_not_found(what: &str, path: &std::path::Path) -> Self {
        DseqError::Source(
            ErrorInfo::new(codes::SOURCE_NOT_FOUND, format!("{what} not found"))
                .with_context("path", path.display().to_string()),
        )
    }
}
