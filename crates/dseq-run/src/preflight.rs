//! Checks performed before generating or running anything.

use std::fs;

use dseq_core::errors::{codes, DseqError, ErrorInfo};
use dseq_core::{Config, SoilValidation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::paths::{workspace_relative, DartPaths};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightReport {
    pub created_input_dir: bool,
    pub engine: Option<DartPaths>,
    pub warnings: Vec<ErrorInfo>,
}

impl PreflightReport {
    fn warn(&mut self, info: ErrorInfo) {
        warn!(warning = %info, "preflight");
        self.warnings.push(info);
    }
}

/// Fails on a missing simulation directory or position file; everything
/// else that would only degrade the run is reported as a warning.
pub fn preflight(config: &Config) -> Result<PreflightReport, DseqError> {
    let mut report = PreflightReport::default();
    let paths = &config.paths;
    let settings = &config.simulation_settings;

    if !paths.simulation_path.is_dir() {
        return Err(DseqError::source_not_found("simulation directory", &paths.simulation_path));
    }
    let input = paths.simulation_path.join("input");
    if !input.is_dir() {
        fs::create_dir_all(&input).map_err(|err| {
            DseqError::Filesystem(
                ErrorInfo::new(codes::SOURCE_NOT_FOUND, "cannot create input directory")
                    .with_context("path", input.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        info!(path = %input.display(), "created input directory");
        report.created_input_dir = true;
    }
    if !paths.position_txt_path.is_file() {
        return Err(DseqError::source_not_found("position file", &paths.position_txt_path));
    }

    if settings.multi_sol || settings.run_sequencer {
        match &paths.soil_factor_path {
            Some(root) if root.is_dir() => {}
            Some(root) => report.warn(
                ErrorInfo::new(codes::SOURCE_NOT_FOUND, "soil directory not found")
                    .with_context("path", root.display().to_string()),
            ),
            None if settings.multi_sol => report.warn(
                ErrorInfo::new(codes::SOURCE_NOT_FOUND, "soil directory not configured")
                    .with_hint("set paths.soil_factor_path"),
            ),
            None => {}
        }
    }

    if settings.multi_sol {
        if settings.soil_validation == SoilValidation::Strict
            && !paths.spectral_manifest().is_file()
        {
            report.warn(
                ErrorInfo::new(codes::SPECTRAL_MANIFEST_UNAVAILABLE, "spectral manifest not found")
                    .with_context("path", paths.spectral_manifest().display().to_string()),
            );
        }
        if !paths.soil_reference_file().is_file() {
            report.warn(
                ErrorInfo::new(codes::SOURCE_NOT_FOUND, "soil reference file not found")
                    .with_context("path", paths.soil_reference_file().display().to_string()),
            );
        }
    }

    if settings.run_sequencer {
        match DartPaths::from_config(paths) {
            Ok(engine) => {
                if !engine.tools.is_dir() {
                    report.warn(
                        ErrorInfo::new(codes::ENGINE_PATHS, "engine tools directory not found")
                            .with_context("path", engine.tools.display().to_string()),
                    );
                }
                report.engine = Some(engine);
            }
            Err(err) => report.warn(err.into_info()),
        }
        if let Err(err) = workspace_relative(&paths.simulation_path) {
            report.warn(err.into_info());
        }
    }

    info!(warnings = report.warnings.len(), "preflight complete");
    Ok(report)
}
