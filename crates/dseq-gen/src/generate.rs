//! The generation pass: configuration in, `sequence.xml` out.

use std::path::{Path, PathBuf};

use dseq_core::errors::{codes, DseqError, ErrorInfo};
use dseq_core::{Config, SoilValidation};
use rand::Rng;
use tracing::{info, warn};

use crate::assembler::SequenceAssembler;
use crate::descriptor::{SequenceDescriptor, SOIL_GROUP};
use crate::positions::PositionSource;
use crate::soils::{self, SoilDiscovery};

/// Result of a successful generation pass.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub descriptor_path: PathBuf,
    pub descriptor: SequenceDescriptor,
    pub entity_count: usize,
    pub offset: usize,
    /// `None` when multi-soil mode is disabled.
    pub soils: Option<SoilDiscovery>,
}

/// Runs soil discovery when multi-soil mode is enabled.
pub fn discover_soils(config: &Config) -> Option<SoilDiscovery> {
    let settings = &config.simulation_settings;
    if !settings.multi_sol {
        return None;
    }
    let manifest = config.paths.spectral_manifest();
    match &config.paths.soil_factor_path {
        Some(root) => Some(soils::discover_with(root, &manifest, settings.soil_validation)),
        None => {
            warn!("multi_sol is enabled but paths.soil_factor_path is not set");
            Some(SoilDiscovery {
                mode: settings.soil_validation,
                expected_bands: None,
                variants: Vec::new(),
                diagnostics: vec![ErrorInfo::new(
                    codes::SOURCE_NOT_FOUND,
                    "soil directory not configured",
                )
                .with_hint("set paths.soil_factor_path")],
            })
        }
    }
}

/// Generates the descriptor and writes it to the configured location.
pub fn generate<R: Rng + ?Sized>(
    config: &Config,
    rng: &mut R,
) -> Result<GenerationOutcome, DseqError> {
    let target = config.paths.sequence_descriptor();
    generate_to(config, &target, rng)
}

/// Generates the descriptor and writes it to `target`.
///
/// Aborts only on structural failures: a missing position file, a position
/// file with no qualifying records, or an invalid trial count.
pub fn generate_to<R: Rng + ?Sized>(
    config: &Config,
    target: &Path,
    rng: &mut R,
) -> Result<GenerationOutcome, DseqError> {
    let source = PositionSource::open(&config.paths.position_txt_path)?;
    let records = source.read_all()?;
    if records.is_empty() {
        return Err(DseqError::Source(
            ErrorInfo::new(codes::NO_POSITION_RECORDS, "position file has no qualifying records")
                .with_context("path", source.path().display().to_string())
                .with_hint("records start with the token 0 and carry at least 7 fields"),
        ));
    }
    info!(entities = records.len(), path = %source.path().display(), "positions loaded");

    let soils = discover_soils(config);
    if let Some(discovery) = &soils {
        if discovery.mode == SoilValidation::NamesOnly && !discovery.variants.is_empty() {
            warn!(count = discovery.variants.len(), "soil variants accepted without validation");
        }
    }
    let variants = soils.as_ref().map(|discovery| discovery.variants.as_slice());

    let assembler = SequenceAssembler::new(config.nbr_of_sequence, config.parameters_to_vary)?
        .with_preference_overrides(config.preferences.clone(), config.lut_preferences.clone());
    let descriptor = assembler.assemble(&records, variants, rng)?;
    let offset = match descriptor.group(SOIL_GROUP) {
        Some(_) => variants.map_or(0, <[_]>::len),
        None => 0,
    };

    descriptor.write_to(target)?;
    info!(
        path = %target.display(),
        groups = descriptor.groups.len(),
        series = descriptor.series_count(),
        offset,
        "sequence descriptor written"
    );

    Ok(GenerationOutcome {
        descriptor_path: target.to_path_buf(),
        descriptor,
        entity_count: records.len(),
        offset,
        soils,
    })
}
