//! Soil variant discovery.
//!
//! A soil folder qualifies when it holds exactly one `.txt` file per band
//! declared in the spectral manifest. Variants are returned sorted by folder
//! name because their position assigns the phase index used by the engine.

use std::path::{Path, PathBuf};

use dseq_core::errors::{codes, ErrorInfo};
use dseq_core::{SoilValidation, SoilVariant};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::encoder::SERIES_SEPARATOR;
use crate::manifest::SpectralManifest;

pub const BAND_FILE_EXTENSION: &str = "txt";

/// Outcome of a discovery pass: accepted variants plus the diagnostics for
/// everything that was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilDiscovery {
    pub mode: SoilValidation,
    pub expected_bands: Option<usize>,
    pub variants: Vec<SoilVariant>,
    pub diagnostics: Vec<ErrorInfo>,
}

impl SoilDiscovery {
    fn empty(mode: SoilValidation, diagnostic: ErrorInfo) -> Self {
        Self {
            mode,
            expected_bands: None,
            variants: Vec::new(),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.variants.iter().map(|variant| variant.name.as_str()).collect()
    }
}

/// Validated discovery against the band count of `manifest_path`.
pub fn discover(soil_root: &Path, manifest_path: &Path) -> SoilDiscovery {
    discover_with(soil_root, manifest_path, SoilValidation::Strict)
}

/// Discovery in the requested validation mode. Never fails: problems with
/// the root or the manifest yield an empty result with a diagnostic.
pub fn discover_with(
    soil_root: &Path,
    manifest_path: &Path,
    mode: SoilValidation,
) -> SoilDiscovery {
    if !soil_root.is_dir() {
        let diagnostic = ErrorInfo::new(codes::SOURCE_NOT_FOUND, "soil directory not found")
            .with_context("path", soil_root.display().to_string());
        warn!(path = %soil_root.display(), "soil directory not found");
        return SoilDiscovery::empty(mode, diagnostic);
    }

    let expected_bands = match mode {
        SoilValidation::Strict => match SpectralManifest::read(manifest_path) {
            Ok(manifest) => Some(manifest.band_count()),
            Err(err) => {
                warn!(error = %err, "soil discovery degraded to empty");
                return SoilDiscovery::empty(mode, err.into_info());
            }
        },
        SoilValidation::NamesOnly => {
            warn!("soil validation disabled; accepting folder names without band checks");
            None
        }
    };

    let mut variants = Vec::new();
    let mut diagnostics = Vec::new();
    for dir in subdirectories(soil_root) {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if name.contains(SERIES_SEPARATOR) {
            warn!(soil = %name, "soil folder excluded: name contains the series separator");
            diagnostics.push(
                ErrorInfo::new(codes::VARIANT_MISMATCH, "soil name contains ';'")
                    .with_context("soil", name),
            );
            continue;
        }
        let band_file_count = count_band_files(&dir);
        if let Some(expected) = expected_bands {
            if band_file_count != expected {
                warn!(
                    soil = %name,
                    found = band_file_count,
                    expected,
                    "soil folder excluded: band file count mismatch"
                );
                diagnostics.push(
                    ErrorInfo::new(codes::VARIANT_MISMATCH, "band file count mismatch")
                        .with_context("soil", name.clone())
                        .with_context("found", band_file_count.to_string())
                        .with_context("expected", expected.to_string()),
                );
                continue;
            }
        }
        variants.push(SoilVariant {
            name,
            directory_path: dir,
            band_file_count,
        });
    }

    if variants.is_empty() {
        warn!(path = %soil_root.display(), "no valid soil folder found");
    } else {
        info!(
            count = variants.len(),
            soils = %variants.iter().map(|v| v.name.as_str()).collect::<Vec<_>>().join(", "),
            "soil variants selected"
        );
    }

    SoilDiscovery {
        mode,
        expected_bands,
        variants,
        diagnostics,
    }
}

/// Immediate subdirectories of `root`, sorted by name.
pub fn subdirectories(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect()
}

/// Number of per-band files directly inside `dir`.
pub fn count_band_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(BAND_FILE_EXTENSION))
        })
        .count()
}
