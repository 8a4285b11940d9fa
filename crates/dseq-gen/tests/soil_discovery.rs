use std::fs;

use dseq_core::{codes, SoilValidation};
use dseq_gen::{discover, discover_with, SpectralManifest};
use tempfile::tempdir;


#[test]
fn only_folders_matching_band_count_qualify() {
    let sim = tempdir().unwrap();
    let soils = tempdir().unwrap();
    let manifest = fixtures::write_phase_manifest(sim.path(), 3);
    fixtures::make_soil(soils.path(), "sand", 3);
    fixtures::make_soil(soils.path(), "clay", 3);
    fixtures::make_soil(soils.path(), "gravel", 2);
    fs::write(soils.path().join("notes.txt"), "not a soil").unwrap();

    let discovery = discover(soils.path(), &manifest);
    assert_eq!(discovery.expected_bands, Some(3));
    assert_eq!(discovery.names(), vec!["clay", "sand"]);
    assert_eq!(discovery.diagnostics.len(), 1);
    assert!(discovery.diagnostics[0].is(codes::VARIANT_MISMATCH));
    assert_eq!(
        discovery.diagnostics[0].context.get("soil").map(String::as_str),
        Some("gravel")
    );
}

#[test]
fn missing_root_yields_empty() {
    let sim = tempdir().unwrap();
    let manifest = fixtures::write_phase_manifest(sim.path(), 2);
    let discovery = discover(&sim.path().join("no-soils"), &manifest);
    assert!(discovery.variants.is_empty());
    assert!(discovery.diagnostics[0].is(codes::SOURCE_NOT_FOUND));
}

#[test]
fn unreadable_manifest_yields_empty() {
    let sim = tempdir().unwrap();
    let soils = tempdir().unwrap();
    fixtures::make_soil(soils.path(), "sand", 1);
    let discovery = discover(soils.path(), &sim.path().join("input/phase.xml"));
    assert!(discovery.variants.is_empty());
    assert!(discovery.diagnostics[0].is(codes::SPECTRAL_MANIFEST_UNAVAILABLE));
}

#[test]
fn zero_declared_bands_yields_empty() {
    let sim = tempdir().unwrap();
    let soils = tempdir().unwrap();
    let manifest = fixtures::write_phase_manifest(sim.path(), 0);
    fixtures::make_soil(soils.path(), "sand", 0);
    let discovery = discover(soils.path(), &manifest);
    assert!(discovery.variants.is_empty());
    assert!(discovery.diagnostics[0].is(codes::SPECTRAL_MANIFEST_UNAVAILABLE));
}

#[test]
fn names_only_mode_skips_validation() {
    let soils = tempdir().unwrap();
    fixtures::make_soil(soils.path(), "b_soil", 1);
    fixtures::make_soil(soils.path(), "a_soil", 5);
    let discovery = discover_with(
        soils.path(),
        &soils.path().join("missing.xml"),
        SoilValidation::NamesOnly,
    );
    assert_eq!(discovery.names(), vec!["a_soil", "b_soil"]);
    assert_eq!(discovery.expected_bands, None);
    assert_eq!(discovery.variants[1].band_file_count, 1);
}

#[test]
fn manifest_exposes_thermal_bands() {
    let sim = tempdir().unwrap();
    let path = fixtures::write_phase_manifest(sim.path(), 4);
    let manifest = SpectralManifest::read(&path).unwrap();
    assert_eq!(manifest.band_count(), 4);
    assert!(manifest.is_thermal(3));
    assert!(!manifest.is_thermal(0));
}

#[test]
fn names_with_the_series_separator_are_excluded() {
    let sim = tempdir().unwrap();
    let manifest = fixtures::write_phase_manifest(sim.path(), 2);
    let soils = tempdir().unwrap();
    fixtures::make_soil(soils.path(), "peat;wet", 2);
    fixtures::make_soil(soils.path(), "sand", 2);

    for mode in [SoilValidation::Strict, SoilValidation::NamesOnly] {
        let discovery = discover_with(soils.path(), &manifest, mode);
        assert_eq!(discovery.names(), vec!["sand"]);
        assert_eq!(discovery.diagnostics.len(), 1);
        assert!(discovery.diagnostics[0].is(codes::VARIANT_MISMATCH));
        assert_eq!(discovery.diagnostics[0].context["soil"], "peat;wet");
    }
}
