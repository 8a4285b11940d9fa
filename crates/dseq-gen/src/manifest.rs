use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use dseq_core::errors::{codes, DseqError, ErrorInfo};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const INTERVALS: &[u8] = b"SpectralIntervals";
const INTERVAL: &[u8] = b"SpectralIntervalsProperties";

/// `spectralDartMode` value marking a thermal band.
pub const THERMAL_MODE: u32 = 2;

/// Spectral bands declared by the simulation's phase manifest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpectralManifest {
    /// Band number to spectral mode.
    pub bands: BTreeMap<u32, u32>,
}

impl SpectralManifest {
    /// Reads the manifest, failing with `spectral-manifest-unavailable` when
    /// the file is missing, malformed, or declares no bands.
    pub fn read(path: &Path) -> Result<Self, DseqError> {
        if !path.is_file() {
            return Err(unavailable("spectral manifest not found", path));
        }
        let xml = fs::read_to_string(path)
            .map_err(|err| unavailable_with("spectral manifest unreadable", path, err))?;
        let manifest = Self::parse(&xml).map_err(|info| {
            DseqError::Manifest(info.with_context("path", path.display().to_string()))
        })?;
        if manifest.bands.is_empty() {
            return Err(unavailable("spectral manifest declares no bands", path));
        }
        Ok(manifest)
    }

    /// Collects `SpectralIntervalsProperties` elements nested in
    /// `SpectralIntervals` that carry both a band number and a mode.
    pub fn parse(xml: &str) -> Result<Self, ErrorInfo> {
        let mut reader = Reader::from_str(xml);
        let mut depth_in_intervals = 0usize;
        let mut bands = BTreeMap::new();
        loop {
            let event = reader.read_event().map_err(|err| {
                ErrorInfo::new(codes::SPECTRAL_MANIFEST_UNAVAILABLE, "invalid spectral manifest")
                    .with_hint(err.to_string())
            })?;
            match event {
                Event::Start(element) => {
                    if element.name().as_ref() == INTERVALS {
                        depth_in_intervals += 1;
                    } else if depth_in_intervals > 0 && element.name().as_ref() == INTERVAL {
                        insert_band(&element, &mut bands);
                    }
                }
                Event::Empty(element) => {
                    if depth_in_intervals > 0 && element.name().as_ref() == INTERVAL {
                        insert_band(&element, &mut bands);
                    }
                }
                Event::End(element) => {
                    if element.name().as_ref() == INTERVALS {
                        depth_in_intervals = depth_in_intervals.saturating_sub(1);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(Self { bands })
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn is_thermal(&self, band: u32) -> bool {
        self.bands.get(&band) == Some(&THERMAL_MODE)
    }
}

fn insert_band(element: &BytesStart<'_>, bands: &mut BTreeMap<u32, u32>) {
    let mut number = None;
    let mut mode = None;
    for attr in element.attributes().flatten() {
        let value = attr.unescape_value().ok().and_then(|v| v.trim().parse::<u32>().ok());
        match attr.key.as_ref() {
            b"bandNumber" => number = value,
            b"spectralDartMode" => mode = value,
            _ => {}
        }
    }
    if let (Some(number), Some(mode)) = (number, mode) {
        bands.insert(number, mode);
    }
}

fn unavailable(message: &str, path: &Path) -> DseqError {
    DseqError::Manifest(
        ErrorInfo::new(codes::SPECTRAL_MANIFEST_UNAVAILABLE, message)
            .with_context("path", path.display().to_string()),
    )
}

fn unavailable_with(message: &str, path: &Path, err: std::io::Error) -> DseqError {
    DseqError::Manifest(
        ErrorInfo::new(codes::SPECTRAL_MANIFEST_UNAVAILABLE, message)
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}
