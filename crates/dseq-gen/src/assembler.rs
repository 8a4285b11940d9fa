use std::collections::BTreeMap;

use dseq_core::errors::{codes, DseqError, ErrorInfo};
use dseq_core::{ParameterFlags, PlacementRecord, SoilVariant};
use rand::Rng;
use tracing::{debug, warn};

use crate::descriptor::{
    default_lut_preferences, default_preferences, SequenceDescriptor, SequenceGroup,
    DEFAULT_SEQUENCE_NAME, PRIMARY_GROUP, SOIL_GROUP,
};
use crate::encoder::{draw_biochemistry, draw_scales, draw_temperatures, paths, ParameterSeries};
use crate::index::resolve_offset;

/// Composes encoder output and the static preference blocks into a
/// [`SequenceDescriptor`].
#[derive(Debug, Clone)]
pub struct SequenceAssembler {
    trial_count: usize,
    flags: ParameterFlags,
    preference_overrides: BTreeMap<String, String>,
    lut_preference_overrides: BTreeMap<String, String>,
}

impl SequenceAssembler {
    pub fn new(trial_count: usize, flags: ParameterFlags) -> Result<Self, DseqError> {
        if trial_count == 0 {
            return Err(DseqError::Descriptor(
                ErrorInfo::new(codes::INVALID_TRIAL_COUNT, "trial count must be positive")
                    .with_context("trial_count", "0"),
            ));
        }
        Ok(Self {
            trial_count,
            flags,
            preference_overrides: BTreeMap::new(),
            lut_preference_overrides: BTreeMap::new(),
        })
    }

    pub fn with_preference_overrides(
        mut self,
        preferences: BTreeMap<String, String>,
        lut_preferences: BTreeMap<String, String>,
    ) -> Self {
        self.preference_overrides = preferences;
        self.lut_preference_overrides = lut_preferences;
        self
    }

    /// Builds the full descriptor.
    ///
    /// `soils` is `None` when multi-soil mode is disabled; otherwise it holds
    /// the valid variants in phase-index order. The registry offset is derived
    /// from it, and the soil group is emitted only when the offset is non-zero.
    pub fn assemble<R: Rng + ?Sized>(
        &self,
        records: &[PlacementRecord],
        soils: Option<&[SoilVariant]>,
        rng: &mut R,
    ) -> Result<SequenceDescriptor, DseqError> {
        let variants = soils.unwrap_or(&[]);
        let offset = resolve_offset(soils.is_some(), variants.len());

        let mut groups = vec![self.primary_group(records, offset, rng)];
        if offset > 0 {
            groups.push(soil_group(variants));
        }

        let mut preferences = default_preferences();
        preferences.extend(self.preference_overrides.clone());
        let mut lut_preferences = default_lut_preferences();
        lut_preferences.extend(self.lut_preference_overrides.clone());

        let descriptor = SequenceDescriptor {
            sequence_name: DEFAULT_SEQUENCE_NAME.to_string(),
            groups,
            preferences,
            lut_preferences,
        };
        verify_lengths(&descriptor, self.trial_count, offset)?;
        debug!(
            series = descriptor.series_count(),
            groups = descriptor.groups.len(),
            offset,
            "sequence descriptor assembled"
        );
        Ok(descriptor)
    }

    /// Per-entity and global series gated by the parameter flags.
    pub fn primary_group<R: Rng + ?Sized>(
        &self,
        records: &[PlacementRecord],
        offset: usize,
        rng: &mut R,
    ) -> SequenceGroup {
        let trials = self.trial_count;
        let entities = records.len();
        let mut group = SequenceGroup::new(PRIMARY_GROUP);

        if self.flags.scale {
            let draws = draw_scales(trials, records, rng);
            for (entity, per_trial) in draws.scales.iter().enumerate() {
                let axes: [(char, Vec<f64>); 3] = [
                    ('x', per_trial.iter().map(|s| s.x).collect()),
                    ('y', per_trial.iter().map(|s| s.y).collect()),
                    ('z', per_trial.iter().map(|s| s.z).collect()),
                ];
                for (axis, values) in axes {
                    group
                        .series
                        .push(ParameterSeries::from_floats(paths::scale(entity, axis), &values));
                }
            }
        }

        if self.flags.soil_temperature || self.flags.tree_temperature {
            let temps = draw_temperatures(trials, entities, rng);
            if self.flags.soil_temperature {
                group.series.push(ParameterSeries::from_floats(
                    paths::soil_temperature(),
                    &temps.soil,
                ));
            }
            if self.flags.tree_temperature {
                for (entity, values) in temps.leaf.iter().enumerate() {
                    group.series.push(ParameterSeries::from_floats(
                        paths::leaf_temperature(entity),
                        values,
                    ));
                }
                for (entity, values) in temps.trunk.iter().enumerate() {
                    group.series.push(ParameterSeries::from_floats(
                        paths::trunk_temperature(entity),
                        values,
                    ));
                }
            }
        }

        if self.flags.chlorophyll || self.flags.water_thickness {
            let biochemistry = draw_biochemistry(trials, entities, rng);
            if self.flags.chlorophyll {
                for (entity, values) in biochemistry.chlorophyll.iter().enumerate() {
                    group.series.push(ParameterSeries::from_floats(
                        paths::chlorophyll(entity, offset),
                        values,
                    ));
                }
            }
            if self.flags.water_thickness {
                for (entity, values) in biochemistry.water_thickness.iter().enumerate() {
                    group.series.push(ParameterSeries::from_floats(
                        paths::water_thickness(entity, offset),
                        values,
                    ));
                }
            }
        }

        if group.series.is_empty() {
            warn!("no parameter family enabled; primary group is empty");
        }
        group
    }
}

/// Soil identity and matching phase index, one value per variant.
pub fn soil_group(variants: &[SoilVariant]) -> SequenceGroup {
    let identities = variants.iter().map(|variant| variant.name.clone()).collect();
    let phases = (0..variants.len()).map(|idx| idx.to_string()).collect();
    SequenceGroup {
        name: SOIL_GROUP.to_string(),
        series: vec![
            ParameterSeries::new(paths::SOIL_IDENTITY, identities),
            ParameterSeries::new(paths::SOIL_PHASE_INDEX, phases),
        ],
    }
}

/// Checks the axis length of every series: trial count in the primary group,
/// variant count in the soil group.
pub fn verify_lengths(
    descriptor: &SequenceDescriptor,
    trial_count: usize,
    variant_count: usize,
) -> Result<(), DseqError> {
    for group in &descriptor.groups {
        let expected = if group.name == SOIL_GROUP {
            variant_count
        } else {
            trial_count
        };
        if let Some(series) = group.series.iter().find(|series| series.len() != expected) {
            return Err(DseqError::Descriptor(
                ErrorInfo::new(codes::SERIES_LENGTH, "series length does not match its axis")
                    .with_context("group", group.name.clone())
                    .with_context("property", series.property_path.clone())
                    .with_context("expected", expected.to_string())
                    .with_context("actual", series.len().to_string()),
            ));
        }
    }
    Ok(())
}
