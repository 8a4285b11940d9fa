use dseq_core::{PlacementRecord, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Uniform distribution over the half-open interval `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamedDistribution {
    pub name: &'static str,
    pub low: f64,
    pub high: f64,
}

impl NamedDistribution {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.low..self.high)
    }
}

/// Leaf chlorophyll content (µg/cm²).
pub const CHLOROPHYLL: NamedDistribution = NamedDistribution {
    name: "chlorophyll",
    low: 20.0,
    high: 90.0,
};

/// Leaf equivalent water thickness (cm).
pub const WATER_THICKNESS: NamedDistribution = NamedDistribution {
    name: "water_thickness",
    low: 0.01,
    high: 0.05,
};

/// Soil temperature (K).
pub const SOIL_TEMPERATURE: NamedDistribution = NamedDistribution {
    name: "soil_temperature",
    low: 290.0,
    high: 310.0,
};

/// Amount the leaf temperature sits below the soil temperature (K).
pub const LEAF_COOLING: NamedDistribution = NamedDistribution {
    name: "leaf_cooling",
    low: 1.0,
    high: 10.0,
};

/// Amount the trunk temperature sits below the soil temperature (K).
pub const TRUNK_COOLING: NamedDistribution = NamedDistribution {
    name: "trunk_cooling",
    low: 0.5,
    high: 5.0,
};

/// Multiplicative deviation applied to each entity's base scale.
pub const SCALE_DEVIATION: NamedDistribution = NamedDistribution {
    name: "scale_deviation",
    low: 0.8,
    high: 1.2,
};

/// Per-entity leaf optical draws, indexed `[entity][trial]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BiochemistryDraws {
    pub chlorophyll: Vec<Vec<f64>>,
    pub water_thickness: Vec<Vec<f64>>,
}

/// Temperature draws; soil is shared per trial, leaf and trunk are `[entity][trial]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureDraws {
    pub soil: Vec<f64>,
    pub leaf: Vec<Vec<f64>>,
    pub trunk: Vec<Vec<f64>>,
}

/// Absolute scale per entity per trial, indexed `[entity][trial]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleDraws {
    pub scales: Vec<Vec<Vec3>>,
}

/// Draws chlorophyll and water thickness series for every entity.
pub fn draw_biochemistry<R: Rng + ?Sized>(
    trial_count: usize,
    entity_count: usize,
    rng: &mut R,
) -> BiochemistryDraws {
    let chlorophyll = (0..entity_count)
        .map(|_| draw_series(&CHLOROPHYLL, trial_count, rng))
        .collect();
    let water_thickness = (0..entity_count)
        .map(|_| draw_series(&WATER_THICKNESS, trial_count, rng))
        .collect();
    BiochemistryDraws {
        chlorophyll,
        water_thickness,
    }
}

/// Draws one soil temperature per trial and, per entity, a leaf and a trunk
/// temperature strictly below it.
pub fn draw_temperatures<R: Rng + ?Sized>(
    trial_count: usize,
    entity_count: usize,
    rng: &mut R,
) -> TemperatureDraws {
    let mut leaf = vec![Vec::with_capacity(trial_count); entity_count];
    let mut trunk = vec![Vec::with_capacity(trial_count); entity_count];
    let mut soil = Vec::with_capacity(trial_count);
    for _ in 0..trial_count {
        let soil_temp = SOIL_TEMPERATURE.sample(rng);
        for series in leaf.iter_mut() {
            series.push(soil_temp - LEAF_COOLING.sample(rng));
        }
        for series in trunk.iter_mut() {
            series.push(soil_temp - TRUNK_COOLING.sample(rng));
        }
        soil.push(soil_temp);
    }
    TemperatureDraws { soil, leaf, trunk }
}

/// Draws a deviation factor per entity per trial and applies it uniformly to
/// the entity's base scale from the position source.
pub fn draw_scales<R: Rng + ?Sized>(
    trial_count: usize,
    records: &[PlacementRecord],
    rng: &mut R,
) -> ScaleDraws {
    let scales = records
        .iter()
        .map(|record| {
            (0..trial_count)
                .map(|_| record.scale.scaled(SCALE_DEVIATION.sample(rng)))
                .collect()
        })
        .collect();
    ScaleDraws { scales }
}

fn draw_series<R: Rng + ?Sized>(
    distribution: &NamedDistribution,
    trial_count: usize,
    rng: &mut R,
) -> Vec<f64> {
    (0..trial_count).map(|_| distribution.sample(rng)).collect()
}

/// Formats floats as decimal literals for embedding in a series.
pub fn encode_values(values: &[f64]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Separator of the value list embedded in a descriptor entry.
pub const SERIES_SEPARATOR: &str = ";";

/// One trial-indexed (or variant-indexed) list of literals bound to a
/// dotted property path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSeries {
    pub property_path: String,
    pub values: Vec<String>,
}

impl ParameterSeries {
    pub fn new(property_path: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            property_path: property_path.into(),
            values,
        }
    }

    pub fn from_floats(property_path: impl Into<String>, values: &[f64]) -> Self {
        Self::new(property_path, encode_values(values))
    }

    /// Semicolon-joined value list as embedded in the descriptor.
    pub fn args(&self) -> String {
        self.values.join(SERIES_SEPARATOR)
    }

    /// Splits a semicolon-joined value list.
    pub fn from_args(property_path: impl Into<String>, args: &str) -> Self {
        let values = if args.is_empty() {
            Vec::new()
        } else {
            args.split(SERIES_SEPARATOR).map(str::to_string).collect()
        };
        Self::new(property_path, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Property paths understood by the engine's sequencer.
pub mod paths {
    const LAMBERTIAN: &str = "Coeff_diff.Surfaces.LambertianMultiFunctions.LambertianMulti";
    const PROSPECT: &str = "Lambertian.ProspectExternalModule.ProspectExternParameters";

    pub const SOIL_IDENTITY: &str = "Maket.Soil.OpticalPropertyLink.ident";
    pub const SOIL_PHASE_INDEX: &str = "Maket.Soil.OpticalPropertyLink.indexFctPhase";

    pub fn scale(entity: usize, axis: char) -> String {
        format!("object_3d.ObjectList.Object[{entity}].GeometricProperties.ScaleProperties.{axis}scale")
    }

    pub fn thermal_function(slot: usize) -> String {
        format!("Coeff_diff.Temperatures.ThermalFunction[{slot}].meanT")
    }

    /// Slot 0 holds the soil temperature.
    pub fn soil_temperature() -> String {
        thermal_function(0)
    }

    pub fn leaf_temperature(entity: usize) -> String {
        thermal_function(1 + 2 * entity)
    }

    pub fn trunk_temperature(entity: usize) -> String {
        thermal_function(2 + 2 * entity)
    }

    pub fn chlorophyll(entity: usize, offset: usize) -> String {
        format!("{LAMBERTIAN}[{}].{PROSPECT}.Cab", entity + offset)
    }

    pub fn water_thickness(entity: usize, offset: usize) -> String {
        format!("{LAMBERTIAN}[{}].{PROSPECT}.Cw", entity + offset)
    }
}
