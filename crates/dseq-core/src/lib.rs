#![deny(missing_docs)]
#![doc = "Core error, configuration and data types shared by the dseq generator and orchestrator."]

pub mod config;
pub mod errors;
pub mod rng;
mod types;

pub use config::{
    Config, EngineConfig, LineAction, LineRule, ParameterFlags, PathsConfig, RelocationConfig,
    SequenceMode, SimulationSettings, SingleRunSteps, SoilValidation,
};
pub use errors::{codes, DseqError, ErrorInfo};
pub use rng::RngHandle;
pub use types::{PlacementRecord, SoilVariant, Vec3};
