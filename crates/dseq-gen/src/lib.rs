#![doc = "Parametric sequence descriptor generation: position parsing, parameter \
draws, registry offsets, soil discovery and the `sequence.xml` writer."]

/// Descriptor assembly from parameter draws and preference blocks.
pub mod assembler;
/// In-memory descriptor model with its XML writer and parser.
pub mod descriptor;
/// Named distributions and property path encoding.
pub mod encoder;
/// End-to-end generation pass.
pub mod generate;
/// Registry offset policy.
pub mod index;
/// Spectral band manifest reader.
pub mod manifest;
/// Fixed-width position source reader.
pub mod positions;
/// Soil variant discovery.
pub mod soils;

pub use assembler::{soil_group, verify_lengths, SequenceAssembler};
pub use descriptor::{GroupShape, SequenceDescriptor, SequenceGroup};
pub use encoder::ParameterSeries;
pub use generate::{discover_soils, generate, generate_to, GenerationOutcome};
pub use index::resolve_offset;
pub use manifest::SpectralManifest;
pub use positions::{parse_record, PositionSource};
pub use soils::{discover, discover_with, SoilDiscovery};
