use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use dseq_core::RngHandle;
use serde::Serialize;

use super::{load_config, print_json};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Configuration file (JSON, or YAML by extension).
    #[arg(long)]
    pub config: PathBuf,
    /// Descriptor path; defaults to `<simulation>/sequence.xml`.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct GenerateReport {
    descriptor: String,
    entity_count: usize,
    offset: usize,
    soils: Vec<String>,
    groups: Vec<dseq_gen::GroupShape>,
}

pub fn run(args: &GenerateArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.config)?;
    let target = args
        .out
        .clone()
        .unwrap_or_else(|| config.paths.sequence_descriptor());
    let mut rng = RngHandle::from_entropy();
    let outcome = dseq_gen::generate_to(&config, &target, &mut rng)?;
    print_json(&GenerateReport {
        descriptor: outcome.descriptor_path.display().to_string(),
        entity_count: outcome.entity_count,
        offset: outcome.offset,
        soils: outcome
            .soils
            .as_ref()
            .map(|discovery| discovery.names().into_iter().map(str::to_string).collect())
            .unwrap_or_default(),
        groups: outcome.descriptor.shape(),
    })
}
