use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use dseq_core::SoilValidation;
use dseq_gen::soils::discover_with;

use super::{load_config, print_json};

#[derive(Args, Debug)]
pub struct SoilsArgs {
    #[arg(long)]
    pub config: PathBuf,
    /// Accept folder names without checking band file counts.
    #[arg(long)]
    pub names_only: bool,
}

pub fn run(args: &SoilsArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.config)?;
    let Some(root) = config.paths.soil_factor_path.as_ref() else {
        return Err("paths.soil_factor_path is not set".into());
    };
    let mode = if args.names_only {
        SoilValidation::NamesOnly
    } else {
        config.simulation_settings.soil_validation
    };
    let discovery = discover_with(root, &config.paths.spectral_manifest(), mode);
    print_json(&discovery)
}
