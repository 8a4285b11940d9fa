use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use dseq_run::preflight;

use super::{load_config, print_json};

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[arg(long)]
    pub config: PathBuf,
}

pub fn run(args: &CheckArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.config)?;
    let report = preflight(&config)?;
    print_json(&report)
}
