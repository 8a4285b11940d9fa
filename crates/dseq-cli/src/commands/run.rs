use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use dseq_core::RngHandle;
use dseq_run::{preflight, DartLauncher, Orchestrator, RunSummary};
use tracing::{info, warn};

use super::{load_config, print_json};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(long)]
    pub config: PathBuf,
    /// Reuse the existing `sequence.xml` instead of generating a new one.
    #[arg(long)]
    pub skip_generate: bool,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.config)?;
    preflight(&config)?;

    let soils = if args.skip_generate {
        if !config.paths.sequence_descriptor().is_file() {
            return Err(format!(
                "sequence descriptor not found: {}",
                config.paths.sequence_descriptor().display()
            )
            .into());
        }
        dseq_gen::discover_soils(&config)
    } else {
        let mut rng = RngHandle::from_entropy();
        dseq_gen::generate(&config, &mut rng)?.soils
    };

    if !config.simulation_settings.run_sequencer {
        info!("run_sequencer is disabled; stopping after generation");
        return Ok(());
    }

    let variants = soils.map(|discovery| discovery.variants).unwrap_or_default();
    let orchestrator = Orchestrator::new(&config, DartLauncher::from_config(&config)?);
    let report = orchestrator.run(&variants)?;

    let summary = RunSummary::from_report(&report, &config.paths.simulation_path)?;
    summary.write_to(&config.paths.sequence_output_root())?;
    print_json(&summary)?;

    if let Some(restore_error) = &report.restore_error {
        warn!(error = %restore_error, "soil reference was not restored");
    }
    if !report.succeeded {
        return Err(format!("variants failed: {}", report.failed_variants().join(", ")).into());
    }
    Ok(())
}
