use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use dseq_gen::SequenceDescriptor;
use serde::Serialize;

use super::print_json;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Sequence descriptor to read.
    #[arg(long)]
    pub descriptor: PathBuf,
}

#[derive(Debug, Serialize)]
struct Inspection {
    sequence_name: String,
    series: usize,
    groups: Vec<dseq_gen::GroupShape>,
    properties: Vec<String>,
}

pub fn run(args: &InspectArgs) -> Result<(), Box<dyn Error>> {
    let descriptor = SequenceDescriptor::read_from(&args.descriptor)?;
    print_json(&Inspection {
        sequence_name: descriptor.sequence_name.clone(),
        series: descriptor.series_count(),
        groups: descriptor.shape(),
        properties: descriptor
            .groups
            .iter()
            .flat_map(|group| group.series.iter())
            .map(|series| series.property_path.clone())
            .collect(),
    })
}
