use std::error::Error;
use std::path::Path;

use dseq_core::Config;
use dseq_run::canonical::to_canonical_json_bytes;
use serde::Serialize;

pub mod check;
pub mod generate;
pub mod inspect;
pub mod run;
pub mod soils;

pub(crate) fn load_config(path: &Path) -> Result<Config, Box<dyn Error>> {
    Ok(Config::load(path)?)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    let bytes = to_canonical_json_bytes(value)?;
    println!("{}", String::from_utf8(bytes)?);
    Ok(())
}
