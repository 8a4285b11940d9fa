//! Engine installation layout derived from a simulation path.
//!
//! Simulations live under `<DART_HOME>/user_data/simulations/<name>`; the
//! installation root and user data root are recovered from the components of
//! that path unless the configuration names them explicitly.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use dseq_core::errors::{codes, DseqError, ErrorInfo};
use dseq_core::PathsConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const HOME_COMPONENT: &str = "DART";
const LOCAL_COMPONENT: &str = "user_data";
const SIMULATIONS_COMPONENT: &str = "simulations";

/// Directory holding the engine's launcher scripts for this platform.
pub const fn platform_tools_dir() -> &'static str {
    if cfg!(windows) {
        "windows"
    } else {
        "linux"
    }
}

/// `DART_HOME`, `DART_LOCAL` and the tools directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DartPaths {
    pub home: PathBuf,
    pub local: PathBuf,
    pub tools: PathBuf,
}

impl DartPaths {
    /// Resolves the layout, preferring explicit configuration overrides.
    pub fn from_config(paths: &PathsConfig) -> Result<Self, DseqError> {
        let simulation = paths.simulation_path.as_path();
        let home = match &paths.dart_home {
            Some(home) => home.clone(),
            None => prefix_through(simulation, |name| name.eq_ignore_ascii_case(HOME_COMPONENT))
                .ok_or_else(|| {
                    DseqError::Config(
                        ErrorInfo::new(codes::ENGINE_PATHS, "cannot locate the DART installation")
                            .with_context("simulation_path", simulation.display().to_string())
                            .with_hint("set paths.dart_home"),
                    )
                })?,
        };
        let local = match &paths.dart_local {
            Some(local) => local.clone(),
            None => prefix_through(simulation, |name| name.eq_ignore_ascii_case(LOCAL_COMPONENT))
                .unwrap_or_else(|| {
                    warn!(
                        simulation = %simulation.display(),
                        "no user_data component in simulation path; using DART_HOME/user_data"
                    );
                    home.join(LOCAL_COMPONENT)
                }),
        };
        let tools = home.join("tools").join(platform_tools_dir());
        debug!(
            home = %home.display(),
            local = %local.display(),
            tools = %tools.display(),
            "engine paths resolved"
        );
        Ok(Self { home, local, tools })
    }

    /// Same as [`DartPaths::from_config`] for a bare simulation path.
    pub fn derive(simulation: &Path) -> Result<Self, DseqError> {
        Self::from_config(&PathsConfig {
            simulation_path: simulation.to_path_buf(),
            position_txt_path: PathBuf::new(),
            soil_factor_path: None,
            dart_home: None,
            dart_local: None,
            soil_reference: None,
        })
    }
}

/// The part of `simulation` after its first `simulations` component, which
/// is how the engine scripts address a workspace.
pub fn workspace_relative(simulation: &Path) -> Result<PathBuf, DseqError> {
    let mut components = simulation.components();
    for component in components.by_ref() {
        if component.as_os_str() == OsStr::new(SIMULATIONS_COMPONENT) {
            let rest: PathBuf = components.collect();
            if rest.as_os_str().is_empty() {
                break;
            }
            return Ok(rest);
        }
    }
    Err(DseqError::Config(
        ErrorInfo::new(codes::ENGINE_PATHS, "simulation path must contain a simulations directory")
            .with_context("simulation_path", simulation.display().to_string()),
    ))
}

/// Path prefix up to and including the last component accepted by `matches`.
fn prefix_through(path: &Path, matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
    let mut prefix = PathBuf::new();
    let mut found = None;
    for component in path.components() {
        prefix.push(component.as_os_str());
        if let Component::Normal(name) = component {
            if name.to_str().is_some_and(&matches) {
                found = Some(prefix.clone());
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_uses_last_match() {
        let path = Path::new("/data/dart/runs/DART/user_data/simulations/a");
        let home = prefix_through(path, |name| name.eq_ignore_ascii_case("DART")).unwrap();
        assert_eq!(home, PathBuf::from("/data/dart/runs/DART"));
    }
}
