//! Qualification of engine output directories with their soil variant.
//!
//! The sequence runner always writes into the same directory names under
//! `<simulation>/sequence/`. Before the next variant runs, every directory
//! that appeared since the [`Relocator`] was created and has not been
//! relocated yet is renamed to `<name>_<variant>`, or `<name>_r<k>_<variant>`
//! when that name is taken. Directories present at creation time belong to
//! earlier runs and are never touched, whatever their names look like.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use dseq_core::errors::{codes, ErrorInfo};
use dseq_core::RelocationConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// How a directory reached its qualified name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelocationMethod {
    Rename,
    CopyDelete,
}

/// One completed relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub variant: String,
    pub from: PathBuf,
    pub to: PathBuf,
    pub method: RelocationMethod,
    pub attempts: u32,
    /// Set when the directory was qualified by the final sweep.
    pub swept: bool,
}

/// Relocations performed by one pass plus the directories left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationPass {
    pub relocations: Vec<Relocation>,
    pub failures: Vec<ErrorInfo>,
}

#[derive(Debug, Clone)]
pub struct Relocator {
    output_root: PathBuf,
    /// Directories that must stay where they are: the ones found at creation
    /// plus every relocation target.
    settled: BTreeSet<PathBuf>,
    policy: RelocationConfig,
}

impl Relocator {
    /// Snapshots the directories already under `output_root`.
    pub fn new(output_root: impl Into<PathBuf>, policy: RelocationConfig) -> Self {
        let output_root = output_root.into();
        let settled: BTreeSet<PathBuf> = child_dirs(&output_root).into_iter().collect();
        if !settled.is_empty() {
            debug!(
                root = %output_root.display(),
                count = settled.len(),
                "existing output directories left untouched"
            );
        }
        Self {
            output_root,
            settled,
            policy,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Whether `dir` predates this relocator or is one of its targets.
    pub fn is_settled(&self, dir: &Path) -> bool {
        self.settled.contains(dir)
    }

    /// Directories created since the snapshot that still await a variant.
    pub fn unqualified(&self) -> Vec<PathBuf> {
        child_dirs(&self.output_root)
            .into_iter()
            .filter(|dir| !self.is_settled(dir))
            .collect()
    }

    /// Qualifies every unqualified directory with `variant`.
    pub fn qualify(&mut self, variant: &str) -> RelocationPass {
        self.run_pass(variant, false)
    }

    /// Final pass after the last variant; identical to [`Relocator::qualify`]
    /// except that relocations are flagged as swept.
    pub fn sweep(&mut self, last_variant: &str) -> RelocationPass {
        self.run_pass(last_variant, true)
    }

    fn run_pass(&mut self, variant: &str, swept: bool) -> RelocationPass {
        let mut pass = RelocationPass::default();
        let pending = self.unqualified();
        if pending.is_empty() {
            debug!(root = %self.output_root.display(), variant, "nothing to relocate");
            return pass;
        }
        self.settle();
        for dir in pending {
            match self.relocate(&dir, variant) {
                Ok(mut relocation) => {
                    relocation.swept = swept;
                    info!(
                        from = %relocation.from.display(),
                        to = %relocation.to.display(),
                        method = ?relocation.method,
                        swept,
                        "output relocated"
                    );
                    self.settled.insert(relocation.to.clone());
                    pass.relocations.push(relocation);
                }
                Err(info) => {
                    warn!(error = %info, "output relocation failed; left for the final sweep");
                    pass.failures.push(info);
                }
            }
        }
        pass
    }

    fn relocate(&self, dir: &Path, variant: &str) -> Result<Relocation, ErrorInfo> {
        let mut last_error = None;
        for attempt in 1..=self.policy.attempts {
            if !dir.is_dir() {
                return Err(ErrorInfo::new(codes::RELOCATION_FAILURE, "output directory vanished")
                    .with_context("path", dir.display().to_string()));
            }
            let target = qualified_target(dir, variant);
            match move_dir(dir, &target) {
                Ok(method) => {
                    return Ok(Relocation {
                        variant: variant.to_string(),
                        from: dir.to_path_buf(),
                        to: target,
                        method,
                        attempts: attempt,
                        swept: false,
                    });
                }
                Err(err) => {
                    debug!(path = %dir.display(), attempt, error = %err, "relocation attempt failed");
                    last_error = Some(err);
                    if attempt < self.policy.attempts {
                        self.settle();
                    }
                }
            }
        }
        let mut info = ErrorInfo::new(codes::RELOCATION_FAILURE, "cannot relocate output directory")
            .with_context("path", dir.display().to_string())
            .with_context("variant", variant)
            .with_context("attempts", self.policy.attempts.to_string());
        if let Some(err) = last_error {
            info = info.with_hint(err.to_string());
        }
        Err(info)
    }

    fn settle(&self) {
        if self.policy.settle_ms > 0 {
            thread::sleep(Duration::from_millis(self.policy.settle_ms));
        }
    }
}

/// Immediate subdirectories of `root`, sorted by name.
fn child_dirs(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect()
}

/// First free name among `<dir>_<variant>`, `<dir>_r1_<variant>`, ...
pub fn qualified_target(dir: &Path, variant: &str) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let candidate = dir.with_file_name(format!("{name}_{variant}"));
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|k| dir.with_file_name(format!("{name}_r{k}_{variant}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(candidate)
}

/// Renames `from` to `to`, falling back to copy-then-delete.
pub fn move_dir(from: &Path, to: &Path) -> io::Result<RelocationMethod> {
    move_dir_with(from, to, |from, to| fs::rename(from, to))
}

/// [`move_dir`] with the rename step supplied by the caller. A failed copy
/// removes whatever part of `to` it created and leaves `from` intact.
pub fn move_dir_with(
    from: &Path,
    to: &Path,
    rename: impl FnOnce(&Path, &Path) -> io::Result<()>,
) -> io::Result<RelocationMethod> {
    if to.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }
    match rename(from, to) {
        Ok(()) => Ok(RelocationMethod::Rename),
        Err(rename_err) => {
            debug!(from = %from.display(), error = %rename_err, "rename failed; copying");
            if let Err(copy_err) = copy_tree(from, to) {
                let _ = fs::remove_dir_all(to);
                return Err(copy_err);
            }
            fs::remove_dir_all(from)?;
            Ok(RelocationMethod::CopyDelete)
        }
    }
}

/// Recursively copies a directory tree.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_tree_reproduces_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("sequence_0");
        fs::create_dir_all(from.join("output/BRF")).unwrap();
        fs::write(from.join("output/BRF/band0.txt"), "1").unwrap();
        let to = dir.path().join("copy");
        copy_tree(&from, &to).unwrap();
        assert_eq!(fs::read_to_string(to.join("output/BRF/band0.txt")).unwrap(), "1");
    }
}
