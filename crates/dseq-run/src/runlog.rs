use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

/// Plain-text log of every engine line, truncated at the start of a run.
///
/// Write failures are reported once and then ignored; the tracing stream
/// still carries the engine output.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl RunLog {
    pub fn create(path: &Path) -> Self {
        let writer = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| File::create(path));
        let writer = match writer {
            Ok(file) => Some(BufWriter::new(file)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "run log unavailable");
                None
            }
        };
        Self {
            path: path.to_path_buf(),
            writer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&mut self, line: &str) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(err) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            warn!(path = %self.path.display(), error = %err, "run log write failed; disabling");
            self.writer = None;
        }
    }
}
