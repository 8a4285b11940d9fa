use std::fs::File;
use std::io::{BufRead, BufReader, Split};
use std::path::{Path, PathBuf};

use dseq_core::errors::{codes, DseqError};
use dseq_core::{PlacementRecord, Vec3};
use tracing::{debug, warn};

/// Minimum whitespace-separated fields for a line to count as a record.
pub const MIN_RECORD_FIELDS: usize = 7;

/// Leading token marking an entity placement line.
pub const RECORD_MARKER: &str = "0";

/// Handle on a position source file.
///
/// Records are read lazily; every call to [`PositionSource::records`] reopens
/// the file, so iteration can be restarted and yields the same sequence as
/// long as the file content does not change.
#[derive(Debug, Clone)]
pub struct PositionSource {
    path: PathBuf,
}

impl PositionSource {
    /// Opens a position source, failing with `source-not-found` when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DseqError> {
        let path = path.into();
        if !path.is_file() {
            return Err(DseqError::source_not_found("position file", &path));
        }
        Ok(Self { path })
    }

    /// Path the source reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Starts a fresh pass over the qualifying records.
    pub fn records(&self) -> Result<Records, DseqError> {
        let file = File::open(&self.path)
            .map_err(|_| DseqError::source_not_found("position file", &self.path))?;
        Ok(Records {
            lines: BufReader::new(file).split(b'\n'),
            line_no: 0,
            next_index: 0,
        })
    }

    /// Collects every qualifying record.
    pub fn read_all(&self) -> Result<Vec<PlacementRecord>, DseqError> {
        Ok(self.records()?.collect())
    }

    /// Number of qualifying records, i.e. the entity count.
    pub fn entity_count(&self) -> Result<usize, DseqError> {
        Ok(self.records()?.count())
    }
}

/// Lazy iterator over the placement records of a [`PositionSource`].
#[derive(Debug)]
pub struct Records {
    lines: Split<BufReader<File>>,
    line_no: usize,
    next_index: usize,
}

impl Iterator for Records {
    type Item = PlacementRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let bytes = match self.lines.next()? {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(line = self.line_no + 1, error = %err, "position file read aborted");
                    return None;
                }
            };
            self.line_no += 1;
            let line = String::from_utf8_lossy(&bytes);
            let line = line.trim_end_matches('\r');
            if let Some(record) = parse_record(line, self.next_index) {
                self.next_index += 1;
                return Some(record);
            }
            if line.split_whitespace().next() == Some(RECORD_MARKER) {
                debug!(
                    line = self.line_no,
                    code = codes::MALFORMED_RECORD,
                    "malformed position record skipped"
                );
            }
        }
    }
}

/// Parses one line, returning `None` for non-records and malformed records.
///
/// Layout: marker, position xyz, scale xyz, then an optional rotation xyz.
pub fn parse_record(line: &str, index: usize) -> Option<PlacementRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.first() != Some(&RECORD_MARKER) || fields.len() < MIN_RECORD_FIELDS {
        return None;
    }
    let number = |idx: usize| -> Option<f64> {
        match fields.get(idx) {
            Some(raw) => raw.parse::<f64>().ok(),
            None => Some(0.0),
        }
    };
    let triple = |start: usize| -> Option<Vec3> {
        Some(Vec3::new(number(start)?, number(start + 1)?, number(start + 2)?))
    };
    Some(PlacementRecord {
        index,
        position: triple(1)?,
        scale: triple(4)?,
        rotation: triple(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_defaults_to_zero() {
        let record = parse_record("0 1 2 3 1.5 1.5 1.5", 4).expect("record");
        assert_eq!(record.index, 4);
        assert_eq!(record.scale, Vec3::new(1.5, 1.5, 1.5));
        assert_eq!(record.rotation, Vec3::default());
    }

    #[test]
    fn short_and_foreign_lines_are_dropped() {
        assert!(parse_record("0 1 2 3 1.5", 0).is_none());
        assert!(parse_record("complete transformation", 0).is_none());
        assert!(parse_record("1 1 2 3 1 1 1 0 0 0", 0).is_none());
        assert!(parse_record("0 x 2 3 1 1 1", 0).is_none());
    }
}
