//! Scoped patching of the soil reference file.
//!
//! The engine reads the active soil from the first `OpticalPropertyLink`
//! element of `maket.xml`. [`SoilReferenceGuard`] takes a one-time backup
//! before the first patch and puts the original back when it is restored
//! explicitly or dropped.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dseq_core::errors::{codes, DseqError, ErrorInfo};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, info, warn};

const LINK_ELEMENT: &[u8] = b"OpticalPropertyLink";
const IDENT_ATTRIBUTE: &[u8] = b"ident";

/// Backup location for a reference file: `<file>.backup`.
pub fn backup_path(reference: &Path) -> PathBuf {
    let mut name = reference.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".backup");
    reference.with_file_name(name)
}

#[derive(Debug)]
pub struct SoilReferenceGuard {
    reference: PathBuf,
    backup: PathBuf,
    restored: bool,
}

impl SoilReferenceGuard {
    /// Takes the backup unless one already exists. An existing backup is
    /// kept as is: it holds the original from an interrupted earlier run.
    pub fn acquire(reference: &Path) -> Result<Self, DseqError> {
        if !reference.is_file() {
            return Err(DseqError::source_not_found("soil reference file", reference));
        }
        let backup = backup_path(reference);
        if backup.exists() {
            info!(backup = %backup.display(), "reusing existing soil reference backup");
        } else {
            fs::copy(reference, &backup)
                .map_err(|err| fs_error(codes::SOIL_REFERENCE_PATCH, "backup failed", &backup, err))?;
            info!(backup = %backup.display(), "soil reference backed up");
        }
        Ok(Self {
            reference: reference.to_path_buf(),
            backup,
            restored: false,
        })
    }

    pub fn backup(&self) -> &Path {
        &self.backup
    }

    /// Points the reference file at `identity`, returning the previous value.
    pub fn patch(&self, identity: &str) -> Result<String, DseqError> {
        let xml = fs::read_to_string(&self.reference).map_err(|err| {
            fs_error(codes::SOIL_REFERENCE_PATCH, "cannot read soil reference", &self.reference, err)
        })?;
        let (patched, previous) = rewrite_identity(&xml, identity).map_err(|info| {
            DseqError::Filesystem(info.with_context("path", self.reference.display().to_string()))
        })?;
        fs::write(&self.reference, patched).map_err(|err| {
            fs_error(codes::SOIL_REFERENCE_PATCH, "cannot write soil reference", &self.reference, err)
        })?;
        info!(previous = %previous, soil = %identity, "soil reference patched");
        Ok(previous)
    }

    /// Copies the backup over the reference file and removes the backup.
    pub fn restore(mut self) -> Result<(), DseqError> {
        self.restored = true;
        self.restore_inner()
    }

    fn restore_inner(&self) -> Result<(), DseqError> {
        fs::copy(&self.backup, &self.reference).map_err(|err| {
            fs_error(codes::CONFIG_RESTORE_FAILURE, "cannot restore soil reference", &self.backup, err)
        })?;
        if let Err(err) = fs::remove_file(&self.backup) {
            debug!(backup = %self.backup.display(), error = %err, "backup left in place");
        }
        info!(path = %self.reference.display(), "soil reference restored");
        Ok(())
    }
}

impl Drop for SoilReferenceGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(err) = self.restore_inner() {
            warn!(error = %err, "soil reference restore on drop failed");
        }
    }
}

/// Replaces the `ident` attribute of the first `OpticalPropertyLink`,
/// leaving every other byte of the document untouched.
pub fn rewrite_identity(xml: &str, identity: &str) -> Result<(String, String), ErrorInfo> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut previous = None;
    loop {
        let event = reader.read_event().map_err(|err| {
            ErrorInfo::new(codes::XML_PARSE, "invalid soil reference document")
                .with_hint(err.to_string())
        })?;
        let event = match event {
            Event::Eof => break,
            Event::Start(element) if previous.is_none() && is_link(&element) => {
                let (element, old) = with_identity(&element, identity)?;
                previous = Some(old);
                Event::Start(element)
            }
            Event::Empty(element) if previous.is_none() && is_link(&element) => {
                let (element, old) = with_identity(&element, identity)?;
                previous = Some(old);
                Event::Empty(element)
            }
            other => other,
        };
        writer.write_event(event).map_err(|err| {
            ErrorInfo::new(codes::XML_WRITE, "cannot render soil reference document")
                .with_hint(err.to_string())
        })?;
    }
    let previous = previous.ok_or_else(|| {
        ErrorInfo::new(codes::SOIL_REFERENCE_PATCH, "no OpticalPropertyLink element found")
    })?;
    let text = String::from_utf8(writer.into_inner())
        .map_err(|err| ErrorInfo::new(codes::XML_WRITE, err.to_string()))?;
    Ok((text, previous))
}

fn is_link(element: &BytesStart<'_>) -> bool {
    element.name().as_ref() == LINK_ELEMENT
}

fn with_identity(
    element: &BytesStart<'_>,
    identity: &str,
) -> Result<(BytesStart<'static>, String), ErrorInfo> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut patched = BytesStart::new(name);
    let mut previous = String::new();
    let mut replaced = false;
    for attr in element.attributes() {
        let attr = attr.map_err(|err| {
            ErrorInfo::new(codes::XML_PARSE, "invalid OpticalPropertyLink attribute")
                .with_hint(err.to_string())
        })?;
        if attr.key.as_ref() == IDENT_ATTRIBUTE {
            previous = attr
                .unescape_value()
                .map(Cow::into_owned)
                .unwrap_or_default();
            patched.push_attribute(("ident", identity));
            replaced = true;
        } else {
            patched.push_attribute(attr);
        }
    }
    if !replaced {
        patched.push_attribute(("ident", identity));
    }
    Ok((patched, previous))
}

fn fs_error(code: &str, message: &str, path: &Path, err: io::Error) -> DseqError {
    DseqError::Filesystem(
        ErrorInfo::new(code, message)
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}
