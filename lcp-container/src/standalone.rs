//! Licenses that are not embedded in a publication.

use crate::error::{ContainerError, ContainerResult};
use lcp_license::LicenseDocument;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A license held in memory, e.g. right after download.
#[derive(Clone, Default)]
pub struct BytesContainer {
    bytes: Vec<u8>,
}

impl BytesContainer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Returns a copy of the held bytes. An empty buffer holds no license.
    pub fn read(&self) -> ContainerResult<Vec<u8>> {
        if self.bytes.is_empty() {
            return Err(ContainerError::FileNotFound("empty license buffer".to_string()));
        }
        Ok(self.bytes.clone())
    }

    /// Replaces the held bytes with the document's original bytes.
    pub fn write(&mut self, license: &LicenseDocument) -> ContainerResult<()> {
        self.bytes = license.raw_bytes().to_vec();
        Ok(())
    }
}

impl std::fmt::Debug for BytesContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BytesContainer")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A standalone `.lcpl` file.
#[derive(Debug, Clone)]
pub struct ExternalContainer {
    path: PathBuf,
}

impl ExternalContainer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file.
    pub fn read(&self) -> ContainerResult<Vec<u8>> {
        debug!(path = %self.path.display(), "reading standalone license");
        std::fs::read(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                ContainerError::OpenFailed(format!("{}: {e}", self.path.display()))
            }
            _ => ContainerError::ReadFailed(format!("{}: {e}", self.path.display())),
        })
    }

    /// Atomically replaces the file with the document's original bytes.
    pub fn write(&mut self, license: &LicenseDocument) -> ContainerResult<()> {
        debug!(path = %self.path.display(), "writing standalone license");
        replace_atomically(&self.path, |file| {
            file.write_all(license.raw_bytes())
                .map_err(|e| ContainerError::WriteFailed(e.to_string()))
        })
    }
}

/// Writes a sibling temp file with `fill`, then renames it over `target`.
///
/// The temp file is removed on any failure, leaving `target` as it was.
pub(crate) fn replace_atomically<F>(target: &Path, fill: F) -> ContainerResult<()>
where
    F: FnOnce(&mut NamedTempFile) -> ContainerResult<()>,
{
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| ContainerError::WriteFailed(format!("temp file in {}: {e}", dir.display())))?;

    fill(&mut tmp)?;

    tmp.as_file()
        .sync_all()
        .map_err(|e| ContainerError::WriteFailed(e.to_string()))?;
    if let Ok(metadata) = std::fs::metadata(target) {
        std::fs::set_permissions(tmp.path(), metadata.permissions())
            .map_err(|e| ContainerError::WriteFailed(e.to_string()))?;
    }
    tmp.persist(target)
        .map_err(|e| ContainerError::WriteFailed(format!("{}: {}", target.display(), e.error)))?;
    Ok(())
}
