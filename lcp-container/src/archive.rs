//! Licenses embedded in ZIP-based publications.

use crate::error::{ContainerError, ContainerResult};
use crate::standalone::replace_atomically;
use lcp_license::LicenseDocument;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// License entry of EPUB and Readium packages.
pub const READIUM_LICENSE_PATH: &str = "META-INF/license.lcpl";

/// License entry of bare packages (e.g. audiobooks, LCP-protected PDFs).
pub const WEBPUB_LICENSE_PATH: &str = "license.lcpl";

const MIMETYPE_ENTRY: &str = "mimetype";
const META_INF_PREFIX: &str = "META-INF/";
const EPUB_MIMETYPE: &str = "application/epub+zip";

/// A license stored at a fixed entry path inside a ZIP archive.
#[derive(Debug, Clone)]
pub struct ZipEmbeddedContainer {
    path: PathBuf,
    entry: String,
}

impl ZipEmbeddedContainer {
    pub fn new(path: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entry: entry.into(),
        }
    }

    /// Picks the entry path from the archive layout: EPUB/Readium packages
    /// (an EPUB `mimetype` or a `META-INF/` directory) use
    /// [`READIUM_LICENSE_PATH`], anything else [`WEBPUB_LICENSE_PATH`].
    pub fn detect(path: impl Into<PathBuf>) -> ContainerResult<Self> {
        let path = path.into();
        let mut archive = open_archive(&path)?;

        let mut readium = archive
            .file_names()
            .any(|name| name.starts_with(META_INF_PREFIX));

        if !readium {
            if let Ok(mut mimetype) = archive.by_name(MIMETYPE_ENTRY) {
                let mut value = String::new();
                if mimetype.read_to_string(&mut value).is_ok() {
                    readium = value.trim() == EPUB_MIMETYPE;
                }
            }
        }

        let entry = if readium {
            READIUM_LICENSE_PATH
        } else {
            WEBPUB_LICENSE_PATH
        };
        Ok(Self::new(path, entry))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Reads the license entry.
    pub fn read(&self) -> ContainerResult<Vec<u8>> {
        debug!(path = %self.path.display(), entry = %self.entry, "reading embedded license");
        let mut archive = open_archive(&self.path)?;

        let mut file = archive.by_name(&self.entry).map_err(|e| match e {
            ZipError::FileNotFound => ContainerError::FileNotFound(self.entry.clone()),
            other => ContainerError::ReadFailed(other.to_string()),
        })?;

        let mut bytes = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut bytes)
            .map_err(|e| ContainerError::ReadFailed(format!("{}: {e}", self.entry)))?;
        Ok(bytes)
    }

    /// Replaces (or adds) the license entry.
    ///
    /// Every other entry is copied raw, in order, so the `mimetype` entry
    /// stays first and stored. The new archive is built next to the original
    /// and renamed over it only once complete.
    pub fn write(&mut self, license: &LicenseDocument) -> ContainerResult<()> {
        let mut archive = open_archive(&self.path)
            .map_err(|e| ContainerError::WriteFailed(e.to_string()))?;
        let entry = self.entry.as_str();

        replace_atomically(&self.path, |tmp| {
            let mut writer = ZipWriter::new(tmp);

            for i in 0..archive.len() {
                let file = archive.by_index_raw(i).map_err(write_failed)?;
                if file.name() == entry {
                    continue;
                }
                writer.raw_copy_file(file).map_err(write_failed)?;
            }

            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            writer.start_file(entry, options).map_err(write_failed)?;
            writer
                .write_all(license.raw_bytes())
                .map_err(|e| ContainerError::WriteFailed(e.to_string()))?;
            writer.finish().map_err(write_failed)?;
            Ok(())
        })?;

        info!(path = %self.path.display(), entry = %self.entry, "license written into publication");
        Ok(())
    }
}

fn open_archive(path: &Path) -> ContainerResult<ZipArchive<BufReader<File>>> {
    let file = File::open(path)
        .map_err(|e| ContainerError::OpenFailed(format!("{}: {e}", path.display())))?;
    ZipArchive::new(BufReader::new(file))
        .map_err(|e| ContainerError::OpenFailed(format!("{}: {e}", path.display())))
}

fn write_failed(err: ZipError) -> ContainerError {
    ContainerError::WriteFailed(err.to_string())
}
