//! The closed set of license containers.

use crate::archive::ZipEmbeddedContainer;
use crate::error::ContainerResult;
use crate::standalone::{BytesContainer, ExternalContainer};
use lcp_license::LicenseDocument;
use std::path::PathBuf;

const LCPL_EXTENSION: &str = "lcpl";

/// Where a license is read from and written back to.
#[derive(Debug, Clone)]
pub enum LicenseContainer {
    Bytes(BytesContainer),
    External(ExternalContainer),
    Zip(ZipEmbeddedContainer),
}

impl LicenseContainer {
    /// In-memory container over downloaded bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::Bytes(BytesContainer::new(bytes))
    }

    /// Container for a file on disk: `.lcpl` files are standalone licenses,
    /// anything else must be a ZIP-based publication.
    pub fn for_path(path: impl Into<PathBuf>) -> ContainerResult<Self> {
        let path = path.into();
        let is_lcpl = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(LCPL_EXTENSION));

        if is_lcpl {
            Ok(Self::External(ExternalContainer::new(path)))
        } else {
            Ok(Self::Zip(ZipEmbeddedContainer::detect(path)?))
        }
    }

    /// Reads the raw License Document bytes.
    pub fn read(&self) -> ContainerResult<Vec<u8>> {
        match self {
            Self::Bytes(c) => c.read(),
            Self::External(c) => c.read(),
            Self::Zip(c) => c.read(),
        }
    }

    /// Persists the document's original bytes.
    pub fn write(&mut self, license: &LicenseDocument) -> ContainerResult<()> {
        match self {
            Self::Bytes(c) => c.write(license),
            Self::External(c) => c.write(license),
            Self::Zip(c) => c.write(license),
        }
    }
}
