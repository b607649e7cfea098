//! Storage for License Documents.
//!
//! A license lives in one of three places, depending on how it was acquired:
//! - [`BytesContainer`]: freshly downloaded, held in memory
//! - [`ExternalContainer`]: a standalone `.lcpl` file
//! - [`ZipEmbeddedContainer`]: an entry inside a ZIP-based publication,
//!   `META-INF/license.lcpl` for EPUB/Readium packages or `license.lcpl` for
//!   bare packages
//!
//! Writes always persist the document's original bytes. File-backed writes go
//! through a temporary file in the same directory that is renamed over the
//! original, so a failed write leaves the original untouched.

mod archive;
mod container;
mod error;
mod standalone;

pub use archive::{ZipEmbeddedContainer, READIUM_LICENSE_PATH, WEBPUB_LICENSE_PATH};
pub use container::LicenseContainer;
pub use error::{ContainerError, ContainerResult};
pub use standalone::{BytesContainer, ExternalContainer};
