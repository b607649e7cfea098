//! Error types for license containers.

use thiserror::Error;

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

#[derive(Debug, Error)]
pub enum ContainerError {
    /// The file or archive could not be opened.
    #[error("can't open the license container: {0}")]
    OpenFailed(String),

    /// The archive has no license entry.
    #[error("license not found in container: {0}")]
    FileNotFound(String),

    /// I/O error while reading the license.
    #[error("can't read the license from the container: {0}")]
    ReadFailed(String),

    /// The license could not be written; the original is left untouched.
    #[error("can't write the license in the container: {0}")]
    WriteFailed(String),
}
