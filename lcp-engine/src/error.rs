//! Error taxonomy of the license engine.

use crate::http::NetworkError;
use chrono::{DateTime, Utc};
use lcp_container::ContainerError;
use lcp_crypto::CryptoError;
use lcp_license::ParsingError;
use lcp_store::{RightKind, StoreError};
use thiserror::Error;

/// Result type for engine operations.
pub type LcpResult<T> = Result<T, LcpError>;

/// Everything the engine can report.
#[derive(Debug, Error)]
pub enum LcpError {
    /// The license could not be read or parsed. Fatal to `open`.
    #[error("can't open the license: {0}")]
    OpeningFailed(#[source] OpeningError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Crypto(CryptoError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Rights(#[from] RightsError),

    #[error(transparent)]
    Restriction(#[from] RestrictionError),

    #[error(transparent)]
    Renew(#[from] RenewError),

    #[error(transparent)]
    Return(#[from] ReturnError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The license uses an encryption profile this engine can't derive.
    #[error("encryption profile not supported: {0}")]
    ProfileNotSupported(String),

    /// The status server offers no link for the requested interaction.
    #[error("license interaction not available")]
    InteractionNotAvailable,

    /// The interaction is only offered as a web page the user must visit.
    #[error("interaction must be completed in a browser: {url}")]
    WebInteractionRequired { url: String },

    /// The publication does not match the digest in the license.
    #[error("publication digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// A refreshed license carries another id than the one it replaces.
    #[error("updated license has id {actual}, expected {expected}")]
    LicenseIdMismatch { expected: String, actual: String },

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<CryptoError> for LcpError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidPassphrase => Self::Auth(AuthError::InvalidPassphrase),
            other => Self::Crypto(other),
        }
    }
}

impl From<tokio::task::JoinError> for LcpError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum OpeningError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Parsing(#[from] ParsingError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No provider produced a passphrase.
    #[error("no passphrase found for this license")]
    PassphraseNotFound,
    /// Every candidate was rejected by the key check.
    #[error("the passphrase is incorrect")]
    InvalidPassphrase,
    /// A provider was cancelled by the user.
    #[error("authentication cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RightsError {
    #[error("not enough {kind} rights left for {requested}")]
    InsufficientRights { kind: RightKind, requested: u32 },
}

/// Why the publication may not be read right now.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestrictionError {
    #[error("license revoked on {date} after registering {devices_count} devices")]
    Revoked {
        date: DateTime<Utc>,
        devices_count: usize,
    },
    #[error("publication returned on {date}")]
    Returned { date: DateTime<Utc> },
    #[error("license cancelled on {date}")]
    Cancelled { date: DateTime<Utc> },
    #[error("license expired on {end}")]
    Expired { end: DateTime<Utc> },
    #[error("license not valid before {start}")]
    NotStarted { start: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenewError {
    /// The server refused to renew the loan.
    #[error("renewal refused by the server")]
    Failed,
    /// The requested end date is outside what the server allows.
    #[error("renewal period not allowed (latest end: {max_renew_date:?})")]
    InvalidRenewalPeriod { max_renew_date: Option<DateTime<Utc>> },
    #[error("unexpected server error {0} during renewal")]
    UnexpectedServerError(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnError {
    #[error("return refused by the server")]
    Failed,
    #[error("publication already returned or loan expired")]
    AlreadyReturnedOrExpired,
    #[error("unexpected server error {0} during return")]
    UnexpectedServerError(u16),
}
