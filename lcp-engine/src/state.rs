//! Lifecycle state of an opened license.
//!
//! The state is recomputed from the License Document, the last known Status
//! Document and the local registration flag. Nothing here touches the network.

use crate::error::RestrictionError;
use chrono::{DateTime, Utc};
use lcp_license::{LicenseDocument, Status, StatusDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LicenseState {
    /// Acquired, this device not registered yet.
    Fresh,
    Registered,
    /// The server reports the license as in use.
    Active,
    NotStarted,
    Revoked,
    Returned,
    Cancelled,
    Expired,
}

impl LicenseState {
    /// States in which the publication can be read.
    #[must_use]
    pub fn allows_decryption(self) -> bool {
        matches!(self, Self::Fresh | Self::Registered | Self::Active)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Revoked | Self::Returned | Self::Cancelled | Self::Expired
        )
    }
}

impl std::fmt::Display for LicenseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Fresh => "fresh",
            Self::Registered => "registered",
            Self::Active => "active",
            Self::NotStarted => "not-started",
            Self::Revoked => "revoked",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Why the license can't be used at `now`, if it can't.
///
/// A terminal server status wins over local dates: once revoked, returned or
/// cancelled, the license stays blocked whatever its rights say. Otherwise
/// `rights.start` and `rights.end` are checked locally.
#[must_use]
pub fn restriction(
    license: &LicenseDocument,
    status: Option<&StatusDocument>,
    now: DateTime<Utc>,
) -> Option<RestrictionError> {
    if let Some(status) = status {
        let date = status.status_updated();
        match status.status {
            Status::Revoked => {
                return Some(RestrictionError::Revoked {
                    date,
                    devices_count: status.registered_devices(),
                });
            }
            Status::Returned => return Some(RestrictionError::Returned { date }),
            Status::Cancelled => return Some(RestrictionError::Cancelled { date }),
            Status::Expired => {
                return Some(RestrictionError::Expired {
                    end: license.rights.end.unwrap_or(date),
                });
            }
            Status::Ready | Status::Active => {}
        }
    }

    if let Some(start) = license.rights.start {
        if start > now {
            return Some(RestrictionError::NotStarted { start });
        }
    }
    if let Some(end) = license.rights.end {
        if now > end {
            return Some(RestrictionError::Expired { end });
        }
    }
    None
}

/// Current lifecycle state.
#[must_use]
pub fn evaluate(
    license: &LicenseDocument,
    status: Option<&StatusDocument>,
    registered: bool,
    now: DateTime<Utc>,
) -> LicenseState {
    match restriction(license, status, now) {
        Some(RestrictionError::Revoked { .. }) => LicenseState::Revoked,
        Some(RestrictionError::Returned { .. }) => LicenseState::Returned,
        Some(RestrictionError::Cancelled { .. }) => LicenseState::Cancelled,
        Some(RestrictionError::Expired { .. }) => LicenseState::Expired,
        Some(RestrictionError::NotStarted { .. }) => LicenseState::NotStarted,
        None if status.is_some_and(|s| s.status == Status::Active) => LicenseState::Active,
        None if registered => LicenseState::Registered,
        None => LicenseState::Fresh,
    }
}
