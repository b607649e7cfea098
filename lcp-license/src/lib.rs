//! License Document and Status Document model for Readium LCP.
//!
//! This crate handles:
//! - Parsing License Documents (`.lcpl`) and Status Documents, keeping the
//!   original bytes so the signed document can be written back untouched
//! - Relation-keyed links and their URI templates
//! - The device identity sent to the License Status Server
//!
//! Parsing is total: the same bytes always yield the same document or the
//! same [`ParsingError`].

mod device;
mod error;
mod license;
mod link;
mod status;

pub use device::Device;
pub use error::{ParsingError, ParsingResult};
pub use license::{
    ContentKeyInfo, Encryption, LicenseDocument, Rights, Signature, User, UserKeyInfo,
    BASIC_PROFILE, PROFILE_1_0, SIGNATURE_ALGORITHMS,
};
pub use link::{media_type, rel, Link};
pub use status::{Event, EventType, PotentialRights, Status, StatusDocument, Updated};
