//! Local persistence for the LCP engine.
//!
//! One SQLite database holds, per license id:
//! - the consumable rights (print pages and copied characters left) and
//!   whether this device is registered
//! - the last Status Document received from the server
//! - hashed passphrases that opened the license before
//!
//! Rights are only ever created once and decremented through
//! [`LcpStore::try_consume`], which is atomic per license id.

mod error;
mod rights;
mod store;

pub use error::{StoreError, StoreResult};
pub use rights::{RightKind, RightsState};
pub use store::LcpStore;
