//! Readium LCP license engine.
//!
//! This crate ties the LCP building blocks together:
//! - [`LcpService`] opens licenses from any [`LicenseContainer`] and acquires
//!   protected publications
//! - [`License`] is an opened license: the content key behind the status
//!   gate, consumable print/copy rights, renew and return
//! - [`LicenseStatusClient`] talks to the License Status Server through an
//!   injected [`HttpClient`]
//! - [`AuthenticationChain`] finds the passphrase, cached ones first
//!
//! Network failures while opening are tolerated: the license opens with the
//! last Status Document persisted in the [`LcpStore`]. Failures of explicit
//! actions (register, renew, return, refresh) are returned to the caller.

mod auth;
mod config;
mod error;
mod http;
mod license;
mod service;
mod state;
mod status_client;
mod task;

pub use auth::{
    Authenticated, AuthenticationChain, AuthenticationReason, CallbackPassphraseProvider,
    PassphraseProvider, PassphraseResponse, StoredPassphraseProvider,
};
pub use config::LcpConfig;
pub use error::{
    AuthError, LcpError, LcpResult, OpeningError, RenewError, RestrictionError, ReturnError,
    RightsError,
};
#[cfg(feature = "online")]
pub use http::ReqwestHttpClient;
pub use http::{HttpClient, HttpRequest, Method, NetworkError};
pub use license::License;
pub use service::{AcquiredPublication, LcpService};
pub use state::{evaluate, restriction, LicenseState};
pub use status_client::LicenseStatusClient;

pub use lcp_container::LicenseContainer;
pub use lcp_store::{LcpStore, RightKind};
