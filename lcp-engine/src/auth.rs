//! Passphrase retrieval.
//!
//! An [`AuthenticationChain`] asks its providers in order until one of them
//! yields a passphrase that opens the license's key check. Providers are
//! synchronous and may block on a user; the engine runs the chain on the
//! blocking pool.

use crate::error::{AuthError, LcpError, LcpResult};
use lcp_crypto::{derive_user_key, validate, Passphrase, UserKey};
use lcp_license::LicenseDocument;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Why a provider is being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationReason {
    /// First request for this license.
    PassphraseNotFound,
    /// A previous candidate was rejected.
    InvalidPassphrase,
}

/// What a provider answers.
#[derive(Debug, Clone)]
pub enum PassphraseResponse {
    Provided(Passphrase),
    /// Nothing to offer; the chain moves on.
    Unavailable,
    /// The user gave up; the chain stops.
    Cancelled,
}

/// A source of passphrase candidates.
pub trait PassphraseProvider: Send + Sync {
    fn ask(&self, license: &LicenseDocument, reason: AuthenticationReason) -> PassphraseResponse;

    /// Whether a person answers. Interactive providers are re-asked even
    /// when they repeat a rejected candidate.
    fn is_interactive(&self) -> bool {
        false
    }
}

/// A passphrase that passed the key check.
#[derive(Debug)]
pub struct Authenticated {
    pub passphrase: Passphrase,
    pub user_key: UserKey,
}

/// Ordered passphrase providers.
#[derive(Clone, Default)]
pub struct AuthenticationChain {
    providers: Vec<Arc<dyn PassphraseProvider>>,
}

impl std::fmt::Debug for AuthenticationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationChain")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl AuthenticationChain {
    pub fn new(providers: Vec<Arc<dyn PassphraseProvider>>) -> Self {
        Self { providers }
    }

    #[must_use]
    pub fn with(mut self, provider: Arc<dyn PassphraseProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(&self) -> impl Iterator<Item = Arc<dyn PassphraseProvider>> + '_ {
        self.providers.iter().cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Runs the chain against `license`'s key check.
    ///
    /// Each provider is asked repeatedly, with
    /// [`AuthenticationReason::InvalidPassphrase`] once a candidate was
    /// rejected. A non-interactive provider repeating a rejected candidate,
    /// or any provider answering with nothing, hands over to the next one.
    /// An interactive provider is re-asked until it succeeds or cancels.
    /// The first `Cancelled` ends the chain.
    ///
    /// # Errors
    /// `Auth(Cancelled)`, `Auth(InvalidPassphrase)` if candidates were
    /// offered but none passed, `Auth(PassphraseNotFound)` if none were
    /// offered, or `Crypto` if the license declares an unknown hash.
    pub fn authenticate(&self, license: &LicenseDocument) -> LcpResult<Authenticated> {
        let algorithm = license.encryption.user_key.algorithm.as_str();
        let key_check = license.encryption.user_key.key_check.as_str();
        let mut rejected: HashSet<String> = HashSet::new();
        let mut reason = AuthenticationReason::PassphraseNotFound;

        for (index, provider) in self.providers.iter().enumerate() {
            loop {
                let passphrase = match provider.ask(license, reason) {
                    PassphraseResponse::Provided(passphrase) => passphrase,
                    PassphraseResponse::Unavailable => break,
                    PassphraseResponse::Cancelled => {
                        info!(license_id = %license.id, provider = index, "authentication cancelled");
                        return Err(AuthError::Cancelled.into());
                    }
                };

                let user_key = derive_user_key(&passphrase, algorithm).map_err(LcpError::from)?;
                let fingerprint = user_key.to_hex();
                if rejected.contains(&fingerprint) {
                    if provider.is_interactive() {
                        debug!(provider = index, "candidate already rejected, asking again");
                        reason = AuthenticationReason::InvalidPassphrase;
                        continue;
                    }
                    debug!(provider = index, "candidate already rejected, moving on");
                    break;
                }

                if validate(&user_key, key_check, &license.id) {
                    info!(license_id = %license.id, provider = index, "passphrase accepted");
                    return Ok(Authenticated {
                        passphrase,
                        user_key,
                    });
                }

                debug!(license_id = %license.id, provider = index, "passphrase rejected");
                rejected.insert(fingerprint);
                reason = AuthenticationReason::InvalidPassphrase;
            }
        }

        if rejected.is_empty() {
            Err(AuthError::PassphraseNotFound.into())
        } else {
            Err(AuthError::InvalidPassphrase.into())
        }
    }
}

/// Offers previously successful passphrases, one per request.
///
/// The candidates are SHA-256 hex digests, as kept by the license store.
#[derive(Debug)]
pub struct StoredPassphraseProvider {
    candidates: Mutex<VecDeque<String>>,
}

impl StoredPassphraseProvider {
    pub fn new(hashed: impl IntoIterator<Item = String>) -> Self {
        Self {
            candidates: Mutex::new(hashed.into_iter().collect()),
        }
    }
}

impl PassphraseProvider for StoredPassphraseProvider {
    fn ask(&self, _license: &LicenseDocument, _reason: AuthenticationReason) -> PassphraseResponse {
        let mut candidates = self
            .candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match candidates.pop_front() {
            Some(hashed) => PassphraseResponse::Provided(Passphrase::hashed(hashed)),
            None => PassphraseResponse::Unavailable,
        }
    }
}

/// Adapts a closure, typically a UI prompt, as a provider.
///
/// The closure returns `None` when the user cancels.
pub struct CallbackPassphraseProvider<F> {
    callback: F,
}

impl<F> CallbackPassphraseProvider<F>
where
    F: Fn(&LicenseDocument, AuthenticationReason) -> Option<String> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> PassphraseProvider for CallbackPassphraseProvider<F>
where
    F: Fn(&LicenseDocument, AuthenticationReason) -> Option<String> + Send + Sync,
{
    fn ask(&self, license: &LicenseDocument, reason: AuthenticationReason) -> PassphraseResponse {
        match (self.callback)(license, reason) {
            Some(clear) => PassphraseResponse::Provided(Passphrase::clear(clear)),
            None => PassphraseResponse::Cancelled,
        }
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

impl<F> std::fmt::Debug for CallbackPassphraseProvider<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CallbackPassphraseProvider")
    }
}
