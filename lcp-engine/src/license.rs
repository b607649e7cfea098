//! The opened license.
//!
//! A [`License`] owns the content key for as long as it lives. Every access
//! to the content goes through the status gate: whatever key is cached, a
//! revoked, returned, cancelled, expired or not yet started license refuses
//! to decrypt.

use crate::auth::{AuthenticationChain, PassphraseProvider, StoredPassphraseProvider};
use crate::config::LcpConfig;
use crate::error::{AuthError, LcpError, LcpResult, RestrictionError, RightsError};
use crate::state::{self, LicenseState};
use crate::status_client::LicenseStatusClient;
use crate::task::blocking;
use chrono::{DateTime, Utc};
use lcp_container::LicenseContainer;
use lcp_crypto::{unlock_content_key, DecryptionContext};
use lcp_license::{rel, LicenseDocument, StatusDocument, BASIC_PROFILE};
use lcp_store::{LcpStore, RightKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Handle on one opened license.
pub struct License {
    document: RwLock<LicenseDocument>,
    status: RwLock<Option<StatusDocument>>,
    context: RwLock<Option<DecryptionContext>>,
    registered: AtomicBool,
    container: Arc<Mutex<LicenseContainer>>,
    store: Arc<LcpStore>,
    client: LicenseStatusClient,
    chain: AuthenticationChain,
    config: LcpConfig,
}

impl std::fmt::Debug for License {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.id();
        f.debug_struct("License")
            .field("id", &id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl License {
    /// Reads, refreshes and authenticates a license.
    ///
    /// Container and parsing failures are fatal. A failed status refresh is
    /// not: the last persisted Status Document is used instead. A license
    /// that is restricted opens without a content key.
    pub(crate) async fn open(
        container: LicenseContainer,
        store: Arc<LcpStore>,
        client: LicenseStatusClient,
        chain: AuthenticationChain,
        config: LcpConfig,
    ) -> LcpResult<Self> {
        let reader = container.clone();
        let bytes = blocking(move || {
            reader
                .read()
                .map_err(|e| LcpError::OpeningFailed(e.into()))
        })
        .await?;
        let document =
            LicenseDocument::parse(&bytes).map_err(|e| LcpError::OpeningFailed(e.into()))?;
        check_profile(&document)?;
        info!(license_id = %document.id, provider = %document.provider, "opening license");

        let (persisted, registered) = {
            let store = Arc::clone(&store);
            let id = document.id.clone();
            let (print, copy) = (document.rights.print, document.rights.copy);
            blocking(move || {
                store.ensure_rights(&id, print, copy)?;
                Ok((store.load_status(&id)?, store.is_registered(&id)?))
            })
            .await?
        };
        let status = persisted.and_then(|raw| match StatusDocument::parse(&raw) {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(license_id = %document.id, error = %e, "discarding unreadable persisted status");
                None
            }
        });

        let license = Self {
            document: RwLock::new(document),
            status: RwLock::new(status),
            context: RwLock::new(None),
            registered: AtomicBool::new(registered),
            container: Arc::new(Mutex::new(container)),
            store,
            client,
            chain,
            config,
        };

        license.refresh_on_open().await;

        match license.restriction() {
            Some(restriction) => {
                info!(license_id = %license.id(), %restriction, "license restricted, skipping authentication");
            }
            None => {
                license.authenticate().await?;
                license.register_on_open().await;
            }
        }

        info!(license_id = %license.id(), state = %license.state(), "license opened");
        Ok(license)
    }

    async fn refresh_on_open(&self) {
        let document = self.document();
        if document.status_link().is_none() {
            return;
        }

        let now = Utc::now();
        let status = self.status();
        let locally_expired = matches!(
            state::restriction(&document, None, now),
            Some(RestrictionError::Expired { .. })
        );
        let renewable = status
            .as_ref()
            .and_then(StatusDocument::max_renew_date)
            .is_some_and(|max| max > now);
        if locally_expired && !renewable {
            info!(license_id = %document.id, "license expired, skipping status refresh");
            return;
        }

        let timeout = Some(self.config.status_timeout());
        match self.client.fetch_status(&document, timeout).await {
            Ok(status) => {
                self.set_status(status.clone());
                if let Err(e) = self.apply_license_update(&status, timeout).await {
                    warn!(license_id = %document.id, error = %e, "failed to update license");
                }
            }
            Err(e) => {
                warn!(license_id = %document.id, error = %e, "status refresh failed, using last known status");
            }
        }
    }

    async fn register_on_open(&self) {
        if !self.config.register_on_open || self.registered.load(Ordering::Acquire) {
            return;
        }
        let has_link = read(&self.status)
            .as_ref()
            .is_some_and(|status| status.link(rel::REGISTER).is_some());
        if !has_link {
            return;
        }
        let timeout = Some(self.config.status_timeout());
        if let Err(e) = self.register_with(timeout).await {
            warn!(license_id = %self.id(), error = %e, "device registration failed");
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    /// License identifier.
    #[must_use]
    pub fn id(&self) -> String {
        read(&self.document).id.clone()
    }

    /// Current License Document.
    #[must_use]
    pub fn document(&self) -> LicenseDocument {
        read(&self.document).clone()
    }

    /// Last known Status Document.
    #[must_use]
    pub fn status(&self) -> Option<StatusDocument> {
        read(&self.status).clone()
    }

    #[must_use]
    pub fn state(&self) -> LicenseState {
        state::evaluate(
            &read(&self.document),
            read(&self.status).as_ref(),
            self.registered.load(Ordering::Acquire),
            Utc::now(),
        )
    }

    /// Why the content can't be read right now.
    #[must_use]
    pub fn restriction(&self) -> Option<RestrictionError> {
        state::restriction(&read(&self.document), read(&self.status).as_ref(), Utc::now())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        read(&self.context).is_some()
    }

    // ── Content ──────────────────────────────────────────────────

    /// The content key and its cipher, for resource decryption.
    ///
    /// # Errors
    /// `Restriction` when the license may not be used,
    /// `Auth(PassphraseNotFound)` when no key was derived yet.
    pub fn decryption_context(&self) -> LcpResult<DecryptionContext> {
        self.check_usable()?;
        read(&self.context)
            .clone()
            .ok_or(LcpError::Auth(AuthError::PassphraseNotFound))
    }

    /// Deciphers one buffer (IV prefix, PKCS#7 padding).
    pub fn decrypt(&self, data: &[u8]) -> LcpResult<Vec<u8>> {
        self.check_usable()?;
        let context = read(&self.context);
        let context = context
            .as_ref()
            .ok_or(LcpError::Auth(AuthError::PassphraseNotFound))?;
        Ok(context.decrypt(data)?)
    }

    fn check_usable(&self) -> LcpResult<()> {
        match self.restriction() {
            Some(restriction) => {
                debug!(license_id = %self.id(), %restriction, "content access refused");
                Err(restriction.into())
            }
            None => Ok(()),
        }
    }

    /// Re-runs the authentication chain and caches the content key.
    pub async fn authenticate(&self) -> LcpResult<()> {
        let document = self.document();
        let chain = self.chain_for(&document).await?;

        let candidate = document.clone();
        let authenticated = blocking(move || chain.authenticate(&candidate)).await?;

        let encryption = &document.encryption;
        let key = unlock_content_key(
            &authenticated.user_key,
            &encryption.user_key.key_check,
            &document.id,
            &encryption.content_key.encrypted_value,
            &encryption.content_key.algorithm,
        )?;
        *write(&self.context) = Some(DecryptionContext::new(
            key,
            encryption.content_key.algorithm.clone(),
        ));

        let store = Arc::clone(&self.store);
        let id = document.id.clone();
        let user_id = document.user.id.clone();
        let hashed = authenticated.user_key.to_hex();
        blocking(move || Ok(store.add_passphrase(&id, user_id.as_deref(), &hashed)?)).await?;

        info!(license_id = %document.id, "content key unlocked");
        Ok(())
    }

    /// Stored passphrases first, then the configured providers.
    async fn chain_for(&self, document: &LicenseDocument) -> LcpResult<AuthenticationChain> {
        let store = Arc::clone(&self.store);
        let id = document.id.clone();
        let user_id = document.user.id.clone();
        let cached = blocking(move || Ok(store.passphrases(&id, user_id.as_deref())?)).await?;
        debug!(license_id = %document.id, cached = cached.len(), "building authentication chain");

        let stored: Arc<dyn PassphraseProvider> = Arc::new(StoredPassphraseProvider::new(cached));
        let mut chain = AuthenticationChain::new(vec![stored]);
        for provider in self.chain.providers() {
            chain = chain.with(provider);
        }
        Ok(chain)
    }

    // ── Rights ───────────────────────────────────────────────────

    /// Pages left to print, `None` if unlimited.
    pub async fn pages_to_print_left(&self) -> LcpResult<Option<u32>> {
        self.remaining(RightKind::Print).await
    }

    /// Characters left to copy, `None` if unlimited.
    pub async fn characters_to_copy_left(&self) -> LcpResult<Option<u32>> {
        self.remaining(RightKind::Copy).await
    }

    async fn remaining(&self, kind: RightKind) -> LcpResult<Option<u32>> {
        let store = Arc::clone(&self.store);
        let id = self.id();
        let rights = blocking(move || Ok(store.rights(&id)?)).await?;
        Ok(match rights {
            Some(rights) => rights.remaining(kind),
            None => {
                let document = read(&self.document);
                match kind {
                    RightKind::Print => document.rights.print,
                    RightKind::Copy => document.rights.copy,
                }
            }
        })
    }

    /// Whether `pages` could be printed now, without consuming anything.
    pub async fn can_print(&self, pages: u32) -> bool {
        self.can_consume(RightKind::Print, pages).await
    }

    /// Whether `characters` could be copied now, without consuming anything.
    pub async fn can_copy(&self, characters: u32) -> bool {
        self.can_consume(RightKind::Copy, characters).await
    }

    async fn can_consume(&self, kind: RightKind, quantity: u32) -> bool {
        if self.restriction().is_some() {
            return false;
        }
        match self.remaining(kind).await {
            Ok(remaining) => remaining.is_none_or(|left| quantity <= left),
            Err(e) => {
                warn!(license_id = %self.id(), right = %kind, error = %e, "failed to read rights");
                false
            }
        }
    }

    /// Takes `quantity` units of a right before the action is performed.
    ///
    /// # Errors
    /// `Rights(InsufficientRights)` leaves the counter untouched.
    pub async fn consume(&self, kind: RightKind, quantity: u32) -> LcpResult<()> {
        self.check_usable()?;

        let store = Arc::clone(&self.store);
        let id = self.id();
        let granted = blocking(move || Ok(store.try_consume(kind, quantity, &id)?)).await?;
        if granted {
            info!(license_id = %self.id(), right = %kind, quantity, "rights consumed");
            Ok(())
        } else {
            debug!(license_id = %self.id(), right = %kind, quantity, "not enough rights left");
            Err(RightsError::InsufficientRights {
                kind,
                requested: quantity,
            }
            .into())
        }
    }

    /// Consumes print rights for `pages`. Returns false when not enough are left.
    pub async fn print(&self, pages: u32) -> LcpResult<bool> {
        granted(self.consume(RightKind::Print, pages).await)
    }

    /// Consumes copy rights for the characters of `text`.
    pub async fn copy(&self, text: &str) -> LcpResult<bool> {
        let characters = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        granted(self.consume(RightKind::Copy, characters).await)
    }

    // ── Status server ────────────────────────────────────────────

    #[must_use]
    pub fn can_renew_loan(&self) -> bool {
        read(&self.status)
            .as_ref()
            .is_some_and(|status| status.link(rel::RENEW).is_some())
    }

    /// Latest end date the server would accept for a renewal.
    #[must_use]
    pub fn max_renew_date(&self) -> Option<DateTime<Utc>> {
        read(&self.status)
            .as_ref()
            .and_then(StatusDocument::max_renew_date)
    }

    #[must_use]
    pub fn can_return_publication(&self) -> bool {
        read(&self.status)
            .as_ref()
            .is_some_and(|status| status.link(rel::RETURN).is_some())
    }

    /// Fetches the Status Document now, surfacing any failure.
    pub async fn refresh_status(&self) -> LcpResult<StatusDocument> {
        let status = self.client.fetch_status(&self.document(), None).await?;
        self.set_status(status.clone());
        self.apply_license_update(&status, None).await?;
        Ok(status)
    }

    /// Registers this device with the status server.
    pub async fn register(&self) -> LcpResult<()> {
        self.register_with(None).await
    }

    async fn register_with(&self, timeout: Option<Duration>) -> LcpResult<()> {
        let status = self.current_status().await?;
        let registered = self.client.register(&self.id(), &status, timeout).await?;
        self.registered.store(true, Ordering::Release);
        self.set_status(registered);
        Ok(())
    }

    /// Extends the loan, to `end` or as far as the server allows.
    pub async fn renew(&self, end: Option<DateTime<Utc>>) -> LcpResult<()> {
        let status = self.current_status().await?;
        let renewed = self.client.renew(&self.id(), &status, end).await?;
        self.set_status(renewed.clone());
        self.apply_license_update(&renewed, None).await?;
        Ok(())
    }

    /// Gives the publication back. The license is `Returned` afterwards.
    pub async fn return_publication(&self) -> LcpResult<()> {
        let status = self.current_status().await?;
        let returned = self.client.return_publication(&self.id(), &status).await?;
        self.set_status(returned.clone());
        self.apply_license_update(&returned, None).await?;
        Ok(())
    }

    async fn current_status(&self) -> LcpResult<StatusDocument> {
        if let Some(status) = self.status() {
            return Ok(status);
        }
        self.refresh_status().await
    }

    fn set_status(&self, status: StatusDocument) {
        debug!(license_id = %status.id, status = %status.status, "status updated");
        *write(&self.status) = Some(status);
    }

    /// Swaps in the newer License Document the server announces, if any,
    /// writing its original bytes back to the container.
    async fn apply_license_update(
        &self,
        status: &StatusDocument,
        timeout: Option<Duration>,
    ) -> LcpResult<bool> {
        let current = self.document();
        let Some(updated) = self
            .client
            .fetch_updated_license(&current, status, timeout)
            .await?
        else {
            return Ok(false);
        };

        let container = Arc::clone(&self.container);
        let written = updated.clone();
        blocking(move || {
            let mut container = container.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(container.write(&written)?)
        })
        .await?;

        *write(&self.document) = updated;
        info!(license_id = %current.id, "license document updated");
        Ok(true)
    }

    /// Drops the content key.
    pub fn close(self) {
        write(&self.context).take();
        debug!(license_id = %self.id(), "license closed");
    }
}

fn check_profile(document: &LicenseDocument) -> LcpResult<()> {
    if document.profile() == BASIC_PROFILE {
        Ok(())
    } else {
        Err(LcpError::ProfileNotSupported(document.profile().to_string()))
    }
}

fn granted(result: LcpResult<()>) -> LcpResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(LcpError::Rights(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
