//! Calls to the License Status Server.
//!
//! Every successful call replaces the persisted Status Document with the
//! server's answer, byte for byte.

use crate::error::{LcpError, LcpResult, RenewError, ReturnError};
use crate::http::{HttpClient, HttpRequest, NetworkError};
use crate::task::blocking;
use chrono::{DateTime, SecondsFormat, Utc};
use lcp_license::{media_type, rel, Device, LicenseDocument, StatusDocument};
use lcp_store::LcpStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Marker some servers put in a 400 body for a device that is already registered.
const ALREADY_REGISTERED: &str = "already registered";

/// Status server client bound to one device and one store.
#[derive(Clone)]
pub struct LicenseStatusClient {
    http: Arc<dyn HttpClient>,
    store: Arc<LcpStore>,
    device: Device,
    timeout: Duration,
}

impl std::fmt::Debug for LicenseStatusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseStatusClient")
            .field("device", &self.device)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl LicenseStatusClient {
    /// `timeout` applies to every call not given its own.
    pub fn new(
        http: Arc<dyn HttpClient>,
        store: Arc<LcpStore>,
        device: Device,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            store,
            device,
            timeout,
        }
    }

    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Fetches and persists the Status Document of `license`.
    ///
    /// `timeout` overrides the client's default, so the refresh done while
    /// opening can give up early.
    pub async fn fetch_status(
        &self,
        license: &LicenseDocument,
        timeout: Option<Duration>,
    ) -> LcpResult<StatusDocument> {
        let link = license
            .status_link()
            .ok_or(LcpError::InteractionNotAvailable)?;
        let request =
            HttpRequest::get(link.url(&[])).with_timeout(timeout.unwrap_or(self.timeout));

        let bytes = self.http.fetch(request).await?;
        let status = self.accept(&license.id, bytes).await?;
        debug!(license_id = %license.id, status = %status.status, "status document refreshed");
        Ok(status)
    }

    /// Registers this device. A device the server already knows counts as
    /// registered; the current document is kept in that case.
    pub async fn register(
        &self,
        license_id: &str,
        status: &StatusDocument,
        timeout: Option<Duration>,
    ) -> LcpResult<StatusDocument> {
        let link = status
            .link(rel::REGISTER)
            .ok_or(LcpError::InteractionNotAvailable)?;
        let request = HttpRequest::post(link.url(&self.device.query_params()))
            .with_timeout(timeout.unwrap_or(self.timeout));

        let refreshed = match self.http.fetch(request).await {
            Ok(bytes) => self.accept(license_id, bytes).await?,
            Err(err) if is_already_registered(&err) => {
                debug!(license_id, "device already registered");
                status.clone()
            }
            Err(err) => return Err(err.into()),
        };

        let store = Arc::clone(&self.store);
        let id = license_id.to_string();
        blocking(move || Ok(store.mark_registered(&id)?)).await?;
        info!(license_id, device = %self.device.name(), "device registered");
        Ok(refreshed)
    }

    /// Extends the loan, up to `end` if given.
    ///
    /// # Errors
    /// `WebInteractionRequired` when the server only offers a web page,
    /// `Renew(Failed)` on 400, `Renew(InvalidRenewalPeriod)` on 403.
    pub async fn renew(
        &self,
        license_id: &str,
        status: &StatusDocument,
        end: Option<DateTime<Utc>>,
    ) -> LcpResult<StatusDocument> {
        let link = status
            .link(rel::RENEW)
            .ok_or(LcpError::InteractionNotAvailable)?;
        if link.media_type.as_deref() == Some(media_type::HTML) {
            return Err(LcpError::WebInteractionRequired {
                url: link.href.clone(),
            });
        }

        let mut params = self.device.query_params();
        if let Some(end) = end {
            params.push(("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        let request = HttpRequest::put(link.url(&params)).with_timeout(self.timeout);

        let bytes = self
            .http
            .fetch(request)
            .await
            .map_err(|err| renew_error(err, status))?;

        let renewed = self.accept(license_id, bytes).await?;
        info!(license_id, ?end, "loan renewed");
        Ok(renewed)
    }

    /// Returns the publication to the provider.
    pub async fn return_publication(
        &self,
        license_id: &str,
        status: &StatusDocument,
    ) -> LcpResult<StatusDocument> {
        let link = status
            .link(rel::RETURN)
            .ok_or(LcpError::InteractionNotAvailable)?;
        let request =
            HttpRequest::put(link.url(&self.device.query_params())).with_timeout(self.timeout);

        let bytes = self.http.fetch(request).await.map_err(return_error)?;

        let returned = self.accept(license_id, bytes).await?;
        info!(license_id, "publication returned");
        Ok(returned)
    }

    /// Downloads the License Document the status server points to, if it is
    /// newer than `license`.
    pub async fn fetch_updated_license(
        &self,
        license: &LicenseDocument,
        status: &StatusDocument,
        timeout: Option<Duration>,
    ) -> LcpResult<Option<LicenseDocument>> {
        if status.license_updated() <= license.updated() {
            return Ok(None);
        }
        let link = status
            .link_of_type(rel::LICENSE, media_type::LICENSE)
            .or_else(|| status.link(rel::LICENSE));
        let Some(link) = link else {
            warn!(license_id = %license.id, "license updated but the status document has no license link");
            return Ok(None);
        };

        let bytes = self
            .http
            .fetch(HttpRequest::get(link.url(&[])).with_timeout(timeout.unwrap_or(self.timeout)))
            .await?;
        let updated = LicenseDocument::parse(&bytes)?;
        if updated.id != license.id {
            return Err(LcpError::LicenseIdMismatch {
                expected: license.id.clone(),
                actual: updated.id,
            });
        }

        info!(license_id = %license.id, updated = %updated.updated(), "fetched updated license");
        Ok(Some(updated))
    }

    /// Parses a server answer and makes it the persisted Status Document.
    async fn accept(&self, license_id: &str, bytes: Vec<u8>) -> LcpResult<StatusDocument> {
        let status = StatusDocument::parse(&bytes)
            .map_err(|e| NetworkError::MalformedResponse(format!("status document: {e}")))?;

        let store = Arc::clone(&self.store);
        let id = license_id.to_string();
        blocking(move || Ok(store.save_status(&id, &bytes)?)).await?;
        Ok(status)
    }
}

fn renew_error(err: NetworkError, status: &StatusDocument) -> LcpError {
    match err.status() {
        Some(400) => RenewError::Failed.into(),
        Some(403) => RenewError::InvalidRenewalPeriod {
            max_renew_date: status.max_renew_date(),
        }
        .into(),
        Some(code) => RenewError::UnexpectedServerError(code).into(),
        None => err.into(),
    }
}

fn return_error(err: NetworkError) -> LcpError {
    match err.status() {
        Some(400) => ReturnError::Failed.into(),
        Some(403) => ReturnError::AlreadyReturnedOrExpired.into(),
        Some(code) => ReturnError::UnexpectedServerError(code).into(),
        None => err.into(),
    }
}

fn is_already_registered(err: &NetworkError) -> bool {
    match err {
        NetworkError::Server { status: 409, .. } => true,
        NetworkError::Server {
            status: 400,
            message,
        } => message.to_ascii_lowercase().contains(ALREADY_REGISTERED),
        _ => false,
    }
}
