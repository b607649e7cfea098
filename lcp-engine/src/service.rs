//! Entry point of the engine.

use crate::auth::{AuthenticationChain, PassphraseProvider};
use crate::config::LcpConfig;
use crate::error::{LcpError, LcpResult};
use crate::http::{HttpClient, HttpRequest};
use crate::license::License;
use crate::status_client::LicenseStatusClient;
use crate::task::blocking;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use lcp_container::{ContainerError, LicenseContainer, ZipEmbeddedContainer};
use lcp_license::{Device, LicenseDocument};
use lcp_store::LcpStore;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A publication downloaded from a license's `publication` link.
#[derive(Debug, Clone)]
pub struct AcquiredPublication {
    /// Where the publication was written, license included.
    pub path: PathBuf,
    /// File name to offer the user, from the license id and media type.
    pub suggested_filename: String,
    pub license: LicenseDocument,
}

/// Opens licenses and acquires publications against one store and one
/// HTTP client.
pub struct LcpService {
    config: LcpConfig,
    store: Arc<LcpStore>,
    http: Arc<dyn HttpClient>,
    device: Device,
    chain: AuthenticationChain,
}

impl std::fmt::Debug for LcpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LcpService")
            .field("config", &self.config)
            .field("device", &self.device)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

impl LcpService {
    pub fn new(config: LcpConfig, store: Arc<LcpStore>, http: Arc<dyn HttpClient>) -> Self {
        let device = Device::current(config.device_name.as_deref());
        Self {
            config,
            store,
            http,
            device,
            chain: AuthenticationChain::default(),
        }
    }

    /// Service using the bundled reqwest transport.
    #[cfg(feature = "online")]
    pub fn online(config: LcpConfig, store: Arc<LcpStore>) -> LcpResult<Self> {
        let http = crate::http::ReqwestHttpClient::new(&config)?;
        Ok(Self::new(config, store, Arc::new(http)))
    }

    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Appends a provider after the stored-passphrase lookup.
    #[must_use]
    pub fn with_passphrase_provider(mut self, provider: Arc<dyn PassphraseProvider>) -> Self {
        self.chain = self.chain.with(provider);
        self
    }

    #[must_use]
    pub fn config(&self) -> &LcpConfig {
        &self.config
    }

    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    fn status_client(&self) -> LicenseStatusClient {
        LicenseStatusClient::new(
            Arc::clone(&self.http),
            Arc::clone(&self.store),
            self.device.clone(),
            self.config.http_timeout(),
        )
    }

    /// Opens the license held by `container`.
    pub async fn open(&self, container: LicenseContainer) -> LcpResult<License> {
        License::open(
            container,
            Arc::clone(&self.store),
            self.status_client(),
            self.chain.clone(),
            self.config.clone(),
        )
        .await
    }

    /// Opens a `.lcpl` file or a protected ZIP publication.
    pub async fn open_path(&self, path: impl Into<PathBuf>) -> LcpResult<License> {
        let path = path.into();
        let container = blocking(move || {
            LicenseContainer::for_path(path).map_err(|e| LcpError::OpeningFailed(e.into()))
        })
        .await?;
        self.open(container).await
    }

    /// Reads a License Document without authenticating or touching the network.
    pub async fn retrieve_license_document(
        &self,
        container: LicenseContainer,
    ) -> LcpResult<LicenseDocument> {
        let bytes = blocking(move || {
            container
                .read()
                .map_err(|e| LcpError::OpeningFailed(e.into()))
        })
        .await?;
        LicenseDocument::parse(&bytes).map_err(|e| LcpError::OpeningFailed(e.into()))
    }

    /// Embeds `license` into the ZIP publication at `publication`.
    pub async fn inject_license(&self, license: &LicenseDocument, publication: &Path) -> LcpResult<()> {
        let license = license.clone();
        let path = publication.to_path_buf();
        blocking(move || {
            let mut container = LicenseContainer::Zip(ZipEmbeddedContainer::detect(&path)?);
            container.write(&license)?;
            Ok(())
        })
        .await
    }

    /// Downloads the publication of `lcpl`, checks its digest, writes it to
    /// `destination` and embeds the license.
    pub async fn acquire_publication(
        &self,
        lcpl: &[u8],
        destination: &Path,
    ) -> LcpResult<AcquiredPublication> {
        let license = LicenseDocument::parse(lcpl)?;
        let link = license
            .publication_link()
            .ok_or(LcpError::InteractionNotAvailable)?;
        info!(license_id = %license.id, url = %link.href, "downloading publication");

        let request = HttpRequest::get(link.url(&[])).with_timeout(self.config.http_timeout());
        let bytes = self.http.fetch(request).await?;
        if let Some(expected) = link.hash.as_deref() {
            check_digest(expected, &bytes)?;
        }

        tokio::fs::write(destination, &bytes).await.map_err(|e| {
            ContainerError::WriteFailed(format!("{}: {e}", destination.display()))
        })?;
        self.inject_license(&license, destination).await?;

        let suggested_filename = format!(
            "{}.{}",
            license.id,
            file_extension(link.media_type.as_deref(), &link.href)
        );
        info!(license_id = %license.id, path = %destination.display(), "publication acquired");

        Ok(AcquiredPublication {
            path: destination.to_path_buf(),
            suggested_filename,
            license,
        })
    }
}

/// Compares `bytes` with a SHA-256 digest given in base64 or hex.
fn check_digest(expected: &str, bytes: &[u8]) -> LcpResult<()> {
    let digest = Sha256::digest(bytes);
    let expected = expected.trim();

    let actual = if expected.len() == 64 && expected.bytes().all(|b| b.is_ascii_hexdigit()) {
        let actual = hex::encode(digest);
        if actual.eq_ignore_ascii_case(expected) {
            return Ok(());
        }
        actual
    } else if let Ok(decoded) = BASE64.decode(expected) {
        if decoded.as_slice() == digest.as_slice() {
            return Ok(());
        }
        BASE64.encode(digest)
    } else {
        debug!(hash = expected, "unrecognized publication digest encoding, not checked");
        return Ok(());
    };

    Err(LcpError::DigestMismatch {
        expected: expected.to_string(),
        actual,
    })
}

fn file_extension(media_type: Option<&str>, href: &str) -> String {
    let known = match media_type {
        Some("application/epub+zip") => Some("epub"),
        Some("application/pdf+lcp") => Some("lcpdf"),
        Some("application/audiobook+lcp") => Some("lcpa"),
        Some("application/divina+lcp") => Some("lcpdi"),
        Some("application/pdf") => Some("pdf"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }

    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "epub".to_string())
}
