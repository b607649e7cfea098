//! Shared fixtures for engine tests.
//!
//! Licenses built here are cryptographically real: the key check and the
//! content key are wrapped with the SHA-256 of [`PASSPHRASE`].

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lcp_crypto::{derive_user_key, encrypt, encrypt_to_base64, Passphrase, SHA256_ALGORITHM};
use lcp_engine::{
    AuthenticationReason, CallbackPassphraseProvider, HttpClient, HttpRequest, LcpConfig,
    LcpService, LcpStore, NetworkError, PassphraseProvider,
};
use lcp_license::{Device, LicenseDocument};
use serde_json::{json, Value};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const LICENSE_ID: &str = "0f1b8a41-3d55-4c2a-9b1e-7a4a2f3c6d10";
pub const PASSPHRASE: &str = "correct horse battery staple";
pub const CONTENT_KEY: [u8; 32] = [7u8; 32];
pub const DEVICE_ID: &str = "device-1";
pub const DEVICE_NAME: &str = "Test Reader";

/// License Document knobs.
#[derive(Debug, Clone)]
pub struct LicenseFixture {
    pub id: String,
    pub profile: String,
    pub issued: String,
    pub updated: Option<String>,
    pub status_url: Option<String>,
    pub publication_url: String,
    pub publication_hash: Option<String>,
    pub print: Option<u32>,
    pub copy: Option<u32>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Default for LicenseFixture {
    fn default() -> Self {
        Self {
            id: LICENSE_ID.to_string(),
            profile: "http://readium.org/lcp/basic-profile".to_string(),
            issued: "2024-01-01T00:00:00Z".to_string(),
            updated: None,
            status_url: None,
            publication_url: "https://books.example/book.epub".to_string(),
            publication_hash: None,
            print: None,
            copy: None,
            start: None,
            end: None,
        }
    }
}

impl LicenseFixture {
    pub fn with_status(base: &str) -> Self {
        Self {
            status_url: Some(format!("{base}/status")),
            ..Self::default()
        }
    }

    pub fn value(&self) -> Value {
        let user_key = derive_user_key(&Passphrase::clear(PASSPHRASE), SHA256_ALGORITHM).unwrap();
        let key_check = encrypt_to_base64(user_key.as_bytes(), self.id.as_bytes()).unwrap();
        let content_key = encrypt_to_base64(user_key.as_bytes(), &CONTENT_KEY).unwrap();

        let mut links = vec![
            json!({ "rel": "hint", "href": "https://provider.example/hint", "type": "text/html" }),
            json!({
                "rel": "publication",
                "href": self.publication_url,
                "type": "application/epub+zip",
                "hash": self.publication_hash,
            }),
        ];
        if let Some(status_url) = &self.status_url {
            links.push(json!({
                "rel": "status",
                "href": status_url,
                "type": "application/vnd.readium.license.status.v1.0+json",
            }));
        }

        let mut value = json!({
            "id": self.id,
            "provider": "https://provider.example",
            "issued": self.issued,
            "encryption": {
                "profile": self.profile,
                "content_key": {
                    "encrypted_value": content_key,
                    "algorithm": "http://www.w3.org/2001/04/xmlenc#aes256-cbc",
                },
                "user_key": {
                    "text_hint": "The passphrase from your account page",
                    "algorithm": SHA256_ALGORITHM,
                    "key_check": key_check,
                },
            },
            "links": links,
            "user": { "id": "user-42" },
            "rights": {
                "print": self.print,
                "copy": self.copy,
                "start": self.start,
                "end": self.end,
            },
            "signature": {
                "algorithm": "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
                "certificate": "Y2VydGlmaWNhdGU=",
                "value": "c2lnbmF0dXJl",
            },
        });
        if let Some(updated) = &self.updated {
            value["updated"] = json!(updated);
        }
        value
    }

    pub fn bytes(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(&self.value()).unwrap()
    }

    pub fn document(&self) -> LicenseDocument {
        LicenseDocument::parse(&self.bytes()).unwrap()
    }
}

/// A Status Document whose register/renew/return/license links point at `base`.
pub fn status_value(base: &str, status: &str) -> Value {
    json!({
        "id": LICENSE_ID,
        "status": status,
        "message": format!("The license is {status}"),
        "updated": {
            "license": "2024-01-01T00:00:00Z",
            "status": "2024-03-01T12:00:00Z",
        },
        "links": [
            { "rel": "license", "href": format!("{base}/license"),
              "type": "application/vnd.readium.lcp.license.v1.0+json" },
            { "rel": "register", "href": format!("{base}/register{{?id,name}}"),
              "type": "application/vnd.readium.license.status.v1.0+json", "templated": true },
            { "rel": "return", "href": format!("{base}/return{{?id,name}}"),
              "type": "application/vnd.readium.license.status.v1.0+json", "templated": true },
            { "rel": "renew", "href": format!("{base}/renew{{?end,id,name}}"),
              "type": "application/vnd.readium.license.status.v1.0+json", "templated": true },
        ],
        "potential_rights": { "end": "2099-01-01T00:00:00Z" },
        "events": [
            { "type": "register", "name": "Other Reader", "timestamp": "2024-01-02T00:00:00Z", "id": "device-0" },
        ],
    })
}

pub fn content_ciphertext(plaintext: &[u8]) -> Vec<u8> {
    encrypt(&CONTENT_KEY, plaintext).unwrap()
}

pub fn test_device() -> Device {
    Device::new(DEVICE_ID, DEVICE_NAME)
}

pub fn memory_store() -> Arc<LcpStore> {
    init_tracing();
    Arc::new(LcpStore::open_in_memory().unwrap())
}

/// Routes engine logs to the test harness; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A provider that always answers with the right passphrase.
pub fn passphrase_provider() -> Arc<dyn PassphraseProvider> {
    Arc::new(CallbackPassphraseProvider::new(
        |_: &LicenseDocument, _: AuthenticationReason| Some(PASSPHRASE.to_string()),
    ))
}

/// Service over the reqwest transport with a fixed device.
pub fn online_service(store: Arc<LcpStore>) -> LcpService {
    LcpService::online(LcpConfig::default(), store)
        .unwrap()
        .with_device(test_device())
}

/// Writes `bytes` as `book.lcpl` in `dir`.
pub fn write_lcpl(dir: &Path, bytes: &[u8]) -> PathBuf {
    let path = dir.join("book.lcpl");
    std::fs::write(&path, bytes).unwrap();
    path
}

/// A minimal EPUB archive.
pub fn epub_bytes() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file("mimetype", stored).unwrap();
    writer.write_all(b"application/epub+zip").unwrap();
    writer.start_file("META-INF/container.xml", SimpleFileOptions::default()).unwrap();
    writer.write_all(b"<container/>").unwrap();
    writer.start_file("OEBPS/chapter1.xhtml", SimpleFileOptions::default()).unwrap();
    writer.write_all(b"<html/>").unwrap();
    writer.finish().unwrap().into_inner()
}

/// Reads one entry of a ZIP file.
pub fn read_entry(path: &Path, name: &str) -> Vec<u8> {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).unwrap();
    bytes
}

/// Transport that records requests. URLs starting with a registered prefix
/// get the canned body, everything else fails as unreachable.
#[derive(Default)]
pub struct RecordingHttpClient {
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
    timeouts: Mutex<Vec<Option<Duration>>>,
    responses: Vec<(String, Vec<u8>)>,
}

impl RecordingHttpClient {
    #[must_use]
    pub fn respond(mut self, url_prefix: impl Into<String>, body: Vec<u8>) -> Self {
        self.responses.push((url_prefix.into(), body));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.timeouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn fetch(&self, request: HttpRequest) -> Result<Vec<u8>, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.timeouts.lock().unwrap().push(request.timeout);
        let canned = self
            .responses
            .iter()
            .find(|(prefix, _)| request.url.starts_with(prefix.as_str()))
            .map(|(_, body)| body.clone());
        self.urls.lock().unwrap().push(request.url);
        canned.ok_or_else(|| NetworkError::Unreachable("offline".to_string()))
    }
}
