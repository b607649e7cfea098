//! The License Document (`.lcpl`).

use crate::error::{ParsingError, ParsingResult};
use crate::link::{self, media_type, rel, Link};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Basic encryption profile: the user key is SHA-256 of the passphrase.
pub const BASIC_PROFILE: &str = "http://readium.org/lcp/basic-profile";

/// Production profile: needs a vendor transform on top of the basic derivation.
pub const PROFILE_1_0: &str = "http://readium.org/lcp/profile-1.0";

/// Signature algorithms accepted by the structural check.
pub const SIGNATURE_ALGORITHMS: &[&str] = &[
    "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
    "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256",
];

/// A parsed License Document.
///
/// The bytes it was parsed from are kept alongside the model: writing a
/// license back always uses them, never a re-serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseDocument {
    pub id: String,
    pub provider: String,
    pub issued: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    pub encryption: Encryption,
    pub links: Vec<Link>,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub rights: Rights,
    pub signature: Signature,
    /// Members this model does not know about, kept for `to_json`.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
    #[serde(skip)]
    raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encryption {
    pub profile: String,
    pub content_key: ContentKeyInfo,
    pub user_key: UserKeyInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentKeyInfo {
    /// Base64 of `IV || AES-256-CBC(content key)` under the user key.
    pub encrypted_value: String,
    pub algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserKeyInfo {
    pub text_hint: String,
    pub algorithm: String,
    /// Base64 of the license id encrypted with the user key.
    pub key_check: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Names of the user fields that are encrypted with the content key.
    #[serde(rename = "encrypted", default, skip_serializing_if = "Vec::is_empty")]
    pub encrypted_fields: Vec<String>,
}

/// Usage rights. `None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub algorithm: String,
    pub certificate: String,
    pub value: String,
}

impl LicenseDocument {
    /// Parses and validates a License Document.
    ///
    /// # Errors
    /// - `MalformedJson` if the bytes are not JSON
    /// - `MissingField` for an absent required member
    /// - `InvalidLink` without a `hint` or `publication` link
    /// - `InvalidValue` for incoherent dates or bad types
    /// - `InvalidSignature` for a structurally broken signature block
    pub fn parse(bytes: &[u8]) -> ParsingResult<Self> {
        let mut document: Self = serde_json::from_slice(bytes)?;
        document.validate()?;
        document.raw = bytes.to_vec();
        Ok(document)
    }

    fn validate(&self) -> ParsingResult<()> {
        for required in [rel::HINT, rel::PUBLICATION] {
            if self.link(required).is_none() {
                return Err(ParsingError::InvalidLink(format!(
                    "license has no `{required}` link"
                )));
            }
        }

        if let Some(updated) = self.updated {
            if updated < self.issued {
                return Err(ParsingError::InvalidValue(format!(
                    "updated ({updated}) precedes issued ({})",
                    self.issued
                )));
            }
        }

        self.validate_signature()
    }

    fn validate_signature(&self) -> ParsingResult<()> {
        let signature = &self.signature;
        if !SIGNATURE_ALGORITHMS.contains(&signature.algorithm.as_str()) {
            return Err(ParsingError::InvalidSignature(format!(
                "unsupported algorithm {}",
                signature.algorithm
            )));
        }
        for (name, value) in [
            ("certificate", &signature.certificate),
            ("value", &signature.value),
        ] {
            if value.is_empty() || BASE64.decode(value.trim()).is_err() {
                return Err(ParsingError::InvalidSignature(format!(
                    "{name} is not valid base64"
                )));
            }
        }
        Ok(())
    }

    /// The exact bytes this document was parsed from.
    #[must_use]
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Re-serializes the model. Semantically equal to the source, but not
    /// byte-identical; use [`raw_bytes`](Self::raw_bytes) for persistence.
    pub fn to_json(&self) -> ParsingResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Last update, falling back to the issue date.
    #[must_use]
    pub fn updated(&self) -> DateTime<Utc> {
        self.updated.unwrap_or(self.issued)
    }

    /// First link with the given relation.
    #[must_use]
    pub fn link(&self, rel: &str) -> Option<&Link> {
        link::find(&self.links, rel, None)
    }

    /// First link with the given relation, preferring `media_type`.
    #[must_use]
    pub fn link_with_type(&self, rel: &str, media_type: &str) -> Option<&Link> {
        link::find(&self.links, rel, Some(media_type))
    }

    /// The Status Document link, if the provider runs a status server.
    #[must_use]
    pub fn status_link(&self) -> Option<&Link> {
        self.link_with_type(rel::STATUS, media_type::STATUS)
    }

    /// Link to the protected publication. Always present on a parsed document.
    #[must_use]
    pub fn publication_link(&self) -> Option<&Link> {
        self.link(rel::PUBLICATION)
    }

    /// Passphrase hint shown to the user.
    #[must_use]
    pub fn hint(&self) -> &str {
        &self.encryption.user_key.text_hint
    }

    #[must_use]
    pub fn profile(&self) -> &str {
        &self.encryption.profile
    }
}
