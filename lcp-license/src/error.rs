//! Error types for document parsing.

use thiserror::Error;

/// Result type for parsing operations.
pub type ParsingResult<T> = Result<T, ParsingError>;

/// Why a License or Status Document was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    /// Bytes are not valid JSON.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// A required field is absent.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A required link relation is absent or unusable.
    #[error("invalid link: {0}")]
    InvalidLink(String),

    /// A field is present but its value is not acceptable.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The signature block is structurally invalid.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

impl From<serde_json::Error> for ParsingError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Syntax | Category::Eof | Category::Io => {
                Self::MalformedJson(err.to_string())
            }
            Category::Data => {
                let message = err.to_string();
                match missing_field_name(&message) {
                    Some(field) => Self::MissingField(field),
                    None => Self::InvalidValue(message),
                }
            }
        }
    }
}

/// Extracts `x` from serde's "missing field `x` at line .. column .." message.
fn missing_field_name(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}
