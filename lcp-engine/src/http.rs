//! Transport to the License Status Server and publication hosts.
//!
//! The engine only talks to the network through [`HttpClient`], so callers can
//! swap the bundled reqwest transport for their own.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        })
    }
}

/// A single request. Bodies are raw bytes.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub body: Option<Vec<u8>>,
    pub headers: Vec<(String, String)>,
    /// Overrides the client's default timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// Transport failures, with the server's verdict where there was one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("server unreachable: {0}")]
    Unreachable(String),

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("request timed out")]
    Timeout,
}

impl NetworkError {
    /// HTTP status of a server-side rejection.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Forbidden(_) => Some(403),
            _ => None,
        }
    }
}

/// Fetches bytes over HTTP. Non-2xx responses are errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn fetch(&self, request: HttpRequest) -> Result<Vec<u8>, NetworkError>;
}

#[cfg(feature = "online")]
pub use online::ReqwestHttpClient;

#[cfg(feature = "online")]
mod online {
    use super::{HttpClient, HttpRequest, Method, NetworkError};
    use crate::config::LcpConfig;
    use async_trait::async_trait;
    use reqwest::Client;
    use tracing::debug;

    /// Longest server message kept in an error.
    const MAX_MESSAGE_LEN: usize = 512;

    /// [`HttpClient`] backed by reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestHttpClient {
        client: Client,
    }

    impl ReqwestHttpClient {
        pub fn new(config: &LcpConfig) -> Result<Self, NetworkError> {
            let client = Client::builder()
                .timeout(config.http_timeout())
                .user_agent(config.user_agent.clone())
                .build()
                .map_err(|e| NetworkError::Unreachable(format!("failed to create HTTP client: {e}")))?;
            Ok(Self { client })
        }

        pub fn with_client(client: Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl HttpClient for ReqwestHttpClient {
        async fn fetch(&self, request: HttpRequest) -> Result<Vec<u8>, NetworkError> {
            debug!(method = %request.method, url = %request.url, "http request");

            let mut builder = match request.method {
                Method::Get => self.client.get(&request.url),
                Method::Post => self.client.post(&request.url),
                Method::Put => self.client.put(&request.url),
            };
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(transport_error)?;
            let status = response.status();
            let body = response.bytes().await.map_err(transport_error)?;

            if status.is_success() {
                return Ok(body.to_vec());
            }

            let mut message = String::from_utf8_lossy(&body).into_owned();
            if message.len() > MAX_MESSAGE_LEN {
                let mut end = MAX_MESSAGE_LEN;
                while !message.is_char_boundary(end) {
                    end -= 1;
                }
                message.truncate(end);
            }
            debug!(url = %request.url, status = status.as_u16(), "http request rejected");

            if status == reqwest::StatusCode::FORBIDDEN {
                Err(NetworkError::Forbidden(message))
            } else {
                Err(NetworkError::Server {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    fn transport_error(err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::Timeout
        } else {
            NetworkError::Unreachable(err.to_string())
        }
    }
}
