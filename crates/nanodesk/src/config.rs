//! Client configuration.

use nanodesk_core::{Error, Result};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Default bound for a single remote call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound for sandbox creation, from request until Ready.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for a [`DesktopClient`](crate::DesktopClient).
///
/// Nothing is read from the environment; callers load credentials however
/// they like and pass them in.
///
/// ```rust
/// use nanodesk::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("desktops.example.com:49983")
///     .with_api_key("nd_live_1234")
///     .with_request_timeout(Duration::from_secs(5));
/// assert_eq!(config.stream_base_url, "https://desktops.example.com/stream");
/// ```
#[derive(Debug)]
pub struct ClientConfig {
    /// `host:port` of the sandbox backend.
    pub endpoint: String,
    /// API key sent when the connection is opened.
    pub api_key: Option<SecretString>,
    /// Base of stream URLs; the sandbox id is appended as a path segment.
    pub stream_base_url: String,
    pub request_timeout: Duration,
    /// Default creation deadline, overridable per sandbox.
    pub ready_timeout: Duration,
}

impl ClientConfig {
    /// Creates a config for the given endpoint with default timeouts.
    ///
    /// The stream base defaults to `https://<endpoint host>/stream`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let stream_base_url = format!("https://{}/stream", host_of(&endpoint));
        Self {
            endpoint,
            api_key: None,
            stream_base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    pub fn with_stream_base_url(mut self, url: impl Into<String>) -> Self {
        self.stream_base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Checks the config and returns the parsed stream base URL.
    pub(crate) fn validate(&self) -> Result<Url> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::InvalidConfig("endpoint must not be empty".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "request timeout must be greater than zero".into(),
            ));
        }
        if self.ready_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "ready timeout must be greater than zero".into(),
            ));
        }

        let url = Url::parse(&self.stream_base_url).map_err(|e| {
            Error::InvalidConfig(format!(
                "invalid stream base URL '{}': {}",
                self.stream_base_url, e
            ))
        })?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "stream base URL '{}' cannot have path segments",
                self.stream_base_url
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(Error::InvalidConfig(format!(
                "stream base URL '{}' must not carry a query or fragment",
                self.stream_base_url
            )));
        }
        Ok(url)
    }
}

fn host_of(endpoint: &str) -> &str {
    match endpoint.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => endpoint,
    }
}
