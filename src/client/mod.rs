//! The UltraOCR client.
//!
//! A [`Client`] owns its session: the bearer token, its expiry, and the
//! optional credentials used to refresh it. Any call which might refresh the
//! token takes `&mut self`, so a client can only be used by one caller at a
//! time. If you need to share one between tasks, wrap it in a
//! [`tokio::sync::Mutex`] yourself.
//!
//! The operations live in submodules:
//!
//! - [`auth`]: authentication and automatic token refresh.
//! - [`api`]: one-request resource calls.
//! - [`upload`]: presigned-URL uploads and job/batch submission.
//! - [`wait`]: polling until a job or batch finishes.

use std::{fmt, sync::Arc, time::Duration};

use reqwest::Url;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    prelude::*,
    transport::{ReqwestTransport, Transport, UPLOAD_TIMEOUT},
};

pub mod api;
pub mod auth;
mod request;
pub mod upload;
pub mod wait;

pub use request::QueryParams;

/// The production API.
pub const BASE_URL: &str = "https://ultraocr.apis.nuveo.ai/v2";

/// The production authentication API.
pub const AUTH_BASE_URL: &str = "https://auth.apis.nuveo.ai/v2";

/// Default time to wait for a job or batch to finish.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pause between two status checks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Default token lifetime, in minutes.
pub const DEFAULT_EXPIRATION_MINUTES: u32 = 60;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL for the OCR API.
    pub base_url: String,

    /// Base URL for the authentication API.
    pub auth_base_url: String,

    /// How long to poll before giving up on a job or batch.
    pub timeout: Duration,

    /// How long to sleep between status checks.
    pub interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_owned(),
            auth_base_url: AUTH_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Credentials kept around for automatic token refresh.
#[derive(Clone)]
struct Credentials {
    client_id: String,
    client_secret: String,
    expires_minutes: u32,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("expires_minutes", &self.expires_minutes)
            .finish()
    }
}

/// A client for the UltraOCR API.
///
/// Not safe for unsynchronized concurrent use. The `&mut self` receivers
/// enforce this at compile time.
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,

    /// The current bearer token. Empty until we authenticate.
    token: String,

    /// Set by [`Client::enable_auto_refresh`].
    credentials: Option<Credentials>,

    /// When the current token expires. `None` means we have no usable token.
    expires_at: Option<Instant>,

    /// Checked before every request and during every poll sleep.
    cancel: Option<CancellationToken>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .field("has_token", &!self.token.is_empty())
            .field("credentials", &self.credentials)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Client {
    /// Create a client with the default configuration and a
    /// [`ReqwestTransport`].
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with a custom configuration and a
    /// [`ReqwestTransport`].
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(UPLOAD_TIMEOUT)
            .map_err(|err| Error::Config(format!("cannot build HTTP client: {err}")))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client which sends requests through `transport`.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            token: String::new(),
            credentials: None,
            expires_at: None,
            cancel: None,
        }
    }

    /// Stop all further requests and polling once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Our current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Change the OCR API base URL.
    pub fn set_base_url(&mut self, url: impl Into<String>) {
        self.config.base_url = url.into();
    }

    /// Change the authentication API base URL.
    pub fn set_auth_base_url(&mut self, url: impl Into<String>) {
        self.config.auth_base_url = url.into();
    }

    /// Change how long we poll before timing out.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    /// Change how long we sleep between status checks.
    pub fn set_interval(&mut self, interval: Duration) {
        self.config.interval = interval;
    }

    /// Replace the transport.
    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = transport;
    }

    /// Build a URL under the OCR API base URL. Each segment is escaped.
    fn api_url(&self, segments: &[&str]) -> Result<Url> {
        join_url(&self.config.base_url, segments)
    }

    /// Build a URL under the authentication base URL.
    fn auth_url(&self, segments: &[&str]) -> Result<Url> {
        join_url(&self.config.auth_base_url, segments)
    }
}

/// Append path segments to `base`.
fn join_url(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|err| Error::Mount(format!("invalid base URL {base:?}: {err}")))?;
    url.path_segments_mut()
        .map_err(|_| Error::Mount(format!("base URL {base:?} cannot have a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
