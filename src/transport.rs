//! The HTTP transport used by [`crate::Client`].
//!
//! The client never talks to `reqwest` directly. Instead, it builds an
//! [`HttpRequest`] and hands it to a [`Transport`], which sends it and returns
//! the status and the full body. This keeps the orchestration code testable
//! without a network, and lets callers plug in their own HTTP stack.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url, header::HeaderMap};

use crate::prelude::*;

/// Default timeout for a single HTTP request, including large uploads.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// One outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: Method,
    /// The full URL, including any query string.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// The request body, if any.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Create a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// One HTTP response, with the body already read into memory.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The response status.
    pub status: StatusCode,
    /// The full response body. Empty if the body could not be read.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// The body as text, for error messages.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Send one HTTP request and get back one HTTP response.
///
/// Implementations should return `Err` only when no response was received at
/// all. Non-2xx responses are normal return values.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync + 'static {
    /// Send `request` and wait for the response.
    async fn send(&self, request: HttpRequest) -> anyhow::Result<HttpResponse>;
}

/// A [`Transport`] built on [`reqwest`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a new transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing [`reqwest::Client`].
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(level = "trace", skip_all, fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        let status = response.status();

        // On a failed body read, keep the status and return an empty body.
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => {
                warn!(%status, "Failed to read response body: {err}");
                Vec::new()
            }
        };
        Ok(HttpResponse { status, body })
    }
}

/// A scripted in-memory transport for unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use anyhow::anyhow;

    use super::*;

    /// Replays canned responses in order, and records every request.
    #[derive(Debug, Default)]
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<anyhow::Result<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Queue a JSON response.
        pub fn push_json(&self, status: u16, body: Value) -> &Self {
            self.push_raw(status, body.to_string().into_bytes())
        }

        /// Queue a response with an empty body.
        pub fn push_status(&self, status: u16) -> &Self {
            self.push_raw(status, Vec::new())
        }

        /// Queue a response with an arbitrary body.
        pub fn push_raw(&self, status: u16, body: Vec<u8>) -> &Self {
            let status = StatusCode::from_u16(status).expect("valid status code");
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(HttpResponse { status, body }));
            self
        }

        /// Queue a transport failure.
        pub fn push_failure(&self, message: &'static str) -> &Self {
            self.responses.lock().unwrap().push_back(Err(anyhow!(message)));
            self
        }

        /// Every request sent so far.
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        /// The paths of every request sent so far.
        pub fn paths(&self) -> Vec<String> {
            self.requests()
                .iter()
                .map(|r| r.url.path().to_owned())
                .collect()
        }

        /// How many scripted responses are left?
        pub fn remaining(&self) -> usize {
            self.responses.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
            let url = request.url.to_string();
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("no scripted response for {url}")))
        }
    }
}
