//! Building, sending and decoding requests.

use std::collections::BTreeMap;

use reqwest::{
    Method, Url,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue},
};
use serde::de::DeserializeOwned;

use crate::{
    prelude::*,
    transport::{HttpRequest, HttpResponse},
};

use super::Client;

/// Query parameters. A [`BTreeMap`] keeps the query string stable.
pub type QueryParams = BTreeMap<String, String>;

impl Client {
    /// Run `future` unless our cancellation token fires first.
    pub(crate) async fn cancellable<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future,
    {
        match &self.cancel {
            Some(cancel) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(Error::Cancelled),
                    output = future => Ok(output),
                }
            }
            None => Ok(future.await),
        }
    }

    /// Hand a request to the transport.
    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.to_string();
        self.cancellable(self.transport.send(request))
            .await?
            .map_err(|source| Error::Transport { url, source })
    }

    /// Send a request with our bearer token, and return the raw status and
    /// body. Does _not_ check the status code.
    #[instrument(level = "debug", skip_all, fields(%method, %url))]
    pub(crate) async fn execute(
        &self,
        method: Method,
        mut url: Url,
        body: Option<Vec<u8>>,
        query: &QueryParams,
    ) -> Result<HttpResponse> {
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut request = HttpRequest::new(method, url);
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| Error::Mount("token is not a valid header value".to_owned()))?;
        request.headers.insert(AUTHORIZATION, bearer);
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        if body.is_some() {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        request.body = body;

        let response = self.send(request).await?;
        debug!(status = %response.status, bytes = response.body.len(), "Response");
        Ok(response)
    }

    /// GET a JSON resource, refreshing our token first if needed.
    pub(crate) async fn get_json<T>(&mut self, url: Url, query: &QueryParams) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.ensure_fresh().await?;
        let response = self.execute(Method::GET, url.clone(), None, query).await?;
        decode(&url, response)
    }

    /// POST a JSON body and decode a JSON response, refreshing our token first
    /// if needed.
    pub(crate) async fn post_json<B, T>(
        &mut self,
        url: Url,
        body: &B,
        query: &QueryParams,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.ensure_fresh().await?;
        let body = encode(body)?;
        let response = self
            .execute(Method::POST, url.clone(), Some(body), query)
            .await?;
        decode(&url, response)
    }
}

/// Serialize a request body.
pub(crate) fn encode<B>(body: &B) -> Result<Vec<u8>>
where
    B: Serialize + ?Sized,
{
    serde_json::to_vec(body)
        .map_err(|err| Error::Mount(format!("cannot serialize request body: {err}")))
}

/// Fail on non-2xx responses.
pub(crate) fn ensure_success(url: &Url, response: HttpResponse) -> Result<HttpResponse> {
    if response.status.is_success() {
        Ok(response)
    } else {
        Err(Error::Status {
            url: url.to_string(),
            status: response.status,
            body: response.body_text(),
        })
    }
}

/// Check the status, then parse the body as JSON.
pub(crate) fn decode<T>(url: &Url, response: HttpResponse) -> Result<T>
where
    T: DeserializeOwned,
{
    let response = ensure_success(url, response)?;
    serde_json::from_slice(&response.body).map_err(|source| Error::Parse {
        url: url.to_string(),
        source,
    })
}
