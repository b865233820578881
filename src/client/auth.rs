//! Authentication and automatic token refresh.

use std::{ops::RangeInclusive, time::Duration};

use reqwest::Method;
use tokio::time::Instant;

use crate::prelude::*;

use super::{
    Client, Credentials,
    request::{QueryParams, decode, encode},
};

/// Token lifetimes accepted by the authentication API, in minutes.
pub const EXPIRATION_RANGE: RangeInclusive<u32> = 1..=1440;

/// Body of `POST /token`.
#[derive(Serialize)]
struct TokenRequest<'a> {
    #[serde(rename = "ClientID")]
    client_id: &'a str,
    #[serde(rename = "ClientSecret")]
    client_secret: &'a str,
    #[serde(rename = "ExpiresIn")]
    expires_in: u32,
}

/// Response of `POST /token`.
#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Reject token lifetimes the server would refuse anyway.
fn check_expiration(expires_minutes: u32) -> Result<()> {
    if EXPIRATION_RANGE.contains(&expires_minutes) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "token lifetime must be between {} and {} minutes, got {expires_minutes}",
            EXPIRATION_RANGE.start(),
            EXPIRATION_RANGE.end(),
        )))
    }
}

impl Client {
    /// Get a new token and use it for all further requests.
    ///
    /// `expires_minutes` must be between 1 and 1440.
    #[instrument(level = "debug", skip(self, client_secret))]
    pub async fn authenticate(
        &mut self,
        client_id: &str,
        client_secret: &str,
        expires_minutes: u32,
    ) -> Result<()> {
        check_expiration(expires_minutes)?;
        let url = self.auth_url(&["token"])?;
        let body = encode(&TokenRequest {
            client_id,
            client_secret,
            expires_in: expires_minutes,
        })?;

        let response = self
            .execute(Method::POST, url.clone(), Some(body), &QueryParams::new())
            .await
            .and_then(|response| decode::<TokenResponse>(&url, response));
        let response = match response {
            Ok(response) => response,
            // These never reached the server, so they aren't a rejection.
            Err(err @ (Error::Mount(_) | Error::Cancelled)) => return Err(err),
            Err(err) => return Err(Error::Auth(Box::new(err))),
        };

        self.token = response.token;
        self.expires_at =
            Some(Instant::now() + Duration::from_secs(u64::from(expires_minutes) * 60));
        info!(expires_minutes, "Authenticated with UltraOCR");
        Ok(())
    }

    /// Remember credentials, and authenticate automatically whenever the
    /// token is missing or expired.
    ///
    /// This does not authenticate immediately. The next API call will.
    pub fn enable_auto_refresh(
        &mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        expires_minutes: u32,
    ) -> Result<()> {
        check_expiration(expires_minutes)?;
        self.credentials = Some(Credentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            expires_minutes,
        });
        self.expires_at = None;
        Ok(())
    }

    /// Use a token obtained elsewhere. Auto-refresh, if enabled, will replace
    /// it on the next call.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    /// Do we have a token which has not yet expired?
    pub fn has_fresh_token(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() <= expires_at)
    }

    /// Called before every authenticated request. If auto-refresh is on and
    /// the token has expired, authenticate first.
    pub(crate) async fn ensure_fresh(&mut self) -> Result<()> {
        if self.has_fresh_token() {
            return Ok(());
        }
        let Some(credentials) = self.credentials.clone() else {
            return Ok(());
        };
        debug!("Token missing or expired, refreshing");
        self.authenticate(
            &credentials.client_id,
            &credentials.client_secret,
            credentials.expires_minutes,
        )
        .await
    }
}
