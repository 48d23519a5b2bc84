//! I define client-credentials authentication against a Solid-OIDC
//! token endpoint, with expiry-based caching of the access token.
//!

use std::{
    sync::Mutex,
    time::{Duration, SystemTime},
};

use serde::Deserialize;
use tracing::debug;

use crate::{
    config::ClientCredentials,
    error::HttpError,
    requestor::common_headers,
    tracing::trace_headers,
};

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: SystemTime,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    token_type: Option<String>,
    scope: Option<String>,
}

/// The authenticator.
///
/// Without configured credentials every [`Self::token`] call yields
/// `None` and the mount operates unauthenticated.
#[derive(Debug)]
pub struct Authenticator {
    credentials: Option<ClientCredentials>,
    session_identifier: String,
    client: reqwest::blocking::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl Authenticator {
    /// Create an authenticator for the session.
    pub fn new(credentials: Option<ClientCredentials>, session_identifier: &str) -> Self {
        Self {
            credentials,
            session_identifier: session_identifier.to_owned(),
            client: reqwest::blocking::Client::new(),
            cached: Mutex::new(None),
        }
    }

    /// Get a bearer token, refreshing the cached one when it has
    /// expired. `None` when no credentials are configured.
    ///
    /// No jitter, no pre-emptive refresh, no retry.
    pub fn token(&self) -> Result<Option<String>, HttpError> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };

        let mut cached = self.cached.lock().expect("token lock poisoned");
        if let Some(token) = cached.as_ref() {
            if SystemTime::now() < token.expires_at {
                return Ok(Some(token.value.clone()));
            }
        }

        let time_before_request = SystemTime::now();
        let mut headers = common_headers(&self.session_identifier);
        headers.extend(trace_headers(&self.session_identifier));

        debug!(
            client_id = %credentials.client_id,
            token_url = %credentials.token_url,
            "Requesting access token"
        );
        let response = self
            .client
            .post(&credentials.token_url)
            .headers(headers)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .map_err(|e| HttpError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().unwrap_or_default();
            return Err(HttpError::for_status(status, message));
        }

        let result: TokenResponse = response
            .json()
            .map_err(|e| HttpError::transport(format!("invalid token response: {e}")))?;

        let expires_at = time_before_request + Duration::from_secs(result.expires_in);
        debug!(
            token_type = result.token_type.as_deref(),
            scope = result.scope.as_deref(),
            "Generated access token"
        );
        *cached = Some(CachedToken {
            value: result.access_token.clone(),
            expires_at,
        });

        Ok(Some(result.access_token))
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_none, assert_ok};

    use super::*;

    #[test]
    fn without_credentials_no_token_is_produced() {
        let authn = Authenticator::new(None, "session");
        assert_none!(assert_ok!(authn.token()));
    }
}
