//! I define the authenticated http requestor surface of the mount.
//!
//! The hierarchy and the adapter only ever see the narrow
//! [`Requestor`] capability; the transport behind it is selected at
//! construction time.
//!

use std::collections::BTreeMap;

use bytes::Bytes;
use headers::HeaderMapExt;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    authn::Authenticator, error::HttpError, header::Link, tracing::trace_headers,
};

pub mod impl_;

/// `Session-Identifier` header name.
pub static SESSION_IDENTIFIER: HeaderName = HeaderName::from_static("session-identifier");

/// `User-Agent` value sent with every request.
pub const USER_AGENT: &str = "SolidFS/v0.0.1";

/// Headers common to every outbound request of a session.
pub fn common_headers(session_identifier: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(session_identifier) {
        headers.insert(SESSION_IDENTIFIER.clone(), value);
    }
    headers.insert(http::header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers
}

/// Compose the full header set of a request: common headers, then
/// bearer authorization, then trace propagation, then caller supplied
/// extras, which override the others on collision.
pub(crate) fn compose_headers(
    session_identifier: &str,
    authn: &Authenticator,
    extra_headers: HeaderMap,
) -> Result<HeaderMap, HttpError> {
    let mut headers = common_headers(session_identifier);
    if let Some(token) = authn.token()? {
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| HttpError::transport("token is not a valid header value"))?;
        headers.insert(http::header::AUTHORIZATION, bearer);
    }
    headers.extend(trace_headers(session_identifier));
    headers.extend(extra_headers);
    Ok(headers)
}

/// A response record.
#[derive(Debug, Clone)]
pub struct SolidResponse {
    /// Response status.
    pub status: StatusCode,

    /// Response headers, case-insensitive by construction.
    pub headers: HeaderMap,

    /// Response body.
    pub content: Bytes,
}

impl SolidResponse {
    /// Get the body as text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Deserialize the body as json.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.content)
    }

    /// Get a header value as a str, if present and textual.
    pub fn header_str(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get the parsed `Link` header targets, indexed by relation type.
    pub fn links(&self) -> BTreeMap<String, String> {
        self.headers
            .typed_get::<Link>()
            .map(|link| link.by_rel())
            .unwrap_or_default()
    }
}

/// Capability of executing an authenticated request against the Pod.
pub trait Requestor: Send + Sync {
    /// Execute a request. Responses with failed statuses are turned
    /// into typed errors before returning.
    fn request(
        &self,
        method: Method,
        url: &str,
        extra_headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<SolidResponse, HttpError>;
}
