//! I define the blocking transport.
//!

use std::sync::Arc;

use http::{HeaderMap, Method};
use tracing::debug;

use crate::{
    authn::Authenticator,
    error::HttpError,
    requestor::{compose_headers, Requestor, SolidResponse},
};

/// Transport over a long-lived blocking client. One client per
/// session, so the connection pool is reused across operations.
#[derive(Debug)]
pub struct BlockingRequestor {
    session_identifier: String,
    authn: Arc<Authenticator>,
    client: reqwest::blocking::Client,
}

impl BlockingRequestor {
    /// Create the transport for the session.
    pub fn new(session_identifier: &str, authn: Arc<Authenticator>) -> Self {
        Self {
            session_identifier: session_identifier.to_owned(),
            authn,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Requestor for BlockingRequestor {
    #[tracing::instrument(skip_all, fields(method = %method, url))]
    fn request(
        &self,
        method: Method,
        url: &str,
        extra_headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<SolidResponse, HttpError> {
        let headers = compose_headers(&self.session_identifier, &self.authn, extra_headers)?;

        debug!("Sending request");
        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let response = builder
            .send()
            .map_err(|e| HttpError::transport(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let content = response
            .bytes()
            .map_err(|e| HttpError::transport(e.to_string()))?;
        debug!(status = status.as_u16(), "Response");

        let response = SolidResponse {
            status,
            headers,
            content,
        };
        HttpError::check(status.as_u16(), || response.text())?;
        Ok(response)
    }
}
