//! I define the pooled async transport, with the optional
//! `Cache-Control` respecting response cache middleware.
//!

use std::sync::Arc;

use http::{HeaderMap, Method};
use http_cache_reqwest::{Cache, CacheMode, HttpCache, MokaManager};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use tracing::debug;

use crate::{
    authn::Authenticator,
    background::Background,
    error::HttpError,
    requestor::{compose_headers, Requestor, SolidResponse},
};

/// Transport over a long-lived async client, driven on the background
/// executor. Kernel-driven callers block on submission.
pub struct AsyncRequestor {
    session_identifier: String,
    authn: Arc<Authenticator>,
    background: Arc<Background>,
    client: ClientWithMiddleware,
}

impl AsyncRequestor {
    /// Create the transport for the session. `content_caching` wraps
    /// it with the response cache middleware.
    pub fn new(
        session_identifier: &str,
        authn: Arc<Authenticator>,
        background: Arc<Background>,
        content_caching: bool,
    ) -> Self {
        let mut builder = ClientBuilder::new(reqwest::Client::new());
        if content_caching {
            debug!("Using content caching");
            builder = builder.with(Cache(HttpCache {
                mode: CacheMode::Default,
                manager: MokaManager::default(),
                options: Default::default(),
            }));
        }

        Self {
            session_identifier: session_identifier.to_owned(),
            authn,
            background,
            client: builder.build(),
        }
    }
}

impl Requestor for AsyncRequestor {
    #[tracing::instrument(skip_all, fields(method = %method, url))]
    fn request(
        &self,
        method: Method,
        url: &str,
        extra_headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<SolidResponse, HttpError> {
        // Token acquisition stays on the calling thread; only the
        // request itself is submitted to the executor.
        let headers = compose_headers(&self.session_identifier, &self.authn, extra_headers)?;

        debug!("Sending request");
        self.background.block_on(async {
            let mut builder = self.client.request(method, url).headers(headers);
            if let Some(body) = body {
                builder = builder.body(body);
            }
            let response = builder
                .send()
                .await
                .map_err(|e| HttpError::transport(e.to_string()))?;

            let status = response.status();
            let headers = response.headers().clone();
            let content = response
                .bytes()
                .await
                .map_err(|e| HttpError::transport(e.to_string()))?;
            debug!(status = status.as_u16(), "Response");

            let response = SolidResponse {
                status,
                headers,
                content,
            };
            HttpError::check(status.as_u16(), || response.text())?;
            Ok(response)
        })
    }
}
