//! I define settings of a solidfs mount, resolved from `SOLIDFS_*`
//! environment variables.
//!

use config::{Config, Environment};
use pod_uri::{InvalidPodUri, PodUri};
use serde::Deserialize;

/// Default mount path, used when neither a mount point argument nor a
/// `root` mount option is given.
pub const DEFAULT_MOUNT_ROOT: &str = "/data/";

/// Settings of a solidfs mount.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root url of the Pod. A trailing `/` is appended if missing.
    pub base_url: String,

    /// Client id for client-credentials authentication. Unset means
    /// the mount operates unauthenticated.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret, required once `client_id` is set.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Token endpoint url, required once `client_id` is set.
    #[serde(default)]
    pub token_url: Option<String>,

    /// Http transport selection. `async` (or the legacy `httpx` value)
    /// selects the pooled async client; anything else selects the
    /// blocking client.
    #[serde(default)]
    pub http_library: Option<String>,

    /// `1` enables the `Cache-Control` respecting response cache.
    /// Implies the async transport, which hosts the cache middleware.
    #[serde(default)]
    pub content_caching: Option<String>,

    /// `1` opts in to websocket change-notification subscriptions.
    #[serde(default)]
    pub enable_websocket_notifications: Option<String>,
}

/// Client-credentials of the mount.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// Client id.
    pub client_id: String,

    /// Client secret.
    pub client_secret: String,

    /// Token endpoint url.
    pub token_url: String,
}

/// Error of invalid settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A credential variable is missing while `SOLIDFS_CLIENT_ID` is set.
    #[error("'SOLIDFS_CLIENT_ID' is set, please also provide '{0}'")]
    MissingCredentialPart(&'static str),

    /// The base url is not a valid http(s) url.
    #[error("'SOLIDFS_BASE_URL' is not a valid pod url: {0}")]
    InvalidBaseUrl(#[from] InvalidPodUri),
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("SOLIDFS"))
            .build()?
            .try_deserialize()
    }

    /// Get the root uri of the hierarchy, with its trailing slash
    /// enforced.
    pub fn root_uri(&self) -> Result<PodUri, SettingsError> {
        let mut base_url = self.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(PodUri::from_wire(&base_url)?)
    }

    /// Get credentials, or `None` when the mount operates
    /// unauthenticated.
    pub fn credentials(&self) -> Result<Option<ClientCredentials>, SettingsError> {
        let client_id = match self.client_id.as_deref() {
            None | Some("") => return Ok(None),
            Some(id) => id.to_owned(),
        };
        let client_secret = self
            .client_secret
            .clone()
            .ok_or(SettingsError::MissingCredentialPart("SOLIDFS_CLIENT_SECRET"))?;
        let token_url = self
            .token_url
            .clone()
            .ok_or(SettingsError::MissingCredentialPart("SOLIDFS_TOKEN_URL"))?;
        Ok(Some(ClientCredentials {
            client_id,
            client_secret,
            token_url,
        }))
    }

    /// Check whether the response cache is enabled.
    #[inline]
    pub fn content_caching_enabled(&self) -> bool {
        flag_enabled(&self.content_caching)
    }

    /// Check whether change-notification subscriptions are enabled.
    #[inline]
    pub fn websocket_notifications_enabled(&self) -> bool {
        flag_enabled(&self.enable_websocket_notifications)
    }

    /// Check whether the async http transport is selected.
    pub fn async_http(&self) -> bool {
        matches!(self.http_library.as_deref(), Some("async") | Some("httpx"))
            || self.content_caching_enabled()
    }
}

fn flag_enabled(value: &Option<String>) -> bool {
    value.as_deref() == Some("1")
}
