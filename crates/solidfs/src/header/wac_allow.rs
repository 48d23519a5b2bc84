//! I define `WAC-Allow` typed header and related types, as defined in
//! the [WAC specification](https://solid.github.io/web-access-control-spec/#wac-allow).
//!
//! ```txt
//! wac-allow        = #access-param
//! access-param     = permission-group OWS "=" OWS access-modes
//! permission-group = 1*ALPHA
//! access-modes     = DQUOTE OWS *1(access-mode *(RWS access-mode)) OWS DQUOTE
//! access-mode      = "read" / "write" / "append" / "control"
//! ```
//!

use std::str::FromStr;

use headers::Header;
use http::{HeaderName, HeaderValue};

/// `Wac-Allow` header name.
pub static WAC_ALLOW: HeaderName = HeaderName::from_static("wac-allow");

/// A struct for representing `access-mode` abnf production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// `read`.
    Read,

    /// `write`.
    Write,

    /// `append`.
    Append,

    /// `control`.
    Control,
}

impl AsRef<str> for AccessMode {
    fn as_ref(&self) -> &str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Append => "append",
            Self::Control => "control",
        }
    }
}

impl FromStr for AccessMode {
    type Err = InvalidEncodedAccessParam;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "append" => Ok(Self::Append),
            "control" => Ok(Self::Control),
            _ => Err(InvalidEncodedAccessParam),
        }
    }
}

/// A struct for representing `access-param` abnf production.
#[derive(Debug, Clone)]
pub struct AccessParam {
    /// Permission group.
    pub permission_group: String,

    /// Access modes.
    pub access_modes: Vec<AccessMode>,
}

impl AccessParam {
    /// Decode access-param from encoded value.
    pub fn decode(value: &str) -> Result<Self, InvalidEncodedAccessParam> {
        let (group, modes) = value.split_once('=').ok_or(InvalidEncodedAccessParam)?;

        let group = group.trim();
        if group.is_empty() || !group.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(InvalidEncodedAccessParam);
        }

        let modes = modes.trim();
        if !(modes.len() >= 2 && modes.starts_with('"') && modes.ends_with('"')) {
            return Err(InvalidEncodedAccessParam);
        }

        let access_modes = modes[1..modes.len() - 1]
            .split_ascii_whitespace()
            .map(AccessMode::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            permission_group: group.to_owned(),
            access_modes,
        })
    }

    pub(crate) fn push_encoded_str(&self, buffer: &mut String) {
        buffer.push_str(&self.permission_group);
        buffer.push_str("=\"");
        let mut modes = self.access_modes.iter();
        if let Some(first) = modes.next() {
            buffer.push_str(first.as_ref());
        }
        for mode in modes {
            buffer.push(' ');
            buffer.push_str(mode.as_ref());
        }
        buffer.push('"');
    }
}

/// Invalid encoded access param.
#[derive(Debug, thiserror::Error)]
#[error("Invalid encoded access param.")]
pub struct InvalidEncodedAccessParam;

/// Typed header for `Wac-Allow`.
#[derive(Debug, Clone, Default)]
pub struct WacAllow {
    /// List of access params.
    pub access_params: Vec<AccessParam>,
}

impl WacAllow {
    /// Get the access modes granted to given permission group.
    pub fn modes_for(&self, group: &str) -> Vec<AccessMode> {
        self.access_params
            .iter()
            .filter(|p| p.permission_group == group)
            .flat_map(|p| p.access_modes.iter().copied())
            .collect()
    }
}

impl Header for WacAllow {
    #[inline]
    fn name() -> &'static HeaderName {
        &WAC_ALLOW
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let access_params = values
            .flat_map(|value| {
                value
                    .to_str()
                    .unwrap_or_default()
                    .split(',')
                    .filter(|part| !part.trim().is_empty())
                    .map(AccessParam::decode)
                    .collect::<Vec<_>>()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| headers::Error::invalid())?;
        Ok(Self { access_params })
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        let mut buf = String::new();
        let mut params = self.access_params.iter();
        if let Some(first) = params.next() {
            first.push_encoded_str(&mut buf);
        }
        for param in params {
            buf.push(',');
            param.push_encoded_str(&mut buf);
        }

        if let Ok(value) = HeaderValue::from_str(&buf) {
            values.extend(std::iter::once(value));
        }
    }
}
