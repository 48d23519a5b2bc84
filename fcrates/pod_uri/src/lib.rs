//! This crate provides [`PodUri`], a type for representing Solid Pod
//! resource uris, along with codecs between the decoded in-memory
//! canonical form and the percent-encoded form used on the wire.
//!
//! Only the path component takes part in encoding/decoding. Scheme,
//! authority, query and fragment are preserved verbatim in both
//! directions.
//!

#![warn(missing_docs)]
#![deny(unused_qualifications)]

use std::{
    cmp::Ordering,
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
    str::FromStr,
    sync::Arc,
};

use iri_string::types::UriStr;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use unicase::Ascii;

/// Http scheme.
pub const HTTP_SCHEME: Ascii<&'static str> = Ascii::new("http");

/// Https scheme.
pub const HTTPS_SCHEME: Ascii<&'static str> = Ascii::new("https");

/// Ascii-set that must be pct-encoded in wire path components.
///
/// Everything except unreserved chars (`ALPHA / DIGIT / "-" / "." / "_" /
/// "~"`) and the segment delimiter `/` is encoded.
pub const WIRE_PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// A O(1) clonable struct for representing the uri of a Solid Pod
/// resource.
///
/// The wire form is held as a validated [`UriStr`] with a canonically
/// percent-encoded path; the decoded form derived from it is the
/// resource's identity. Uris of containers end with `/`, those of
/// non-containers don't.
#[derive(Clone)]
pub struct PodUri {
    wire: Arc<UriStr>,
    decoded: Arc<str>,
}

impl Debug for PodUri {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PodUri({})", self.decoded)
    }
}

impl Display for PodUri {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.decoded, f)
    }
}

impl PartialEq for PodUri {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.decoded == other.decoded
    }
}

impl Eq for PodUri {}

impl Hash for PodUri {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.decoded.hash(state);
    }
}

impl PartialOrd for PodUri {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PodUri {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.decoded.cmp(&other.decoded)
    }
}

/// Error of invalid pod uri.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InvalidPodUri {
    /// Invalid uri.
    #[error("Given source is not a valid uri")]
    InvalidUri,

    /// Empty host in uri.
    #[error("Given source uri has empty host")]
    EmptyHost,

    /// Non http scheme in uri.
    #[error("Given source uri has non http scheme")]
    NonHttpScheme,
}

impl TryFrom<&UriStr> for PodUri {
    type Error = InvalidPodUri;

    fn try_from(wire: &UriStr) -> Result<Self, Self::Error> {
        // Ensure scheme is http/https.
        let scheme = Ascii::new(wire.scheme_str());
        if scheme != HTTP_SCHEME && scheme != HTTPS_SCHEME {
            return Err(InvalidPodUri::NonHttpScheme);
        }

        // Ensure host is non-empty.
        let is_empty_host = wire
            .authority_components()
            .map(|a| a.host().is_empty())
            .unwrap_or(true);
        if is_empty_host {
            return Err(InvalidPodUri::EmptyHost);
        }

        // pct decode bytes first, and then decode utf8 str
        let decoded_path = percent_decode_str(wire.path_str()).decode_utf8_lossy();
        Self::from_parts(
            wire.scheme_str(),
            wire.authority_str().ok_or(InvalidPodUri::EmptyHost)?,
            &decoded_path,
            wire.query_str(),
            wire.fragment().map(|f| f.as_str()),
        )
    }
}

impl TryFrom<&str> for PodUri {
    type Error = InvalidPodUri;

    #[inline]
    fn try_from(uri_str: &str) -> Result<Self, Self::Error> {
        let wire: &UriStr = uri_str.try_into().map_err(|_| InvalidPodUri::InvalidUri)?;
        wire.try_into()
    }
}

impl TryFrom<String> for PodUri {
    type Error = InvalidPodUri;

    #[inline]
    fn try_from(uri: String) -> Result<Self, Self::Error> {
        uri.as_str().try_into()
    }
}

impl FromStr for PodUri {
    type Err = InvalidPodUri;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.try_into()
    }
}

impl AsRef<str> for PodUri {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.decoded
    }
}

impl PodUri {
    /// Decode from wire form. Only the path component is pct-decoded,
    /// and it is re-encoded canonically for [`Self::to_wire`].
    #[inline]
    pub fn from_wire(quoted: &str) -> Result<Self, InvalidPodUri> {
        quoted.try_into()
    }

    /// Get the wire form, with the path component pct-encoded and
    /// scheme, authority, query and fragment intact.
    #[inline]
    pub fn to_wire(&self) -> String {
        self.wire.as_str().to_owned()
    }

    /// Get the decoded uri as a str slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.decoded
    }

    /// Get the authority str of this pod uri.
    #[inline]
    pub fn authority_str(&self) -> &str {
        self.wire.authority_str().expect("Checked at construction")
    }

    /// Check if this uri identifies a container, by the trailing-slash
    /// convention of the Solid protocol.
    #[inline]
    pub fn is_container(&self) -> bool {
        self.decoded.ends_with('/')
    }

    /// Get the uri of a child with given decoded name.
    ///
    /// The name extends the path component verbatim. Container
    /// children must carry their trailing `/` in `name`.
    pub fn child(&self, name: &str) -> Self {
        let mut decoded_path = self.decoded_path().into_owned();
        decoded_path.push_str(name);
        Self::from_parts(
            self.wire.scheme_str(),
            self.authority_str(),
            &decoded_path,
            self.wire.query_str(),
            self.wire.fragment().map(|f| f.as_str()),
        )
        .expect("appending a path segment keeps the uri valid")
    }

    /// Get the uri of the container containing this resource, `None`
    /// for a hierarchy root. Query and fragment don't carry over.
    pub fn parent(&self) -> Option<Self> {
        let path = self.wire.path_str();
        let trimmed = path.strip_suffix('/').unwrap_or(path);
        let cut = trimmed.rfind('/')?;
        let decoded_path = percent_decode_str(&path[..cut + 1]).decode_utf8_lossy();
        Self::from_parts(
            self.wire.scheme_str(),
            self.authority_str(),
            &decoded_path,
            None,
            None,
        )
        .ok()
    }

    /// Get this uri's string with `base`'s string prefix removed.
    ///
    /// Returns `None` if `base` is not a prefix of this uri.
    #[inline]
    pub fn relative_to<'a>(&'a self, base: &Self) -> Option<&'a str> {
        self.decoded.strip_prefix(base.as_str())
    }

    fn decoded_path(&self) -> std::borrow::Cow<'_, str> {
        percent_decode_str(self.wire.path_str()).decode_utf8_lossy()
    }

    /// Build both forms from components. The path arrives decoded and
    /// is pct-encoded for the wire side.
    fn from_parts(
        scheme: &str,
        authority: &str,
        decoded_path: &str,
        query: Option<&str>,
        fragment: Option<&str>,
    ) -> Result<Self, InvalidPodUri> {
        let suffix_len = query.map_or(0, |q| q.len() + 1) + fragment.map_or(0, |f| f.len() + 1);
        let head_len = scheme.len() + 3 + authority.len();

        let mut decoded = String::with_capacity(head_len + decoded_path.len() + suffix_len);
        decoded.push_str(scheme);
        decoded.push_str("://");
        decoded.push_str(authority);
        decoded.push_str(decoded_path);

        let mut wire = String::with_capacity(decoded.capacity());
        wire.push_str(&decoded[..head_len]);
        wire.push_str(&utf8_percent_encode(decoded_path, WIRE_PATH_ENCODE_SET).to_string());

        for (delimiter, part) in [('?', query), ('#', fragment)] {
            if let Some(part) = part {
                decoded.push(delimiter);
                decoded.push_str(part);
                wire.push(delimiter);
                wire.push_str(part);
            }
        }

        let wire: &UriStr = wire
            .as_str()
            .try_into()
            .map_err(|_| InvalidPodUri::InvalidUri)?;
        Ok(Self {
            wire: Arc::from(wire),
            decoded: Arc::from(decoded.as_str()),
        })
    }
}
