//! I define a minimal `Link` typed header, covering the profile of
//! [rfc8288](https://datatracker.ietf.org/doc/html/rfc8288) that Solid
//! servers emit.
//!
//! ```txt
//! Link       = #link-value
//! link-value = "<" URI-Reference ">" *( OWS ";" OWS link-param )
//! link-param = token BWS [ "=" BWS ( token / quoted-string ) ]
//! ```
//!

use std::{collections::BTreeMap, str::FromStr};

use headers::Header;
use http::{HeaderName, HeaderValue};

/// A struct for representing `link-value` abnf production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkValue {
    /// Link target uri reference.
    pub target: String,

    /// Link params, with quoted-string values unquoted.
    pub params: Vec<(String, String)>,
}

impl LinkValue {
    /// Get the value of the `rel` param.
    pub fn rel(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("rel"))
            .map(|(_, value)| value.as_str())
    }
}

impl FromStr for LinkValue {
    type Err = InvalidLinkValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(';');
        let target = parts.next().unwrap_or_default().trim();
        if !(target.len() >= 2 && target.starts_with('<') && target.ends_with('>')) {
            return Err(InvalidLinkValue);
        }

        let params = parts
            .map(|param| {
                let (name, value) = param.split_once('=').ok_or(InvalidLinkValue)?;
                Ok((
                    name.trim().to_owned(),
                    value.trim().trim_matches('"').to_owned(),
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            target: target[1..target.len() - 1].to_owned(),
            params,
        })
    }
}

/// Invalid encoded link value.
#[derive(Debug, thiserror::Error)]
#[error("Invalid encoded link value.")]
pub struct InvalidLinkValue;

/// Typed header for `Link`.
#[derive(Debug, Clone, Default)]
pub struct Link {
    /// List of link values.
    pub values: Vec<LinkValue>,
}

impl Link {
    /// Get link targets indexed by relation type. Targets of repeated
    /// relations are comma-joined.
    pub fn by_rel(&self) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for value in &self.values {
            let Some(rel) = value.rel() else { continue };
            map.entry(rel.to_owned())
                .and_modify(|targets| {
                    targets.push(',');
                    targets.push_str(&value.target);
                })
                .or_insert_with(|| value.target.clone());
        }
        map
    }
}

impl Header for Link {
    #[inline]
    fn name() -> &'static HeaderName {
        &http::header::LINK
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let link_values = values
            .flat_map(|value| {
                value
                    .to_str()
                    .unwrap_or_default()
                    .split(',')
                    .filter(|part| !part.trim().is_empty())
                    .map(LinkValue::from_str)
                    .collect::<Vec<_>>()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| headers::Error::invalid())?;

        Ok(Self {
            values: link_values,
        })
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        let encoded = self
            .values
            .iter()
            .map(|value| {
                let mut buf = format!("<{}>", value.target);
                for (name, param_value) in &value.params {
                    buf.push_str("; ");
                    buf.push_str(name);
                    buf.push_str("=\"");
                    buf.push_str(param_value);
                    buf.push('"');
                }
                buf
            })
            .collect::<Vec<_>>()
            .join(", ");

        if let Ok(value) = HeaderValue::from_str(&encoded) {
            values.extend(std::iter::once(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_ok};
    use headers::HeaderMapExt;
    use http::HeaderMap;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("no-angle-brackets; rel=\"type\"")]
    #[case("<unterminated; rel=\"type\"")]
    #[case("<t>; rel")]
    fn invalid_link_value_will_be_rejected(#[case] value: &str) {
        assert_err!(LinkValue::from_str(value));
    }

    #[test]
    fn link_value_parses_target_and_params() {
        let value = assert_ok!(LinkValue::from_str(
            "<http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\""
        ));
        assert_eq!(value.target, "http://www.w3.org/ns/ldp#BasicContainer");
        assert_eq!(value.rel(), Some("type"));
    }

    #[test]
    fn header_with_multiple_values_indexes_by_rel() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::LINK,
            HeaderValue::from_static(
                "<http://www.w3.org/ns/ldp#Resource>; rel=\"type\", <./.acl>; rel=\"acl\"",
            ),
        );

        let link: Link = headers.typed_get().expect("header must decode");
        let by_rel = link.by_rel();
        assert_eq!(
            by_rel.get("type").map(String::as_str),
            Some("http://www.w3.org/ns/ldp#Resource")
        );
        assert_eq!(by_rel.get("acl").map(String::as_str), Some("./.acl"));
    }

    #[test]
    fn repeated_relations_are_comma_joined() {
        let mut headers = HeaderMap::new();
        headers.append(
            http::header::LINK,
            HeaderValue::from_static("<a>; rel=\"type\""),
        );
        headers.append(
            http::header::LINK,
            HeaderValue::from_static("<b>; rel=\"type\""),
        );

        let link: Link = headers.typed_get().expect("header must decode");
        assert_eq!(link.by_rel().get("type").map(String::as_str), Some("a,b"));
    }
}
