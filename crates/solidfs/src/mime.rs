//! I define content type inference for pod resources, from resource
//! names and from content bytes.
//!

use crate::resource::{AttributeSource, Resource};

/// Magic detection only ever considers this many leading bytes, so
/// writes at or past this offset can never change the inferred type.
pub const SNIFF_WINDOW: usize = 1024;

/// Extension table for RDF serializations, consulted before the
/// general purpose table, which misses most of them.
static RDF_EXTENSION_TYPES: &[(&str, &str)] = &[
    ("ttl", "text/turtle"),
    ("nt", "application/n-triples"),
    ("nq", "application/n-quads"),
    ("n3", "text/n3"),
    ("rdf", "application/rdf+xml"),
    ("jsonld", "application/ld+json"),
    ("trig", "application/trig"),
];

/// Guess a content type from the resource uri's extension, and record
/// it on the resource when the extension is known.
///
/// The uri doesn't change after creation, so this is worth attempting
/// as soon as a resource is created.
pub fn update_from_uri(resource: &mut Resource) {
    if let Some(content_type) = guess_from_name(resource.uri.as_str()) {
        resource.set_content_type(&content_type, AttributeSource::Mime);
    }
}

/// Detect a content type from content bytes, and record it on the
/// resource when detection yields a result.
///
/// A no-op for writes past the sniff window and for empty content.
/// A generic result never downgrades a specific type already known
/// from the resource's name or from the server.
pub fn update_from_content(offset: usize, resource: &mut Resource, content: &[u8]) {
    if offset >= SNIFF_WINDOW {
        return;
    }
    let Some(detected) = sniff_content(content) else {
        return;
    };
    if is_generic(&detected) && !is_generic(&resource.content_type) {
        return;
    }
    resource.set_content_type(&detected, AttributeSource::Mime);
}

/// Check whether a content type is one of the "nothing better known"
/// results byte sniffing falls back to.
pub fn is_generic(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();
    essence == mime::TEXT_PLAIN.essence_str()
        || essence == mime::APPLICATION_OCTET_STREAM.essence_str()
}

/// Guess a content type from a name's extension.
pub fn guess_from_name(name: &str) -> Option<String> {
    let stripped = name
        .split(['?', '#'])
        .next()
        .expect("split yields at least one part");
    let segment = stripped.rsplit('/').next().unwrap_or(stripped);
    let (stem, extension) = segment.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }

    let extension = extension.to_ascii_lowercase();
    if let Some((_, content_type)) = RDF_EXTENSION_TYPES
        .iter()
        .find(|(known, _)| *known == extension)
    {
        return Some((*content_type).to_owned());
    }

    mime_guess::from_ext(&extension)
        .first_raw()
        .map(str::to_owned)
}

/// Detect a content type from leading content bytes. `None` when the
/// content is empty.
pub fn sniff_content(content: &[u8]) -> Option<String> {
    if content.is_empty() {
        return None;
    }
    let window = &content[..content.len().min(SNIFF_WINDOW)];

    if let Some(found) = infer::get(window) {
        return Some(found.mime_type().to_owned());
    }

    Some(match window_str(window) {
        Some(text) if looks_like_html(text) => "text/html".to_owned(),
        Some(text) if is_plain_text(text) => "text/plain".to_owned(),
        _ => "application/octet-stream".to_owned(),
    })
}

/// Decode the sniff window as utf-8, tolerating a multi-byte sequence
/// cut off by the window boundary.
fn window_str(window: &[u8]) -> Option<&str> {
    match std::str::from_utf8(window) {
        Ok(text) => Some(text),
        Err(e) if e.error_len().is_none() => {
            std::str::from_utf8(&window[..e.valid_up_to()]).ok()
        }
        Err(_) => None,
    }
}

fn looks_like_html(text: &str) -> bool {
    let head = text.trim_start();
    let mut prefix = head.chars().take(14).collect::<String>();
    prefix.make_ascii_lowercase();
    prefix.starts_with("<!doctype html") || prefix.starts_with("<html")
}

fn is_plain_text(text: &str) -> bool {
    text.chars()
        .all(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
}

#[cfg(test)]
mod tests {
    use claims::{assert_none, assert_some_eq};
    use rstest::rstest;

    use crate::resource::{Resource, ResourceStat, DEFAULT_CONTENT_TYPE};

    use super::*;

    fn resource(uri: &str) -> Resource {
        Resource::new_file(
            uri.try_into().expect("test uri must be valid"),
            ResourceStat::default(),
        )
    }

    #[rstest]
    #[case("https://pod.example/a.ttl", "text/turtle")]
    #[case("https://pod.example/d/report.PNG", "image/png")]
    #[case("https://pod.example/graph.jsonld", "application/ld+json")]
    #[case("https://pod.example/notes.txt", "text/plain")]
    fn known_extensions_resolve(#[case] uri: &str, #[case] expected: &str) {
        assert_some_eq!(guess_from_name(uri), expected);
    }

    #[rstest]
    #[case("https://pod.example/README")]
    #[case("https://pod.example/d/")]
    #[case("https://pod.example/.hidden")]
    fn unknown_names_yield_nothing(#[case] uri: &str) {
        assert_none!(guess_from_name(uri));
    }

    #[test]
    fn update_from_uri_leaves_unknown_extensions_alone() {
        let mut r = resource("https://pod.example/README");
        update_from_uri(&mut r);
        assert_eq!(r.content_type, DEFAULT_CONTENT_TYPE);

        let mut r = resource("https://pod.example/a.ttl");
        update_from_uri(&mut r);
        assert_eq!(r.content_type, "text/turtle");
    }

    #[rstest]
    #[case(b"Plain text".as_slice(), "text/plain")]
    #[case(b"<html><head><title>HTML</title></head></html>".as_slice(), "text/html")]
    #[case(b"  <!DOCTYPE html><html></html>".as_slice(), "text/html")]
    #[case(b"\x89PNG\r\n\x1a\n".as_slice(), "image/png")]
    #[case(b"\x00\x01\x02\x03".as_slice(), "application/octet-stream")]
    fn content_detection_matches_magic(#[case] content: &[u8], #[case] expected: &str) {
        assert_some_eq!(sniff_content(content), expected);
    }

    #[test]
    fn empty_content_detects_nothing() {
        assert_none!(sniff_content(b""));
    }

    #[test]
    fn writes_past_the_sniff_window_never_change_the_type() {
        let mut r = resource("https://pod.example/x");
        r.set_content_type("text/plain", AttributeSource::Mime);

        let mut content = vec![b'a'; 4096];
        content.extend_from_slice(b"<html></html>");
        update_from_content(2000, &mut r, &content);
        assert_eq!(r.content_type, "text/plain");
    }

    #[test]
    fn empty_content_leaves_the_type_unchanged() {
        let mut r = resource("https://pod.example/x");
        update_from_content(0, &mut r, b"");
        assert_eq!(r.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn generic_detection_never_downgrades_a_specific_type() {
        let mut r = resource("https://pod.example/a.ttl");
        update_from_uri(&mut r);
        update_from_content(0, &mut r, b"hello");
        assert_eq!(r.content_type, "text/turtle");
    }

    #[test]
    fn specific_detection_replaces_generic_and_specific_types() {
        let mut r = resource("https://pod.example/x");
        update_from_content(0, &mut r, b"Plain");
        assert_eq!(r.content_type, "text/plain");

        update_from_content(0, &mut r, b"<html></html>");
        assert_eq!(r.content_type, "text/html");
    }
}
