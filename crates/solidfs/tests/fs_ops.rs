//! Adapter tests against an in-memory pod.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use claims::{assert_err, assert_ok, assert_ok_eq};
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use solidfs::{
    content::ReadCache,
    error::{FsError, HttpError},
    fs::{DirEntry, EntryKind, SolidFs, XattrReply},
    requestor::{Requestor, SolidResponse},
};

const BASE: &str = "https://pod.example/";
const LAST_MODIFIED: &str = "Sat, 13 Apr 2024 12:00:00 GMT";
const LAST_MODIFIED_EPOCH: i64 = 1_713_009_600;

#[derive(Debug, Clone)]
struct StoredResource {
    content_type: String,
    body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Recorded {
    method: Method,
    url: String,
    content_type: Option<String>,
    body: Option<Vec<u8>>,
}

/// An in-memory pod speaking the wire surface the adapter expects.
///
/// Resources are keyed by wire url; containers carry their trailing
/// slash. `PUT` creates missing ancestor containers the way Solid
/// servers do.
struct FakePod {
    resources: Mutex<BTreeMap<String, StoredResource>>,
    forbidden: Mutex<Vec<String>>,
    log: Mutex<Vec<Recorded>>,
}

impl FakePod {
    fn new() -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(
            BASE.to_owned(),
            StoredResource {
                content_type: "text/turtle".to_owned(),
                body: Vec::new(),
            },
        );
        Self {
            resources: Mutex::new(resources),
            forbidden: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    fn forbid(&self, url: &str) {
        self.forbidden.lock().unwrap().push(url.to_owned());
    }

    fn store(&self, url: &str, content_type: &str, body: &[u8]) {
        self.resources.lock().unwrap().insert(
            url.to_owned(),
            StoredResource {
                content_type: content_type.to_owned(),
                body: body.to_vec(),
            },
        );
    }

    fn requests_for(&self, url: &str) -> Vec<Recorded> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect()
    }

    fn request_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    fn listing_of(resources: &BTreeMap<String, StoredResource>, url: &str) -> String {
        let mut body = String::new();
        for child in resources.keys() {
            let Some(relative) = child.strip_prefix(url) else {
                continue;
            };
            if relative.is_empty() {
                continue;
            }
            let inner = relative.strip_suffix('/').unwrap_or(relative);
            if inner.is_empty() || inner.contains('/') {
                continue;
            }
            body.push_str(&format!(
                "<> <http://www.w3.org/ns/ldp#contains> <{relative}>.\n"
            ));
        }
        body
    }

    fn respond(&self, method: &Method, url: &str, body: Option<&[u8]>, content_type: Option<&str>) -> (StatusCode, HeaderMap, Bytes) {
        let mut resources = self.resources.lock().unwrap();
        match method.as_str() {
            "GET" => {
                if self.forbidden.lock().unwrap().iter().any(|f| f == url) {
                    return (StatusCode::FORBIDDEN, HeaderMap::new(), Bytes::new());
                }
                let Some(stored) = resources.get(url) else {
                    return (StatusCode::NOT_FOUND, HeaderMap::new(), Bytes::new());
                };
                let mut headers = HeaderMap::new();
                if url.ends_with('/') {
                    headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("text/turtle"),
                    );
                    let listing = Self::listing_of(&resources, url);
                    (StatusCode::OK, headers, Bytes::from(listing))
                } else {
                    headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_str(&stored.content_type).unwrap(),
                    );
                    (StatusCode::OK, headers, Bytes::from(stored.body.clone()))
                }
            }
            "HEAD" => {
                let Some(stored) = resources.get(url) else {
                    return (StatusCode::NOT_FOUND, HeaderMap::new(), Bytes::new());
                };
                let mut headers = HeaderMap::new();
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_str(&stored.content_type).unwrap(),
                );
                headers.insert(
                    header::LAST_MODIFIED,
                    HeaderValue::from_static(LAST_MODIFIED),
                );
                headers.insert(
                    "wac-allow",
                    HeaderValue::from_static("user=\"read write\", public=\"read\""),
                );
                headers.insert(header::ALLOW, HeaderValue::from_static("GET, HEAD, PUT"));
                headers.insert(
                    header::LINK,
                    HeaderValue::from_static(
                        "<http://www.w3.org/ns/ldp#Resource>; rel=\"type\"",
                    ),
                );
                (StatusCode::OK, headers, Bytes::new())
            }
            "PUT" => {
                // Ancestor containers spring into being.
                let mut ancestor = BASE.to_owned();
                let relative = url.strip_prefix(BASE).unwrap_or_default();
                let segments: Vec<&str> = relative.split('/').collect();
                for segment in &segments[..segments.len().saturating_sub(1)] {
                    if segment.is_empty() {
                        continue;
                    }
                    ancestor.push_str(segment);
                    ancestor.push('/');
                    resources
                        .entry(ancestor.clone())
                        .or_insert_with(|| StoredResource {
                            content_type: "text/turtle".to_owned(),
                            body: Vec::new(),
                        });
                }

                let existed = resources.contains_key(url);
                resources.insert(
                    url.to_owned(),
                    StoredResource {
                        content_type: content_type.unwrap_or("application/octet-stream").to_owned(),
                        body: body.unwrap_or_default().to_vec(),
                    },
                );
                let status = if existed {
                    StatusCode::NO_CONTENT
                } else {
                    StatusCode::CREATED
                };
                (status, HeaderMap::new(), Bytes::new())
            }
            "DELETE" => {
                if resources.remove(url).is_some() {
                    (StatusCode::NO_CONTENT, HeaderMap::new(), Bytes::new())
                } else {
                    (StatusCode::NOT_FOUND, HeaderMap::new(), Bytes::new())
                }
            }
            _ => (StatusCode::METHOD_NOT_ALLOWED, HeaderMap::new(), Bytes::new()),
        }
    }
}

impl Requestor for FakePod {
    fn request(
        &self,
        method: Method,
        url: &str,
        extra_headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<SolidResponse, HttpError> {
        let content_type = extra_headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        self.log.lock().unwrap().push(Recorded {
            method: method.clone(),
            url: url.to_owned(),
            content_type: content_type.clone(),
            body: body.clone(),
        });

        let (status, headers, content) =
            self.respond(&method, url, body.as_deref(), content_type.as_deref());
        let response = SolidResponse {
            status,
            headers,
            content,
        };
        HttpError::check(status.as_u16(), || response.text())?;
        Ok(response)
    }
}

fn new_fs() -> (SolidFs, Arc<FakePod>) {
    let pod = Arc::new(FakePod::new());
    let requestor: Arc<dyn Requestor> = pod.clone() as Arc<dyn Requestor>;
    let fs = SolidFs::new(
        BASE.try_into().expect("base uri must be valid"),
        requestor,
        None,
        Arc::new(ReadCache::default()),
        "test-session".to_owned(),
    );
    (fs, pod)
}

fn names(entries: &[DirEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn create_write_small_read_back() {
    let (fs, pod) = new_fs();

    assert_ok!(fs.create("/a.ttl", 0o644, 0));
    assert_ok_eq!(fs.write("/a.ttl", b"hello", 0), 5);
    assert_ok!(fs.flush("/a.ttl"));

    let puts: Vec<Recorded> = pod
        .requests_for("https://pod.example/a.ttl")
        .into_iter()
        .filter(|r| r.method == Method::PUT)
        .collect();
    // One PUT from create, one from flush; the flush one carries the
    // body under the extension-derived type.
    assert_eq!(puts.len(), 2);
    assert_eq!(puts[1].body.as_deref(), Some(b"hello".as_slice()));
    assert_eq!(puts[1].content_type.as_deref(), Some("text/turtle"));
    assert!(pod
        .requests_for("https://pod.example/a.ttl")
        .iter()
        .all(|r| r.method != Method::DELETE));

    assert_ok_eq!(fs.read("/a.ttl", 5, 0), b"hello".to_vec());
}

#[test]
fn mkdir_then_list_is_empty() {
    let (fs, pod) = new_fs();

    assert_ok!(fs.mkdir("/d", 0o755));
    let puts = pod.requests_for("https://pod.example/d/");
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].method, Method::PUT);
    assert_eq!(puts[0].content_type.as_deref(), Some("text/turtle"));

    let entries = assert_ok!(fs.readdir("/d", 0));
    assert_eq!(names(&entries), vec![".", ".."]);
}

#[test]
fn mkdir_rejects_trailing_slash() {
    let (fs, pod) = new_fs();
    let error = assert_err!(fs.mkdir("/d/", 0o755));
    assert_eq!(error.errno(), libc::EINVAL);
    assert_eq!(pod.request_count(), 0);
}

#[test]
fn content_type_change_triggers_delete_then_put() {
    let (fs, pod) = new_fs();

    assert_ok!(fs.create("/x", 0o644, 0));
    assert_ok_eq!(fs.write("/x", b"Plain", 0), 5);
    assert_ok!(fs.flush("/x"));

    let so_far = pod.requests_for("https://pod.example/x");
    assert!(
        so_far.iter().all(|r| r.method != Method::DELETE),
        "first flush is a plain rewrite"
    );
    let first_flush = so_far.last().expect("flush must have requested");
    assert_eq!(first_flush.method, Method::PUT);
    assert_eq!(first_flush.content_type.as_deref(), Some("text/plain"));

    assert_ok_eq!(fs.write("/x", b"<html></html>", 0), 13);
    assert_ok!(fs.flush("/x"));

    let requests = pod.requests_for("https://pod.example/x");
    let tail: Vec<&Method> = requests
        .iter()
        .rev()
        .take(2)
        .map(|r| &r.method)
        .collect();
    assert_eq!(tail, vec![&Method::PUT, &Method::DELETE], "delete, then put");
    let last = requests.last().expect("must have requested");
    assert_eq!(last.content_type.as_deref(), Some("text/html"));
    assert_eq!(last.body.as_deref(), Some(b"<html></html>".as_slice()));
}

#[test]
fn forbidden_container_lists_as_empty() {
    let (fs, pod) = new_fs();
    pod.store("https://pod.example/private/", "text/turtle", b"");
    pod.forbid("https://pod.example/private/");

    let entries = assert_ok!(fs.readdir("/private", 0));
    assert_eq!(names(&entries), vec![".", ".."]);
}

#[test]
fn unknown_path_is_enoent() {
    let (fs, _pod) = new_fs();
    let error = assert_err!(fs.getattr("/nope"));
    assert_eq!(error.errno(), libc::ENOENT);
}

#[test]
fn overlong_path_fails_before_any_request() {
    let (fs, pod) = new_fs();
    let path = format!("/{}", "a".repeat(1024));
    let error = assert_err!(fs.getattr(&path));
    assert_eq!(error.errno(), libc::ENAMETOOLONG);
    assert_eq!(pod.request_count(), 0);
}

#[test]
fn sentinel_path_fails_before_any_request() {
    let (fs, pod) = new_fs();
    let error = assert_err!(fs.getattr("/6291403e-8887-40ec-9e6d-7f394008a979"));
    assert_eq!(error.errno(), libc::EINVAL);
    assert_eq!(pod.request_count(), 0);
}

#[test]
fn non_ascii_names_are_percent_encoded_on_the_wire() {
    let (fs, pod) = new_fs();

    assert_ok!(fs.mkdir("/🦖", 0o755));
    assert_eq!(
        pod.requests_for("https://pod.example/%F0%9F%A6%96/").len(),
        1
    );

    let entries = assert_ok!(fs.readdir("/", 0));
    assert!(entries.contains(&DirEntry {
        name: "🦖".to_owned(),
        kind: EntryKind::Directory,
    }));
}

#[test]
fn append_mode_is_refused() {
    let (fs, _pod) = new_fs();
    let error = assert_err!(fs.open("/a.ttl", libc::O_APPEND));
    assert!(error.errno() > 0);
    assert_eq!(error.errno(), libc::ENOTSUP);
    assert_ok!(fs.open("/a.ttl", libc::O_RDWR));
}

#[test]
fn unlink_removes_from_listing() {
    let (fs, _pod) = new_fs();

    assert_ok!(fs.create("/gone.txt", 0o644, 0));
    assert!(names(&assert_ok!(fs.readdir("/", 0))).contains(&"gone.txt"));

    assert_ok!(fs.unlink("/gone.txt"));
    assert!(!names(&assert_ok!(fs.readdir("/", 0))).contains(&"gone.txt"));
    assert_eq!(assert_err!(fs.getattr("/gone.txt")).errno(), libc::ENOENT);
}

#[test]
fn getattr_refreshes_stat_from_head_headers() {
    let (fs, _pod) = new_fs();

    assert_ok!(fs.create("/w.txt", 0o644, 0));
    let stat = assert_ok!(fs.getattr("/w.txt"));

    // WAC-Allow user="read write" masked into owner bits.
    assert_eq!(stat.mode, libc::S_IFREG | 0o600);
    assert_eq!(stat.mtime, LAST_MODIFIED_EPOCH);
}

#[test]
fn xattrs_reflect_mime_headers_and_links() {
    let (fs, _pod) = new_fs();

    assert_ok!(fs.create("/w.txt", 0o644, 0));
    let _ = assert_ok!(fs.getattr("/w.txt"));

    match assert_ok!(fs.listxattr("/w.txt", 4096)) {
        XattrReply::Names(listed) => {
            assert!(listed.iter().any(|n| n == "user.mime_type"));
            assert!(listed.iter().any(|n| n == "user.header.allow"));
            assert!(listed.iter().any(|n| n == "user.link.type"));
        }
        other => panic!("expected names, got {other:?}"),
    }

    match assert_ok!(fs.listxattr("/w.txt", 0)) {
        XattrReply::Size(needed) => assert!(needed > 0),
        other => panic!("expected a size, got {other:?}"),
    }

    assert_eq!(
        assert_ok!(fs.getxattr("/w.txt", "user.mime_type", 0)),
        XattrReply::Size("text/plain".len() as u64)
    );
    assert_eq!(
        assert_ok!(fs.getxattr("/w.txt", "user.mime_type", 4096)),
        XattrReply::Data(b"text/plain".to_vec())
    );
    assert_eq!(
        assert_ok!(fs.getxattr("/w.txt", "user.link.type", 4096)),
        XattrReply::Data(b"http://www.w3.org/ns/ldp#Resource".to_vec())
    );
    assert_eq!(
        assert_ok!(fs.getxattr("/w.txt", "user.nothing", 4096)),
        XattrReply::Size(0)
    );
}

#[test]
fn truncate_shrinks_by_rewriting_the_prefix() {
    let (fs, pod) = new_fs();
    pod.store("https://pod.example/t.txt", "text/plain", b"Original text");

    assert_ok!(fs.truncate("/t.txt", 4));
    assert_ok_eq!(fs.read("/t.txt", 64, 0), b"Orig".to_vec());

    let stat = assert_ok!(fs.getattr("/t.txt"));
    assert_eq!(stat.size, 4);
}

#[test]
fn truncate_never_extends() {
    let (fs, pod) = new_fs();
    pod.store("https://pod.example/t.txt", "text/plain", b"tiny");

    let error = assert_err!(fs.truncate("/t.txt", 100));
    assert_eq!(error.errno(), libc::EINVAL);

    assert_eq!(assert_err!(fs.truncate("/t.txt", -1)).errno(), libc::EINVAL);
    assert_eq!(
        assert_err!(fs.truncate("/t.txt/", 0)).errno(),
        libc::EINVAL
    );
}

#[test]
fn truncate_to_zero_writes_empty_content() {
    let (fs, pod) = new_fs();
    pod.store("https://pod.example/t.txt", "text/plain", b"something");

    assert_ok!(fs.truncate("/t.txt", 0));
    let last = pod
        .requests_for("https://pod.example/t.txt")
        .into_iter()
        .filter(|r| r.method == Method::PUT)
        .next_back()
        .expect("a rewrite must have happened");
    assert_eq!(last.body.as_deref(), Some(b"".as_slice()));

    assert_ok_eq!(fs.read("/t.txt", 64, 0), Vec::<u8>::new());
}

#[test]
fn rename_moves_content_across_paths() {
    let (fs, _pod) = new_fs();

    assert_ok!(fs.create("/src.txt", 0o644, 0));
    assert_ok_eq!(fs.write("/src.txt", b"data", 0), 4);
    assert_ok!(fs.flush("/src.txt"));

    assert_ok!(fs.rename("/src.txt", "/dst.txt"));

    let listed = assert_ok!(fs.readdir("/", 0));
    assert!(!names(&listed).contains(&"src.txt"));
    assert!(names(&listed).contains(&"dst.txt"));
    assert_ok_eq!(fs.read("/dst.txt", 16, 0), b"data".to_vec());
}

#[test]
fn chmod_chown_utime_are_accepted_and_ignored() {
    let (fs, pod) = new_fs();
    assert_ok!(fs.chmod("/anything", 0o600));
    assert_ok!(fs.chown("/anything", 1000, 1000));
    assert_ok!(fs.utime("/anything", (0, 0)));
    assert_eq!(pod.request_count(), 0);
}

#[test]
fn offset_reads_are_served_from_the_read_cache() {
    let (fs, pod) = new_fs();
    pod.store("https://pod.example/big.bin", "application/octet-stream", b"0123456789");

    assert_ok_eq!(fs.read("/big.bin", 4, 0), b"0123".to_vec());
    let fetches_before = pod
        .requests_for("https://pod.example/big.bin")
        .into_iter()
        .filter(|r| r.method == Method::GET)
        .count();

    assert_ok_eq!(fs.read("/big.bin", 4, 4), b"4567".to_vec());
    let fetches_after = pod
        .requests_for("https://pod.example/big.bin")
        .into_iter()
        .filter(|r| r.method == Method::GET)
        .count();
    assert_eq!(fetches_before, fetches_after, "the slice came from cache");
}

#[test]
fn oversized_buffered_writes_are_efbig() {
    let (fs, _pod) = new_fs();
    assert_ok!(fs.create("/big", 0o644, 0));
    let error = assert_err!(fs.write("/big", b"x", 64 * 1024 * 1024));
    assert_eq!(error.errno(), libc::EFBIG);
    assert!(matches!(error, FsError::TooLarge));
}
