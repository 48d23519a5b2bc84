//! I define the lazily populated resource hierarchy of a pod, with
//! containers representing the branches and non-containers the leaves.
//!
//! Membership of a container is discovered by fetching its RDF
//! representation and extracting `ldp:contains` statements. A
//! container's membership is authoritative only after such a fetch;
//! unpopulated membership means "ask the server".
//!

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use headers::HeaderMapExt;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use pod_uri::PodUri;
use sophia_api::{parser::TripleParser, prelude::Iri, source::TripleSource, term::Term, triple::Triple};
use sophia_turtle::parser::turtle::TurtleParser;
use tracing::{debug, warn};

use crate::{
    error::{FsError, HttpError, HttpErrorKind},
    header::{AccessMode, WacAllow},
    notify::Notifier,
    requestor::Requestor,
    resource::{AttributeSource, ExtendedAttribute, Resource, ResourceStat},
};

/// The `ldp:contains` predicate.
pub const LDP_CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";

/// The `posix:mtime` predicate of the posix stat vocabulary.
pub const POSIX_STAT_MTIME: &str = "http://www.w3.org/ns/posix/stat#mtime";

/// The `posix:size` predicate of the posix stat vocabulary.
pub const POSIX_STAT_SIZE: &str = "http://www.w3.org/ns/posix/stat#size";

/// `Accept` value of container listing fetches.
pub const CONTAINER_ACCEPT: &str = "text/turtle, application/rdf+xml, application/ld+json";

/// Placeholder size of a discovered file until a stat refresh or a
/// read determines the real one.
pub const UNKNOWN_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// `X-Powered-By` header name, reflected as an xattr of the root.
static X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// Error of a hierarchy operation.
#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    /// A path segment has no matching resource.
    #[error("'{segment}' not found in '{container}'")]
    NotFound {
        /// The unmatched segment.
        segment: String,

        /// The container searched.
        container: String,
    },

    /// A non-container where a container is required.
    #[error("'{0}' is not a container")]
    NotAContainer(String),

    /// A server interaction failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A container listing fetch succeeded with an unusable status.
    #[error("error fetching container listing with status {0}")]
    UnexpectedStatus(u16),

    /// A container listing could not be parsed.
    #[error("unable to parse container listing: {0}")]
    Parse(String),
}

impl From<HierarchyError> for FsError {
    fn from(e: HierarchyError) -> Self {
        match e {
            HierarchyError::NotFound { segment, .. } => FsError::NotFound(segment),
            HierarchyError::NotAContainer(uri) => FsError::NotAContainer(uri),
            HierarchyError::Http(e) => FsError::Http(e),
            HierarchyError::UnexpectedStatus(_) | HierarchyError::Parse(_) => {
                FsError::Internal(e.to_string())
            }
        }
    }
}

/// The resource hierarchy of one mount.
///
/// Resources are keyed by uri; parents are never back-referenced from
/// children, they are re-derived from paths and uris instead.
pub struct Hierarchy {
    root: PodUri,
    resources: HashMap<PodUri, Resource>,
    notifier: Option<Arc<Notifier>>,
}

impl Hierarchy {
    /// Create the hierarchy rooted at the given container uri.
    pub fn new(root: PodUri, notifier: Option<Arc<Notifier>>) -> Self {
        debug_assert!(root.is_container(), "root uri must end with '/'");
        Self {
            root,
            resources: HashMap::new(),
            notifier,
        }
    }

    /// Get the root uri.
    #[inline]
    pub fn root_uri(&self) -> &PodUri {
        &self.root
    }

    /// Get a known resource.
    #[inline]
    pub fn get(&self, uri: &PodUri) -> Option<&Resource> {
        self.resources.get(uri)
    }

    /// Get a known resource mutably.
    #[inline]
    pub fn get_mut(&mut self, uri: &PodUri) -> Option<&mut Resource> {
        self.resources.get_mut(uri)
    }

    /// Map a file system path, delimited by `/`, to a resource uri.
    ///
    /// A trailing slash resolves to the same resource as the bare
    /// path, since the kernel never supplies one.
    pub fn resolve(
        &mut self,
        path: &str,
        requestor: &dyn Requestor,
    ) -> Result<PodUri, HierarchyError> {
        self.ensure_root();

        let trimmed = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        if matches!(trimmed, "/" | "" | ".") {
            return Ok(self.root.clone());
        }

        let mut current = self.root.clone();
        for segment in trimmed.trim_start_matches('/').split('/') {
            if segment.is_empty() {
                return Err(HierarchyError::NotFound {
                    segment: segment.to_owned(),
                    container: current.to_string(),
                });
            }

            let members = self.children(&current, requestor)?;
            // The path arrives without trailing slashes, so a segment
            // may name either a file or a container.
            let file_match = current.child(segment);
            let container_match = current.child(&format!("{segment}/"));
            match members
                .into_iter()
                .find(|m| *m == file_match || *m == container_match)
            {
                Some(matched) => current = matched,
                None => {
                    return Err(HierarchyError::NotFound {
                        segment: segment.to_owned(),
                        container: current.to_string(),
                    })
                }
            }
        }

        Ok(current)
    }

    /// Get the membership of a container, fetching and parsing its
    /// listing on first use.
    ///
    /// A `401`/`403` on the fetch records empty membership, keeping
    /// the directory browseable.
    pub fn children(
        &mut self,
        container: &PodUri,
        requestor: &dyn Requestor,
    ) -> Result<Vec<PodUri>, HierarchyError> {
        self.ensure_root();

        let resource = self
            .resources
            .get(container)
            .ok_or_else(|| HierarchyError::NotFound {
                segment: container.to_string(),
                container: self.root.to_string(),
            })?;
        if !resource.is_container() {
            return Err(HierarchyError::NotAContainer(container.to_string()));
        }
        if let Some(members) = resource.contains() {
            return Ok(members.iter().cloned().collect());
        }

        let wire_url = container.to_wire();
        debug!(resource_url = %container, quoted_url = %wire_url, "Determining contents of Container");
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(CONTAINER_ACCEPT));

        let response = match requestor.request(Method::GET, &wire_url, headers, None) {
            Ok(response) => response,
            Err(e) if matches!(e.kind, HttpErrorKind::Unauthorized | HttpErrorKind::Forbidden) => {
                warn!(resource_url = %container, status_code = e.status, "Unable to get contents");
                self.resources
                    .get_mut(container)
                    .expect("container is present, checked above")
                    .set_contains(BTreeSet::new());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        if response.status.as_u16() != 200 {
            return Err(HierarchyError::UnexpectedStatus(response.status.as_u16()));
        }

        debug!(size = response.content.len(), "Parsing Container RDF");
        let statements = parse_container_listing(
            response.header_str(&header::CONTENT_TYPE),
            &response.content,
            &wire_url,
        )?;

        // The graph may also describe the container itself.
        if let Some(resource) = self.resources.get_mut(container) {
            extend_resource_from_graph(resource, &wire_url, &statements);
        }

        let mut members = BTreeSet::new();
        for statement in &statements {
            if statement.subject != wire_url || statement.predicate != LDP_CONTAINS {
                continue;
            }
            let StatementObject::Iri(quoted) = &statement.object else {
                return Err(HierarchyError::Parse(format!(
                    "expected '{LDP_CONTAINS}' object to be an iri"
                )));
            };
            // Uris in the graph are quoted; in-memory uris aren't.
            let uri = PodUri::from_wire(quoted).map_err(|e| {
                HierarchyError::Parse(format!("invalid contained resource uri '{quoted}': {e}"))
            })?;
            debug!(contained_resource_url = %uri, "Discovered contained Resource");

            let mut discovered = if uri.is_container() {
                Resource::new_container(
                    uri.clone(),
                    ResourceStat {
                        mode: libc::S_IFDIR | 0o755,
                        nlink: 2,
                        ..Default::default()
                    },
                )
            } else {
                Resource::new_file(
                    uri.clone(),
                    ResourceStat {
                        mode: libc::S_IFREG | 0o444,
                        nlink: 1,
                        size: UNKNOWN_FILE_SIZE,
                        ..Default::default()
                    },
                )
            };
            extend_resource_from_graph(&mut discovered, quoted, &statements);

            if let Some(notifier) = &self.notifier {
                notifier.subscribe(&discovered.uri);
            }

            members.insert(uri.clone());
            self.resources.entry(uri).or_insert(discovered);
        }

        debug!(size = members.len(), "Contains");
        let listing = members.iter().cloned().collect();
        self.resources
            .get_mut(container)
            .expect("container is present, checked above")
            .set_contains(members);
        Ok(listing)
    }

    /// Refresh a resource's stat record from a `HEAD` response.
    ///
    /// Advisory: any failure is logged and swallowed.
    pub fn refresh_stat(&mut self, uri: &PodUri, requestor: &dyn Requestor) {
        let is_root = *uri == self.root;
        let Some(resource) = self.resources.get_mut(uri) else {
            return;
        };

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*"));
        let response = match requestor.request(Method::HEAD, &uri.to_wire(), headers, None) {
            Ok(response) => response,
            Err(e) => {
                warn!(resource_url = %uri, error = %e, "Unable to refresh Resource stat");
                return;
            }
        };

        if let Some(content_type) = response.header_str(&header::CONTENT_TYPE) {
            let content_type = content_type.to_owned();
            resource.set_content_type(&content_type, AttributeSource::Header);
        }

        if let Some(last_modified) = response.header_str(&header::LAST_MODIFIED) {
            match chrono::DateTime::parse_from_rfc2822(last_modified) {
                Ok(parsed) => resource.stat.mtime = parsed.timestamp(),
                Err(e) => debug!(last_modified, error = %e, "Unparsable Last-Modified"),
            }
        }

        if let Some(wac_allow) = response.headers.typed_get::<WacAllow>() {
            let modes = wac_allow.modes_for("user");
            debug!(allowed = ?modes, "Access modes");
            let mut permissions = 0u32;
            if modes.contains(&AccessMode::Read) {
                permissions |= libc::S_IRUSR;
            }
            if modes.contains(&AccessMode::Write) {
                permissions |= libc::S_IWUSR;
            }
            // append and control have no file mode counterpart
            resource.stat.mode = resource.file_type_bit() | (permissions & libc::S_IRWXU);
        }

        let mut reflected = vec![header::ALLOW];
        if is_root {
            reflected.push(X_POWERED_BY.clone());
        }
        for name in &reflected {
            if let Some(value) = response.header_str(name) {
                resource.extended_attributes.insert(
                    format!("user.header.{name}"),
                    ExtendedAttribute {
                        source: AttributeSource::Header,
                        value: value.to_owned(),
                    },
                );
            }
        }

        for (rel, target) in response.links() {
            resource.extended_attributes.insert(
                format!("user.link.{rel}"),
                ExtendedAttribute {
                    source: AttributeSource::Link,
                    value: target,
                },
            );
        }
    }

    /// Record a freshly created resource under its parent container,
    /// initialising the parent's membership if it was unpopulated.
    pub fn insert_child(&mut self, parent: &PodUri, resource: Resource) {
        if let Some(parent_resource) = self.resources.get_mut(parent) {
            if let Some(members) = parent_resource.contains_mut_or_init() {
                members.insert(resource.uri.clone());
            }
        }
        self.resources.insert(resource.uri.clone(), resource);
    }

    /// Remove a deleted resource, dropping it from its parent's
    /// membership when that is populated.
    pub fn remove(&mut self, uri: &PodUri) {
        self.resources.remove(uri);
        if let Some(parent) = uri.parent() {
            if let Some(parent_resource) = self.resources.get_mut(&parent) {
                if let Some(members) = parent_resource.contains_mut_or_init() {
                    members.remove(uri);
                }
            }
        }
    }

    fn ensure_root(&mut self) {
        if !self.resources.contains_key(&self.root) {
            debug!(base_url = %self.root, "Establishing root");
            let root = self.root.clone();
            self.resources.insert(
                root.clone(),
                Resource::new_container(
                    root,
                    ResourceStat {
                        mode: libc::S_IFDIR | 0o777,
                        nlink: 2,
                        ..Default::default()
                    },
                ),
            );
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum StatementObject {
    Iri(String),
    Literal(String),
}

impl StatementObject {
    fn lexical(&self) -> &str {
        match self {
            Self::Iri(iri) => iri,
            Self::Literal(literal) => literal,
        }
    }
}

/// An RDF statement reduced to the shapes the hierarchy consumes.
#[derive(Debug)]
struct Statement {
    subject: String,
    predicate: String,
    object: StatementObject,
}

/// Parse a container listing body into statements, resolving relative
/// references against the container's wire url.
fn parse_container_listing(
    content_type: Option<&str>,
    body: &[u8],
    base_url: &str,
) -> Result<Vec<Statement>, HierarchyError> {
    let essence = content_type.map(|ct| {
        ct.split(';')
            .next()
            .unwrap_or(ct)
            .trim()
            .to_ascii_lowercase()
    });
    match essence.as_deref() {
        // Turtle is a superset of n-triples, one parser covers both.
        None | Some("text/turtle") | Some("application/n-triples") => {}
        Some(other) => {
            return Err(HierarchyError::Parse(format!(
                "unsupported rdf syntax '{other}'"
            )))
        }
    }

    let text = std::str::from_utf8(body)
        .map_err(|e| HierarchyError::Parse(format!("listing is not utf-8: {e}")))?;
    let base = Iri::new(base_url.to_owned())
        .map_err(|e| HierarchyError::Parse(format!("invalid base iri '{base_url}': {e}")))?;

    let parser = TurtleParser { base: Some(base) };
    let mut statements = Vec::new();
    parser
        .parse_str(text)
        .for_each_triple(|t| {
            let s_term = t.s();
            let p_term = t.p();
            let o_term = t.o();
            let (Some(subject), Some(predicate)) = (s_term.iri(), p_term.iri()) else {
                return;
            };
            let object = if let Some(iri) = o_term.iri() {
                StatementObject::Iri(iri.as_str().to_owned())
            } else if let Some(lexical_form) = o_term.lexical_form() {
                StatementObject::Literal(lexical_form.to_string())
            } else {
                return;
            };
            statements.push(Statement {
                subject: subject.as_str().to_owned(),
                predicate: predicate.as_str().to_owned(),
                object,
            });
        })
        .map_err(|e| HierarchyError::Parse(e.to_string()))?;

    Ok(statements)
}

/// Fold statements about `wire_subject` into the resource: posix stat
/// values onto the stat record, everything else into xattrs. Cheaper
/// than a `HEAD` per resource.
fn extend_resource_from_graph(
    resource: &mut Resource,
    wire_subject: &str,
    statements: &[Statement],
) {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for statement in statements {
        if statement.subject != wire_subject || statement.predicate == LDP_CONTAINS {
            continue;
        }
        grouped
            .entry(statement.predicate.as_str())
            .or_default()
            .push(statement.object.lexical());
    }

    for (predicate, values) in &grouped {
        // A xattr can only hold a single value, so concatenate.
        resource.extended_attributes.insert(
            (*predicate).to_owned(),
            ExtendedAttribute {
                source: AttributeSource::Graph,
                value: values.join(","),
            },
        );
    }

    if let Some(newest) = grouped
        .get(POSIX_STAT_MTIME)
        .into_iter()
        .flatten()
        .filter_map(|v| v.parse::<i64>().ok())
        .max()
    {
        resource.stat.mtime = newest;
    }
    if let Some(largest) = grouped
        .get(POSIX_STAT_SIZE)
        .into_iter()
        .flatten()
        .filter_map(|v| v.parse::<u64>().ok())
        .max()
    {
        resource.stat.size = largest;
    }
}
