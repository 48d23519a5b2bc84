//! I define the resource model of a pod hierarchy.
//!
//! A Solid Pod is a resource hierarchy with containers representing
//! the branches and non-containers as the leaves.
//!

use std::collections::{BTreeMap, BTreeSet};

use pod_uri::PodUri;

/// Content type assumed until something better is known.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Name of the xattr mirroring a resource's content type.
pub const MIME_TYPE_XATTR: &str = "user.mime_type";

/// POSIX-stat shaped record of a resource.
///
/// Fields default to 0 until populated from the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceStat {
    /// File mode, file-type bit included.
    pub mode: u32,

    /// Link count.
    pub nlink: u32,

    /// Content size in bytes.
    pub size: u64,

    /// Modification time, in epoch seconds.
    pub mtime: i64,
}

/// Provenance of an extended attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSource {
    /// Derived from an RDF graph triple.
    Graph,

    /// Reflected from an http response header.
    Header,

    /// Reflected from a `Link` response header relation.
    Link,

    /// Derived by content type inference.
    Mime,
}

/// An extended attribute value with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedAttribute {
    /// Where the value came from.
    pub source: AttributeSource,

    /// The value.
    pub value: String,
}

/// Variant of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// A non-container leaf resource.
    File,

    /// An ldp container.
    Container {
        /// Membership uris. `None` means "ask the server".
        contains: Option<BTreeSet<PodUri>>,
    },
}

/// A pod resource known to the hierarchy.
///
/// Identity is its uri alone; the hierarchy keys resources by uri and
/// membership sets dedupe accordingly.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Identity.
    pub uri: PodUri,

    /// Variant.
    pub kind: ResourceKind,

    /// POSIX stat record.
    pub stat: ResourceStat,

    /// Content type.
    pub content_type: String,

    /// Extended attributes by xattr-style name.
    pub extended_attributes: BTreeMap<String, ExtendedAttribute>,
}

impl Resource {
    /// Create a leaf resource.
    pub fn new_file(uri: PodUri, stat: ResourceStat) -> Self {
        Self::new(uri, ResourceKind::File, stat)
    }

    /// Create a container resource with unpopulated membership.
    pub fn new_container(uri: PodUri, stat: ResourceStat) -> Self {
        Self::new(uri, ResourceKind::Container { contains: None }, stat)
    }

    fn new(uri: PodUri, kind: ResourceKind, stat: ResourceStat) -> Self {
        let mut resource = Self {
            uri,
            kind,
            stat,
            content_type: DEFAULT_CONTENT_TYPE.to_owned(),
            extended_attributes: BTreeMap::new(),
        };
        resource.mirror_content_type_xattr(AttributeSource::Mime);
        resource
    }

    /// Check whether this resource is a container.
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self.kind, ResourceKind::Container { .. })
    }

    /// Get the `S_IFMT` bit of this resource's variant.
    #[inline]
    pub fn file_type_bit(&self) -> u32 {
        if self.is_container() {
            libc::S_IFDIR
        } else {
            libc::S_IFREG
        }
    }

    /// Get the membership set, if this is a container with populated
    /// membership.
    pub fn contains(&self) -> Option<&BTreeSet<PodUri>> {
        match &self.kind {
            ResourceKind::Container { contains } => contains.as_ref(),
            ResourceKind::File => None,
        }
    }

    /// Get the membership set of this container, initialising it to
    /// empty if unpopulated. `None` for non-containers.
    pub fn contains_mut_or_init(&mut self) -> Option<&mut BTreeSet<PodUri>> {
        match &mut self.kind {
            ResourceKind::Container { contains } => {
                Some(contains.get_or_insert_with(BTreeSet::new))
            }
            ResourceKind::File => None,
        }
    }

    /// Replace the membership set of this container.
    pub fn set_contains(&mut self, members: BTreeSet<PodUri>) {
        if let ResourceKind::Container { contains } = &mut self.kind {
            *contains = Some(members);
        }
    }

    /// Set the content type, keeping the mirroring xattr in sync.
    pub fn set_content_type(&mut self, content_type: &str, source: AttributeSource) {
        self.content_type = content_type.to_owned();
        self.mirror_content_type_xattr(source);
    }

    fn mirror_content_type_xattr(&mut self, source: AttributeSource) {
        self.extended_attributes.insert(
            MIME_TYPE_XATTR.to_owned(),
            ExtendedAttribute {
                source,
                value: self.content_type.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_none, assert_some};

    use super::*;

    fn uri(s: &str) -> PodUri {
        s.try_into().expect("test uri must be valid")
    }

    #[test]
    fn new_resources_default_to_octet_stream() {
        let resource = Resource::new_file(uri("https://pod.example/x"), ResourceStat::default());
        assert_eq!(resource.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(
            resource
                .extended_attributes
                .get(MIME_TYPE_XATTR)
                .map(|a| a.value.as_str()),
            Some(DEFAULT_CONTENT_TYPE)
        );
    }

    #[test]
    fn content_type_updates_are_mirrored_into_xattrs() {
        let mut resource =
            Resource::new_file(uri("https://pod.example/x"), ResourceStat::default());
        resource.set_content_type("text/turtle", AttributeSource::Header);
        assert_eq!(
            resource
                .extended_attributes
                .get(MIME_TYPE_XATTR)
                .map(|a| a.value.as_str()),
            Some("text/turtle")
        );
    }

    #[test]
    fn membership_accessors_distinguish_unpopulated_from_empty() {
        let mut container =
            Resource::new_container(uri("https://pod.example/d/"), ResourceStat::default());
        assert_none!(container.contains());

        assert_some!(container.contains_mut_or_init());
        assert_some!(container.contains());
    }

    #[test]
    fn files_have_no_membership() {
        let mut file = Resource::new_file(uri("https://pod.example/x"), ResourceStat::default());
        assert_none!(file.contains());
        assert_none!(file.contains_mut_or_init());
    }
}
