//! I define the file system adapter: POSIX-shaped operations over the
//! pod hierarchy, the write buffers and the read cache.
//!
//! Every operation validates its path before anything else, and every
//! failure is a typed [`FsError`] that the kernel bridge translates
//! into a negative errno.
//!

use std::sync::{Arc, Mutex, MutexGuard};

use http::{header, HeaderMap, HeaderValue, Method};
use pod_uri::PodUri;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    authn::Authenticator,
    background::Background,
    config::Settings,
    content::{ReadCache, TruncateOutcome, WriteBufferPool},
    error::FsError,
    hierarchy::Hierarchy,
    mime,
    notify::Notifier,
    path,
    requestor::{
        impl_::{AsyncRequestor, BlockingRequestor},
        Requestor,
    },
    resource::{Resource, ResourceStat, DEFAULT_CONTENT_TYPE, MIME_TYPE_XATTR},
};

/// `Link` value advertising an ldp resource on creation.
const LDP_RESOURCE_LINK: &str = "<http://www.w3.org/ns/ldp#Resource>; rel=\"type\"";

/// `Link` value advertising an ldp basic container on creation.
const LDP_BASIC_CONTAINER_LINK: &str = "<http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\"";

/// Variant of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,

    /// A directory.
    Directory,
}

/// A directory entry yielded by [`SolidFs::readdir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name, relative to the directory, without a trailing
    /// slash.
    pub name: String,

    /// Entry variant.
    pub kind: EntryKind,
}

/// Synthetic file system statistics. The backend has no meaningful
/// counterparts, so everything reads as free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFs {
    /// Preferred block size.
    pub block_size: u32,

    /// Total blocks.
    pub blocks: u64,

    /// Free blocks.
    pub blocks_free: u64,

    /// Blocks available to unprivileged users.
    pub blocks_available: u64,

    /// Total file slots.
    pub files: u64,

    /// Free file slots.
    pub files_free: u64,

    /// Longest file name accepted.
    pub name_max: u32,

    /// Mount flags.
    pub flags: u64,
}

/// Reply of the xattr operations, shaped by the caller's `size`
/// probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XattrReply {
    /// The byte count a follow-up call must allocate for; also the
    /// "no such attribute" reply, as a zero.
    Size(u64),

    /// Attribute names.
    Names(Vec<String>),

    /// An attribute value.
    Data(Vec<u8>),
}

/// The file system adapter of one mount.
pub struct SolidFs {
    session_identifier: String,
    requestor: Arc<dyn Requestor>,
    hierarchy: Mutex<Hierarchy>,
    write_buffers: WriteBufferPool,
    read_cache: Arc<ReadCache>,
}

impl SolidFs {
    /// Create an adapter over the given transport.
    pub fn new(
        root: PodUri,
        requestor: Arc<dyn Requestor>,
        notifier: Option<Arc<Notifier>>,
        read_cache: Arc<ReadCache>,
        session_identifier: String,
    ) -> Self {
        Self {
            session_identifier,
            requestor,
            hierarchy: Mutex::new(Hierarchy::new(root, notifier)),
            write_buffers: WriteBufferPool::default(),
            read_cache,
        }
    }

    /// Assemble a full adapter from settings: session identity,
    /// background executor, authenticator, selected transport, and
    /// the opt-in notifier.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let session_identifier = Uuid::new_v4().simple().to_string();
        info!(%session_identifier, "Establishing session");

        let root = settings.root_uri()?;
        let background = Arc::new(Background::new()?);
        let authn = Arc::new(Authenticator::new(
            settings.credentials()?,
            &session_identifier,
        ));

        let requestor: Arc<dyn Requestor> = if settings.async_http() {
            Arc::new(AsyncRequestor::new(
                &session_identifier,
                authn,
                Arc::clone(&background),
                settings.content_caching_enabled(),
            ))
        } else {
            Arc::new(BlockingRequestor::new(&session_identifier, authn))
        };

        let read_cache = Arc::new(ReadCache::default());
        let notifier = settings.websocket_notifications_enabled().then(|| {
            Arc::new(Notifier::new(
                Arc::clone(&requestor),
                background,
                Arc::clone(&read_cache),
            ))
        });

        Ok(Self::new(
            root,
            requestor,
            notifier,
            read_cache,
            session_identifier,
        ))
    }

    /// Get the session identifier stamped into outbound requests.
    #[inline]
    pub fn session_identifier(&self) -> &str {
        &self.session_identifier
    }

    fn lock_hierarchy(&self) -> MutexGuard<'_, Hierarchy> {
        self.hierarchy.lock().expect("hierarchy lock poisoned")
    }

    /// Changing mode is accepted and ignored.
    #[tracing::instrument(skip(self))]
    pub fn chmod(&self, path: &str, mode: u32) -> Result<(), FsError> {
        path::validate(path)?;
        warn!(path, mode, "Changing mode is not supported");
        Ok(())
    }

    /// Changing owner is accepted and ignored.
    #[tracing::instrument(skip(self))]
    pub fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<(), FsError> {
        path::validate(path)?;
        warn!(path, uid, gid, "Changing owner is not supported");
        Ok(())
    }

    /// Changing times is accepted and ignored.
    #[tracing::instrument(skip(self))]
    pub fn utime(&self, path: &str, times: (i64, i64)) -> Result<(), FsError> {
        path::validate(path)?;
        warn!(path, ?times, "Unable to set times on Solid Resource");
        Ok(())
    }

    /// Open a resource. Append mode is refused: writes are buffered
    /// into whole-resource bodies, and appending would first require
    /// a full read behind the caller's back.
    #[tracing::instrument(skip(self))]
    pub fn open(&self, path: &str, flags: i32) -> Result<(), FsError> {
        path::validate(path)?;
        debug!(path, flags, "open");
        if flags & libc::O_APPEND != 0 {
            warn!(path, "Append mode is not supported");
            return Err(FsError::NotSupported("append mode"));
        }
        Ok(())
    }

    /// Create a resource.
    #[tracing::instrument(skip(self))]
    pub fn create(&self, path: &str, mode: u32, umask: u32) -> Result<(), FsError> {
        path::validate(path)?;
        debug!(path, mode, umask, "create");

        let (parent_path, name) = split_parent(path)?;
        let mut hierarchy = self.lock_hierarchy();
        let parent_uri = hierarchy.resolve(parent_path, self.requestor.as_ref())?;
        let parent = hierarchy
            .get(&parent_uri)
            .ok_or_else(|| FsError::Internal(format!("resolved parent '{parent_uri}' unknown")))?;
        if !parent.is_container() {
            return Err(FsError::NotAContainer(parent_uri.to_string()));
        }

        let uri = parent_uri.child(name);
        let mut resource = Resource::new_file(
            uri.clone(),
            ResourceStat {
                mode: libc::S_IFREG | 0o777,
                nlink: 1,
                ..Default::default()
            },
        );
        // The uri doesn't change after creation, so the extension is
        // worth consulting right away.
        mime::update_from_uri(&mut resource);
        let content_type = resource.content_type.clone();

        let mut headers = HeaderMap::new();
        headers.insert(header::LINK, HeaderValue::from_static(LDP_RESOURCE_LINK));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&content_type)
                .map_err(|_| FsError::Internal("content type is not a valid header".into()))?,
        );

        info!(resource_url = %uri, parent = parent_path, name, %content_type, "Creating Solid Resource");
        // PUT, so the name on the server matches the requested path.
        let response = self
            .requestor
            .request(Method::PUT, &uri.to_wire(), headers, None)?;
        match response.status.as_u16() {
            201 | 204 => {
                hierarchy.insert_child(&parent_uri, resource);
                Ok(())
            }
            status => {
                error!(status_code = status, text = %response.text(), "Error creating Solid Resource on server");
                Err(FsError::Internal(format!(
                    "unexpected status {status} creating resource"
                )))
            }
        }
    }

    /// Create a container.
    #[tracing::instrument(skip(self))]
    pub fn mkdir(&self, path: &str, mode: u32) -> Result<(), FsError> {
        path::validate(path)?;
        if path.ends_with('/') {
            // The path never arrives with a trailing slash, and the
            // hierarchy assumes as much.
            warn!(path, "Unexpected slash at end of path");
            return Err(FsError::Invalid("unexpected slash at end of path".into()));
        }
        debug!(path, mode, "mkdir");

        let (parent_path, name) = split_parent(path)?;
        let mut hierarchy = self.lock_hierarchy();
        let parent_uri = hierarchy.resolve(parent_path, self.requestor.as_ref())?;
        let parent = hierarchy
            .get(&parent_uri)
            .ok_or_else(|| FsError::Internal(format!("resolved parent '{parent_uri}' unknown")))?;
        if !parent.is_container() {
            return Err(FsError::NotAContainer(parent_uri.to_string()));
        }

        let uri = parent_uri.child(&format!("{name}/"));
        let mut headers = HeaderMap::new();
        headers.insert(
            header::LINK,
            HeaderValue::from_static(LDP_BASIC_CONTAINER_LINK),
        );
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/turtle"));

        info!(target_uri = %uri, quoted_url = %uri.to_wire(), "Creating Solid Container");
        let response = self
            .requestor
            .request(Method::PUT, &uri.to_wire(), headers, None)?;
        match response.status.as_u16() {
            201 | 204 => {
                let mut container = Resource::new_container(
                    uri,
                    ResourceStat {
                        mode: libc::S_IFDIR | 0o777,
                        nlink: 2,
                        ..Default::default()
                    },
                );
                container.set_content_type("text/turtle", crate::resource::AttributeSource::Mime);
                hierarchy.insert_child(&parent_uri, container);
                Ok(())
            }
            status => {
                error!(status_code = status, text = %response.text(), "Error creating Solid Container on server");
                Err(FsError::Internal(format!(
                    "unexpected status {status} creating container"
                )))
            }
        }
    }

    /// Delete a resource.
    #[tracing::instrument(skip(self))]
    pub fn unlink(&self, path: &str) -> Result<(), FsError> {
        path::validate(path)?;
        debug!(path, "unlink");

        let mut hierarchy = self.lock_hierarchy();
        let uri = hierarchy.resolve(path, self.requestor.as_ref())?;

        let response = self
            .requestor
            .request(Method::DELETE, &uri.to_wire(), HeaderMap::new(), None)?;
        match response.status.as_u16() {
            // 202 is not supported.
            200 | 204 => {
                hierarchy.remove(&uri);
                self.read_cache.invalidate(&uri);
                Ok(())
            }
            status => {
                error!(status_code = status, text = %response.text(), "Deleting Solid Resource failed");
                Err(FsError::Internal(format!(
                    "unexpected status {status} deleting resource"
                )))
            }
        }
    }

    /// Delete a container. A synonym for [`Self::unlink`].
    #[inline]
    pub fn rmdir(&self, path: &str) -> Result<(), FsError> {
        self.unlink(path)
    }

    /// Move a resource: read it fully, create and write the target,
    /// then unlink the source. Not atomic; any failing step
    /// short-circuits, and a partial failure leaves both paths as
    /// they are at that point.
    #[tracing::instrument(skip(self))]
    pub fn rename(&self, source: &str, target: &str) -> Result<(), FsError> {
        path::validate(source)?;
        path::validate(target)?;
        debug!(source, target, "rename");

        let source_mode = {
            let mut hierarchy = self.lock_hierarchy();
            let uri = hierarchy.resolve(source, self.requestor.as_ref())?;
            hierarchy
                .get(&uri)
                .map(|r| r.stat.mode)
                .unwrap_or(libc::S_IFREG | 0o777)
        };

        let content = self.read_full(source)?;
        self.create(target, source_mode, 0)?;
        self.write(target, &content, 0)?;
        self.flush(target)?;
        self.unlink(source)?;
        Ok(())
    }

    /// Read a byte range of a resource.
    ///
    /// The backend is treated as whole-resource: ranged requests are
    /// intentionally not used, because the kernel asks for many small
    /// chunks whose per-request overhead would dominate.
    #[tracing::instrument(skip(self))]
    pub fn read(&self, path: &str, size: usize, offset: usize) -> Result<Vec<u8>, FsError> {
        path::validate(path)?;
        debug!(path, size, offset, "read");

        let uri = self
            .lock_hierarchy()
            .resolve(path, self.requestor.as_ref())?;

        if offset > 0 {
            if let Some(content) = self.read_cache.get(&uri) {
                debug!(size = content.len(), "Retrieved content from cache");
                return Ok(slice_of(&content, offset, size));
            }
        }

        debug!(uri = %uri, "Fetching");
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*"));
        let response = self
            .requestor
            .request(Method::GET, &uri.to_wire(), headers, None)?;
        if response.status.as_u16() != 200 {
            return Err(FsError::Internal(format!(
                "unexpected status {} reading resource",
                response.status.as_u16()
            )));
        }

        {
            let mut hierarchy = self.lock_hierarchy();
            if let Some(resource) = hierarchy.get_mut(&uri) {
                if let Some(content_type) = response.header_str(&header::CONTENT_TYPE) {
                    let content_type = content_type.to_owned();
                    resource
                        .set_content_type(&content_type, crate::resource::AttributeSource::Header);
                }
                resource.stat.size = response.content.len() as u64;
            }
        }

        if offset == 0 {
            self.read_cache.put(uri, response.content.clone());
        }
        Ok(slice_of(&response.content, offset, size))
    }

    /// Buffer a write. The server is not contacted until
    /// [`Self::flush`].
    #[tracing::instrument(skip(self, buf), fields(size = buf.len()))]
    pub fn write(&self, path: &str, buf: &[u8], offset: usize) -> Result<usize, FsError> {
        path::validate(path)?;
        debug!(path, size = buf.len(), offset, "write");

        let uri = self
            .lock_hierarchy()
            .resolve(path, self.requestor.as_ref())?;
        self.write_buffers
            .write(&uri, buf, offset)
            .map_err(|_| FsError::TooLarge)
    }

    /// Flush a resource's buffered writes as one `PUT`.
    ///
    /// When the inferred content type changed since the server last
    /// saw the resource, the resource is deleted first: some Solid
    /// servers won't alter their view of the content type otherwise.
    /// The buffer is discarded whatever the outcome.
    #[tracing::instrument(skip(self))]
    pub fn flush(&self, path: &str) -> Result<(), FsError> {
        path::validate(path)?;
        debug!(path, "flush");

        let mut hierarchy = self.lock_hierarchy();
        let uri = hierarchy.resolve(path, self.requestor.as_ref())?;
        let Some(buffer) = self.write_buffers.take(&uri) else {
            return Ok(());
        };

        let resource = hierarchy
            .get_mut(&uri)
            .ok_or_else(|| FsError::Internal(format!("resolved resource '{uri}' unknown")))?;
        let previous_content_type = resource.content_type.clone();
        mime::update_from_content(0, resource, &buffer);
        let content_type = resource.content_type.clone();

        let expected_status =
            if content_type != previous_content_type && previous_content_type != DEFAULT_CONTENT_TYPE {
                // The server has content-bearing state under the old
                // type. Don't use unlink, it would drop metadata.
                info!(
                    %previous_content_type,
                    %content_type, "Deleting due to content type changing"
                );
                if let Err(e) =
                    self.requestor
                        .request(Method::DELETE, &uri.to_wire(), HeaderMap::new(), None)
                {
                    debug!(error = %e, "Ignoring delete failure before rewrite");
                }
                201
            } else {
                204
            };

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&content_type)
                .map_err(|_| FsError::Internal("content type is not a valid header".into()))?,
        );
        headers.insert(
            header::CONTENT_LENGTH,
            HeaderValue::from_str(&buffer.len().to_string())
                .expect("a decimal length is a valid header value"),
        );

        let size = buffer.len();
        let response = self
            .requestor
            .request(Method::PUT, &uri.to_wire(), headers, Some(buffer))?;
        self.read_cache.invalidate(&uri);

        if response.status.as_u16() == expected_status {
            debug!(size, status_code = expected_status, "Wrote bytes to Solid server");
            resource.stat.size = size as u64;
            Ok(())
        } else {
            error!(status_code = response.status.as_u16(), "Error writing Solid Resource to server");
            Err(FsError::Internal(format!(
                "unexpected status {} writing resource",
                response.status.as_u16()
            )))
        }
    }

    /// Change the size of a resource.
    ///
    /// Shrinking rewrites the prefix; growing is refused, zero-padding
    /// extension is not performed.
    #[tracing::instrument(skip(self))]
    pub fn truncate(&self, path: &str, size: i64) -> Result<(), FsError> {
        path::validate(path)?;
        if path.ends_with('/') {
            return Err(FsError::Invalid("cannot truncate a container".into()));
        }
        if size < 0 {
            return Err(FsError::Invalid("negative truncate size".into()));
        }
        let size = size as usize;
        debug!(path, size, "truncate");

        let uri = self
            .lock_hierarchy()
            .resolve(path, self.requestor.as_ref())?;

        match self.write_buffers.truncate(&uri, size) {
            TruncateOutcome::Truncated => {
                if let Some(resource) = self.lock_hierarchy().get_mut(&uri) {
                    resource.stat.size = size as u64;
                }
                return Ok(());
            }
            TruncateOutcome::WouldExtend => {
                return Err(FsError::Invalid(format!(
                    "only {size} bytes of content to truncate to"
                )))
            }
            TruncateOutcome::Missing => {}
        }

        if size > 0 {
            let content = self.read(path, size + 1, 0)?;
            if content.len() < size {
                return Err(FsError::Invalid(format!(
                    "unable to truncate to {size} with only {} bytes of content",
                    content.len()
                )));
            }
            if content.len() == size {
                // Already exactly that size.
                return Ok(());
            }
            self.write(path, &content[..size], 0)?;
        } else {
            // No opinion about the current content, write none.
            self.write(path, &[], 0)?;
        }
        self.flush(path)
    }

    /// Get the stat record of a resource, refreshing it from the
    /// server when it was never populated.
    #[tracing::instrument(skip(self))]
    pub fn getattr(&self, path: &str) -> Result<ResourceStat, FsError> {
        path::validate(path)?;

        let mut hierarchy = self.lock_hierarchy();
        let uri = hierarchy.resolve(path, self.requestor.as_ref())?;
        let needs_refresh = hierarchy
            .get(&uri)
            .map(|r| r.stat.mtime == 0 || r.stat.mode == 0)
            .unwrap_or(false);
        if needs_refresh {
            debug!(resource_url = %uri, "Refreshing Resource stats");
            hierarchy.refresh_stat(&uri, self.requestor.as_ref());
        }

        hierarchy
            .get(&uri)
            .map(|r| r.stat.clone())
            .ok_or_else(|| FsError::Internal(format!("resolved resource '{uri}' unknown")))
    }

    /// List a container: `.`, `..`, then one entry per member, named
    /// relative to the container without the trailing slash the
    /// kernel would crash on.
    #[tracing::instrument(skip(self))]
    pub fn readdir(&self, path: &str, offset: u64) -> Result<Vec<DirEntry>, FsError> {
        path::validate(path)?;
        debug!(path, offset, "readdir");

        let mut hierarchy = self.lock_hierarchy();
        let uri = hierarchy.resolve(path, self.requestor.as_ref())?;
        let members = hierarchy.children(&uri, self.requestor.as_ref())?;

        let mut entries = vec![
            DirEntry {
                name: ".".to_owned(),
                kind: EntryKind::Directory,
            },
            DirEntry {
                name: "..".to_owned(),
                kind: EntryKind::Directory,
            },
        ];
        for member in members {
            let Some(relative) = member.relative_to(&uri) else {
                warn!(member = %member, container = %uri, "Member outside its container");
                continue;
            };
            let name = relative.trim_end_matches('/').to_owned();
            debug!(%name, uri = %uri, "Returning directory entry");
            entries.push(DirEntry {
                name,
                kind: if member.is_container() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
            });
        }
        Ok(entries)
    }

    /// Get synthetic file system statistics.
    pub fn statfs(&self) -> StatFs {
        StatFs {
            block_size: 128 * 1024,
            blocks: 1 << 32,
            blocks_free: 1 << 32,
            blocks_available: 1 << 32,
            files: 1 << 32,
            files_free: 1 << 32,
            name_max: path::MAX_PATH_LENGTH as u32,
            flags: (libc::ST_NOATIME | libc::ST_NODIRATIME) as u64,
        }
    }

    /// List a resource's extended attribute names, or the byte count
    /// they need when probed with `size == 0`.
    #[tracing::instrument(skip(self))]
    pub fn listxattr(&self, path: &str, size: u64) -> Result<XattrReply, FsError> {
        path::validate(path)?;
        debug!(path, size, "listxattr");

        let mut hierarchy = self.lock_hierarchy();
        let uri = hierarchy.resolve(path, self.requestor.as_ref())?;
        let names: Vec<String> = hierarchy
            .get(&uri)
            .map(|r| r.extended_attributes.keys().cloned().collect())
            .unwrap_or_default();

        if size == 0 {
            // Joint size of the names plus their null separators.
            let needed = names.iter().map(|n| n.len() as u64 + 1).sum();
            return Ok(XattrReply::Size(needed));
        }
        Ok(XattrReply::Names(names))
    }

    /// Get an extended attribute value, its length when probed with
    /// `size == 0`, or zero for a missing name.
    #[tracing::instrument(skip(self))]
    pub fn getxattr(&self, path: &str, name: &str, size: u64) -> Result<XattrReply, FsError> {
        path::validate(path)?;
        debug!(path, name, size, "getxattr");

        let mut hierarchy = self.lock_hierarchy();
        let uri = hierarchy.resolve(path, self.requestor.as_ref())?;
        let Some(resource) = hierarchy.get(&uri) else {
            return Ok(XattrReply::Size(0));
        };

        // The mime type answers from the resource record even before
        // any HEAD has mirrored it into the attribute map.
        let value = if name == MIME_TYPE_XATTR {
            Some(resource.content_type.clone())
        } else {
            resource
                .extended_attributes
                .get(name)
                .map(|a| a.value.clone())
        };

        match value {
            None => Ok(XattrReply::Size(0)),
            Some(value) if size == 0 => Ok(XattrReply::Size(value.len() as u64)),
            Some(value) => Ok(XattrReply::Data(value.into_bytes())),
        }
    }

    fn read_full(&self, path: &str) -> Result<Vec<u8>, FsError> {
        self.read(path, usize::MAX, 0)
    }
}

/// Split a validated path into its parent path and final segment.
fn split_parent(path: &str) -> Result<(&str, &str), FsError> {
    let (parent, name) = path
        .rsplit_once('/')
        .expect("validated paths always contain '/'");
    if name.is_empty() {
        return Err(FsError::Invalid(format!("'{path}' has no final segment")));
    }
    Ok((if parent.is_empty() { "/" } else { parent }, name))
}

fn slice_of(content: &[u8], offset: usize, size: usize) -> Vec<u8> {
    let start = offset.min(content.len());
    let end = offset.saturating_add(size).min(content.len());
    content[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_parent_defaults_to_the_root() {
        claims::assert_ok_eq!(split_parent("/a.ttl"), ("/", "a.ttl"));
        claims::assert_ok_eq!(split_parent("/d/a.ttl"), ("/d", "a.ttl"));
        claims::assert_err!(split_parent("/d/"));
    }

    #[test]
    fn slices_clamp_to_the_available_content() {
        assert_eq!(slice_of(b"hello", 0, 5), b"hello");
        assert_eq!(slice_of(b"hello", 2, 2), b"ll");
        assert_eq!(slice_of(b"hello", 4, 10), b"o");
        assert_eq!(slice_of(b"hello", 9, 2), b"");
    }

    #[test]
    fn statfs_reads_as_free() {
        let requestor: Arc<dyn Requestor> = Arc::new(NoopRequestor);
        let fs = SolidFs::new(
            "https://pod.example/".try_into().expect("valid uri"),
            requestor,
            None,
            Arc::new(ReadCache::default()),
            "session".to_owned(),
        );
        let statfs = fs.statfs();
        assert_eq!(statfs.block_size, 131072);
        assert_eq!(statfs.blocks, statfs.blocks_free);
        assert_eq!(statfs.name_max, 1024);
    }

    struct NoopRequestor;

    impl Requestor for NoopRequestor {
        fn request(
            &self,
            _method: Method,
            _url: &str,
            _extra_headers: HeaderMap,
            _body: Option<Vec<u8>>,
        ) -> Result<crate::requestor::SolidResponse, crate::error::HttpError> {
            Err(crate::error::HttpError::transport("noop"))
        }
    }
}
