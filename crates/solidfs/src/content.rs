//! I define the per-resource write buffering and the whole-resource
//! read cache.
//!

use std::{collections::HashMap, sync::Mutex};

use bytes::Bytes;
use pod_uri::PodUri;

/// Ceiling on a single resource's buffered content. Writes that would
/// grow a buffer beyond it are refused.
pub const MAX_BUFFERED_RESOURCE_SIZE: usize = 64 * 1024 * 1024;

/// Error of a write that would exceed [`MAX_BUFFERED_RESOURCE_SIZE`].
#[derive(Debug, thiserror::Error)]
#[error("buffered content would exceed {MAX_BUFFERED_RESOURCE_SIZE} bytes")]
pub struct BufferTooLarge;

/// Outcome of truncating a buffer in place.
#[derive(Debug, PartialEq, Eq)]
pub enum TruncateOutcome {
    /// No buffer exists for the uri.
    Missing,

    /// The buffer was truncated to the requested size.
    Truncated,

    /// The buffer holds fewer bytes than the requested size.
    /// Zero-padding extension is not performed.
    WouldExtend,
}

/// In-memory assembly of writes, keyed by resource uri.
///
/// A buffer is created on first write and destroyed when taken for a
/// flush.
#[derive(Debug, Default)]
pub struct WriteBufferPool {
    buffers: Mutex<HashMap<PodUri, Vec<u8>>>,
}

impl WriteBufferPool {
    /// Splice `buf` into the resource's buffer at `offset`, extending
    /// the buffer with zero bytes when it is shorter than the write
    /// requires. Returns the number of bytes accepted.
    pub fn write(&self, uri: &PodUri, buf: &[u8], offset: usize) -> Result<usize, BufferTooLarge> {
        let end = offset.checked_add(buf.len()).ok_or(BufferTooLarge)?;
        if end > MAX_BUFFERED_RESOURCE_SIZE {
            return Err(BufferTooLarge);
        }

        let mut buffers = self.buffers.lock().expect("buffer lock poisoned");
        let buffer = buffers.entry(uri.clone()).or_default();
        if buffer.len() < end {
            buffer.resize(end, 0);
        }
        buffer[offset..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    /// Remove and return the resource's buffer, if one exists.
    pub fn take(&self, uri: &PodUri) -> Option<Vec<u8>> {
        self.buffers
            .lock()
            .expect("buffer lock poisoned")
            .remove(uri)
    }

    /// Truncate the resource's buffer in place.
    pub fn truncate(&self, uri: &PodUri, size: usize) -> TruncateOutcome {
        let mut buffers = self.buffers.lock().expect("buffer lock poisoned");
        let Some(buffer) = buffers.get_mut(uri) else {
            return TruncateOutcome::Missing;
        };
        if buffer.len() < size {
            return TruncateOutcome::WouldExtend;
        }
        buffer.truncate(size);
        TruncateOutcome::Truncated
    }
}

/// Whole-resource bodies by uri, populated by offset-0 reads so that
/// the flurry of small sequential reads fuse issues doesn't refetch
/// the resource each time.
#[derive(Debug, Default)]
pub struct ReadCache {
    entries: Mutex<HashMap<PodUri, Bytes>>,
}

impl ReadCache {
    /// Get the cached body of a resource.
    pub fn get(&self, uri: &PodUri) -> Option<Bytes> {
        self.entries
            .lock()
            .expect("read cache lock poisoned")
            .get(uri)
            .cloned()
    }

    /// Record the full body of a resource.
    pub fn put(&self, uri: PodUri, content: Bytes) {
        self.entries
            .lock()
            .expect("read cache lock poisoned")
            .insert(uri, content);
    }

    /// Drop the cached body of a resource.
    pub fn invalidate(&self, uri: &PodUri) {
        self.entries
            .lock()
            .expect("read cache lock poisoned")
            .remove(uri);
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_none, assert_ok, assert_some_eq};

    use super::*;

    fn uri(s: &str) -> PodUri {
        s.try_into().expect("test uri must be valid")
    }

    #[test]
    fn writes_splice_at_offsets_with_zero_fill() {
        let pool = WriteBufferPool::default();
        let uri = uri("https://pod.example/x");

        assert_ok!(pool.write(&uri, b"hello", 0));
        assert_ok!(pool.write(&uri, b"!", 7));
        assert_ok!(pool.write(&uri, b" world", 5));

        assert_some_eq!(pool.take(&uri), b"hello world!".to_vec());
        assert_none!(pool.take(&uri));
    }

    #[test]
    fn oversized_writes_are_refused() {
        let pool = WriteBufferPool::default();
        let uri = uri("https://pod.example/x");
        claims::assert_err!(pool.write(&uri, b"x", MAX_BUFFERED_RESOURCE_SIZE));
    }

    #[test]
    fn truncate_shrinks_but_never_extends() {
        let pool = WriteBufferPool::default();
        let uri = uri("https://pod.example/x");

        assert_eq!(pool.truncate(&uri, 0), TruncateOutcome::Missing);

        assert_ok!(pool.write(&uri, b"original", 0));
        assert_eq!(pool.truncate(&uri, 100), TruncateOutcome::WouldExtend);
        assert_eq!(pool.truncate(&uri, 4), TruncateOutcome::Truncated);
        assert_some_eq!(pool.take(&uri), b"orig".to_vec());
    }

    #[test]
    fn read_cache_round_trips_and_invalidates() {
        let cache = ReadCache::default();
        let uri = uri("https://pod.example/x");

        assert_none!(cache.get(&uri));
        cache.put(uri.clone(), Bytes::from_static(b"body"));
        assert_some_eq!(cache.get(&uri), Bytes::from_static(b"body"));
        cache.invalidate(&uri);
        assert_none!(cache.get(&uri));
    }
}
