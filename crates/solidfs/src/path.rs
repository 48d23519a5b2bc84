//! I define safety checks applied to every path before it can reach
//! the network.
//!

use std::ffi::OsStr;

/// A very specific name so error handling can be exercised end to end.
pub const RESERVED_PATH_SENTINEL: &str = "6291403e-8887-40ec-9e6d-7f394008a979";

/// Longest path accepted, in bytes.
pub const MAX_PATH_LENGTH: usize = 1024;

/// Error of an unsafe path.
///
/// Passing these checks does not ensure the path will be acceptable to
/// the Solid server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path is not valid utf-8.
    #[error("path is not valid utf-8")]
    NotUtf8,

    /// The path does not begin with `/`.
    #[error("path does not begin with '/'")]
    NotAbsolute,

    /// The path is longer than [`MAX_PATH_LENGTH`] bytes.
    #[error("path is longer than {MAX_PATH_LENGTH} bytes")]
    TooLong,

    /// The path contains the reserved sentinel name.
    #[error("path contains the reserved sentinel name")]
    Reserved,
}

impl PathError {
    /// Map onto an OS errno value.
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotUtf8 => libc::EFAULT,
            Self::NotAbsolute => libc::ENOTDIR,
            Self::TooLong => libc::ENAMETOOLONG,
            Self::Reserved => libc::EINVAL,
        }
    }
}

/// Check that a path is safe to translate into a request.
pub fn validate(path: &str) -> Result<(), PathError> {
    if !path.starts_with('/') {
        return Err(PathError::NotAbsolute);
    }
    if path.len() > MAX_PATH_LENGTH {
        return Err(PathError::TooLong);
    }
    if path.contains(RESERVED_PATH_SENTINEL) {
        return Err(PathError::Reserved);
    }
    Ok(())
}

/// Decode a path arriving from the kernel as raw bytes.
pub fn decode(path: &OsStr) -> Result<&str, PathError> {
    path.to_str().ok_or(PathError::NotUtf8)
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_ok};
    use rstest::rstest;

    use super::*;

    #[test]
    fn ordinary_paths_pass() {
        assert_ok!(validate("/"));
        assert_ok!(validate("/a/b/c.ttl"));
        assert_ok!(validate("/🦖"));
    }

    #[rstest]
    #[case("relative/path", PathError::NotAbsolute)]
    #[case("", PathError::NotAbsolute)]
    fn relative_paths_are_rejected(#[case] path: &str, #[case] expected: PathError) {
        assert_eq!(validate(path), Err(expected));
    }

    #[test]
    fn overlong_path_is_rejected_by_errno() {
        let path = format!("/{}", "a".repeat(MAX_PATH_LENGTH));
        let error = assert_err!(validate(&path));
        assert_eq!(error, PathError::TooLong);
        assert_eq!(error.errno(), libc::ENAMETOOLONG);
    }

    #[test]
    fn sentinel_path_is_rejected_by_errno() {
        let path = format!("/{RESERVED_PATH_SENTINEL}");
        let error = assert_err!(validate(&path));
        assert_eq!(error.errno(), libc::EINVAL);
    }

    #[test]
    fn path_of_exactly_max_length_passes() {
        let path = format!("/{}", "a".repeat(MAX_PATH_LENGTH - 1));
        assert_ok!(validate(&path));
    }
}
