//! I define typed errors for interactions with a Solid server, and
//! their mapping onto OS `errno` values.
//!

use crate::path::PathError;

/// Classification of a failed http interaction.
///
/// There is such a strong correlation between Solid http status codes
/// and file system codes that the errno of most operations can be
/// determined from the status code alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    /// 3xx.
    Redirection,

    /// 401.
    Unauthorized,

    /// 403.
    Forbidden,

    /// 404.
    NotFound,

    /// 406.
    NotAcceptable,

    /// Any other 4xx.
    BadRequest,

    /// 5xx.
    Server,

    /// Any other status code.
    Unknown,

    /// The request never produced a status code.
    Transport,
}

/// Error of a failed http interaction, carrying the numeric status
/// and the response body text.
#[derive(Debug, Clone, thiserror::Error)]
#[error("HTTP status code {status}: {message}")]
pub struct HttpError {
    /// Error classification.
    pub kind: HttpErrorKind,

    /// Numeric response status, 0 for transport failures.
    pub status: u16,

    /// Response body text, or the transport failure description.
    pub message: String,
}

impl HttpError {
    /// Classify a response status, turning any failed request into a
    /// typed error. Allows greater control in response to problems
    /// than blanket error-for-status helpers.
    pub fn check(status: u16, message: impl FnOnce() -> String) -> Result<(), Self> {
        if status < 300 {
            return Ok(());
        }
        Err(Self::for_status(status, message()))
    }

    /// Build the typed error for a failed status.
    pub fn for_status(status: u16, message: String) -> Self {
        let kind = match status {
            300..=399 => HttpErrorKind::Redirection,
            401 => HttpErrorKind::Unauthorized,
            403 => HttpErrorKind::Forbidden,
            404 => HttpErrorKind::NotFound,
            406 => HttpErrorKind::NotAcceptable,
            400..=499 => HttpErrorKind::BadRequest,
            500..=599 => HttpErrorKind::Server,
            _ => HttpErrorKind::Unknown,
        };
        Self {
            kind,
            status,
            message,
        }
    }

    /// Build an error for a request that failed before producing a
    /// status code.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: HttpErrorKind::Transport,
            status: 0,
            message: message.into(),
        }
    }

    /// Map onto an OS errno value.
    pub fn errno(&self) -> i32 {
        match self.kind {
            HttpErrorKind::Redirection => libc::EREMCHG,
            HttpErrorKind::Unauthorized | HttpErrorKind::Forbidden => libc::EACCES,
            HttpErrorKind::NotFound => libc::ENOENT,
            HttpErrorKind::NotAcceptable => libc::ENOTSUP,
            HttpErrorKind::BadRequest => libc::EINVAL,
            HttpErrorKind::Server => libc::EAGAIN,
            HttpErrorKind::Unknown | HttpErrorKind::Transport => libc::EBADMSG,
        }
    }
}

/// Error of a file system operation.
///
/// The adapter boundary is the single place where these are translated
/// to negative errno values for the kernel.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The supplied path is unsafe.
    #[error(transparent)]
    Path(#[from] PathError),

    /// A server interaction failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// No resource at the given path.
    #[error("'{0}' not found")]
    NotFound(String),

    /// A non-container where a container is required.
    #[error("'{0}' is not a container")]
    NotAContainer(String),

    /// The operation is not supported by this file system.
    #[error("{0} is not supported")]
    NotSupported(&'static str),

    /// A write would grow a buffer beyond the per-resource ceiling.
    #[error("resource content exceeds the write buffer ceiling")]
    TooLarge,

    /// An invalid argument.
    #[error("invalid argument: {0}")]
    Invalid(String),

    /// Anything unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FsError {
    /// Map onto an OS errno value.
    pub fn errno(&self) -> i32 {
        match self {
            Self::Path(e) => e.errno(),
            Self::Http(e) => e.errno(),
            Self::NotFound(_) => libc::ENOENT,
            Self::NotAContainer(_) => libc::ENOTDIR,
            Self::NotSupported(_) => libc::ENOTSUP,
            Self::TooLarge => libc::EFBIG,
            Self::Invalid(_) => libc::EINVAL,
            Self::Internal(_) => libc::EBADMSG,
        }
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_ok};
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(100)]
    #[case(200)]
    #[case(204)]
    #[case(299)]
    fn informational_and_successful_statuses_pass(#[case] status: u16) {
        assert_ok!(HttpError::check(status, String::new));
    }

    #[rstest]
    #[case(301, libc::EREMCHG)]
    #[case(401, libc::EACCES)]
    #[case(403, libc::EACCES)]
    #[case(404, libc::ENOENT)]
    #[case(406, libc::ENOTSUP)]
    #[case(422, libc::EINVAL)]
    #[case(500, libc::EAGAIN)]
    #[case(503, libc::EAGAIN)]
    #[case(600, libc::EBADMSG)]
    fn failed_statuses_map_to_errno(#[case] status: u16, #[case] errno: i32) {
        let error = assert_err!(HttpError::check(status, || "body".to_owned()));
        assert_eq!(error.status, status);
        assert_eq!(error.errno(), errno);
    }

    #[test]
    fn transport_failures_map_to_ebadmsg() {
        assert_eq!(HttpError::transport("refused").errno(), libc::EBADMSG);
    }
}
