//! I define the transport implementations behind the [`Requestor`]
//! capability.
//!
//! [`Requestor`]: super::Requestor
//!

pub mod async_;
pub mod blocking;

pub use async_::AsyncRequestor;
pub use blocking::BlockingRequestor;
