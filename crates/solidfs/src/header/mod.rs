//! I define the typed headers of the Solid wire surface that the
//! standard [`headers`] crate doesn't cover.
//!

pub mod link;
pub mod wac_allow;

pub use link::{Link, LinkValue};
pub use wac_allow::{AccessMode, AccessParam, WacAllow};
