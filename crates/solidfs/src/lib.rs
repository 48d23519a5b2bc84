//! SolidFS presents a remote Solid Pod as a mountable POSIX file
//! system: ldp containers appear as directories, non-container
//! resources as files, and ordinary file operations are translated
//! into http requests against the Pod.
//!

#![warn(missing_docs)]
#![deny(unused_qualifications)]

pub mod activity;
pub mod authn;
pub mod background;
pub mod config;
pub mod content;
pub mod error;
pub mod fs;
pub mod fuse;
pub mod header;
pub mod hierarchy;
pub mod mime;
pub mod notify;
pub mod path;
pub mod requestor;
pub mod resource;
pub mod tracing;

pub use crate::{config::Settings, fs::SolidFs};
