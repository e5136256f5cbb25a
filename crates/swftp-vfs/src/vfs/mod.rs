//! Virtual filesystem over object storage.
//!
//! Presents the flat container/object namespace as a directory tree:
//!
//! - [`path`] - Canonical paths and normalization
//! - [`convention`] - What counts as a directory
//! - [`attrs`] - Protocol-neutral attributes and field formatting
//! - [`fs`] - The filesystem operations themselves

pub mod attrs;
pub mod convention;
mod error;
pub mod fs;
pub mod path;

use std::collections::BTreeMap;

pub use attrs::{FieldName, FieldValue, ObjectAttributes};
pub use convention::Evidence;
pub use error::{VfsError, VfsResult};
pub use fs::{FsOptions, SwiftFileSystem};
pub use path::{VirtualPath, normalize};

/// Directory contents keyed by child name (or relative path for
/// recursive listings), in byte order.
pub type DirectoryListing = BTreeMap<String, ObjectAttributes>;
