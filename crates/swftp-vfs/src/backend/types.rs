//! Raw records returned by object-storage backends.

use bytes::Bytes;
use futures::stream::BoxStream;

use super::BackendResult;

/// Streamed object body.
///
/// Used in both directions: a GET yields one, a PUT consumes one.
pub type ByteStream = BoxStream<'static, BackendResult<Bytes>>;

/// A container as reported by an account listing or a container HEAD.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRecord {
    /// Container name.
    pub name: String,
    /// Number of objects stored.
    pub object_count: u64,
    /// Total bytes stored.
    pub bytes_used: u64,
    /// Last modification, epoch seconds.
    pub last_modified: Option<f64>,
}

impl ContainerRecord {
    /// Create an empty container record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_count: 0,
            bytes_used: 0,
            last_modified: None,
        }
    }
}

/// An object as reported by a container listing or an object HEAD.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    /// Full object key within its container.
    pub name: String,
    /// Size in bytes.
    pub bytes: u64,
    /// Media type as stored by the backend.
    pub content_type: String,
    /// Last modification, epoch seconds.
    pub last_modified: Option<f64>,
}

impl ObjectRecord {
    /// Create an object record.
    pub fn new(name: impl Into<String>, bytes: u64, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            content_type: content_type.into(),
            last_modified: None,
        }
    }

    /// Set the modification time.
    pub fn with_last_modified(mut self, epoch_secs: f64) -> Self {
        self.last_modified = Some(epoch_secs);
        self
    }
}

/// One row of a container listing.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingEntry {
    /// A stored object.
    Object(ObjectRecord),
    /// A key prefix rolled up by the delimiter. Includes the trailing
    /// delimiter, e.g. `"docs/img/"`.
    Subdir(String),
}

impl ListingEntry {
    /// The name used as the pagination marker for the next page.
    pub fn marker(&self) -> &str {
        match self {
            ListingEntry::Object(record) => &record.name,
            ListingEntry::Subdir(prefix) => prefix,
        }
    }
}

/// Listing parameters with Swift prefix/delimiter/marker semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Only names starting with this prefix.
    pub prefix: Option<String>,
    /// Roll up names containing this character after the prefix.
    pub delimiter: Option<char>,
    /// Only names sorting strictly after this marker.
    pub marker: Option<String>,
    /// Maximum rows in one page.
    pub limit: Option<usize>,
}

impl ListQuery {
    /// Create an unfiltered query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    /// Roll up on a delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Continue after a marker.
    pub fn with_marker(mut self, marker: Option<String>) -> Self {
        self.marker = marker;
        self
    }

    /// Limit the page size.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
