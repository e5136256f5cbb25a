//! Attribute translation.
//!
//! Turns raw backend records into protocol-neutral [`ObjectAttributes`] and
//! formats a requested field list for presentation.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use strum::EnumString;

use super::convention::Classified;
use crate::backend::{ContainerRecord, ObjectRecord};
use crate::constants::{DIRECTORY_MODE, FILE_MODE, PLACEHOLDER_OWNER};

/// Attributes of a file or pseudo-directory.
///
/// Built fresh from each backend response and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectAttributes {
    /// Size in bytes; 0 for directories.
    pub size: u64,
    /// Derived from the directory convention only.
    pub is_directory: bool,
    /// Cosmetic POSIX mode, type bits included.
    pub mode_bits: u32,
    /// Not tracked by the backend.
    pub link_count: u32,
    /// Epoch seconds, truncated.
    pub modified_at: i64,
    /// Constant placeholder.
    pub owner: String,
    /// Constant placeholder.
    pub group: String,
}

impl ObjectAttributes {
    fn new(size: u64, is_directory: bool, modified: Option<f64>) -> Self {
        Self {
            size,
            is_directory,
            mode_bits: if is_directory { DIRECTORY_MODE } else { FILE_MODE },
            link_count: 0,
            modified_at: modified.map(|secs| secs.trunc() as i64).unwrap_or(0),
            owner: PLACEHOLDER_OWNER.to_string(),
            group: PLACEHOLDER_OWNER.to_string(),
        }
    }

    /// Attributes of a directory with no record behind it (root, implied).
    pub fn directory() -> Self {
        Self::new(0, true, None)
    }
}

/// A raw backend description to translate.
#[derive(Debug, Clone, Copy)]
pub enum RawEntry<'a> {
    /// The account root.
    Root,
    /// A container.
    Container(&'a ContainerRecord),
    /// A classified listing row or HEAD result.
    Classified(&'a Classified<'a>),
}

/// Translate a raw backend record.
pub fn describe(raw: RawEntry<'_>) -> ObjectAttributes {
    match raw {
        RawEntry::Root => ObjectAttributes::directory(),
        RawEntry::Container(record) => ObjectAttributes::new(0, true, record.last_modified),
        RawEntry::Classified(Classified::File(record)) => describe_file(record),
        RawEntry::Classified(Classified::Directory {
            marker: Some(record),
            ..
        }) => ObjectAttributes::new(0, true, record.last_modified),
        RawEntry::Classified(Classified::Directory { marker: None, .. }) => {
            ObjectAttributes::directory()
        }
    }
}

fn describe_file(record: &ObjectRecord) -> ObjectAttributes {
    ObjectAttributes::new(record.bytes, false, record.last_modified)
}

/// Attribute field names a protocol engine may request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FieldName {
    Size,
    Directory,
    Permissions,
    Hardlinks,
    Modified,
    Owner,
    Group,
    /// Anything the backend cannot supply.
    #[strum(default)]
    Unknown(String),
}

impl FieldName {
    /// Parse a field name; unknown names are kept, never rejected.
    pub fn parse(name: &str) -> Self {
        match FieldName::from_str(name) {
            Ok(field) => field,
            Err(_) => FieldName::Unknown(name.to_string()),
        }
    }

    /// Parse a list of field names.
    pub fn parse_all<I, S>(names: I) -> Vec<FieldName>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().map(|n| Self::parse(n.as_ref())).collect()
    }
}

/// One formatted attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Bool(bool),
    Text(String),
    /// Placeholder for fields that cannot be supplied.
    Empty,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Empty => Ok(()),
        }
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        FieldValue::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

/// Format the requested fields, in order.
///
/// Unknown fields produce [`FieldValue::Empty`] so that one odd request
/// never aborts a whole listing.
pub fn format(fields: &[FieldName], attrs: &ObjectAttributes) -> Vec<FieldValue> {
    fields
        .iter()
        .map(|field| match field {
            FieldName::Size => FieldValue::from(attrs.size),
            FieldName::Directory => FieldValue::Bool(attrs.is_directory),
            FieldName::Permissions => FieldValue::Int(i64::from(attrs.mode_bits)),
            FieldName::Hardlinks => FieldValue::Int(i64::from(attrs.link_count)),
            FieldName::Modified => FieldValue::Int(attrs.modified_at),
            FieldName::Owner => FieldValue::Text(attrs.owner.clone()),
            FieldName::Group => FieldValue::Text(attrs.group.clone()),
            FieldName::Unknown(_) => FieldValue::Empty,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::convention::{classify_object, implied};

    fn file(size: u64, modified: f64) -> ObjectAttributes {
        let record = ObjectRecord::new("f", size, "text/plain").with_last_modified(modified);
        describe(RawEntry::Classified(&classify_object(&record)))
    }

    #[test]
    fn test_stat_scenario() {
        let attrs = file(42, 1_700_000_000.0);
        let fields = FieldName::parse_all(["size", "directory", "modified"]);
        assert_eq!(
            format(&fields, &attrs),
            vec![
                FieldValue::Int(42),
                FieldValue::Bool(false),
                FieldValue::Int(1_700_000_000),
            ]
        );
    }

    #[test]
    fn test_timestamp_truncated() {
        assert_eq!(file(1, 1_700_000_000.99).modified_at, 1_700_000_000);
    }

    #[test]
    fn test_unknown_field_is_empty() {
        let attrs = file(1, 0.0);
        let fields = FieldName::parse_all(["size", "inode", "owner"]);
        assert_eq!(fields[1], FieldName::Unknown("inode".into()));
        assert_eq!(
            format(&fields, &attrs),
            vec![
                FieldValue::Int(1),
                FieldValue::Empty,
                FieldValue::Text("nobody".into()),
            ]
        );
    }

    #[test]
    fn test_directory_kinds() {
        let marker = ObjectRecord::new("d", 0, "application/directory").with_last_modified(5.0);
        let attrs = describe(RawEntry::Classified(&classify_object(&marker)));
        assert!(attrs.is_directory);
        assert_eq!(attrs.modified_at, 5);
        assert_eq!(attrs.mode_bits, DIRECTORY_MODE);

        let attrs = describe(RawEntry::Classified(&implied()));
        assert!(attrs.is_directory);
        assert_eq!(attrs.size, 0);

        let root = describe(RawEntry::Root);
        assert!(root.is_directory);
        assert_eq!(root.size, 0);

        let container = ContainerRecord::new("c");
        assert!(describe(RawEntry::Container(&container)).is_directory);
    }

    #[test]
    fn test_permissions_and_links() {
        let attrs = file(1, 0.0);
        let fields = FieldName::parse_all(["permissions", "hardlinks", "group"]);
        assert_eq!(
            format(&fields, &attrs),
            vec![
                FieldValue::Int(i64::from(FILE_MODE)),
                FieldValue::Int(0),
                FieldValue::Text("nobody".into()),
            ]
        );
    }
}
