//! The directory convention.
//!
//! Object storage has no directories. The account root and containers are
//! directories by construction; below them every directory is inferred,
//! and this module is the only place that decides what counts as one:
//!
//! | Evidence                 | Example                                  |
//! |--------------------------|------------------------------------------|
//! | [`Evidence::Marker`]     | zero-byte `docs/img` with type `application/directory` |
//! | [`Evidence::Implied`]    | any key under `docs/img/`                |
//!
//! `mkdir` always writes a marker. `rmdir` removes a marker only while no
//! key is implied below it. When a plain object and an implied directory
//! share a name, listings show the directory while `stat` reports the
//! object.

use crate::backend::{ListingEntry, ObjectRecord};
use crate::constants::{DIRECTORY_CONTENT_TYPE, SEPARATOR};

/// Why a path below a container is considered a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evidence {
    /// At least one key lives below the path.
    Implied,
    /// An explicit marker object.
    Marker,
}

/// What a single listing row contributes to its parent directory.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified<'a> {
    /// A stored object that is a regular file.
    File(&'a ObjectRecord),
    /// A directory, with the record of its marker when there is one.
    Directory {
        evidence: Evidence,
        marker: Option<&'a ObjectRecord>,
    },
}

/// Returns true if `content_type` marks a directory.
///
/// Media type parameters (`; charset=...`) are ignored.
pub fn is_directory_marker(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|media| media.eq_ignore_ascii_case(DIRECTORY_CONTENT_TYPE))
}

/// Classify an object record.
pub fn classify_object(record: &ObjectRecord) -> Classified<'_> {
    if is_directory_marker(&record.content_type) {
        Classified::Directory {
            evidence: Evidence::Marker,
            marker: Some(record),
        }
    } else {
        Classified::File(record)
    }
}

/// Split a listing row into the direct-child name it contributes under
/// `prefix` and its classification.
///
/// Rows nested deeper than one level (when the backend ignored the
/// delimiter) contribute their first segment as an implied directory.
/// Returns `None` for rows that name the prefix itself.
pub fn child_of<'a>(entry: &'a ListingEntry, prefix: &str) -> Option<(String, Classified<'a>)> {
    let (name, record) = match entry {
        ListingEntry::Object(record) => (record.name.as_str(), Some(record)),
        ListingEntry::Subdir(subdir) => (subdir.as_str(), None),
    };
    let relative = name.strip_prefix(prefix)?;
    let trimmed = relative.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        return None;
    }

    match (trimmed.split_once(SEPARATOR), record) {
        (None, Some(record)) if relative == trimmed => {
            Some((trimmed.to_string(), classify_object(record)))
        }
        (Some((first, _)), _) => Some((first.to_string(), implied())),
        (None, _) => Some((trimmed.to_string(), implied())),
    }
}

/// Classification of a directory known only from keys below it.
pub fn implied<'a>() -> Classified<'a> {
    Classified::Directory {
        evidence: Evidence::Implied,
        marker: None,
    }
}

/// Every ancestor of a relative key, shallowest first: `a/b/c` yields
/// `a` and `a/b`.
pub fn ancestors(relative: &str) -> Vec<&str> {
    relative
        .match_indices(SEPARATOR)
        .map(|(idx, _)| &relative[..idx])
        .filter(|ancestor| !ancestor.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_detection() {
        assert!(is_directory_marker("application/directory"));
        assert!(is_directory_marker("application/directory; charset=utf-8"));
        assert!(is_directory_marker("Application/Directory"));
        assert!(!is_directory_marker("text/plain"));
        assert!(!is_directory_marker(""));
    }

    #[test]
    fn test_child_of_plain_object() {
        let entry = ListingEntry::Object(ObjectRecord::new("docs/readme.txt", 500, "text/plain"));
        let (name, kind) = child_of(&entry, "docs/").unwrap();
        assert_eq!(name, "readme.txt");
        assert!(matches!(kind, Classified::File(r) if r.bytes == 500));
    }

    #[test]
    fn test_child_of_marker_and_subdir() {
        let marker = ListingEntry::Object(ObjectRecord::new("docs/img", 0, DIRECTORY_CONTENT_TYPE));
        let (name, kind) = child_of(&marker, "docs/").unwrap();
        assert_eq!(name, "img");
        assert!(matches!(
            kind,
            Classified::Directory { evidence: Evidence::Marker, .. }
        ));

        let subdir = ListingEntry::Subdir("docs/img/".into());
        let (name, kind) = child_of(&subdir, "docs/").unwrap();
        assert_eq!(name, "img");
        assert_eq!(kind, implied());
    }

    #[test]
    fn test_child_of_deeper_key_without_delimiter() {
        let entry = ListingEntry::Object(ObjectRecord::new("docs/img/logo.png", 2000, "image/png"));
        let (name, kind) = child_of(&entry, "docs/").unwrap();
        assert_eq!(name, "img");
        assert_eq!(kind, implied());
    }

    #[test]
    fn test_child_of_skips_self() {
        let entry = ListingEntry::Object(ObjectRecord::new("docs/", 0, "text/plain"));
        assert!(child_of(&entry, "docs/").is_none());
        let other = ListingEntry::Object(ObjectRecord::new("other/x", 0, "text/plain"));
        assert!(child_of(&other, "docs/").is_none());
    }

    #[test]
    fn test_ancestors() {
        assert_eq!(ancestors("a/b/c"), vec!["a", "a/b"]);
        assert!(ancestors("file").is_empty());
    }
}
