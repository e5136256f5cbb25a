//! Virtual paths.
//!
//! A [`VirtualPath`] is the canonical form of whatever segment list a
//! protocol engine hands over. The first segment names a container, the
//! rest form the object key inside it.

use std::fmt;
use std::str::FromStr;

use crate::constants::SEPARATOR;

/// Canonical absolute path: an ordered list of non-empty segments.
///
/// The empty list is the root. No segment is empty, `.`, `..`, or contains
/// the separator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualPath {
    segments: Vec<String>,
}

/// Normalize protocol-supplied segments into a [`VirtualPath`].
///
/// Never fails. Empty segments and `.` are dropped, `..` pops (stopping at
/// the root), and a segment that smuggles in a separator is split.
pub fn normalize<I, S>(segments: I) -> VirtualPath
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for segment in segments {
        for part in segment.as_ref().split(SEPARATOR) {
            match part {
                "" | "." => {}
                ".." => {
                    out.pop();
                }
                name => out.push(name.to_string()),
            }
        }
    }
    VirtualPath { segments: out }
}

impl VirtualPath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns true for the root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The container this path lives in, if any.
    pub fn container(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// The object key inside the container, if the path is below one.
    pub fn key(&self) -> Option<String> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(self.segments[1..].join(&SEPARATOR.to_string()))
    }

    /// Key prefix selecting everything below this path inside its
    /// container: `""` for a container, `"a/b/"` for `/c/a/b`.
    pub fn child_prefix(&self) -> String {
        match self.key() {
            Some(key) => format!("{}{}", key, SEPARATOR),
            None => String::new(),
        }
    }

    /// Last segment.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent path; the root is its own parent.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Append one child name.
    pub fn join(&self, name: &str) -> Self {
        normalize(self.segments.iter().map(String::as_str).chain(std::iter::once(name)))
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "{}", SEPARATOR);
        }
        for segment in &self.segments {
            write!(f, "{}{}", SEPARATOR, segment)?;
        }
        Ok(())
    }
}

impl FromStr for VirtualPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(normalize([s]))
    }
}

impl From<&str> for VirtualPath {
    fn from(s: &str) -> Self {
        normalize([s])
    }
}
