//! Shell adapter: the surface a protocol engine drives.
//!
//! Each call normalizes the engine's path segments, delegates to the
//! [`SwiftFileSystem`] or the transfer bridge, formats requested fields and
//! remaps failures into [`ShellError`]. The adapter keeps no state between
//! calls beyond its [`ShellPolicy`].

mod error;
mod files;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub use error::{ShellError, ShellResult};
pub use files::{ReadFile, WriteFile};

use crate::backend::ObjectStore;
use crate::vfs::{
    DirectoryListing, FieldName, FieldValue, FsOptions, SwiftFileSystem, VfsError, attrs,
    normalize,
};

/// Lenient behaviours, each off or on explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellPolicy {
    /// `access` on a missing path grants instead of failing, so clients
    /// can change into paths that do not exist yet.
    pub lenient_access: bool,
    /// `remove_directory` on a missing path succeeds instead of failing.
    pub lenient_remove_directory: bool,
}

impl Default for ShellPolicy {
    fn default() -> Self {
        Self {
            lenient_access: true,
            lenient_remove_directory: false,
        }
    }
}

/// One listing row: child name and its formatted fields.
pub type ListingRow = (String, Vec<FieldValue>);

/// Per-session façade over one backend session.
#[derive(Debug, Clone)]
pub struct SwiftShell {
    fs: SwiftFileSystem,
    policy: ShellPolicy,
}

impl SwiftShell {
    pub fn new(store: Arc<dyn ObjectStore>, options: FsOptions, policy: ShellPolicy) -> Self {
        Self {
            fs: SwiftFileSystem::with_options(store, options),
            policy,
        }
    }

    pub fn filesystem(&self) -> &SwiftFileSystem {
        &self.fs
    }

    pub fn policy(&self) -> ShellPolicy {
        self.policy
    }

    /// Succeeds if `path` is a directory.
    ///
    /// With `lenient_access`, a missing path is granted too.
    pub async fn access<S: AsRef<str>>(&self, path: &[S]) -> ShellResult<()> {
        let path = normalize(path);
        match self.fs.get_attributes(&path).await {
            Ok(attrs) if attrs.is_directory => Ok(()),
            Ok(_) => Err(ShellError::IsNotADirectory(path.to_string())),
            Err(VfsError::NotFound(_)) if self.policy.lenient_access => {
                debug!(path = %path, "granting access to missing path");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Requested fields of one path, in request order.
    pub async fn stat<S: AsRef<str>>(
        &self,
        path: &[S],
        fields: &[FieldName],
    ) -> ShellResult<Vec<FieldValue>> {
        let path = normalize(path);
        let attrs = self.fs.get_attributes(&path).await?;
        Ok(attrs::format(fields, &attrs))
    }

    /// Requested fields of every direct child, sorted by name.
    pub async fn list<S: AsRef<str>>(
        &self,
        path: &[S],
        fields: &[FieldName],
    ) -> ShellResult<Vec<ListingRow>> {
        let path = normalize(path);
        let listing = self.fs.list_children(&path).await?;
        Ok(rows(listing, fields))
    }

    /// Requested fields of every descendant, keyed by relative path.
    pub async fn list_recursive<S: AsRef<str>>(
        &self,
        path: &[S],
        fields: &[FieldName],
    ) -> ShellResult<Vec<ListingRow>> {
        let path = normalize(path);
        let listing = self.fs.list_all_descendants(&path).await?;
        Ok(rows(listing, fields))
    }

    pub async fn make_directory<S: AsRef<str>>(&self, path: &[S]) -> ShellResult<()> {
        Ok(self.fs.make_directory(&normalize(path)).await?)
    }

    /// Remove an empty directory.
    ///
    /// With `lenient_remove_directory`, a missing path counts as removed.
    pub async fn remove_directory<S: AsRef<str>>(&self, path: &[S]) -> ShellResult<()> {
        let path = normalize(path);
        match self.fs.remove_directory(&path).await {
            Err(VfsError::NotFound(_)) if self.policy.lenient_remove_directory => {
                debug!(path = %path, "directory already absent");
                Ok(())
            }
            result => Ok(result?),
        }
    }

    pub async fn remove_file<S: AsRef<str>>(&self, path: &[S]) -> ShellResult<()> {
        Ok(self.fs.remove_file(&normalize(path)).await?)
    }

    /// Rename a file. Not atomic; see [`SwiftFileSystem::rename_file`].
    pub async fn rename<S: AsRef<str>, T: AsRef<str>>(
        &self,
        from: &[S],
        to: &[T],
    ) -> ShellResult<()> {
        Ok(self
            .fs
            .rename_file(&normalize(from), &normalize(to))
            .await?)
    }

    /// Open an existing file for reading.
    pub async fn open_for_reading<S: AsRef<str>>(&self, path: &[S]) -> ShellResult<ReadFile> {
        let path = normalize(path);
        self.fs.check_file_existence(&path).await?;
        Ok(ReadFile::new(self.fs.clone(), path))
    }

    /// Open a file for writing, creating or replacing it on close.
    pub async fn open_for_writing<S: AsRef<str>>(&self, path: &[S]) -> ShellResult<WriteFile> {
        let path = normalize(path);
        if path.key().is_none() {
            return Err(ShellError::IsADirectory(path.to_string()));
        }
        match self.fs.get_attributes(&path).await {
            Ok(attrs) if attrs.is_directory => Err(ShellError::IsADirectory(path.to_string())),
            Ok(_) | Err(VfsError::NotFound(_)) => Ok(WriteFile::new(self.fs.clone(), path)),
            Err(e) => Err(e.into()),
        }
    }
}

fn rows(listing: DirectoryListing, fields: &[FieldName]) -> Vec<ListingRow> {
    listing
        .into_iter()
        .map(|(name, attrs)| {
            let values = attrs::format(fields, &attrs);
            (name, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;

    fn shell(policy: ShellPolicy) -> SwiftShell {
        let store = MemoryStore::new();
        store.insert("docs", "readme.txt", vec![0u8; 500], "text/plain", 1.0);
        store.insert("docs", "img/logo.png", vec![0u8; 2000], "image/png", 2.0);
        SwiftShell::new(Arc::new(store), FsOptions::default(), policy)
    }

    #[tokio::test]
    async fn test_access() {
        let sh = shell(ShellPolicy::default());
        sh.access(&["docs", "img"]).await.unwrap();
        sh.access::<&str>(&[]).await.unwrap();
        assert_eq!(
            sh.access(&["docs", "readme.txt"]).await.unwrap_err(),
            ShellError::IsNotADirectory("/docs/readme.txt".into())
        );
        sh.access(&["docs", "later"]).await.unwrap();

        let strict = shell(ShellPolicy {
            lenient_access: false,
            ..ShellPolicy::default()
        });
        assert!(matches!(
            strict.access(&["docs", "later"]).await.unwrap_err(),
            ShellError::FileNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_remove_directory_policy() {
        let strict = shell(ShellPolicy::default());
        assert!(matches!(
            strict.remove_directory(&["docs", "gone"]).await.unwrap_err(),
            ShellError::FileNotFound(_)
        ));

        let lenient = shell(ShellPolicy {
            lenient_remove_directory: true,
            ..ShellPolicy::default()
        });
        lenient.remove_directory(&["docs", "gone"]).await.unwrap();
        assert!(matches!(
            lenient.remove_directory(&["docs", "img"]).await.unwrap_err(),
            ShellError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_list_rows_sorted() {
        let sh = shell(ShellPolicy::default());
        let fields = FieldName::parse_all(["directory", "size"]);
        let rows = sh.list(&["docs"], &fields).await.unwrap();
        assert_eq!(
            rows,
            vec![
                (
                    "img".to_string(),
                    vec![FieldValue::Bool(true), FieldValue::Int(0)]
                ),
                (
                    "readme.txt".to_string(),
                    vec![FieldValue::Bool(false), FieldValue::Int(500)]
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_open_errors() {
        let sh = shell(ShellPolicy::default());
        assert!(matches!(
            sh.open_for_reading(&["docs", "img"]).await.unwrap_err(),
            ShellError::IsADirectory(_)
        ));
        assert!(matches!(
            sh.open_for_reading(&["docs", "nope"]).await.unwrap_err(),
            ShellError::FileNotFound(_)
        ));
        assert!(matches!(
            sh.open_for_writing(&["docs", "img"]).await.unwrap_err(),
            ShellError::IsADirectory(_)
        ));
        assert!(matches!(
            sh.open_for_writing(&["docs"]).await.unwrap_err(),
            ShellError::IsADirectory(_)
        ));
    }

    #[test]
    fn test_policy_defaults() {
        let policy: ShellPolicy = ron::from_str("(lenient_remove_directory: true)").unwrap();
        assert!(policy.lenient_access);
        assert!(policy.lenient_remove_directory);
    }
}
