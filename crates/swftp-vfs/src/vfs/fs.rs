//! Hierarchical filesystem over a flat object store.

use futures::StreamExt;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use tracing::{debug, warn};

use super::attrs::{ObjectAttributes, RawEntry, describe};
use super::convention::{self, Classified, Evidence};
use super::error::{VfsError, VfsResult};
use super::path::VirtualPath;
use super::DirectoryListing;
use crate::backend::{
    BackendError, ByteStream, ContainerRecord, ListQuery, ListingEntry, ObjectStore,
};
use crate::constants::{
    DEFAULT_LISTING_PAGE_SIZE, DEFAULT_UPLOAD_QUEUE_DEPTH, DIRECTORY_CONTENT_TYPE, SEPARATOR,
};
use crate::transfer::{self, Completion, DataConsumer, UploadSink};

/// Tunables for [`SwiftFileSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsOptions {
    /// Rows requested per listing page.
    pub listing_page_size: usize,
    /// Chunks queued between an upload sink and its PUT body.
    pub upload_queue_depth: usize,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self {
            listing_page_size: DEFAULT_LISTING_PAGE_SIZE,
            upload_queue_depth: DEFAULT_UPLOAD_QUEUE_DEPTH,
        }
    }
}

/// Merges listing rows, letting stronger directory evidence win when
/// several rows name the same entry.
#[derive(Default)]
struct ListingBuilder {
    entries: BTreeMap<String, (u8, ObjectAttributes)>,
}

impl ListingBuilder {
    fn rank(kind: &Classified<'_>) -> u8 {
        match kind {
            Classified::File(_) => 0,
            Classified::Directory {
                evidence: Evidence::Implied,
                ..
            } => 1,
            Classified::Directory {
                evidence: Evidence::Marker,
                ..
            } => 2,
        }
    }

    fn offer(&mut self, name: String, kind: &Classified<'_>) {
        let rank = Self::rank(kind);
        match self.entries.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert((rank, describe(RawEntry::Classified(kind))));
            }
            Entry::Occupied(mut slot) if slot.get().0 < rank => {
                slot.insert((rank, describe(RawEntry::Classified(kind))));
            }
            Entry::Occupied(_) => {}
        }
    }

    fn insert(&mut self, name: String, attrs: ObjectAttributes) {
        self.entries.insert(name, (u8::MAX, attrs));
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn finish(self) -> DirectoryListing {
        self.entries
            .into_iter()
            .map(|(name, (_, attrs))| (name, attrs))
            .collect()
    }
}

fn empty_body() -> ByteStream {
    futures::stream::empty().boxed()
}

/// Virtual filesystem over one backend session.
///
/// Holds no state between calls: the backend is always the source of
/// truth, so sessions sharing a store need no locking.
#[derive(Clone)]
pub struct SwiftFileSystem {
    store: Arc<dyn ObjectStore>,
    options: FsOptions,
}

impl std::fmt::Debug for SwiftFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwiftFileSystem")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SwiftFileSystem {
    /// Create a filesystem over `store` with default options.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_options(store, FsOptions::default())
    }

    /// Create a filesystem with explicit options.
    pub fn with_options(store: Arc<dyn ObjectStore>, options: FsOptions) -> Self {
        Self { store, options }
    }

    /// The backend this filesystem drives.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Attributes of a file or directory.
    ///
    /// The root always succeeds, even on an empty account.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    pub async fn get_attributes(&self, path: &VirtualPath) -> VfsResult<ObjectAttributes> {
        let Some(container) = path.container() else {
            return Ok(describe(RawEntry::Root));
        };
        let Some(key) = path.key() else {
            let record = self.store.head_container(container).await?;
            return Ok(describe(RawEntry::Container(&record)));
        };

        match self.store.head_object(container, &key).await {
            Ok(record) => Ok(describe(RawEntry::Classified(&convention::classify_object(
                &record,
            )))),
            Err(e) if e.is_not_found() => {
                if self.has_children(container, &path.child_prefix()).await? {
                    Ok(describe(RawEntry::Classified(&convention::implied())))
                } else {
                    Err(VfsError::not_found(path))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether anything (file or directory) lives at `path`.
    ///
    /// Only a missing path yields `false`; backend failures propagate.
    pub async fn exists(&self, path: &VirtualPath) -> VfsResult<bool> {
        match self.get_attributes(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Attributes of a path that must be a file.
    pub async fn check_file_existence(&self, path: &VirtualPath) -> VfsResult<ObjectAttributes> {
        let attrs = self.get_attributes(path).await?;
        if attrs.is_directory {
            return Err(VfsError::is_a_directory(path));
        }
        Ok(attrs)
    }

    /// Direct children of a directory, keyed by name.
    ///
    /// Directories are synthesized both from markers and from deeper keys,
    /// so `a/b/file` makes `b` appear when listing `a`.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    pub async fn list_children(&self, path: &VirtualPath) -> VfsResult<DirectoryListing> {
        let Some(container) = path.container() else {
            return self.list_root().await;
        };

        let prefix = path.child_prefix();
        let query = ListQuery::new()
            .with_prefix(prefix.clone())
            .with_delimiter(SEPARATOR);
        let entries = self.collect_objects(container, query).await?;

        let mut builder = ListingBuilder::default();
        for entry in &entries {
            if let Some((name, kind)) = convention::child_of(entry, &prefix) {
                builder.offer(name, &kind);
            }
        }

        if builder.is_empty() {
            self.require_directory(path).await?;
        }
        debug!(entries = builder.entries.len(), "listed children");
        Ok(builder.finish())
    }

    /// Every descendant of a directory, keyed by path relative to it.
    ///
    /// Intermediate directories are included even when only implied.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    pub async fn list_all_descendants(&self, path: &VirtualPath) -> VfsResult<DirectoryListing> {
        let Some(container) = path.container() else {
            let mut builder = ListingBuilder::default();
            for record in self.collect_containers().await? {
                let below = self.descendants_of(&record.name, "").await?;
                for (relative, attrs) in below.finish() {
                    builder.insert(format!("{}{}{}", record.name, SEPARATOR, relative), attrs);
                }
                builder.insert(record.name.clone(), describe(RawEntry::Container(&record)));
            }
            return Ok(builder.finish());
        };

        let builder = self.descendants_of(container, &path.child_prefix()).await?;
        if builder.is_empty() {
            self.require_directory(path).await?;
        }
        Ok(builder.finish())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a directory. Idempotent on an existing directory.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    pub async fn make_directory(&self, path: &VirtualPath) -> VfsResult<()> {
        let Some(container) = path.container() else {
            return Ok(());
        };
        let Some(key) = path.key() else {
            self.store.put_container(container).await?;
            return Ok(());
        };

        match self.store.head_object(container, &key).await {
            Ok(record) if convention::is_directory_marker(&record.content_type) => Ok(()),
            Ok(_) => Err(VfsError::conflict(path)),
            Err(e) if e.is_not_found() => {
                self.store
                    .put_object(container, &key, Some(DIRECTORY_CONTENT_TYPE), empty_body())
                    .await?;
                debug!("created directory marker");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove an empty directory.
    ///
    /// Non-empty directories are rejected with `Conflict`; nothing cascades.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    pub async fn remove_directory(&self, path: &VirtualPath) -> VfsResult<()> {
        let Some(container) = path.container() else {
            return Err(VfsError::not_implemented("removing the root"));
        };
        let Some(key) = path.key() else {
            if self.has_children(container, "").await? {
                return Err(VfsError::conflict(format!("directory not empty: {}", path)));
            }
            return self
                .store
                .delete_container(container)
                .await
                .map_err(|e| Self::at_path(e, path));
        };

        let attrs = self.get_attributes(path).await?;
        if !attrs.is_directory {
            return Err(VfsError::not_a_directory(path));
        }
        if self.has_children(container, &path.child_prefix()).await? {
            return Err(VfsError::conflict(format!("directory not empty: {}", path)));
        }
        self.store
            .delete_object(container, &key)
            .await
            .map_err(|e| Self::at_path(e, path))
    }

    /// Remove a file.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    pub async fn remove_file(&self, path: &VirtualPath) -> VfsResult<()> {
        let (Some(container), Some(key)) = (path.container(), path.key()) else {
            return Err(VfsError::is_a_directory(path));
        };
        self.check_file_existence(path).await?;
        self.store
            .delete_object(container, &key)
            .await
            .map_err(|e| Self::at_path(e, path))
    }

    /// Rename a file.
    ///
    /// This is a server-side copy followed by a delete and is **not
    /// atomic**. A crash in between leaves both objects present; a failed
    /// delete is reported as the error of the whole rename while the copy
    /// remains. Containers and directories cannot be renamed.
    #[tracing::instrument(level = "debug", skip_all, fields(from = %old, to = %new))]
    pub async fn rename_file(&self, old: &VirtualPath, new: &VirtualPath) -> VfsResult<()> {
        let (Some(old_container), Some(old_key)) = (old.container(), old.key()) else {
            return Err(VfsError::not_implemented(format!("renaming container {}", old)));
        };
        let (Some(new_container), Some(new_key)) = (new.container(), new.key()) else {
            return Err(VfsError::not_implemented(format!("renaming onto container {}", new)));
        };

        let source = self.get_attributes(old).await?;
        if source.is_directory {
            return Err(VfsError::not_implemented(format!("renaming directory {}", old)));
        }
        if old == new {
            return Ok(());
        }

        match self.get_attributes(new).await {
            Ok(dest) if dest.is_directory => return Err(VfsError::conflict(new)),
            Ok(_) if old_container != new_container => return Err(VfsError::conflict(new)),
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        self.store
            .copy_object((old_container, &old_key), (new_container, &new_key))
            .await?;
        if let Err(e) = self.store.delete_object(old_container, &old_key).await {
            warn!(error = %e, "rename copied but could not delete the source; both exist");
            return Err(e.into());
        }
        debug!("renamed");
        Ok(())
    }

    // ========================================================================
    // Transfers
    // ========================================================================

    /// Start streaming an upload to `path`.
    ///
    /// Returns the completion signal and the sink to write into. The PUT is
    /// already in flight when this returns.
    pub fn begin_upload(&self, path: &VirtualPath) -> VfsResult<(Completion, UploadSink)> {
        let (Some(container), Some(key)) = (path.container(), path.key()) else {
            return Err(VfsError::is_a_directory(path));
        };
        debug!(path = %path, "begin upload");
        Ok(transfer::begin_upload(
            Arc::clone(&self.store),
            container.to_string(),
            key,
            self.options.upload_queue_depth,
        ))
    }

    /// Start streaming `path` into `consumer`.
    pub fn begin_download<C>(&self, path: &VirtualPath, consumer: C) -> VfsResult<Completion>
    where
        C: DataConsumer + 'static,
    {
        let (Some(container), Some(key)) = (path.container(), path.key()) else {
            return Err(VfsError::is_a_directory(path));
        };
        debug!(path = %path, "begin download");
        Ok(transfer::begin_download(
            Arc::clone(&self.store),
            container.to_string(),
            key,
            consumer,
        ))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Rewrite a backend NotFound to name the path the caller asked about.
    fn at_path(e: BackendError, path: &VirtualPath) -> VfsError {
        match e {
            BackendError::NotFound(_) => VfsError::not_found(path),
            other => other.into(),
        }
    }

    /// Fail unless `path` is an existing directory.
    async fn require_directory(&self, path: &VirtualPath) -> VfsResult<()> {
        let attrs = self.get_attributes(path).await?;
        if attrs.is_directory {
            Ok(())
        } else {
            Err(VfsError::not_a_directory(path))
        }
    }

    /// Whether any key lives under `prefix`. A missing container has none.
    async fn has_children(&self, container: &str, prefix: &str) -> VfsResult<bool> {
        let query = ListQuery::new().with_prefix(prefix).with_limit(1);
        match self.store.list_objects(container, &query).await {
            Ok(page) => Ok(!page.is_empty()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_root(&self) -> VfsResult<DirectoryListing> {
        let mut builder = ListingBuilder::default();
        for record in self.collect_containers().await? {
            let attrs = describe(RawEntry::Container(&record));
            builder.insert(record.name, attrs);
        }
        Ok(builder.finish())
    }

    async fn descendants_of(&self, container: &str, prefix: &str) -> VfsResult<ListingBuilder> {
        let query = ListQuery::new().with_prefix(prefix);
        let entries = self.collect_objects(container, query).await?;

        let mut builder = ListingBuilder::default();
        for entry in &entries {
            let (name, kind) = match entry {
                ListingEntry::Object(record) => (record.name.as_str(), convention::classify_object(record)),
                ListingEntry::Subdir(subdir) => (subdir.as_str(), convention::implied()),
            };
            let Some(relative) = name.strip_prefix(prefix) else {
                continue;
            };
            let relative = relative.trim_end_matches(SEPARATOR);
            if relative.is_empty() {
                continue;
            }
            for ancestor in convention::ancestors(relative) {
                builder.offer(ancestor.to_string(), &convention::implied());
            }
            builder.offer(relative.to_string(), &kind);
        }
        Ok(builder)
    }

    /// Page through a container listing until an empty page.
    ///
    /// Any failing page fails the whole listing.
    async fn collect_objects(
        &self,
        container: &str,
        base: ListQuery,
    ) -> VfsResult<Vec<ListingEntry>> {
        let mut entries = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let query = base
                .clone()
                .with_marker(marker.clone())
                .with_limit(self.options.listing_page_size);
            let page = self.store.list_objects(container, &query).await?;
            let Some(last) = page.last() else {
                break;
            };
            let next = last.marker().to_string();
            if marker.as_deref() == Some(next.as_str()) {
                return Err(VfsError::Transport(format!(
                    "listing of /{} stopped advancing at {}",
                    container, next
                )));
            }
            marker = Some(next);
            entries.extend(page);
        }
        Ok(entries)
    }

    /// Page through the account listing until an empty page.
    async fn collect_containers(&self) -> VfsResult<Vec<ContainerRecord>> {
        let mut records = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let query = ListQuery::new()
                .with_marker(marker.clone())
                .with_limit(self.options.listing_page_size);
            let page = self.store.list_containers(&query).await?;
            let Some(last) = page.last() else {
                break;
            };
            if marker.as_deref() == Some(last.name.as_str()) {
                return Err(VfsError::Transport(format!(
                    "account listing stopped advancing at {}",
                    last.name
                )));
            }
            marker = Some(last.name.clone());
            records.extend(page);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;

    fn fs_with(store: MemoryStore) -> (Arc<MemoryStore>, SwiftFileSystem) {
        let store = Arc::new(store);
        let fs = SwiftFileSystem::new(store.clone());
        (store, fs)
    }

    fn docs_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert("docs", "readme.txt", vec![0u8; 500], "text/plain", 1.0);
        store.insert("docs", "img/logo.png", vec![0u8; 2000], "image/png", 2.0);
        store
    }

    fn p(s: &str) -> VirtualPath {
        VirtualPath::from(s)
    }

    #[tokio::test]
    async fn test_root_attributes_on_empty_account() {
        let (_, fs) = fs_with(MemoryStore::new());
        let attrs = fs.get_attributes(&VirtualPath::root()).await.unwrap();
        assert!(attrs.is_directory);
        assert_eq!(attrs.size, 0);
    }

    #[tokio::test]
    async fn test_listing_scenario() {
        let (_, fs) = fs_with(docs_store());
        let listing = fs.list_children(&p("/docs")).await.unwrap();
        assert_eq!(listing.len(), 2);
        let readme = &listing["readme.txt"];
        assert!(!readme.is_directory);
        assert_eq!(readme.size, 500);
        let img = &listing["img"];
        assert!(img.is_directory);
        assert_eq!(img.size, 0);
    }

    #[tokio::test]
    async fn test_listing_merges_pages() {
        let store = MemoryStore::new().with_page_cap(2);
        for i in 0..7 {
            store.insert("c", &format!("f{}", i), &b"x"[..], "text/plain", 0.0);
        }
        store.insert("c", "sub/a", &b"x"[..], "text/plain", 0.0);
        store.insert("c", "sub/b", &b"x"[..], "text/plain", 0.0);
        let (store, fs) = fs_with(store);

        let listing = fs.list_children(&p("/c")).await.unwrap();
        assert_eq!(listing.len(), 8);
        assert!(listing["sub"].is_directory);
        assert!(store.listing_calls() > 1);
    }

    #[tokio::test]
    async fn test_listing_fails_on_mid_pagination_error() {
        let store = MemoryStore::new().with_page_cap(1);
        for i in 0..4 {
            store.insert("c", &format!("f{}", i), &b"x"[..], "text/plain", 0.0);
        }
        let (store, fs) = fs_with(store);
        store.fail_listing_call(3);

        let err = fs.list_children(&p("/c")).await.unwrap_err();
        assert!(matches!(err, VfsError::Transport(_)));
    }

    #[tokio::test]
    async fn test_marker_and_subdir_merge() {
        let store = docs_store();
        store.insert("docs", "img", Vec::<u8>::new(), DIRECTORY_CONTENT_TYPE, 9.0);
        let (_, fs) = fs_with(store);

        let listing = fs.list_children(&p("/docs")).await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing["img"].modified_at, 9);
    }

    #[tokio::test]
    async fn test_list_children_errors() {
        let (_, fs) = fs_with(docs_store());
        assert!(fs.list_children(&p("/docs/missing")).await.unwrap_err().is_not_found());
        assert!(fs.list_children(&p("/nope")).await.unwrap_err().is_not_found());
        assert!(matches!(
            fs.list_children(&p("/docs/readme.txt")).await.unwrap_err(),
            VfsError::NotADirectory(_)
        ));
    }

    #[tokio::test]
    async fn test_list_root() {
        let (_, fs) = fs_with(docs_store());
        fs.make_directory(&p("/photos")).await.unwrap();
        let listing = fs.list_children(&VirtualPath::root()).await.unwrap();
        let names: Vec<_> = listing.keys().cloned().collect();
        assert_eq!(names, vec!["docs", "photos"]);
        assert!(listing.values().all(|a| a.is_directory));
    }

    #[tokio::test]
    async fn test_list_all_descendants() {
        let store = docs_store();
        store.insert("docs", "a/b/c.txt", &b"c"[..], "text/plain", 0.0);
        let (_, fs) = fs_with(store);

        let listing = fs.list_all_descendants(&p("/docs")).await.unwrap();
        let names: Vec<_> = listing.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["a", "a/b", "a/b/c.txt", "img", "img/logo.png", "readme.txt"]
        );
        assert!(listing["a/b"].is_directory);
        assert!(!listing["a/b/c.txt"].is_directory);

        let all = fs.list_all_descendants(&VirtualPath::root()).await.unwrap();
        assert!(all["docs"].is_directory);
        assert_eq!(all["docs/img/logo.png"].size, 2000);
    }

    #[tokio::test]
    async fn test_exists_distinguishes_kinds() {
        let (_, fs) = fs_with(docs_store());
        assert!(fs.exists(&p("/docs/img")).await.unwrap());
        assert!(fs.exists(&p("/docs/readme.txt")).await.unwrap());
        assert!(!fs.exists(&p("/docs/nope")).await.unwrap());

        assert!(matches!(
            fs.check_file_existence(&p("/docs/img")).await.unwrap_err(),
            VfsError::IsADirectory(_)
        ));
        assert_eq!(
            fs.check_file_existence(&p("/docs/readme.txt")).await.unwrap().size,
            500
        );
    }

    #[tokio::test]
    async fn test_make_directory_idempotent() {
        let (store, fs) = fs_with(docs_store());
        fs.make_directory(&p("/docs/new")).await.unwrap();
        fs.make_directory(&p("/docs/new")).await.unwrap();
        let record = store.head_object("docs", "new").await.unwrap();
        assert_eq!(record.content_type, DIRECTORY_CONTENT_TYPE);
        assert!(fs.get_attributes(&p("/docs/new")).await.unwrap().is_directory);
    }

    #[tokio::test]
    async fn test_make_directory_over_file_conflicts() {
        let (_, fs) = fs_with(docs_store());
        assert!(matches!(
            fs.make_directory(&p("/docs/readme.txt")).await.unwrap_err(),
            VfsError::Conflict(_)
        ));
        assert!(
            fs.make_directory(&p("/missing/dir"))
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_remove_directory() {
        let (_, fs) = fs_with(docs_store());
        fs.make_directory(&p("/docs/empty")).await.unwrap();
        fs.remove_directory(&p("/docs/empty")).await.unwrap();
        assert!(!fs.exists(&p("/docs/empty")).await.unwrap());

        assert!(matches!(
            fs.remove_directory(&p("/docs/img")).await.unwrap_err(),
            VfsError::Conflict(_)
        ));
        assert!(matches!(
            fs.remove_directory(&p("/docs/readme.txt")).await.unwrap_err(),
            VfsError::NotADirectory(_)
        ));
        assert!(fs.remove_directory(&p("/docs/gone")).await.unwrap_err().is_not_found());
        assert!(matches!(
            fs.remove_directory(&p("/docs")).await.unwrap_err(),
            VfsError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_remove_container() {
        let (_, fs) = fs_with(MemoryStore::new());
        fs.make_directory(&p("/box")).await.unwrap();
        fs.remove_directory(&p("/box")).await.unwrap();
        assert!(fs.remove_directory(&p("/box")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_remove_file() {
        let (_, fs) = fs_with(docs_store());
        fs.remove_file(&p("/docs/readme.txt")).await.unwrap();
        assert!(fs.remove_file(&p("/docs/readme.txt")).await.unwrap_err().is_not_found());
        assert!(matches!(
            fs.remove_file(&p("/docs/img")).await.unwrap_err(),
            VfsError::IsADirectory(_)
        ));
        assert!(matches!(
            fs.remove_file(&p("/docs")).await.unwrap_err(),
            VfsError::IsADirectory(_)
        ));
    }

    #[tokio::test]
    async fn test_rename_same_container() {
        let (_, fs) = fs_with(docs_store());
        let before = fs.get_attributes(&p("/docs/readme.txt")).await.unwrap();
        fs.rename_file(&p("/docs/readme.txt"), &p("/docs/img/readme.md"))
            .await
            .unwrap();
        assert!(!fs.exists(&p("/docs/readme.txt")).await.unwrap());
        let after = fs.get_attributes(&p("/docs/img/readme.md")).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_rename_rules() {
        let store = docs_store();
        store.insert("other", "readme.txt", &b"x"[..], "text/plain", 0.0);
        let (_, fs) = fs_with(store);

        assert!(
            fs.rename_file(&p("/docs/nope"), &p("/docs/x"))
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(matches!(
            fs.rename_file(&p("/docs"), &p("/archive")).await.unwrap_err(),
            VfsError::NotImplemented(_)
        ));
        assert!(matches!(
            fs.rename_file(&p("/docs/img"), &p("/docs/pics")).await.unwrap_err(),
            VfsError::NotImplemented(_)
        ));
        assert!(matches!(
            fs.rename_file(&p("/docs/readme.txt"), &p("/other/readme.txt"))
                .await
                .unwrap_err(),
            VfsError::Conflict(_)
        ));
        assert!(matches!(
            fs.rename_file(&p("/other/readme.txt"), &p("/docs/img"))
                .await
                .unwrap_err(),
            VfsError::Conflict(_)
        ));

        fs.rename_file(&p("/other/readme.txt"), &p("/docs/moved.txt"))
            .await
            .unwrap();
        assert!(fs.exists(&p("/docs/moved.txt")).await.unwrap());
        assert!(!fs.exists(&p("/other/readme.txt")).await.unwrap());
    }
}
