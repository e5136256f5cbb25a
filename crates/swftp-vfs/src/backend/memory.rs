//! In-memory object store.
//!
//! Used for testing and for running the shell without a Swift cluster.
//! Listing follows Swift semantics (prefix, delimiter roll-up, marker,
//! server-side page cap) so that pagination paths are exercised.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::error::{BackendError, BackendResult};
use super::types::{ByteStream, ContainerRecord, ListQuery, ListingEntry, ObjectRecord};
use super::ObjectStore;
use crate::constants::DEFAULT_CONTENT_TYPE;

/// Largest page the store will return regardless of the requested limit.
const DEFAULT_SERVER_PAGE_CAP: usize = 10_000;

/// Chunk size used when streaming stored objects back out.
const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    last_modified: f64,
}

impl StoredObject {
    fn record(&self, name: &str) -> ObjectRecord {
        ObjectRecord {
            name: name.to_string(),
            bytes: self.data.len() as u64,
            content_type: self.content_type.clone(),
            last_modified: Some(self.last_modified),
        }
    }
}

#[derive(Debug, Default)]
struct Container {
    objects: BTreeMap<String, StoredObject>,
    last_modified: f64,
}

impl Container {
    fn record(&self, name: &str) -> ContainerRecord {
        ContainerRecord {
            name: name.to_string(),
            object_count: self.objects.len() as u64,
            bytes_used: self.objects.values().map(|o| o.data.len() as u64).sum(),
            last_modified: Some(self.last_modified),
        }
    }
}

/// In-memory object store.
///
/// Thread-safe via internal `RwLock`. All data is lost when dropped.
#[derive(Debug)]
pub struct MemoryStore {
    containers: RwLock<BTreeMap<String, Container>>,
    page_cap: usize,
    /// Listing call number (1-based) that fails, 0 for none.
    fail_listing_call: AtomicUsize,
    listing_calls: AtomicUsize,
    /// Error appended to every GET body after its data.
    body_tail: Mutex<Option<BackendError>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(BTreeMap::new()),
            page_cap: DEFAULT_SERVER_PAGE_CAP,
            fail_listing_call: AtomicUsize::new(0),
            listing_calls: AtomicUsize::new(0),
            body_tail: Mutex::new(None),
        }
    }

    /// Cap every listing page at `cap` rows, whatever the client asks for.
    pub fn with_page_cap(mut self, cap: usize) -> Self {
        self.page_cap = cap.max(1);
        self
    }

    /// Make the `n`th listing call from now fail with a transport error.
    pub fn fail_listing_call(&self, n: usize) {
        self.listing_calls.store(0, Ordering::SeqCst);
        self.fail_listing_call.store(n, Ordering::SeqCst);
    }

    /// Number of listing calls served since the last `fail_listing_call`.
    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    /// End every GET body from now on with `error` once its data is out,
    /// or restore clean bodies with `None`.
    pub fn end_bodies_with(&self, error: Option<BackendError>) {
        *self.body_tail.lock() = error;
    }

    /// Store an object directly, creating its container if needed.
    pub fn insert(
        &self,
        container: &str,
        key: &str,
        data: impl Into<Bytes>,
        content_type: &str,
        last_modified: f64,
    ) {
        let mut containers = self.containers.write();
        let entry = containers.entry(container.to_string()).or_default();
        entry.objects.insert(
            key.to_string(),
            StoredObject {
                data: data.into(),
                content_type: content_type.to_string(),
                last_modified,
            },
        );
    }

    /// Raw object bytes, if present.
    pub fn object_data(&self, container: &str, key: &str) -> Option<Bytes> {
        let containers = self.containers.read();
        containers
            .get(container)
            .and_then(|c| c.objects.get(key))
            .map(|o| o.data.clone())
    }

    fn object_path(container: &str, key: &str) -> String {
        format!("/{}/{}", container, key)
    }

    fn check_listing_failure(&self) -> BackendResult<()> {
        let call = self.listing_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail_at = self.fail_listing_call.load(Ordering::SeqCst);
        if fail_at != 0 && call == fail_at {
            return Err(BackendError::transport("injected listing failure"));
        }
        Ok(())
    }

    fn page_limit(&self, query: &ListQuery) -> usize {
        query.limit.unwrap_or(self.page_cap).min(self.page_cap)
    }
}

/// Roll up `name` for a delimited listing.
///
/// Returns the subdir prefix (with trailing delimiter) when the part after
/// `prefix` contains the delimiter.
fn rollup(name: &str, prefix: &str, delimiter: Option<char>) -> Option<String> {
    let delimiter = delimiter?;
    let rest = &name[prefix.len()..];
    rest.find(delimiter)
        .map(|idx| name[..prefix.len() + idx + delimiter.len_utf8()].to_string())
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_containers(&self, query: &ListQuery) -> BackendResult<Vec<ContainerRecord>> {
        self.check_listing_failure()?;
        let limit = self.page_limit(query);
        let prefix = query.prefix.as_deref().unwrap_or("");
        let containers = self.containers.read();
        Ok(containers
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .filter(|(name, _)| query.marker.as_deref().is_none_or(|m| name.as_str() > m))
            .take(limit)
            .map(|(name, c)| c.record(name))
            .collect())
    }

    async fn list_objects(
        &self,
        container: &str,
        query: &ListQuery,
    ) -> BackendResult<Vec<ListingEntry>> {
        self.check_listing_failure()?;
        let limit = self.page_limit(query);
        let prefix = query.prefix.as_deref().unwrap_or("");
        let marker = query.marker.as_deref();

        let containers = self.containers.read();
        let stored = containers
            .get(container)
            .ok_or_else(|| BackendError::not_found(format!("/{}", container)))?;

        let mut page: Vec<ListingEntry> = Vec::new();
        for (name, object) in stored.objects.iter() {
            if page.len() >= limit {
                break;
            }
            if !name.starts_with(prefix) {
                continue;
            }
            let entry = match rollup(name, prefix, query.delimiter) {
                Some(subdir) => ListingEntry::Subdir(subdir),
                None => ListingEntry::Object(object.record(name)),
            };
            // Everything up to and including the marker was served already,
            // including whole rolled-up prefixes.
            if marker.is_some_and(|m| entry.marker() <= m) {
                continue;
            }
            if page.last().is_some_and(|last| last == &entry) {
                continue;
            }
            page.push(entry);
        }
        Ok(page)
    }

    async fn head_container(&self, container: &str) -> BackendResult<ContainerRecord> {
        let containers = self.containers.read();
        containers
            .get(container)
            .map(|c| c.record(container))
            .ok_or_else(|| BackendError::not_found(format!("/{}", container)))
    }

    async fn put_container(&self, container: &str) -> BackendResult<()> {
        let mut containers = self.containers.write();
        containers
            .entry(container.to_string())
            .or_insert_with(|| Container {
                objects: BTreeMap::new(),
                last_modified: now_epoch(),
            });
        Ok(())
    }

    async fn delete_container(&self, container: &str) -> BackendResult<()> {
        let mut containers = self.containers.write();
        match containers.get(container) {
            None => Err(BackendError::not_found(format!("/{}", container))),
            Some(c) if !c.objects.is_empty() => {
                Err(BackendError::conflict(format!("/{}", container)))
            }
            Some(_) => {
                containers.remove(container);
                Ok(())
            }
        }
    }

    async fn head_object(&self, container: &str, key: &str) -> BackendResult<ObjectRecord> {
        let containers = self.containers.read();
        containers
            .get(container)
            .and_then(|c| c.objects.get(key))
            .map(|o| o.record(key))
            .ok_or_else(|| BackendError::not_found(Self::object_path(container, key)))
    }

    async fn get_object(&self, container: &str, key: &str) -> BackendResult<ByteStream> {
        let data = self
            .object_data(container, key)
            .ok_or_else(|| BackendError::not_found(Self::object_path(container, key)))?;

        let mut chunks: Vec<BackendResult<Bytes>> = (0..data.len())
            .step_by(READ_CHUNK)
            .map(|start| Ok(data.slice(start..(start + READ_CHUNK).min(data.len()))))
            .collect();
        if let Some(tail) = self.body_tail.lock().clone() {
            chunks.push(Err(tail));
        }
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        content_type: Option<&str>,
        mut body: ByteStream,
    ) -> BackendResult<()> {
        if !self.containers.read().contains_key(container) {
            return Err(BackendError::not_found(format!("/{}", container)));
        }

        // A broken body stores nothing, like an aborted chunked upload.
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }

        let mut containers = self.containers.write();
        let stored = containers
            .get_mut(container)
            .ok_or_else(|| BackendError::not_found(format!("/{}", container)))?;
        stored.objects.insert(
            key.to_string(),
            StoredObject {
                data: buf.freeze(),
                content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
                last_modified: now_epoch(),
            },
        );
        Ok(())
    }

    async fn copy_object(&self, from: (&str, &str), to: (&str, &str)) -> BackendResult<()> {
        let mut containers = self.containers.write();
        // Copies keep the source metadata, timestamp included.
        let source = containers
            .get(from.0)
            .and_then(|c| c.objects.get(from.1))
            .cloned()
            .ok_or_else(|| BackendError::not_found(Self::object_path(from.0, from.1)))?;
        let target = containers
            .get_mut(to.0)
            .ok_or_else(|| BackendError::not_found(format!("/{}", to.0)))?;
        target.objects.insert(to.1.to_string(), source);
        Ok(())
    }

    async fn delete_object(&self, container: &str, key: &str) -> BackendResult<()> {
        let mut containers = self.containers.write();
        containers
            .get_mut(container)
            .and_then(|c| c.objects.remove(key))
            .map(|_| ())
            .ok_or_else(|| BackendError::not_found(Self::object_path(container, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(parts: &[&'static [u8]]) -> ByteStream {
        let chunks: Vec<BackendResult<Bytes>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        futures::stream::iter(chunks).boxed()
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert("docs", "readme.txt", &b"hello"[..], "text/plain", 1.0);
        store.insert("docs", "img/logo.png", &b"png"[..], "image/png", 2.0);
        store.insert("docs", "img/icons/a.png", &b"a"[..], "image/png", 3.0);
        store.insert("docs", "zzz", &b"z"[..], "text/plain", 4.0);
        store
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        store.put_container("c").await.unwrap();
        store
            .put_object("c", "k", None, body(&[b"hello ", b"world"]))
            .await
            .unwrap();

        let mut stream = store.get_object("c", "k").await.unwrap();
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(out, b"hello world");

        let record = store.head_object("c", "k").await.unwrap();
        assert_eq!(record.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(record.bytes, 11);
    }

    #[tokio::test]
    async fn test_put_into_missing_container() {
        let store = MemoryStore::new();
        let err = store.put_object("nope", "k", None, body(&[])).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delimited_listing_rolls_up() {
        let store = seeded();
        let query = ListQuery::new().with_delimiter('/');
        let page = store.list_objects("docs", &query).await.unwrap();
        let markers: Vec<_> = page.iter().map(|e| e.marker().to_string()).collect();
        assert_eq!(markers, vec!["img/", "readme.txt", "zzz"]);
        assert!(matches!(page[0], ListingEntry::Subdir(_)));
    }

    #[tokio::test]
    async fn test_marker_skips_rolled_up_prefix() {
        let store = seeded().with_page_cap(1);
        let mut marker = None;
        let mut seen = Vec::new();
        loop {
            let query = ListQuery::new()
                .with_delimiter('/')
                .with_marker(marker.clone());
            let page = store.list_objects("docs", &query).await.unwrap();
            let Some(last) = page.last() else { break };
            marker = Some(last.marker().to_string());
            seen.extend(page.iter().map(|e| e.marker().to_string()));
        }
        assert_eq!(seen, vec!["img/", "readme.txt", "zzz"]);
    }

    #[tokio::test]
    async fn test_delete_non_empty_container_conflicts() {
        let store = seeded();
        let err = store.delete_container("docs").await.unwrap_err();
        assert!(matches!(err, BackendError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_injected_listing_failure() {
        let store = seeded();
        store.fail_listing_call(2);
        let query = ListQuery::new();
        assert!(store.list_objects("docs", &query).await.is_ok());
        assert!(store.list_objects("docs", &query).await.is_err());
        assert!(store.list_objects("docs", &query).await.is_ok());
    }

    #[tokio::test]
    async fn test_body_tail_follows_data() {
        let store = MemoryStore::new();
        store.insert("c", "f", vec![1u8; 10], "text/plain", 0.0);
        store.end_bodies_with(Some(BackendError::PotentialDataLoss));
        let chunks: Vec<_> = store.get_object("c", "f").await.unwrap().collect().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].as_ref().map(|b| b.len()), Ok(10));
        assert_eq!(chunks[1], Err(BackendError::PotentialDataLoss));

        store.end_bodies_with(None);
        let chunks: Vec<_> = store.get_object("c", "f").await.unwrap().collect().await;
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_copy_preserves_metadata() {
        let store = seeded();
        store.copy_object(("docs", "zzz"), ("docs", "yyy")).await.unwrap();
        let a = store.head_object("docs", "zzz").await.unwrap();
        let b = store.head_object("docs", "yyy").await.unwrap();
        assert_eq!(a.bytes, b.bytes);
        assert_eq!(a.last_modified, b.last_modified);
    }
}
