//! Object-storage backends.
//!
//! The virtual filesystem never speaks HTTP itself. It drives an
//! [`ObjectStore`], which exposes the flat container/object primitives:
//!
//! - [`MemoryStore`] - In-process store with Swift listing semantics (testing)
//! - [`SwiftClient`] - OpenStack Swift over HTTP, one per authenticated user
//!
//! Failures are reported as [`BackendError`]; only `NotFound` and
//! `Conflict` are interpreted by the layers above.

mod error;
mod memory;
mod pool;
mod swift;
mod types;

use async_trait::async_trait;

pub use error::{BackendError, BackendResult};
pub use memory::MemoryStore;
pub use pool::{HttpPool, PoolConfig, PoolPermit};
pub use swift::{SwiftClient, authenticate_v1};
pub use types::{ByteStream, ContainerRecord, ListQuery, ListingEntry, ObjectRecord};

/// Flat container/object storage operations.
///
/// One call is one backend request. Listings return a single page; callers
/// page with [`ListQuery::marker`] until an empty page comes back.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    // ========================================================================
    // Account level
    // ========================================================================

    /// List one page of containers.
    async fn list_containers(&self, query: &ListQuery) -> BackendResult<Vec<ContainerRecord>>;

    // ========================================================================
    // Container level
    // ========================================================================

    /// List one page of a container.
    async fn list_objects(&self, container: &str, query: &ListQuery)
    -> BackendResult<Vec<ListingEntry>>;

    /// Fetch container metadata.
    async fn head_container(&self, container: &str) -> BackendResult<ContainerRecord>;

    /// Create a container. Succeeds if it already exists.
    async fn put_container(&self, container: &str) -> BackendResult<()>;

    /// Delete an empty container.
    ///
    /// Fails with `Conflict` if the container still holds objects.
    async fn delete_container(&self, container: &str) -> BackendResult<()>;

    // ========================================================================
    // Object level
    // ========================================================================

    /// Fetch object metadata.
    async fn head_object(&self, container: &str, key: &str) -> BackendResult<ObjectRecord>;

    /// Start downloading an object.
    ///
    /// Resolves once response headers arrive; the body is streamed.
    async fn get_object(&self, container: &str, key: &str) -> BackendResult<ByteStream>;

    /// Upload an object, consuming `body` as it is produced.
    ///
    /// A `None` content type lets the backend pick one.
    async fn put_object(
        &self,
        container: &str,
        key: &str,
        content_type: Option<&str>,
        body: ByteStream,
    ) -> BackendResult<()>;

    /// Server-side copy. Overwrites the destination.
    async fn copy_object(
        &self,
        from: (&str, &str),
        to: (&str, &str),
    ) -> BackendResult<()>;

    /// Delete an object.
    async fn delete_object(&self, container: &str, key: &str) -> BackendResult<()>;
}
