//! Shared HTTP connection pool with per-host admission control.
//!
//! `reqwest` keeps idle connections alive but does not bound how many
//! requests run against one host at a time. [`HttpPool`] adds that bound:
//! every request holds a [`PoolPermit`] for its host until the request,
//! including any streamed body, is finished or dropped.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::error::{BackendError, BackendResult};
use crate::constants::{
    DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS_PER_HOST,
    DEFAULT_PERSISTENT_CONNECTIONS,
};

/// Pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Idle keep-alive connections retained per host.
    pub max_idle_per_host: usize,
    /// How long an idle connection is kept.
    pub idle_timeout: Duration,
    /// Concurrent in-flight requests allowed per host.
    pub max_connections_per_host: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: DEFAULT_PERSISTENT_CONNECTIONS,
            idle_timeout: Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS),
            max_connections_per_host: DEFAULT_MAX_CONNECTIONS_PER_HOST,
        }
    }
}

/// Admission permit for one in-flight request. Dropping it frees the slot.
#[derive(Debug)]
pub struct PoolPermit {
    _permit: OwnedSemaphorePermit,
}

/// HTTP client shared by every backend session in the process.
///
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpPool {
    client: reqwest::Client,
    hosts: Arc<DashMap<String, Arc<Semaphore>>>,
    config: PoolConfig,
}

impl HttpPool {
    /// Build the pool.
    pub fn new(config: PoolConfig) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(config.idle_timeout)
            .build()
            .map_err(|e| BackendError::transport(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            client,
            hosts: Arc::new(DashMap::new()),
            config,
        })
    }

    /// The underlying client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// The pool configuration.
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Wait for a free request slot on `host`.
    pub async fn acquire(&self, host: &str) -> BackendResult<PoolPermit> {
        let semaphore = self
            .hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.max_connections_per_host.max(1))))
            .clone();
        let permit = semaphore
            .acquire_owned()
            .await
            .map_err(|_| BackendError::transport("connection pool closed"))?;
        Ok(PoolPermit { _permit: permit })
    }

    /// Free request slots currently available on `host`.
    pub fn available(&self, host: &str) -> usize {
        self.hosts
            .get(host)
            .map(|s| s.available_permits())
            .unwrap_or(self.config.max_connections_per_host)
    }
}
