//! Defaults and fixed values.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

/// Path separator for virtual paths and object keys.
pub const SEPARATOR: char = '/';

/// Media type marking a zero-byte object as a directory.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/directory";

/// Media type stored when an upload names none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Owner and group reported for every entry.
pub const PLACEHOLDER_OWNER: &str = "nobody";

/// Mode bits reported for directories (`drwxr-xr-x`).
pub const DIRECTORY_MODE: u32 = 0o040755;

/// Mode bits reported for files (`-rw-r--r--`).
pub const FILE_MODE: u32 = 0o100644;

/// Default v1.0 auth endpoint.
pub const DEFAULT_AUTH_URL: &str = "http://127.0.0.1:8080/auth/v1.0";

/// Idle keep-alive connections retained per backend host.
pub const DEFAULT_PERSISTENT_CONNECTIONS: usize = 4;

/// Seconds an idle pooled connection is kept.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 240;

/// Concurrent requests allowed per backend host.
pub const DEFAULT_MAX_CONNECTIONS_PER_HOST: usize = 16;

/// Rows requested per listing page.
pub const DEFAULT_LISTING_PAGE_SIZE: usize = 10_000;

/// Chunks buffered between an upload sink and its PUT body.
pub const DEFAULT_UPLOAD_QUEUE_DEPTH: usize = 16;
