//! Virtual filesystem bridge between file-transfer shells and OpenStack
//! Swift object storage.
//!
//! FTP and SFTP engines see a hierarchical filesystem; Swift stores flat
//! objects in containers. This crate sits between them:
//!
//! - [`vfs`] - Paths, the directory convention, attributes and filesystem operations
//! - [`transfer`] - Streaming uploads and downloads with one-shot completion
//! - [`shell`] - The protocol-facing façade and error taxonomy
//! - [`backend`] - The object-store seam, Swift HTTP client and in-memory store
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use swftp_vfs::backend::MemoryStore;
//! use swftp_vfs::shell::{ShellPolicy, SwiftShell};
//! use swftp_vfs::vfs::{FieldName, FsOptions};
//!
//! # async fn demo() -> Result<(), swftp_vfs::shell::ShellError> {
//! let shell = SwiftShell::new(Arc::new(MemoryStore::new()), FsOptions::default(), ShellPolicy::default());
//! shell.make_directory(&["docs"]).await?;
//! let rows = shell.list(&["docs"], &FieldName::parse_all(["size", "directory"])).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod shell;
pub mod transfer;
pub mod vfs;

pub use backend::{BackendError, MemoryStore, ObjectStore, SwiftClient};
pub use config::{ConfigError, SwftpConfig};
pub use shell::{ReadFile, ShellError, ShellPolicy, SwiftShell, WriteFile};
pub use transfer::{Completion, DataConsumer, TransferError, UploadSink, WriterConsumer};
pub use vfs::{FieldName, FieldValue, ObjectAttributes, SwiftFileSystem, VfsError, VirtualPath};
