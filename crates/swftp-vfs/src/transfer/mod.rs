//! Streaming transfer bridge.
//!
//! Moves object bodies between the backend and a protocol's data channel
//! without buffering whole objects. Each transfer runs on its own task and
//! reports through a [`Completion`]:
//!
//! - [`begin_upload`] returns an [`UploadSink`] feeding a PUT
//! - [`begin_download`] pumps a GET into a [`DataConsumer`]

mod completion;
mod download;
mod error;
mod upload;

pub use completion::{Completion, Resolver, TransferState, completion};
pub use download::{DataConsumer, WriterConsumer, begin_download};
pub use error::TransferError;
pub use upload::{UploadSink, begin_upload};
