//! File handles given to a protocol engine's data channel.

use tracing::debug;

use super::error::ShellResult;
use crate::transfer::{Completion, DataConsumer, UploadSink};
use crate::vfs::{SwiftFileSystem, VirtualPath};

/// Cancels a transfer unless disarmed first.
struct CancelOnDrop(Option<Completion>);

impl CancelOnDrop {
    fn disarm(mut self) {
        self.0.take();
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(completion) = self.0.take() {
            debug!("transfer future dropped; cancelling");
            completion.cancel();
        }
    }
}

/// A file opened for reading.
#[derive(Debug)]
pub struct ReadFile {
    fs: SwiftFileSystem,
    path: VirtualPath,
}

impl ReadFile {
    pub(crate) fn new(fs: SwiftFileSystem, path: VirtualPath) -> Self {
        Self { fs, path }
    }

    pub fn path(&self) -> &VirtualPath {
        &self.path
    }

    /// Stream the file into `consumer` and return the byte count.
    ///
    /// Dropping the returned future (client disconnect) cancels the
    /// backend request.
    pub async fn send<C>(&self, consumer: C) -> ShellResult<u64>
    where
        C: DataConsumer + 'static,
    {
        let completion = self.fs.begin_download(&self.path, consumer)?;
        let guard = CancelOnDrop(Some(completion.clone()));
        let result = completion.wait().await;
        guard.disarm();
        Ok(result?)
    }
}

/// A file opened for writing.
///
/// Nothing is sent until [`receive`](Self::receive) or
/// [`close`](Self::close). Dropping an unclosed handle aborts the upload.
#[derive(Debug)]
pub struct WriteFile {
    fs: SwiftFileSystem,
    path: VirtualPath,
    sink: Option<UploadSink>,
}

impl WriteFile {
    pub(crate) fn new(fs: SwiftFileSystem, path: VirtualPath) -> Self {
        Self {
            fs,
            path,
            sink: None,
        }
    }

    pub fn path(&self) -> &VirtualPath {
        &self.path
    }

    /// Start the upload and hand out its sink.
    pub fn receive(&mut self) -> ShellResult<&mut UploadSink> {
        let sink = match self.sink.take() {
            Some(sink) => sink,
            None => self.fs.begin_upload(&self.path)?.1,
        };
        Ok(self.sink.insert(sink))
    }

    /// Finish the upload and wait for the backend to commit it.
    ///
    /// Closing without `receive` stores an empty object.
    pub async fn close(mut self) -> ShellResult<u64> {
        let sink = match self.sink.take() {
            Some(sink) => sink,
            None => self.fs.begin_upload(&self.path)?.1,
        };
        Ok(sink.finish().await?)
    }
}
