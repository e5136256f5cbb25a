//! Streaming uploads: a bounded channel feeding a PUT body.

use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;
use tracing::{debug, warn};

use super::completion::{Completion, completion};
use super::TransferError;
use crate::backend::{BackendResult, ObjectStore};

/// Producer side of an upload.
///
/// Chunks written here become the PUT body in order. The channel is
/// bounded, so a slow backend pushes back on the writer.
///
/// Call [`close`](Self::close) (or shut down the [`AsyncWrite`]) to finish
/// the object. A sink dropped without closing aborts the upload and nothing
/// is stored.
#[derive(Debug)]
pub struct UploadSink {
    tx: Option<mpsc::Sender<BackendResult<Bytes>>>,
    completion: Completion,
    written: u64,
}

impl UploadSink {
    /// Send one chunk, waiting for queue space.
    ///
    /// Fails with [`TransferError::Closed`] once the sink is closed or the
    /// PUT has ended; the completion carries the underlying cause.
    pub async fn write(&mut self, chunk: Bytes) -> Result<(), TransferError> {
        let tx = self.tx.as_mut().ok_or(TransferError::Closed)?;
        let len = chunk.len() as u64;
        tx.send(Ok(chunk)).await.map_err(|_| TransferError::Closed)?;
        self.written += len;
        Ok(())
    }

    /// End the body. The object is committed when the PUT returns.
    pub fn close(&mut self) {
        if self.tx.take().is_some() {
            debug!(bytes = self.written, "upload sink closed");
        }
    }

    /// Close and wait for the PUT to finish.
    pub async fn finish(mut self) -> Result<u64, TransferError> {
        self.close();
        self.completion.wait().await
    }

    /// Abandon the upload; nothing is stored.
    pub fn abort(&mut self) {
        // Cancel before ending the body so the PUT never sees a clean EOF.
        self.completion.cancel();
        self.tx.take();
    }

    /// Bytes accepted so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// The completion of the PUT behind this sink.
    pub fn completion(&self) -> &Completion {
        &self.completion
    }
}

impl Drop for UploadSink {
    fn drop(&mut self) {
        if self.tx.is_some() {
            warn!(bytes = self.written, "upload sink dropped without close; aborting");
            self.abort();
        }
    }
}

fn closed_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, TransferError::Closed)
}

impl AsyncWrite for UploadSink {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let Some(tx) = this.tx.as_mut() else {
            return Poll::Ready(Err(closed_pipe()));
        };
        match tx.poll_ready(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(_)) => Poll::Ready(Err(closed_pipe())),
            Poll::Ready(Ok(())) => {
                tx.start_send(Ok(Bytes::copy_from_slice(buf)))
                    .map_err(|_| closed_pipe())?;
                this.written += buf.len() as u64;
                Poll::Ready(Ok(buf.len()))
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().close();
        Poll::Ready(Ok(()))
    }
}

/// Start a PUT of `container/key` fed by the returned sink.
///
/// The request runs on its own task and is in flight before the first
/// chunk is written.
pub fn begin_upload(
    store: Arc<dyn ObjectStore>,
    container: String,
    key: String,
    queue_depth: usize,
) -> (Completion, UploadSink) {
    let (tx, rx) = mpsc::channel::<BackendResult<Bytes>>(queue_depth.max(1));
    let (resolver, completion) = completion();

    let stored = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&stored);
    let body = rx
        .inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                counter.fetch_add(bytes.len() as u64, Ordering::Relaxed);
            }
        })
        .boxed();

    tokio::spawn(async move {
        let cancelled = resolver.cancellation();
        tokio::select! {
            biased;
            _ = cancelled.cancelled() => {
                debug!(container = %container, key = %key, "upload cancelled");
                resolver.cancel();
            }
            result = store.put_object(&container, &key, None, body) => match result {
                Ok(()) => {
                    let bytes = stored.load(Ordering::Relaxed);
                    debug!(container = %container, key = %key, bytes, "upload complete");
                    resolver.complete(bytes);
                }
                Err(e) => {
                    warn!(container = %container, key = %key, error = %e, "upload failed");
                    resolver.fail(e.into());
                }
            },
        }
    });

    let sink = UploadSink {
        tx: Some(tx),
        completion: completion.clone(),
        written: 0,
    };
    (completion, sink)
}
