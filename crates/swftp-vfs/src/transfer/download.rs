//! Streaming downloads: a GET body pumped into a consumer.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use super::completion::{Completion, completion};
use super::TransferError;
use crate::backend::{BackendError, ObjectStore};

/// Receives a download's bytes.
///
/// `write` is awaited before the next chunk is pulled from the backend, so
/// a slow consumer slows the GET instead of buffering it.
#[async_trait]
pub trait DataConsumer: Send {
    /// Accept one chunk.
    async fn write(&mut self, chunk: Bytes) -> Result<(), TransferError>;

    /// Called exactly once when the stream ends, for any reason.
    ///
    /// An error here fails an otherwise successful transfer.
    async fn stop(&mut self) -> Result<(), TransferError> {
        Ok(())
    }
}

/// Adapts any [`AsyncWrite`] into a [`DataConsumer`].
#[derive(Debug)]
pub struct WriterConsumer<W> {
    writer: W,
}

impl<W> WriterConsumer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> DataConsumer for WriterConsumer<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, chunk: Bytes) -> Result<(), TransferError> {
        self.writer.write_all(&chunk).await?;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TransferError> {
        self.writer.flush().await?;
        Ok(())
    }
}

async fn pump<C>(
    store: &dyn ObjectStore,
    container: &str,
    key: &str,
    consumer: &mut C,
) -> Result<u64, TransferError>
where
    C: DataConsumer,
{
    let mut body = store.get_object(container, key).await?;
    let mut total = 0u64;
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                total += bytes.len() as u64;
                consumer.write(bytes).await?;
            }
            // Body ended without a declared length; treat as complete.
            Err(BackendError::PotentialDataLoss) => {
                debug!(container, key, total, "body ended without a length");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(total)
}

/// Start a GET of `container/key` streamed into `consumer`.
///
/// The consumer's `stop` runs after the last chunk, after a failure, and
/// after cancellation alike.
pub fn begin_download<C>(
    store: Arc<dyn ObjectStore>,
    container: String,
    key: String,
    mut consumer: C,
) -> Completion
where
    C: DataConsumer + 'static,
{
    let (resolver, completion) = completion();

    tokio::spawn(async move {
        let cancelled = resolver.cancellation();
        let outcome = tokio::select! {
            biased;
            _ = cancelled.cancelled() => None,
            result = pump(store.as_ref(), &container, &key, &mut consumer) => Some(result),
        };
        let stopped = consumer.stop().await;

        match (outcome, stopped) {
            (None, _) => {
                debug!(container = %container, key = %key, "download cancelled");
                resolver.cancel();
            }
            (Some(Ok(bytes)), Ok(())) => {
                debug!(container = %container, key = %key, bytes, "download complete");
                resolver.complete(bytes);
            }
            (Some(Ok(_)), Err(e)) | (Some(Err(e)), _) => {
                warn!(container = %container, key = %key, error = %e, "download failed");
                resolver.fail(e);
            }
        }
    });

    completion
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use crate::transfer::TransferState;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Collects chunks and counts `stop` calls.
    #[derive(Clone, Default)]
    struct Collector {
        data: Arc<Mutex<Vec<u8>>>,
        stops: Arc<AtomicUsize>,
        delay: Option<Duration>,
        fail: bool,
    }

    #[async_trait]
    impl DataConsumer for Collector {
        async fn write(&mut self, chunk: Bytes) -> Result<(), TransferError> {
            if self.fail {
                return Err(TransferError::Consumer("disk full".into()));
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.data.lock().extend_from_slice(&chunk);
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), TransferError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn store_with(data: Vec<u8>) -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.insert("c", "f", data, "application/octet-stream", 0.0);
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_download_delivers_everything() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let store = store_with(data.clone());
        let consumer = Collector::default();
        let completion = begin_download(store, "c".into(), "f".into(), consumer.clone());
        assert_eq!(completion.wait().await, Ok(data.len() as u64));
        assert_eq!(*consumer.data.lock(), data);
        assert_eq!(consumer.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_object_stops_consumer() {
        let store = Arc::new(MemoryStore::new());
        let consumer = Collector::default();
        let completion = begin_download(store, "c".into(), "f".into(), consumer.clone());
        let err = completion.wait().await.unwrap_err();
        assert!(matches!(err, TransferError::Backend(e) if e.is_not_found()));
        assert_eq!(consumer.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_delimited_body_completes() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 13) as u8).collect();
        let store = store_with(data.clone());
        store.end_bodies_with(Some(BackendError::PotentialDataLoss));
        let consumer = Collector::default();
        let completion = begin_download(store, "c".into(), "f".into(), consumer.clone());
        assert_eq!(completion.wait().await, Ok(data.len() as u64));
        assert_eq!(*consumer.data.lock(), data);
        assert_eq!(consumer.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mid_body_failure_stops_consumer() {
        let store = store_with(vec![3; 100_000]);
        store.end_bodies_with(Some(BackendError::transport("connection reset")));
        let consumer = Collector::default();
        let completion = begin_download(store, "c".into(), "f".into(), consumer.clone());
        assert_eq!(
            completion.wait().await,
            Err(TransferError::Backend(BackendError::transport("connection reset")))
        );
        assert!(matches!(completion.state(), TransferState::Failed(_)));
        assert_eq!(consumer.data.lock().len(), 100_000);
        assert_eq!(consumer.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_consumer_failure_fails_transfer() {
        let store = store_with(vec![1; 10]);
        let consumer = Collector {
            fail: true,
            ..Default::default()
        };
        let completion = begin_download(store, "c".into(), "f".into(), consumer.clone());
        assert_eq!(
            completion.wait().await,
            Err(TransferError::Consumer("disk full".into()))
        );
        assert_eq!(consumer.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_stream() {
        let store = store_with(vec![7; 300_000]);
        let consumer = Collector {
            delay: Some(Duration::from_secs(1)),
            ..Default::default()
        };
        let completion = begin_download(store, "c".into(), "f".into(), consumer.clone());
        tokio::time::sleep(Duration::from_millis(1500)).await;
        completion.cancel();
        assert_eq!(completion.wait().await, Err(TransferError::Cancelled));
        assert!(consumer.data.lock().len() < 300_000);
        assert_eq!(consumer.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_writer_consumer() {
        let store = store_with(b"payload".to_vec());
        let (writer, mut reader) = tokio::io::duplex(64);
        let completion = begin_download(
            store,
            "c".into(),
            "f".into(),
            WriterConsumer::new(writer),
        );
        assert_eq!(completion.wait().await, Ok(7));
        let mut out = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut out)
            .await
            .unwrap();
        assert_eq!(out, b"payload");
    }
}
