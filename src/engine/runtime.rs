use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::ingest::{IngestSummary, IngestionLoop};
use crate::error::IngestError;
use crate::transport::Transport;
use crate::visualization::RingReader;

/// Runtime status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeStatus {
    Stopped,
    Running,
    Failed,
}

/// Owns the ingestion task and its shutdown signal
pub struct IngestRuntime {
    status: RuntimeStatus,
    shutdown_tx: Option<broadcast::Sender<()>>,
    handle: Option<JoinHandle<Result<IngestSummary, IngestError>>>,
    reader: Option<RingReader>,
}

impl IngestRuntime {
    pub fn new() -> Self {
        Self {
            status: RuntimeStatus::Stopped,
            shutdown_tx: None,
            handle: None,
            reader: None,
        }
    }

    /// Current status; a task that ended on its own is reported as `Failed`
    pub fn status(&self) -> RuntimeStatus {
        match (&self.handle, self.status) {
            (Some(handle), RuntimeStatus::Running) if handle.is_finished() => RuntimeStatus::Failed,
            _ => self.status,
        }
    }

    /// Read handle onto the buffer of the running loop
    pub fn reader(&self) -> Option<RingReader> {
        self.reader.clone()
    }

    /// Shutdown receiver for tasks that should stop alongside ingestion
    pub fn subscribe(&self) -> Option<broadcast::Receiver<()>> {
        self.shutdown_tx.as_ref().map(|tx| tx.subscribe())
    }

    /// Spawn `ingest` on the tokio runtime
    pub fn start<T: Transport + 'static>(&mut self, ingest: IngestionLoop<T>) -> Result<()> {
        if self.status() == RuntimeStatus::Running {
            return Err(anyhow!("Ingestion is already running"));
        }

        // A task that already ended on its own is replaced; its error was logged
        if self.handle.take().is_some() {
            log::warn!("Restarting ingestion after the previous task ended");
        }

        let (shutdown_tx, shutdown_rx) = broadcast::channel(16);
        self.reader = Some(ingest.buffer().reader());
        self.handle = Some(tokio::spawn(ingest.run(shutdown_rx)));
        self.shutdown_tx = Some(shutdown_tx);
        self.status = RuntimeStatus::Running;

        Ok(())
    }

    /// Signal shutdown and wait for the ingestion task
    pub async fn stop(&mut self) -> Result<IngestSummary> {
        let Some(handle) = self.handle.take() else {
            return Ok(IngestSummary::default());
        };

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        match handle.await {
            Ok(Ok(summary)) => {
                self.status = RuntimeStatus::Stopped;
                Ok(summary)
            }
            Ok(Err(e)) => {
                self.status = RuntimeStatus::Failed;
                Err(anyhow::Error::new(e).context("Ingestion task failed"))
            }
            Err(e) => {
                self.status = RuntimeStatus::Failed;
                Err(anyhow!("Ingestion task panicked or was cancelled: {}", e))
            }
        }
    }
}

impl Default for IngestRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Dropping without `stop()` only signals the task; it cannot await it.
impl Drop for IngestRuntime {
    fn drop(&mut self) {
        if let Some(tx) = &self.shutdown_tx {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FrameDecoder, SampleLayout, SampleReshaper};
    use crate::observability::IngestMetrics;
    use crate::transport::ChannelTransport;
    use crate::visualization::RingBuffer;
    use std::sync::Arc;

    fn ingest_loop(transport: ChannelTransport) -> IngestionLoop<ChannelTransport> {
        IngestionLoop::new(
            transport,
            FrameDecoder::new(),
            SampleReshaper::new(1.0, SampleLayout::ChannelMajor),
            RingBuffer::new(2, 16).unwrap(),
            Arc::new(IngestMetrics::new()),
        )
    }

    #[test]
    fn test_runtime_status_default() {
        let runtime = IngestRuntime::new();
        assert_eq!(runtime.status(), RuntimeStatus::Stopped);
        assert!(runtime.reader().is_none());
    }

    #[tokio::test]
    async fn test_start_stop() {
        let (_tx, transport) = ChannelTransport::pair("runtime");
        let mut runtime = IngestRuntime::new();

        runtime.start(ingest_loop(transport)).unwrap();
        assert_eq!(runtime.status(), RuntimeStatus::Running);
        assert_eq!(runtime.reader().unwrap().capacity(), 16);

        let summary = runtime.stop().await.unwrap();
        assert_eq!(summary.frames_written, 0);
        assert_eq!(runtime.status(), RuntimeStatus::Stopped);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let (_tx, transport) = ChannelTransport::pair("a");
        let (_tx2, transport2) = ChannelTransport::pair("b");
        let mut runtime = IngestRuntime::new();

        runtime.start(ingest_loop(transport)).unwrap();
        assert!(runtime.start(ingest_loop(transport2)).is_err());

        runtime.stop().await.unwrap();
    }

    async fn wait_for_status(runtime: &IngestRuntime, status: RuntimeStatus) {
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while runtime.status() != status && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }

    #[tokio::test]
    async fn test_restart_after_task_failed() {
        let (tx, transport) = ChannelTransport::pair("first");
        drop(tx);

        let mut runtime = IngestRuntime::new();
        runtime.start(ingest_loop(transport)).unwrap();
        wait_for_status(&runtime, RuntimeStatus::Failed).await;
        assert_eq!(runtime.status(), RuntimeStatus::Failed);

        let (_tx2, transport2) = ChannelTransport::pair("second");
        runtime.start(ingest_loop(transport2)).unwrap();
        assert_eq!(runtime.status(), RuntimeStatus::Running);

        let summary = runtime.stop().await.unwrap();
        assert_eq!(summary.frames_dropped, 0);
        assert_eq!(runtime.status(), RuntimeStatus::Stopped);
    }

    #[tokio::test]
    async fn test_closed_transport_marks_failed() {
        let (tx, transport) = ChannelTransport::pair("closed");
        drop(tx);

        let mut runtime = IngestRuntime::new();
        runtime.start(ingest_loop(transport)).unwrap();

        assert!(runtime.stop().await.is_err());
        assert_eq!(runtime.status(), RuntimeStatus::Failed);
    }
}
