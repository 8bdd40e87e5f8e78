use crate::codec::{FrameDecoder, SampleReshaper};
use crate::error::{IngestError, RingBufferError};
use crate::observability::IngestMetrics;
use crate::transport::Transport;
use crate::visualization::{RingBuffer, WriteRegion};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Why a received frame was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Decode,
    Shape,
    TooFewChannels,
}

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing was waiting on the transport
    Idle,
    Written(WriteRegion),
    Dropped(DropReason),
}

/// Totals reported when the loop ends cleanly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub iterations: u64,
    pub frames_written: u64,
    pub frames_dropped: u64,
}

/// Producer side of the pipeline: transport -> decode -> reshape -> ring
pub struct IngestionLoop<T: Transport> {
    transport: T,
    decoder: FrameDecoder,
    reshaper: SampleReshaper,
    buffer: RingBuffer,
    metrics: Arc<IngestMetrics>,
    idle_backoff: Duration,
    warned_extra_channels: bool,
}

impl<T: Transport> IngestionLoop<T> {
    pub fn new(
        transport: T,
        decoder: FrameDecoder,
        reshaper: SampleReshaper,
        buffer: RingBuffer,
        metrics: Arc<IngestMetrics>,
    ) -> Self {
        Self {
            transport,
            decoder,
            reshaper,
            buffer,
            metrics,
            idle_backoff: Duration::ZERO,
            warned_extra_channels: false,
        }
    }

    /// Pause after an empty poll; zero only yields to the scheduler
    pub fn with_idle_backoff(mut self, idle_backoff: Duration) -> Self {
        self.idle_backoff = idle_backoff;
        self
    }

    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }

    /// Process at most one message
    ///
    /// Per-frame problems are logged and reported as `Dropped`; only a dead
    /// transport or an oversized write comes back as an error.
    pub async fn poll_once(&mut self) -> Result<PollOutcome, IngestError> {
        let Some(message) = self.transport.try_recv().await? else {
            return Ok(PollOutcome::Idle);
        };

        self.metrics.record_frame_received();
        let start = self.metrics.start_processing();

        let frame = match self.decoder.decode(&message) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Impossible to parse the packet received, skipping: {}", e);
                self.metrics.record_decode_error();
                return Ok(PollOutcome::Dropped(DropReason::Decode));
            }
        };
        log::trace!(
            "Received message {} from stream {:?}: sample {} ({} samples x {} channels)",
            frame.message_id,
            frame.stream_id,
            frame.sample_number,
            frame.num_samples,
            frame.num_channels
        );
        self.metrics.observe_message_id(frame.message_id);

        let matrix = match self.reshaper.reshape(&frame) {
            Ok(matrix) => matrix,
            Err(e) => {
                log::warn!(
                    "Dropping message {} from stream {:?}: {}",
                    frame.message_id,
                    frame.stream_id,
                    e
                );
                self.metrics.record_shape_error();
                return Ok(PollOutcome::Dropped(DropReason::Shape));
            }
        };

        let retained = self.buffer.num_channels();
        if matrix.num_channels() < retained {
            log::warn!(
                "Dropping message {}: {} channels but {} are retained",
                frame.message_id,
                matrix.num_channels(),
                retained
            );
            self.metrics.record_shape_error();
            return Ok(PollOutcome::Dropped(DropReason::TooFewChannels));
        }
        if matrix.num_channels() > retained && !self.warned_extra_channels {
            log::info!(
                "Stream {:?} carries {} channels; retaining the first {}",
                frame.stream_id,
                matrix.num_channels(),
                retained
            );
            self.warned_extra_channels = true;
        }

        let region = self
            .buffer
            .write(&matrix, frame.num_samples)
            .inspect_err(|e| {
                if let RingBufferError::ExceedsCapacity { .. } = e {
                    log::error!(
                        "Message {} holds {} samples per channel, more than the ring capacity {}",
                        frame.message_id,
                        frame.num_samples,
                        self.buffer.capacity()
                    );
                }
            })?;

        self.metrics.record_frame_written(region.num_samples());
        self.metrics.finish_processing(start);

        Ok(PollOutcome::Written(region))
    }

    /// Run until `shutdown` fires or a fatal error occurs
    ///
    /// The shutdown signal is checked once per iteration; a frame already
    /// being processed is finished first.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<IngestSummary, IngestError> {
        log::info!(
            "Ingesting from {} into {} channels x {} samples",
            self.transport.describe(),
            self.buffer.num_channels(),
            self.buffer.capacity()
        );
        log::info!(
            "Scaling raw samples by {} ({:?} payloads)",
            self.reshaper.scale(),
            self.reshaper.layout()
        );

        let mut summary = IngestSummary::default();

        loop {
            match shutdown.try_recv() {
                Ok(()) | Err(broadcast::error::TryRecvError::Closed) => break,
                Err(broadcast::error::TryRecvError::Lagged(_)) => break,
                Err(broadcast::error::TryRecvError::Empty) => {}
            }

            summary.iterations += 1;

            match self.poll_once().await {
                Ok(PollOutcome::Idle) => {
                    if self.idle_backoff.is_zero() {
                        tokio::task::yield_now().await;
                    } else {
                        tokio::time::sleep(self.idle_backoff).await;
                    }
                }
                Ok(PollOutcome::Written(_)) => summary.frames_written += 1,
                Ok(PollOutcome::Dropped(_)) => summary.frames_dropped += 1,
                Err(e) => {
                    log::error!("Ingestion from {} stopped: {}", self.transport.describe(), e);
                    return Err(e);
                }
            }
        }

        log::info!(
            "Ingestion stopped after {} frames ({} dropped)",
            summary.frames_written,
            summary.frames_dropped
        );

        Ok(summary)
    }
}
