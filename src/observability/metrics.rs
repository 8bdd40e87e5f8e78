use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Lock-free counters shared between the ingestion task and its readers
pub struct IngestMetrics {
    frames_received: AtomicU64,
    frames_written: AtomicU64,
    samples_written: AtomicU64,
    decode_errors: AtomicU64,
    shape_errors: AtomicU64,
    message_gaps: AtomicU64,
    missed_messages: AtomicU64,
    out_of_order: AtomicU64,
    last_message_id: AtomicU64,
    // Every u64 is a valid id, so "nothing seen yet" needs its own flag
    message_seen: AtomicBool,
    total_latency_us: AtomicU64,
    latency_samples: AtomicU64,
}

/// Plain copy of the counters at one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_written: u64,
    pub samples_written: u64,
    pub decode_errors: u64,
    pub shape_errors: u64,
    pub message_gaps: u64,
    pub missed_messages: u64,
    pub out_of_order: u64,
    pub last_message_id: Option<u64>,
    pub avg_latency_us: u64,
}

impl MetricsSnapshot {
    pub fn frames_dropped(&self) -> u64 {
        self.decode_errors + self.shape_errors
    }
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self {
            frames_received: AtomicU64::new(0),
            frames_written: AtomicU64::new(0),
            samples_written: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            shape_errors: AtomicU64::new(0),
            message_gaps: AtomicU64::new(0),
            missed_messages: AtomicU64::new(0),
            out_of_order: AtomicU64::new(0),
            last_message_id: AtomicU64::new(0),
            message_seen: AtomicBool::new(false),
            total_latency_us: AtomicU64::new(0),
            latency_samples: AtomicU64::new(0),
        }
    }

    pub fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_written(&self, samples: usize) {
        self.frames_written.fetch_add(1, Ordering::Relaxed);
        self.samples_written.fetch_add(samples as u64, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shape_error(&self) {
        self.shape_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Track message id continuity; ids may skip but should increase
    pub fn observe_message_id(&self, id: u64) {
        let previous = self.last_message_id.swap(id, Ordering::Relaxed);
        if !self.message_seen.swap(true, Ordering::Relaxed) {
            return;
        }
        if id <= previous {
            self.out_of_order.fetch_add(1, Ordering::Relaxed);
        } else if id > previous + 1 {
            self.message_gaps.fetch_add(1, Ordering::Relaxed);
            self.missed_messages.fetch_add(id - previous - 1, Ordering::Relaxed);
        }
    }

    pub fn start_processing(&self) -> Instant {
        Instant::now()
    }

    pub fn finish_processing(&self, start: Instant) {
        let latency_us = start.elapsed().as_micros() as u64;
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    pub fn shape_errors(&self) -> u64 {
        self.shape_errors.load(Ordering::Relaxed)
    }

    pub fn avg_latency_us(&self) -> u64 {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0;
        }
        self.total_latency_us.load(Ordering::Relaxed) / samples
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let seen = self.message_seen.load(Ordering::Relaxed);
        let last = self.last_message_id.load(Ordering::Relaxed);
        MetricsSnapshot {
            frames_received: self.frames_received(),
            frames_written: self.frames_written(),
            samples_written: self.samples_written.load(Ordering::Relaxed),
            decode_errors: self.decode_errors(),
            shape_errors: self.shape_errors(),
            message_gaps: self.message_gaps.load(Ordering::Relaxed),
            missed_messages: self.missed_messages.load(Ordering::Relaxed),
            out_of_order: self.out_of_order.load(Ordering::Relaxed),
            last_message_id: seen.then_some(last),
            avg_latency_us: self.avg_latency_us(),
        }
    }
}

impl Default for IngestMetrics {
    fn default() -> Self {
        Self::new()
    }
}
