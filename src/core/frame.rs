use serde::{Deserialize, Serialize};

/// One decoded wire message: a block of raw samples across channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Publisher message counter, increasing but not necessarily contiguous
    pub message_id: u64,

    /// Opaque identifier of the logical stream
    pub stream_id: String,

    pub num_channels: usize,

    /// Samples per channel in this frame
    pub num_samples: usize,

    /// Flat raw samples, nominally `num_channels * num_samples` long
    pub payload: Vec<i32>,

    /// Index of the first sample of this block in the publisher's timeline
    pub sample_number: i64,

    /// Publisher send time in seconds
    pub timestamp: f64,

    /// Sample rate in Hz (0 when the publisher did not report one)
    pub sample_rate: u32,
}

impl Frame {
    pub fn new(
        message_id: u64,
        stream_id: impl Into<String>,
        num_channels: usize,
        num_samples: usize,
        payload: Vec<i32>,
    ) -> Self {
        Self {
            message_id,
            stream_id: stream_id.into(),
            num_channels,
            num_samples,
            payload,
            sample_number: 0,
            timestamp: 0.0,
            sample_rate: 0,
        }
    }

    /// Number of payload elements implied by the declared dimensions
    pub fn expected_len(&self) -> Option<usize> {
        self.num_channels.checked_mul(self.num_samples)
    }
}

/// Channel-major matrix of scaled samples
///
/// Row `c` holds all samples of channel `c` contiguously.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatrix {
    num_channels: usize,
    num_samples: usize,
    data: Vec<f64>,
}

impl SampleMatrix {
    /// Build from channel-major data; `None` if the length does not match
    pub fn from_channel_major(num_channels: usize, num_samples: usize, data: Vec<f64>) -> Option<Self> {
        if num_channels.checked_mul(num_samples)? != data.len() {
            return None;
        }
        Some(Self {
            num_channels,
            num_samples,
            data,
        })
    }

    /// Build from per-channel rows, all of equal length
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let num_samples = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != num_samples) {
            return None;
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::from_channel_major(rows.len(), num_samples, data)
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn channel(&self, channel: usize) -> &[f64] {
        let start = channel * self.num_samples;
        &self.data[start..start + self.num_samples]
    }

    pub fn get(&self, channel: usize, sample: usize) -> Option<f64> {
        if channel >= self.num_channels || sample >= self.num_samples {
            return None;
        }
        Some(self.data[channel * self.num_samples + sample])
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on 0
        self.data.chunks_exact(self.num_samples.max(1)).take(self.num_channels)
    }
}
