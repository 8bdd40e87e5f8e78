use super::ring_buffer::Snapshot;
use serde::Serialize;

/// Amplitude statistics of one channel's retained window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub rms: f64,
}

impl ChannelSummary {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                rms: 0.0,
            };
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for &s in samples {
            min = min.min(s);
            max = max.max(s);
            sum += s;
            sum_sq += s * s;
        }
        let n = samples.len() as f64;

        Self {
            min,
            max,
            mean: sum / n,
            rms: (sum_sq / n).sqrt(),
        }
    }

    pub fn peak_to_peak(&self) -> f64 {
        self.max - self.min
    }
}

impl Snapshot {
    pub fn summaries(&self) -> Vec<ChannelSummary> {
        self.channels
            .iter()
            .map(|c| ChannelSummary::from_samples(c))
            .collect()
    }
}
