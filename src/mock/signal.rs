use crate::core::Frame;
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub stream_id: String,
    pub num_channels: usize,
    pub samples_per_frame: usize,
    pub sample_rate: u32,
    /// Frequency of channel 0; channel `c` runs at `(c + 1)` times this
    pub base_frequency: f64,
    /// Peak amplitude in raw units
    pub amplitude: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            stream_id: "synthetic".to_string(),
            num_channels: 16,
            samples_per_frame: 640,
            sample_rate: 30_000,
            base_frequency: 10.0,
            amplitude: 1000.0,
        }
    }
}

/// Multichannel sine generator producing raw integer frames
///
/// Phase is continuous across frames and message ids increase by one.
pub struct SyntheticSource {
    config: SignalConfig,
    sample_number: i64,
    message_id: u64,
}

impl SyntheticSource {
    pub fn new(config: SignalConfig) -> Self {
        Self {
            config,
            sample_number: 0,
            message_id: 0,
        }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Skip `count` message ids, as a publisher that lost messages would
    pub fn skip_messages(&mut self, count: u64) {
        self.message_id += count;
    }

    /// Next channel-major frame
    pub fn next_frame(&mut self) -> Frame {
        let n = self.config.samples_per_frame;
        let rate = f64::from(self.config.sample_rate.max(1));
        let mut payload = Vec::with_capacity(self.config.num_channels * n);

        for c in 0..self.config.num_channels {
            let freq = self.config.base_frequency * (c + 1) as f64;
            let delta_phase = 2.0 * PI * freq / rate;
            for s in 0..n {
                let t = (self.sample_number + s as i64) as f64;
                payload.push((self.config.amplitude * (delta_phase * t).sin()).round() as i32);
            }
        }

        let mut frame = Frame::new(
            self.message_id,
            self.config.stream_id.clone(),
            self.config.num_channels,
            n,
            payload,
        );
        frame.sample_number = self.sample_number;
        frame.timestamp = self.sample_number as f64 / rate;
        frame.sample_rate = self.config.sample_rate;

        self.message_id += 1;
        self.sample_number += n as i64;

        frame
    }
}

impl Iterator for SyntheticSource {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        Some(self.next_frame())
    }
}
