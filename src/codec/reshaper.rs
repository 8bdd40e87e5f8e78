use crate::core::{Frame, SampleMatrix};
use crate::error::ShapeError;
use serde::{Deserialize, Serialize};

/// Ordering of the flat payload on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleLayout {
    /// `[ch0 s0, ch0 s1, ..., ch1 s0, ...]`
    ChannelMajor,
    /// Interleaved: `[s0 ch0, s0 ch1, ..., s1 ch0, ...]`
    SampleMajor,
}

/// Converts raw frame payloads to scaled channel-major matrices
///
/// The scale factor maps raw ADC codes to physical units (e.g. 0.195 for
/// microvolts on common headstages). It has no default: every deployment
/// states its own gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleReshaper {
    scale: f64,
    layout: SampleLayout,
}

impl SampleReshaper {
    pub fn new(scale: f64, layout: SampleLayout) -> Self {
        Self { scale, layout }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    pub fn reshape(&self, frame: &Frame) -> Result<SampleMatrix, ShapeError> {
        let actual = frame.payload.len();
        let expected = frame.expected_len().unwrap_or(usize::MAX);
        if actual != expected {
            return Err(ShapeError::SizeMismatch { expected, actual });
        }

        let channels = frame.num_channels;
        let samples = frame.num_samples;
        let data: Vec<f64> = match self.layout {
            SampleLayout::ChannelMajor => frame
                .payload
                .iter()
                .map(|&raw| raw as f64 * self.scale)
                .collect(),
            SampleLayout::SampleMajor => {
                let mut data = Vec::with_capacity(actual);
                for ch in 0..channels {
                    for s in 0..samples {
                        data.push(frame.payload[s * channels + ch] as f64 * self.scale);
                    }
                }
                data
            }
        };

        // Length was checked against channels * samples above
        SampleMatrix::from_channel_major(channels, samples, data)
            .ok_or(ShapeError::SizeMismatch { expected, actual })
    }
}
