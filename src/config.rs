use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use crate::codec::{SampleLayout, SampleReshaper};

/// Retaining more channels than this is allowed but slow to render
pub const CHANNEL_WARNING_THRESHOLD: usize = 32;

/// Process-start configuration, read once from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    /// Required: the scale factor depends on the acquisition hardware
    pub scaling: ScalingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub endpoint: String,
    pub topic: String,
    pub poll_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "tcp://127.0.0.1:3335".to_string(),
            topic: String::new(),
            poll_timeout_ms: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Samples retained per channel
    pub capacity: usize,
    pub channels: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 40_000,
            channels: 16,
        }
    }
}

/// Raw-to-physical conversion; no defaults on purpose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingConfig {
    pub scale: f64,
    pub layout: SampleLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub idle_backoff_us: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { idle_backoff_us: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub update_interval_ms: u64,
    /// Log the metrics report every N render ticks; 0 disables it
    pub report_every: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 30,
            report_every: 100,
        }
    }
}

impl ScopeConfig {
    /// Full configuration with defaults everywhere except scaling
    pub fn template(scale: f64, layout: SampleLayout) -> Self {
        Self {
            transport: TransportConfig::default(),
            buffer: BufferConfig::default(),
            scaling: ScalingConfig { scale, layout },
            ingest: IngestConfig::default(),
            render: RenderConfig::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: ScopeConfig = serde_json::from_str(json).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .context(format!("Failed to read config file {:?}", path))?;

        Self::from_json(&content).context(format!("Invalid config in {:?}", path))
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json)
            .await
            .context("Failed to write temporary config file")?;

        fs::rename(&temp_path, path)
            .await
            .context("Failed to atomically update config file")?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer.capacity == 0 {
            bail!("buffer.capacity must be greater than zero");
        }
        if self.buffer.channels == 0 {
            bail!("buffer.channels must be greater than zero");
        }
        if !self.scaling.scale.is_finite() || self.scaling.scale == 0.0 {
            bail!("scaling.scale must be finite and non-zero, got {}", self.scaling.scale);
        }
        if self.render.update_interval_ms == 0 {
            bail!("render.update_interval_ms must be greater than zero");
        }
        if self.transport.endpoint.is_empty() {
            bail!("transport.endpoint must not be empty");
        }

        if self.buffer.channels > CHANNEL_WARNING_THRESHOLD {
            log::warn!(
                "Retaining {} channels; rendering more than {} may be slow",
                self.buffer.channels,
                CHANNEL_WARNING_THRESHOLD
            );
        }

        Ok(())
    }

    pub fn reshaper(&self) -> SampleReshaper {
        SampleReshaper::new(self.scaling.scale, self.scaling.layout)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.transport.poll_timeout_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_micros(self.ingest.idle_backoff_us)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.render.update_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_is_required() {
        let result = ScopeConfig::from_json(r#"{ "buffer": { "capacity": 10, "channels": 2 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config =
            ScopeConfig::from_json(r#"{ "scaling": { "scale": 0.195, "layout": "channel_major" } }"#).unwrap();

        assert_eq!(config.buffer.capacity, 40_000);
        assert_eq!(config.buffer.channels, 16);
        assert_eq!(config.transport.endpoint, "tcp://127.0.0.1:3335");
        assert_eq!(config.update_interval(), Duration::from_millis(30));
    }

    #[test]
    fn test_validate_rejects_zero_scale() {
        let config = ScopeConfig::template(0.0, SampleLayout::ChannelMajor);
        assert!(config.validate().is_err());
    }
}
