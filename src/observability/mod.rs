pub mod metrics;
pub mod monitor;

pub use metrics::{IngestMetrics, MetricsSnapshot};
pub use monitor::IngestMonitor;
