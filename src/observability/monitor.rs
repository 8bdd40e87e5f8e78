use super::{IngestMetrics, MetricsSnapshot};
use std::sync::Arc;

/// Human-readable view over the ingestion counters
pub struct IngestMonitor {
    metrics: Arc<IngestMetrics>,
}

impl IngestMonitor {
    pub fn new(metrics: Arc<IngestMetrics>) -> Self {
        Self { metrics }
    }

    pub fn generate_report(&self) -> String {
        format_report(&self.metrics.snapshot())
    }
}

pub fn format_report(m: &MetricsSnapshot) -> String {
    if m.frames_received == 0 {
        return "No frames received".to_string();
    }

    let mut report = String::from("=== Ingestion Metrics ===\n");
    report.push_str(&format!(
        "  Frames: {} received, {} written, {} dropped\n",
        m.frames_received,
        m.frames_written,
        m.frames_dropped()
    ));
    report.push_str(&format!(
        "  Errors: {} decode, {} shape\n",
        m.decode_errors, m.shape_errors
    ));
    report.push_str(&format!(
        "  Continuity: {} gap{} ({} missed), {} out of order\n",
        m.message_gaps,
        if m.message_gaps == 1 { "" } else { "s" },
        m.missed_messages,
        m.out_of_order
    ));
    report.push_str(&format!(
        "  Samples: {} per channel, last message {}\n",
        m.samples_written,
        m.last_message_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string())
    ));
    report.push_str(&format!("  Avg Latency: {}μs\n", m.avg_latency_us));

    report
}
