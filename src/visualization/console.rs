use std::time::Duration;
use tokio::sync::broadcast;

use super::ring_buffer::{RingReader, Snapshot};
use crate::observability::IngestMonitor;

/// Reader-side consumer that logs the ring contents on a fixed timer
pub struct ConsoleRenderer {
    reader: RingReader,
    monitor: Option<IngestMonitor>,
    update_interval: Duration,
    report_every: u64,
}

impl ConsoleRenderer {
    pub fn new(reader: RingReader, update_interval: Duration) -> Self {
        Self {
            reader,
            monitor: None,
            update_interval,
            report_every: 0,
        }
    }

    /// Log the metrics report every `report_every` ticks; 0 disables it
    pub fn with_report(mut self, monitor: IngestMonitor, report_every: u64) -> Self {
        self.monitor = Some(monitor);
        self.report_every = report_every;
        self
    }

    /// Tick until shutdown, returning the number of frames rendered
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        let mut interval = tokio::time::interval(self.update_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut snapshot = Snapshot::empty();
        let mut last_written = 0;
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = interval.tick() => {}
            }

            ticks += 1;
            self.reader.snapshot_into(&mut snapshot);

            if snapshot.samples_written != last_written {
                last_written = snapshot.samples_written;
                if log::log_enabled!(log::Level::Debug) {
                    for line in render_lines(&snapshot) {
                        log::debug!("{}", line);
                    }
                }
            }

            if let Some(monitor) = &self.monitor {
                if self.report_every > 0 && ticks % self.report_every == 0 {
                    log::info!("{}", monitor.generate_report());
                }
            }
        }

        ticks
    }
}

/// One line per channel: index, then min/max/p2p/mean/rms of the window
pub fn render_lines(snapshot: &Snapshot) -> Vec<String> {
    snapshot
        .summaries()
        .iter()
        .enumerate()
        .map(|(channel, s)| {
            format!(
                "ch{:02} min {:>10.3} max {:>10.3} p2p {:>10.3} mean {:>10.3} rms {:>10.3}",
                channel,
                s.min,
                s.max,
                s.peak_to_peak(),
                s.mean,
                s.rms
            )
        })
        .collect()
}
