use anyhow::{bail, Context, Result};
use std::sync::Arc;

use ringscope::codec::{FrameDecoder, SampleLayout};
use ringscope::config::ScopeConfig;
use ringscope::engine::{IngestRuntime, IngestionLoop, RuntimeStatus};
use ringscope::observability::{IngestMetrics, IngestMonitor};
use ringscope::transport::ZmqSubscriber;
use ringscope::visualization::{ConsoleRenderer, RingBuffer};

const USAGE: &str = "usage: ringscope <config.json>\n       ringscope init <config.json> [scale]";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [cmd, path] if cmd == "init" => init(path, None).await,
        [cmd, path, scale] if cmd == "init" => init(path, Some(scale)).await,
        [path] => run(path).await,
        _ => bail!(USAGE),
    }
}

async fn init(path: &str, scale: Option<&String>) -> Result<()> {
    let scale = match scale {
        Some(s) => s.parse::<f64>().context(format!("Invalid scale {:?}", s))?,
        None => 0.195,
    };

    let config = ScopeConfig::template(scale, SampleLayout::ChannelMajor);
    config.validate()?;
    config.save(path).await?;

    log::info!("Wrote config template to {}", path);
    Ok(())
}

async fn run(path: &str) -> Result<()> {
    let config = ScopeConfig::load(path).await?;

    let buffer = RingBuffer::new(config.buffer.channels, config.buffer.capacity)?;
    let metrics = Arc::new(IngestMetrics::new());

    let transport = ZmqSubscriber::connect(
        &config.transport.endpoint,
        &config.transport.topic,
        config.poll_timeout(),
    )
    .await?;

    let ingest = IngestionLoop::new(
        transport,
        FrameDecoder::new(),
        config.reshaper(),
        buffer,
        Arc::clone(&metrics),
    )
    .with_idle_backoff(config.idle_backoff());

    let mut runtime = IngestRuntime::new();
    runtime.start(ingest)?;

    let reader = runtime.reader().context("Ingestion runtime has no buffer")?;
    let render_shutdown = runtime.subscribe().context("Ingestion runtime has no shutdown signal")?;
    let renderer = ConsoleRenderer::new(reader, config.update_interval())
        .with_report(IngestMonitor::new(Arc::clone(&metrics)), config.render.report_every);
    let render_handle = tokio::spawn(renderer.run(render_shutdown));

    log::info!("Running; press Ctrl-C to stop");
    let mut watchdog = tokio::time::interval(std::time::Duration::from_millis(250));
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                log::info!("Shutting down");
                break;
            }
            _ = watchdog.tick() => {
                if runtime.status() == RuntimeStatus::Failed {
                    break;
                }
            }
        }
    }

    let result = runtime.stop().await;
    if let Err(e) = render_handle.await {
        log::warn!("Render task ended abnormally: {}", e);
    }

    log::info!("{}", IngestMonitor::new(metrics).generate_report());

    let summary = result?;
    log::info!(
        "Wrote {} frames, dropped {}",
        summary.frames_written,
        summary.frames_dropped
    );

    Ok(())
}
