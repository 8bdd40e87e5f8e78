use anyhow::{Context, Result};
use std::time::Duration;

use ringscope::codec::FrameEncoder;
use ringscope::mock::{SignalConfig, SyntheticSource};
use ringscope::transport::ZmqPublisher;

/// Publishes synthetic channel-major frames on a ZeroMQ PUB socket
///
/// usage: publish_demo [endpoint] [channels]
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let endpoint = args.next().unwrap_or_else(|| "tcp://127.0.0.1:3335".to_string());
    let channels = match args.next() {
        Some(c) => c.parse::<usize>().context(format!("Invalid channel count {:?}", c))?,
        None => 16,
    };

    let config = SignalConfig {
        num_channels: channels,
        ..Default::default()
    };
    // One frame per block period keeps the publisher close to real time
    let period = Duration::from_secs_f64(config.samples_per_frame as f64 / f64::from(config.sample_rate));

    let mut publisher = ZmqPublisher::bind(&endpoint).await?;
    let encoder = FrameEncoder::new();
    let mut source = SyntheticSource::new(config);
    let mut ticker = tokio::time::interval(period);

    log::info!(
        "Publishing {} channels x {} samples every {:?} on {}",
        channels,
        source.config().samples_per_frame,
        period,
        publisher.endpoint()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let frame = source.next_frame();
                publisher.publish(encoder.encode(&frame)).await?;
                if frame.message_id % 1000 == 0 {
                    log::info!("Published message {}", frame.message_id);
                }
            }
        }
    }

    log::info!("Publisher stopped");
    Ok(())
}
