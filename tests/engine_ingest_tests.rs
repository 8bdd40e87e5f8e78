use bytes::Bytes;
use ringscope::codec::{FrameDecoder, FrameEncoder, SampleLayout, SampleReshaper};
use ringscope::core::Frame;
use ringscope::engine::{DropReason, IngestionLoop, PollOutcome};
use ringscope::error::{IngestError, RingBufferError, TransportError};
use ringscope::mock::{SignalConfig, SyntheticSource};
use ringscope::observability::IngestMetrics;
use ringscope::transport::ChannelTransport;
use ringscope::visualization::RingBuffer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn encode(frame: &Frame) -> Bytes {
    Bytes::from(FrameEncoder::new().encode(frame))
}

fn ingest_loop(
    transport: ChannelTransport,
    channels: usize,
    capacity: usize,
) -> (IngestionLoop<ChannelTransport>, Arc<IngestMetrics>) {
    let metrics = Arc::new(IngestMetrics::new());
    let ingest = IngestionLoop::new(
        transport,
        FrameDecoder::new(),
        SampleReshaper::new(0.5, SampleLayout::ChannelMajor),
        RingBuffer::new(channels, capacity).unwrap(),
        Arc::clone(&metrics),
    );
    (ingest, metrics)
}

#[tokio::test]
async fn test_poll_idle_then_written() {
    let (tx, transport) = ChannelTransport::pair("poll");
    let (mut ingest, metrics) = ingest_loop(transport, 2, 8);

    assert_eq!(ingest.poll_once().await.unwrap(), PollOutcome::Idle);

    tx.send(encode(&Frame::new(0, "s", 2, 3, vec![2, 4, 6, 8, 10, 12]))).unwrap();
    let outcome = ingest.poll_once().await.unwrap();

    match outcome {
        PollOutcome::Written(region) => {
            assert_eq!(region.start, 0);
            assert_eq!(region.cursor, 3);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let snap = ingest.buffer().snapshot();
    assert_eq!(&snap.channels[0][..3], &[1.0, 2.0, 3.0]);
    assert_eq!(&snap.channels[1][..3], &[4.0, 5.0, 6.0]);
    assert_eq!(metrics.frames_written(), 1);
}

#[tokio::test]
async fn test_bad_frames_are_dropped() {
    let (tx, transport) = ChannelTransport::pair("drops");
    let (mut ingest, metrics) = ingest_loop(transport, 2, 8);

    tx.send(Bytes::from_static(b"garbage")).unwrap();
    tx.send(encode(&Frame::new(1, "s", 2, 3, vec![1; 5]))).unwrap();
    tx.send(encode(&Frame::new(2, "s", 1, 3, vec![1; 3]))).unwrap();

    assert_eq!(ingest.poll_once().await.unwrap(), PollOutcome::Dropped(DropReason::Decode));
    assert_eq!(ingest.poll_once().await.unwrap(), PollOutcome::Dropped(DropReason::Shape));
    assert_eq!(
        ingest.poll_once().await.unwrap(),
        PollOutcome::Dropped(DropReason::TooFewChannels)
    );

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.frames_received, 3);
    assert_eq!(snapshot.decode_errors, 1);
    assert_eq!(snapshot.shape_errors, 2);
    assert_eq!(snapshot.frames_written, 0);
    assert_eq!(ingest.buffer().cursor(), 0);
}

#[tokio::test]
async fn test_extra_channels_are_written() {
    let (tx, transport) = ChannelTransport::pair("extra");
    let (mut ingest, _metrics) = ingest_loop(transport, 1, 4);

    tx.send(encode(&Frame::new(0, "s", 3, 2, vec![2, 2, 4, 4, 6, 6]))).unwrap();

    assert!(matches!(ingest.poll_once().await.unwrap(), PollOutcome::Written(_)));
    assert_eq!(&ingest.buffer().snapshot().channels[0][..2], &[1.0, 1.0]);
}

#[tokio::test]
async fn test_message_gaps_counted_not_dropped() {
    let (tx, transport) = ChannelTransport::pair("gaps");
    let (mut ingest, metrics) = ingest_loop(transport, 2, 64);

    let mut source = SyntheticSource::new(SignalConfig {
        num_channels: 2,
        samples_per_frame: 4,
        ..Default::default()
    });
    tx.send(encode(&source.next_frame())).unwrap();
    source.skip_messages(2);
    tx.send(encode(&source.next_frame())).unwrap();

    for _ in 0..2 {
        assert!(matches!(ingest.poll_once().await.unwrap(), PollOutcome::Written(_)));
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.message_gaps, 1);
    assert_eq!(snapshot.missed_messages, 2);
    assert_eq!(snapshot.frames_written, 2);
}

#[tokio::test]
async fn test_oversized_frame_is_fatal() {
    let (tx, transport) = ChannelTransport::pair("oversized");
    let (mut ingest, _metrics) = ingest_loop(transport, 1, 4);

    tx.send(encode(&Frame::new(0, "s", 1, 5, vec![1; 5]))).unwrap();

    let err = ingest.poll_once().await.unwrap_err();
    assert!(matches!(
        err,
        IngestError::Buffer(RingBufferError::ExceedsCapacity { requested: 5, capacity: 4 })
    ));
}

#[tokio::test]
async fn test_closed_transport_ends_run() {
    let (tx, transport) = ChannelTransport::pair("closed");
    let (ingest, metrics) = ingest_loop(transport, 2, 8);

    tx.send(encode(&Frame::new(0, "s", 2, 2, vec![1; 4]))).unwrap();
    drop(tx);

    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let err = ingest.run(shutdown_rx).await.unwrap_err();

    assert!(matches!(err, IngestError::Transport(TransportError::Closed)));
    assert_eq!(metrics.frames_written(), 1);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let (tx, transport) = ChannelTransport::pair("shutdown");
    let (ingest, _metrics) = ingest_loop(transport, 2, 32);
    let ingest = ingest.with_idle_backoff(Duration::from_micros(50));
    let reader = ingest.buffer().reader();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(ingest.run(shutdown_rx));

    for id in 0..5 {
        tx.send(encode(&Frame::new(id, "s", 2, 4, vec![id as i32; 8]))).unwrap();
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while reader.snapshot().samples_written < 20 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    shutdown_tx.send(()).unwrap();
    let summary = handle.await.unwrap().unwrap();

    assert_eq!(summary.frames_written, 5);
    assert_eq!(summary.frames_dropped, 0);
    assert!(summary.iterations >= 5);
    assert_eq!(reader.snapshot().cursor, 20);
}
