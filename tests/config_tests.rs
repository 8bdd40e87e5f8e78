use ringscope::codec::SampleLayout;
use ringscope::config::ScopeConfig;
use std::time::Duration;
use tempfile::tempdir;

#[tokio::test]
async fn test_save_and_load_roundtrip() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("nested").join("scope.json");

    let mut config = ScopeConfig::template(0.195, SampleLayout::SampleMajor);
    config.buffer.channels = 4;
    config.transport.endpoint = "ipc:///tmp/ringscope-test.ipc".to_string();
    config.save(&path).await.unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let loaded = ScopeConfig::load(&path).await.unwrap();
    assert_eq!(loaded, config);
}

#[tokio::test]
async fn test_load_full_document() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("scope.json");
    tokio::fs::write(
        &path,
        r#"{
            "transport": { "endpoint": "tcp://10.0.0.2:5555", "topic": "ephys", "poll_timeout_ms": 0 },
            "buffer": { "capacity": 1000, "channels": 8 },
            "scaling": { "scale": 0.05, "layout": "sample_major" },
            "ingest": { "idle_backoff_us": 0 },
            "render": { "update_interval_ms": 50, "report_every": 0 }
        }"#,
    )
    .await
    .unwrap();

    let config = ScopeConfig::load(&path).await.unwrap();

    assert_eq!(config.transport.topic, "ephys");
    assert_eq!(config.poll_timeout(), Duration::ZERO);
    assert_eq!(config.idle_backoff(), Duration::ZERO);
    assert_eq!(config.buffer.capacity, 1000);
    assert_eq!(config.reshaper().layout(), SampleLayout::SampleMajor);
    assert_eq!(config.reshaper().scale(), 0.05);
}

#[tokio::test]
async fn test_load_missing_file_fails() {
    let temp_dir = tempdir().unwrap();
    let result = ScopeConfig::load(temp_dir.path().join("absent.json")).await;

    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("Failed to read config file"));
}

#[test]
fn test_missing_layout_fails() {
    assert!(ScopeConfig::from_json(r#"{ "scaling": { "scale": 0.195 } }"#).is_err());
}

#[test]
fn test_validation_rules() {
    let valid = ScopeConfig::template(0.195, SampleLayout::ChannelMajor);
    assert!(valid.validate().is_ok());

    let mut config = valid.clone();
    config.buffer.capacity = 0;
    assert!(config.validate().is_err());

    let mut config = valid.clone();
    config.buffer.channels = 0;
    assert!(config.validate().is_err());

    let mut config = valid.clone();
    config.scaling.scale = f64::NAN;
    assert!(config.validate().is_err());

    let mut config = valid.clone();
    config.render.update_interval_ms = 0;
    assert!(config.validate().is_err());

    // Many channels only warns
    let mut config = valid;
    config.buffer.channels = 64;
    assert!(config.validate().is_ok());
}
