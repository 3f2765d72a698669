//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::logging::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_header, redact_uri, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

// Only one global subscriber can exist per process, so everything that needs
// one lives in this test.
#[test]
fn test_events_reach_logger_sink() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());
    init_logging(config).unwrap();

    let uri = "https://cdn.example.com/v.m3u8?token=abc";
    tracing::info!(target: "core_playback", uri = %redact_uri(uri), "Data source set");
    tracing::trace!(target: "core_playback", "Dropping stale decoder event");
    tracing::debug!(target: "hyper", "Filtered out by default directives");

    let entries = sink.entries.lock().unwrap().clone();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, LogLevel::Info);
    assert_eq!(entries[0].target, "core_playback");
    assert_eq!(entries[0].message, "Data source set");
    assert_eq!(
        entries[0].fields.get("uri").map(String::as_str),
        Some("https://cdn.example.com/v.m3u8?[REDACTED]")
    );

    // A second subscriber is refused.
    assert!(init_logging(LoggingConfig::default()).is_err());
}

#[test]
fn test_invalid_filter_is_rejected() {
    let config = LoggingConfig::default().with_filter("core_playback=loud");
    assert!(init_logging(config).is_err());
}

#[test]
fn test_uri_redaction() {
    assert_eq!(
        redact_uri("https://user:pw@cdn.example.com/v.m3u8?token=abc#t=10"),
        "https://[REDACTED]@cdn.example.com/v.m3u8?[REDACTED]"
    );
    assert_eq!(
        redact_uri("rtsp://camera.local/stream1"),
        "rtsp://camera.local/stream1"
    );
    assert_eq!(redact_uri("/sdcard/Movies/clip.mp4"), "/sdcard/Movies/clip.mp4");
    assert_eq!(redact_uri("https://cdn.example.com/a.mp4?"), "https://cdn.example.com/a.mp4");
}

#[test]
fn test_header_redaction() {
    assert_eq!(redact_header("Authorization", "Bearer abc"), "[REDACTED]");
    assert_eq!(redact_header("Cookie", "session=1"), "[REDACTED]");
    assert_eq!(redact_header("X-Api-Key", "k"), "[REDACTED]");
    assert_eq!(redact_header("User-Agent", "player/1.0"), "player/1.0");
    assert_eq!(redact_header("Range", "bytes=0-"), "bytes=0-");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_filter("core_playback=debug,bridge_traits=warn")
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(
        config.filter.as_deref(),
        Some("core_playback=debug,bridge_traits=warn")
    );
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
