//! Logging system demonstration
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format
//! cargo run --example logging_demo -- json
//!
//! # With custom filter
//! cargo run --example logging_demo -- pretty "core_runtime=trace"
//! ```

use core_runtime::events::{CacheEvent, CacheTier, CoreEvent, EventBus};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use std::env;
use tracing::{debug, info, instrument, warn};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace);
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    init_logging(config).expect("Failed to initialize logging");

    info!(format = ?format, "Logging initialized");

    demo_structured_logging();
    demo_event_bus().await;
    demo_instrumentation().await;

    info!("Demo complete");
}

fn demo_structured_logging() {
    info!("Simple message without fields");

    info!(
        key = "https://example.com/kick.wav",
        tier = "store",
        size = 524288,
        "Cache hit"
    );

    warn!(
        key = "https://example.com/snare.wav",
        operation = "write",
        "Store write failed; load continues with fetched bytes"
    );
}

async fn demo_event_bus() {
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();

    bus.emit(CoreEvent::Cache(CacheEvent::Hit {
        key: "https://example.com/kick.wav".to_string(),
        tier: CacheTier::Memory,
    }))
    .ok();

    if let Ok(event) = rx.recv().await {
        info!(severity = ?event.severity(), "Received event: {}", event.description());
    }
}

#[instrument]
async fn demo_instrumentation() {
    info!("Instrumented function automatically creates spans");

    for key in ["kick.wav", "snare.wav", "hat.wav"] {
        load_sample(key).await;
    }
}

#[instrument(fields(key = %key))]
async fn load_sample(key: &str) {
    debug!("Resolving sample");
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
}
