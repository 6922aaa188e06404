//! # Event Bus System
//!
//! Process-wide notifications for the sample loader using
//! `tokio::sync::broadcast`. Modules emit typed events; any number of
//! subscribers observe them independently.
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{CacheEvent, CacheTier, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(100);
//! let event = CoreEvent::Cache(CacheEvent::Hit {
//!     key: "https://example.com/kick.wav".to_string(),
//!     tier: CacheTier::Memory,
//! });
//!
//! event_bus.emit(event).ok();
//! ```
//!
//! ### Subscribing to Events
//!
//! ```no_run
//! use core_runtime::events::{CoreEvent, EventBus};
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         match stream.recv().await {
//!             Ok(event) => println!("Received: {:?}", event),
//!             Err(RecvError::Lagged(n)) => {
//!                 eprintln!("Missed {} events", n);
//!             }
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! ## Error Handling
//!
//! `emit` fails only when no subscriber exists; callers treat that as a
//! no-op (`emit(...).ok()`). Subscribers that fall behind receive
//! `RecvError::Lagged` and keep going; `RecvError::Closed` signals
//! shutdown.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Loading-lifecycle events (one operation = one Started, one terminal)
    Loading(LoadingEvent),
    /// Cache-observability events
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Loading(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Loading(LoadingEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::StoreError { .. }) => EventSeverity::Warning,
            CoreEvent::Loading(LoadingEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

/// Which cache tier satisfied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    /// In-process decoded-buffer cache
    Memory,
    /// Persistent byte store
    Store,
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheTier::Memory => f.write_str("memory"),
            CacheTier::Store => f.write_str("store"),
        }
    }
}

// ============================================================================
// Loading Events
// ============================================================================

/// Events covering the lifecycle of one coalesced load operation.
///
/// These mirror the per-call progress callbacks at process granularity:
/// exactly one `Started` and exactly one of `Completed`/`Failed` per
/// underlying operation, regardless of how many callers joined it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum LoadingEvent {
    /// A fetch-and-decode operation began for a key.
    Started {
        /// The resource key being loaded.
        key: String,
    },
    /// The operation produced a decoded buffer.
    Completed {
        /// The resource key.
        key: String,
        /// Wall time spent by the operation, in milliseconds.
        duration_ms: u64,
        /// Size of the encoded payload in bytes.
        size: u64,
    },
    /// The operation settled with a terminal error.
    Failed {
        /// The resource key.
        key: String,
        /// Human-readable error message.
        message: String,
        /// Stable classification ("network", "decode", ...).
        error_type: String,
    },
}

impl LoadingEvent {
    fn description(&self) -> &str {
        match self {
            LoadingEvent::Started { .. } => "Load started",
            LoadingEvent::Completed { .. } => "Load completed",
            LoadingEvent::Failed { .. } => "Load failed",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events describing cache behavior for observability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A request was satisfied from a cache tier.
    Hit {
        /// The resource key.
        key: String,
        /// Which tier answered.
        tier: CacheTier,
    },
    /// No cache tier could satisfy the request.
    Miss {
        /// The resource key.
        key: String,
        /// Why the cache could not answer (e.g. "no-metadata", "stale").
        reason: String,
    },
    /// The persistent store failed during a cache operation.
    ///
    /// Store failures never fail the overall load; this event is how they
    /// surface.
    StoreError {
        /// The resource key.
        key: String,
        /// The operation that failed ("open", "read", "write", "delete").
        operation: String,
        /// Human-readable error message.
        message: String,
    },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Hit { .. } => "Cache hit",
            CacheEvent::Miss { .. } => "Cache miss",
            CacheEvent::StoreError { .. } => "Cache store error",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning is cheap; the bus is fully thread-safe and is normally shared as
/// `Arc<EventBus>`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when there are none. Emitters ignore the error (`.ok()`):
    /// having no observers is not a failure.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
