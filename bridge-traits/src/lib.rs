//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host
//! environment the sample loader runs in.
//!
//! ## Overview
//!
//! This crate defines the contract between the loader core and
//! platform-specific implementations. Each trait represents a capability
//! the core requires but that is provided differently per environment:
//!
//! - [`HttpTransport`](http::HttpTransport) - network requests with
//!   conditional headers, streaming bodies, and abort support
//! - [`ByteStore`](store::ByteStore) / [`StoreHandle`](store::StoreHandle) -
//!   named persistent key/value byte stores
//! - [`AudioDecoder`](decoder::AudioDecoder) - encoded bytes to PCM
//! - [`Clock`](time::Clock) - time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert their native errors and provide
//! actionable messages; a transport that honors an abort signal reports it
//! as `BridgeError::Aborted` so the core can classify it precisely.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe
//! concurrent usage across async tasks.

pub mod decoder;
pub mod error;
pub mod http;
pub mod store;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use decoder::{AudioBuffer, AudioDecoder};
pub use http::{HttpBody, HttpRequest, HttpResponse, HttpTransport};
pub use store::{ByteStore, ContentHeaders, StoreHandle};
pub use time::{Clock, SystemClock};
