//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations using
//! desktop-appropriate libraries:
//! - `HttpTransport` using `reqwest` with streaming bodies and abort
//! - `ByteStore` using a directory of sha256-named files via `tokio::fs`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FsByteStore, ReqwestTransport};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(ReqwestTransport::new());
//! let store = Arc::new(FsByteStore::new("/var/cache/sample-loader"));
//! // Hand both to SampleLoader::new(...)
//! ```

mod http;
mod store;

pub use http::ReqwestTransport;
pub use store::FsByteStore;
