//! # Sample Loader Core
//!
//! Resolves a resource identifier (a URL or an inline `data:` payload) to a
//! decoded, ready-to-use audio buffer, minimizing redundant network
//! transfer and redundant decode work across repeated and concurrent
//! requests.
//!
//! ## Architecture
//!
//! Three cache tiers sit in front of the decoding service:
//!
//! 1. [`BufferCache`](buffer_cache::BufferCache) - bounded in-process LRU
//!    of decoded buffers
//! 2. persistent byte store (via `bridge_traits::store`) - raw bodies plus
//!    JSON metadata side-records, managed as pairs
//! 3. network (via `bridge_traits::http`) - conditional fetches with
//!    HTTP-style revalidation
//!
//! [`SampleLoader`] orchestrates them: memory check, inline-payload fast
//! path, then a per-key coalesced pipeline of freshness decision, store
//! read or conditional fetch, decode, and memory insert. Concurrent callers
//! for one key share a single underlying operation and observe the same
//! settlement.
//!
//! ## Failure policy
//!
//! Persistent-store failures degrade rather than fail: a write failure
//! rolls the body/metadata pair back and the freshly fetched bytes are
//! still returned; a read failure is a cache miss. Decode failures and
//! unrecovered cache inconsistencies are terminal for every caller joined
//! on the operation; a cancellation is terminal only for the caller whose
//! signal fired.

pub mod buffer_cache;
mod coalesce;
pub mod data_url;
pub mod error;
mod fetch;
pub mod freshness;
pub mod loader;
pub mod metadata;
pub mod progress;
pub mod store;

pub use error::{LoaderError, Result};
pub use loader::SampleLoader;
pub use progress::{LoadCallbacks, LoadCompletion, LoadFailure, LoadProgress};

// Re-export commonly used types
pub use buffer_cache::BufferCache;
pub use freshness::FreshnessDecision;
pub use metadata::CacheMetadata;
