//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the sample loader:
//! - Logging and tracing setup
//! - Loader configuration
//! - Event bus for loading and cache notifications
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the loader core depends on.
//! It establishes the logging conventions and the event broadcasting
//! mechanism used throughout the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::LoaderConfig;
pub use error::{Error, Result};
pub use events::{CacheEvent, CacheTier, CoreEvent, EventBus, LoadingEvent};
