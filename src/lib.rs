//! Workspace placeholder crate.
//!
//! This crate exists to expose the workspace members under one dependency
//! (e.g., `core-loader`, `core-runtime`) together with the feature flags
//! that select platform adapters. Host applications can depend on
//! `slc-workspace` with the `desktop` feature and get a working loader
//! without wiring each crate individually.

pub use core_loader as loader;
pub use core_runtime as runtime;

#[cfg(feature = "desktop")]
pub use bridge_desktop as desktop;
