//! # Load Progress Callbacks
//!
//! Per-call observer registrations for one load. Several callers can join
//! the same underlying operation, so the in-flight record keeps a set of
//! registrations and fans each notification out to all of them.
//!
//! A panic inside a callback is caught and logged; observers can never
//! break the load they are observing.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Streaming progress for one load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProgress {
    /// Bytes received so far.
    pub loaded: u64,
    /// Expected total from the length header, when the origin sent one.
    pub total: Option<u64>,
    /// Fraction in `[0, 1]`, or `-1.0` when the total is unknown.
    pub progress: f64,
}

impl LoadProgress {
    pub(crate) fn new(loaded: u64, total: Option<u64>) -> Self {
        let progress = match total {
            Some(total) if total > 0 => loaded as f64 / total as f64,
            _ => -1.0,
        };
        Self {
            loaded,
            total,
            progress,
        }
    }
}

/// Payload of the completion notification.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCompletion {
    /// Wall time spent by the underlying operation.
    pub duration: Duration,
    /// Size of the encoded payload in bytes.
    pub size: u64,
}

/// Payload of the failure notification.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub message: String,
    /// Stable classification ("network", "decode", ...).
    pub error_type: &'static str,
}

type StartFn = Box<dyn Fn() + Send + Sync>;
type ProgressFn = Box<dyn Fn(&LoadProgress) + Send + Sync>;
type CompleteFn = Box<dyn Fn(&LoadCompletion) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&LoadFailure) + Send + Sync>;

/// One caller's observer registration. All callbacks are optional.
#[derive(Default)]
pub struct LoadCallbacks {
    on_start: Option<StartFn>,
    on_progress: Option<ProgressFn>,
    on_complete: Option<CompleteFn>,
    on_error: Option<ErrorFn>,
}

impl LoadCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    pub fn on_progress(mut self, f: impl Fn(&LoadProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(&LoadCompletion) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&LoadFailure) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn start(&self) {
        if let Some(f) = &self.on_start {
            guarded("on_start", f);
        }
    }

    pub(crate) fn progress(&self, p: &LoadProgress) {
        if let Some(f) = &self.on_progress {
            guarded("on_progress", || f(p));
        }
    }

    pub(crate) fn complete(&self, c: &LoadCompletion) {
        if let Some(f) = &self.on_complete {
            guarded("on_complete", || f(c));
        }
    }

    pub(crate) fn error(&self, e: &LoadFailure) {
        if let Some(f) = &self.on_error {
            guarded("on_error", || f(e));
        }
    }
}

impl std::fmt::Debug for LoadCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

fn guarded(name: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!(callback = name, "Load callback panicked, ignoring");
    }
}

/// The registration set attached to one in-flight operation.
///
/// Callers attach when they create or join the operation and detach when
/// their own cancellation signal fires; the remaining-count tells the
/// coalescer when nobody is interested anymore.
#[derive(Clone, Default)]
pub(crate) struct SharedCallbacks {
    inner: Arc<Mutex<Registry>>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: HashMap<u64, Arc<LoadCallbacks>>,
}

impl SharedCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach one caller's registration, firing its `on_start`.
    pub fn attach(&self, callbacks: LoadCallbacks) -> u64 {
        let callbacks = Arc::new(callbacks);
        let id = {
            let mut registry = self.inner.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.insert(id, callbacks.clone());
            id
        };
        callbacks.start();
        id
    }

    /// Detach a caller. Returns how many registrations remain.
    pub fn detach(&self, id: u64) -> usize {
        let mut registry = self.inner.lock();
        registry.entries.remove(&id);
        registry.entries.len()
    }

    pub fn progress(&self, p: &LoadProgress) {
        for callbacks in self.snapshot() {
            callbacks.progress(p);
        }
    }

    pub fn complete(&self, c: &LoadCompletion) {
        for callbacks in self.snapshot() {
            callbacks.complete(c);
        }
    }

    pub fn error(&self, e: &LoadFailure) {
        for callbacks in self.snapshot() {
            callbacks.error(e);
        }
    }

    // Invocation happens outside the lock so a slow observer cannot block
    // attach/detach.
    fn snapshot(&self) -> Vec<Arc<LoadCallbacks>> {
        self.inner.lock().entries.values().cloned().collect()
    }
}
