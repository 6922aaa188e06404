//! # Request Coalescer
//!
//! Guarantees at most one in-flight fetch-and-decode operation per resource
//! key. The first caller for a key creates the operation and every later
//! caller joins it; all of them observe the identical settlement.
//!
//! The operation runs on its own task, so a joined caller aborting detaches
//! only that caller. Once the last interested caller has detached, the
//! operation's shared cancellation token fires and the fetch stage stops at
//! its next suspension point (never mid-write).

use crate::error::{LoaderError, Result};
use crate::progress::{LoadCallbacks, LoadCompletion, LoadFailure, SharedCallbacks};
use bridge_traits::decoder::AudioBuffer;
use core_runtime::events::{CoreEvent, EventBus, LoadingEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What a work function hands back on success.
pub(crate) struct LoadOutcome {
    pub buffer: Arc<AudioBuffer>,
    /// Size of the encoded payload, for the completion notification.
    pub encoded_size: u64,
}

type Settlement = Option<Result<Arc<AudioBuffer>>>;

/// One in-flight fetch-or-serve for a key.
struct PendingOperation {
    op_id: u64,
    settled: watch::Receiver<Settlement>,
    callbacks: SharedCallbacks,
    cancel: CancellationToken,
}

/// Per-key single-flight table.
pub(crate) struct RequestCoalescer {
    pending: Mutex<HashMap<String, PendingOperation>>,
    next_op: AtomicU64,
}

/// Removes the table entry when the driving task settles, on every exit
/// path including a panic inside the work future. Matching on `op_id`
/// protects a replacement operation under the same key from being removed
/// by its predecessor.
struct RemovalGuard {
    coalescer: Arc<RequestCoalescer>,
    key: String,
    op_id: u64,
}

impl Drop for RemovalGuard {
    fn drop(&mut self) {
        let mut pending = self.coalescer.pending.lock();
        if pending.get(&self.key).is_some_and(|op| op.op_id == self.op_id) {
            pending.remove(&self.key);
        }
    }
}

impl RequestCoalescer {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            next_op: AtomicU64::new(0),
        }
    }

    /// Number of keys with an operation in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Join the pending operation for `key`, or create one driving `work`.
    ///
    /// Every caller for the same operation receives the same buffer or the
    /// same error classification. A caller whose own `cancel` fires detaches
    /// with [`LoaderError::Aborted`] without disturbing the others.
    pub async fn run_or_join<F, Fut>(
        self: &Arc<Self>,
        key: &str,
        cancel: Option<CancellationToken>,
        callbacks: LoadCallbacks,
        events: Option<Arc<EventBus>>,
        work: F,
    ) -> Result<Arc<AudioBuffer>>
    where
        F: FnOnce(CancellationToken, SharedCallbacks) -> Fut,
        Fut: Future<Output = Result<LoadOutcome>> + Send + 'static,
    {
        let (shared, settled, op_cancel, driver) = {
            let mut pending = self.pending.lock();

            // An entry whose shared token already fired was abandoned by
            // every previous caller; replace it so a fresh caller is not
            // doomed by a cancellation it never issued.
            if pending.get(key).is_some_and(|op| op.cancel.is_cancelled()) {
                pending.remove(key);
            }

            if let Some(op) = pending.get(key) {
                debug!(key, "Joining in-flight load");
                (
                    op.callbacks.clone(),
                    op.settled.clone(),
                    op.cancel.clone(),
                    None,
                )
            } else {
                let op_id = self.next_op.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = watch::channel(None);
                let shared = SharedCallbacks::new();
                let op_cancel = CancellationToken::new();
                pending.insert(
                    key.to_string(),
                    PendingOperation {
                        op_id,
                        settled: rx.clone(),
                        callbacks: shared.clone(),
                        cancel: op_cancel.clone(),
                    },
                );
                (shared, rx, op_cancel, Some((tx, op_id)))
            }
        };

        let registration = shared.attach(callbacks);

        if let Some((tx, op_id)) = driver {
            emit(&events, CoreEvent::Loading(LoadingEvent::Started {
                key: key.to_string(),
            }));

            let guard = RemovalGuard {
                coalescer: Arc::clone(self),
                key: key.to_string(),
                op_id,
            };
            let fut = work(op_cancel.clone(), shared.clone());
            let driver_callbacks = shared.clone();
            let driver_key = key.to_string();

            tokio::spawn(async move {
                let started = Instant::now();
                let result = fut.await;

                // Entry out of the table before settling, so a caller that
                // arrives after settlement starts a fresh operation.
                drop(guard);

                match &result {
                    Ok(outcome) => {
                        driver_callbacks.complete(&LoadCompletion {
                            duration: started.elapsed(),
                            size: outcome.encoded_size,
                        });
                        emit(&events, CoreEvent::Loading(LoadingEvent::Completed {
                            key: driver_key,
                            duration_ms: started.elapsed().as_millis() as u64,
                            size: outcome.encoded_size,
                        }));
                    }
                    Err(e) => {
                        driver_callbacks.error(&LoadFailure {
                            message: e.to_string(),
                            error_type: e.error_type(),
                        });
                        emit(&events, CoreEvent::Loading(LoadingEvent::Failed {
                            key: driver_key,
                            message: e.to_string(),
                            error_type: e.error_type().to_string(),
                        }));
                    }
                }

                tx.send(Some(result.map(|outcome| outcome.buffer))).ok();
            });
        }

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        let remaining = shared.detach(registration);
                        if remaining == 0 && settled.borrow().is_none() {
                            debug!(key, "Last participant detached; cancelling shared load");
                            op_cancel.cancel();
                        }
                        Err(LoaderError::Aborted)
                    }
                    result = wait_settled(settled.clone()) => result,
                }
            }
            None => wait_settled(settled).await,
        }
    }
}

async fn wait_settled(mut rx: watch::Receiver<Settlement>) -> Result<Arc<AudioBuffer>> {
    loop {
        if let Some(result) = rx.borrow_and_update().clone() {
            return result;
        }
        if rx.changed().await.is_err() {
            return Err(LoaderError::Internal(
                "load task terminated before settling".to_string(),
            ));
        }
    }
}

fn emit(events: &Option<Arc<EventBus>>, event: CoreEvent) {
    if let Some(bus) = events {
        bus.emit(event).ok();
    }
}
