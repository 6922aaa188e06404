//! Concurrency behavior of the loader: per-key coalescing, per-caller
//! cancellation, and independence of distinct keys.

mod common;

use common::*;
use core_loader::LoaderError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_request_and_one_buffer() {
    let gate = Arc::new(Semaphore::new(0));
    let fx = Arc::new(Fixture::with_transport(MockTransport::gated(gate.clone())));
    fx.transport.push(ScriptedResponse::ok(b"payload"));

    let mut handles = Vec::new();
    for _ in 0..3 {
        let fx = fx.clone();
        handles.push(tokio::spawn(async move { fx.load(URL).await }));
    }

    // all three callers are in flight, exactly one request was issued
    wait_for_requests(&fx.transport, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fx.transport.request_count(), 1);
    assert_eq!(fx.loader.pending_loads(), 1);

    gate.add_permits(1);

    let buffers: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert!(Arc::ptr_eq(&buffers[0], &buffers[1]));
    assert!(Arc::ptr_eq(&buffers[1], &buffers[2]));
    assert_eq!(fx.transport.request_count(), 1);
    assert_eq!(fx.decoder.call_count(), 1);
    assert_eq!(fx.loader.pending_loads(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn error_settlement_is_shared_by_all_joined_callers() {
    let gate = Arc::new(Semaphore::new(0));
    let fx = Arc::new(Fixture::with_transport(MockTransport::gated(gate.clone())));
    fx.transport.push(ScriptedResponse::ok(b"bad")); // decoder rejects

    let mut handles = Vec::new();
    for _ in 0..2 {
        let fx = fx.clone();
        handles.push(tokio::spawn(async move { fx.load(URL).await }));
    }

    wait_for_requests(&fx.transport, 1).await;
    gate.add_permits(1);

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(LoaderError::Decode(_))));
    }
    assert_eq!(fx.transport.request_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn aborting_one_caller_leaves_the_sibling_undisturbed() {
    let gate = Arc::new(Semaphore::new(0));
    let fx = Arc::new(Fixture::with_transport(MockTransport::gated(gate.clone())));
    fx.transport.push(ScriptedResponse::ok(b"payload"));

    let token = CancellationToken::new();

    let aborting = {
        let fx = fx.clone();
        let token = token.clone();
        tokio::spawn(async move {
            fx.loader
                .get_audio_buffer(fx.decoder.clone(), URL, Some(token), Default::default())
                .await
        })
    };
    let surviving = {
        let fx = fx.clone();
        tokio::spawn(async move { fx.load(URL).await })
    };

    wait_for_requests(&fx.transport, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    token.cancel();
    let aborted = aborting.await.unwrap();
    assert!(matches!(aborted, Err(LoaderError::Aborted)));

    // the shared operation keeps running for the sibling
    gate.add_permits(1);
    let buffer = surviving.await.unwrap().unwrap();
    assert_eq!(buffer.frames(), b"payload".len());
    assert_eq!(fx.transport.request_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sole_caller_abort_cancels_the_network_stage() {
    let gate = Arc::new(Semaphore::new(0));
    let fx = Arc::new(Fixture::with_transport(MockTransport::gated(gate.clone())));
    fx.transport.push(ScriptedResponse::ok(b"payload"));

    let token = CancellationToken::new();
    let caller = {
        let fx = fx.clone();
        let token = token.clone();
        tokio::spawn(async move {
            fx.loader
                .get_audio_buffer(fx.decoder.clone(), URL, Some(token), Default::default())
                .await
        })
    };

    wait_for_requests(&fx.transport, 1).await;
    token.cancel();

    let result = caller.await.unwrap();
    assert!(matches!(result, Err(LoaderError::Aborted)));

    // the transport observed the shared token and gave up; once the
    // operation settles the pending table is empty again
    for _ in 0..100 {
        if fx.loader.pending_loads() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(fx.loader.pending_loads(), 0);

    // a later caller starts a fresh operation and succeeds
    gate.add_permits(1);
    let buffer = fx.load(URL).await.unwrap();
    assert_eq!(buffer.frames(), b"payload".len());
    assert_eq!(fx.transport.request_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_keys_run_concurrently() {
    let gate = Arc::new(Semaphore::new(0));
    let fx = Arc::new(Fixture::with_transport(MockTransport::gated(gate.clone())));
    fx.transport.push(ScriptedResponse::ok(b"alpha"));
    fx.transport.push(ScriptedResponse::ok(b"bravo"));

    let first = {
        let fx = fx.clone();
        tokio::spawn(async move { fx.load("https://samples.example.com/a.wav").await })
    };
    let second = {
        let fx = fx.clone();
        tokio::spawn(async move { fx.load("https://samples.example.com/b.wav").await })
    };

    // both requests are in flight at the same time: no cross-key lock
    wait_for_requests(&fx.transport, 2).await;
    assert_eq!(fx.loader.pending_loads(), 2);

    gate.add_permits(2);
    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());
    assert_eq!(fx.loader.pending_loads(), 0);
}

#[tokio::test]
async fn pre_cancelled_caller_never_reaches_the_network() {
    let fx = Fixture::new();
    let token = CancellationToken::new();
    token.cancel();

    let result = fx
        .loader
        .get_audio_buffer(fx.decoder.clone(), URL, Some(token), Default::default())
        .await;

    assert!(matches!(result, Err(LoaderError::Aborted)));
    assert_eq!(fx.transport.request_count(), 0);
}
