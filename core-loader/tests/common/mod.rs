//! Shared test doubles: scripted HTTP transport, in-memory byte store with
//! failure injection, counting decoder, and a manually advanced clock.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::decoder::{AudioBuffer, AudioDecoder};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpBody, HttpRequest, HttpResponse, HttpTransport};
use bridge_traits::store::{ByteStore, ContentHeaders, StoreHandle};
use bridge_traits::time::Clock;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use core_loader::{CacheMetadata, SampleLoader};
use core_runtime::config::LoaderConfig;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

// ============================================================================
// Transport
// ============================================================================

/// One canned response the mock transport will serve.
pub struct ScriptedResponse {
    status: u16,
    status_text: String,
    headers: Vec<(String, String)>,
    body: Bytes,
    stream_body: bool,
}

impl ScriptedResponse {
    /// 200 with a streamed body and a `Content-Length` header.
    pub fn ok(body: &'static [u8]) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![("content-length".to_string(), body.len().to_string())],
            body: Bytes::from_static(body),
            stream_body: true,
        }
    }

    /// 200 with a streamed body and no length header.
    pub fn ok_unknown_length(body: &'static [u8]) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            headers: Vec::new(),
            body: Bytes::from_static(body),
            stream_body: true,
        }
    }

    pub fn not_modified() -> Self {
        Self {
            status: 304,
            status_text: "Not Modified".to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
            stream_body: false,
        }
    }

    pub fn error(status: u16, status_text: &str) -> Self {
        Self {
            status,
            status_text: status_text.to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
            stream_body: false,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_lowercase(), value.to_string()));
        self
    }

    fn into_response(self) -> HttpResponse {
        let body = if self.stream_body {
            let chunks: Vec<BridgeResult<Bytes>> = self
                .body
                .chunks(4)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            HttpBody::Stream(Box::pin(futures::stream::iter(chunks)))
        } else {
            HttpBody::Full(self.body)
        };

        HttpResponse {
            status: self.status,
            status_text: self.status_text,
            headers: self.headers.into_iter().collect(),
            body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Transport that serves scripted responses in order and records every
/// request. An optional gate (zero-permit semaphore) holds requests until
/// the test releases them.
pub struct MockTransport {
    script: Mutex<VecDeque<ScriptedResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn push(&self, response: ScriptedResponse) {
        self.script.lock().push_back(response);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn request(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if let Some(token) = &request.cancel {
            if token.is_cancelled() {
                return Err(BridgeError::Aborted);
            }
        }

        self.requests.lock().push(RecordedRequest {
            url: request.url.clone(),
            headers: request.headers.clone(),
        });

        if let Some(gate) = &self.gate {
            match &request.cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return Err(BridgeError::Aborted),
                        permit = gate.acquire() => permit.expect("gate closed").forget(),
                    }
                }
                None => gate.acquire().await.expect("gate closed").forget(),
            }
        }

        let scripted = self
            .script
            .lock()
            .pop_front()
            .ok_or_else(|| BridgeError::OperationFailed("no scripted response left".to_string()))?;
        Ok(scripted.into_response())
    }
}

/// Poll until the transport has seen `count` requests.
pub async fn wait_for_requests(transport: &MockTransport, count: usize) {
    for _ in 0..200 {
        if transport.request_count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "timed out waiting for {count} requests (saw {})",
        transport.request_count()
    );
}

// ============================================================================
// Store
// ============================================================================

/// In-memory byte store with per-key put/get failure injection.
pub struct MockStore {
    entries: Arc<Mutex<HashMap<String, Bytes>>>,
    fail_put_keys: Arc<Mutex<HashSet<String>>>,
    fail_get_keys: Arc<Mutex<HashSet<String>>>,
    fail_open: AtomicBool,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            fail_put_keys: Arc::new(Mutex::new(HashSet::new())),
            fail_get_keys: Arc::new(Mutex::new(HashSet::new())),
            fail_open: AtomicBool::new(false),
        }
    }

    pub fn seed(&self, key: &str, body: &'static [u8]) {
        self.entries
            .lock()
            .insert(key.to_string(), Bytes::from_static(body));
    }

    pub fn seed_metadata(&self, key: &str, metadata: &CacheMetadata) {
        self.entries.lock().insert(
            format!("{key}:meta"),
            Bytes::from(metadata.to_json().unwrap()),
        );
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.lock().get(key).cloned()
    }

    pub fn metadata(&self, key: &str) -> Option<CacheMetadata> {
        let raw = self.entries.lock().get(&format!("{key}:meta")).cloned()?;
        Some(CacheMetadata::from_json(&raw).unwrap())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn fail_put(&self, key: &str) {
        self.fail_put_keys.lock().insert(key.to_string());
    }

    pub fn fail_get(&self, key: &str) {
        self.fail_get_keys.lock().insert(key.to_string());
    }

    pub fn fail_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ByteStore for MockStore {
    async fn open(&self, _name: &str) -> BridgeResult<Arc<dyn StoreHandle>> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable(
                "store unsupported in this environment".to_string(),
            ));
        }
        Ok(Arc::new(MockHandle {
            entries: self.entries.clone(),
            fail_put_keys: self.fail_put_keys.clone(),
            fail_get_keys: self.fail_get_keys.clone(),
        }))
    }
}

struct MockHandle {
    entries: Arc<Mutex<HashMap<String, Bytes>>>,
    fail_put_keys: Arc<Mutex<HashSet<String>>>,
    fail_get_keys: Arc<Mutex<HashSet<String>>>,
}

#[async_trait]
impl StoreHandle for MockHandle {
    async fn get(&self, key: &str) -> BridgeResult<Option<Bytes>> {
        if self.fail_get_keys.lock().contains(key) {
            return Err(BridgeError::OperationFailed("read failed".to_string()));
        }
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, data: Bytes, _headers: &ContentHeaders) -> BridgeResult<()> {
        if self.fail_put_keys.lock().contains(key) {
            return Err(BridgeError::OperationFailed("quota exceeded".to_string()));
        }
        self.entries.lock().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> BridgeResult<bool> {
        Ok(self.entries.lock().remove(key).is_some())
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// Decoder double: one mono sample per input byte, so assertions can match
/// buffers back to the encoded payload. Rejects the payload `b"bad"`.
pub struct MockDecoder {
    calls: AtomicUsize,
}

impl MockDecoder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioDecoder for MockDecoder {
    async fn decode(&self, data: Bytes) -> BridgeResult<AudioBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if data.is_empty() || data.as_ref() == b"bad" {
            return Err(BridgeError::OperationFailed(
                "unsupported audio format".to_string(),
            ));
        }
        let samples = data.iter().map(|b| *b as f32 / 255.0).collect();
        Ok(AudioBuffer::new(44100, vec![samples]))
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Manually advanced time source.
pub struct ManualClock {
    now: Mutex<i64>,
}

impl ManualClock {
    pub fn at(unix_seconds: i64) -> Self {
        Self {
            now: Mutex::new(unix_seconds),
        }
    }

    pub fn advance(&self, seconds: i64) {
        *self.now.lock() += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(*self.now.lock(), 0).unwrap()
    }
}

// ============================================================================
// Fixture
// ============================================================================

pub const NOW: i64 = 1_700_000_000;
pub const URL: &str = "https://samples.example.com/kick.wav";

pub struct Fixture {
    pub transport: Arc<MockTransport>,
    pub store: Arc<MockStore>,
    pub decoder: Arc<MockDecoder>,
    pub clock: Arc<ManualClock>,
    pub loader: SampleLoader,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_transport(MockTransport::new())
    }

    pub fn with_transport(transport: MockTransport) -> Self {
        let transport = Arc::new(transport);
        let store = Arc::new(MockStore::new());
        let decoder = Arc::new(MockDecoder::new());
        let clock = Arc::new(ManualClock::at(NOW));

        let config = LoaderConfig::default()
            .with_store_name("test-store")
            .with_buffer_cache_capacity(4);
        let loader = SampleLoader::new(config, transport.clone(), store.clone())
            .unwrap()
            .with_clock(clock.clone());

        Self {
            transport,
            store,
            decoder,
            clock,
            loader,
        }
    }

    pub fn metadata(&self, etag: Option<&str>, cache_control: Option<&str>, timestamp: i64) -> CacheMetadata {
        CacheMetadata {
            url: URL.to_string(),
            etag: etag.map(str::to_string),
            last_modified: None,
            cache_control: cache_control.map(str::to_string),
            timestamp,
        }
    }

    pub async fn load(&self, key: &str) -> core_loader::Result<Arc<AudioBuffer>> {
        self.loader
            .get_audio_buffer(self.decoder.clone(), key, None, Default::default())
            .await
    }
}
