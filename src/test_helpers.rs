//! Shared fixtures for unit tests: records, stores, a mock remote, and an
//! in-process fake HTTP API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use uuid::Uuid;

use crate::config::{DEFAULT_LOCAL_QUOTA_BYTES, StoreConfig};
use crate::error::StorageError;
use crate::local::LocalStore;
use crate::mode::{ModeSelector, StorageMode};
use crate::models::{Budget, BudgetPeriod, Entity, Expense, UserProfile};
use crate::notify::RecordingNotifier;
use crate::remote::RemoteBackend;
use crate::services::MoneyStore;

// =============================================================================
// FIXTURES
// =============================================================================

pub(crate) fn memory_store() -> LocalStore {
    LocalStore::in_memory(DEFAULT_LOCAL_QUOTA_BYTES)
}

pub(crate) fn expense(id: &str, description: &str, amount: f64) -> Expense {
    Expense {
        id: id.to_owned(),
        description: description.to_owned(),
        amount,
        category_id: "food".to_owned(),
        date: "2024-01-01".to_owned(),
        notes: String::new(),
        user_id: None,
        created_at: "2024-01-01T08:00:00Z".to_owned(),
        updated_at: None,
        client_key: Some(Uuid::new_v4()),
    }
}

pub(crate) fn budget(id: &str, category_id: &str, amount: f64) -> Budget {
    Budget {
        id: id.to_owned(),
        category_id: category_id.to_owned(),
        amount,
        period: BudgetPeriod::Monthly,
        user_id: None,
        created_at: "2024-01-01T08:00:00Z".to_owned(),
        updated_at: None,
        client_key: Some(Uuid::new_v4()),
    }
}

pub(crate) fn profile(id: &str) -> UserProfile {
    UserProfile {
        id: id.to_owned(),
        email: Some(format!("{id}@example.test")),
        name: Some("Test User".to_owned()),
        picture: None,
        provider: Some("google".to_owned()),
        access_token: Some(format!("token-{id}")),
        refresh_token: None,
        login_time: None,
    }
}

/// Store with a signed-in user and server mode persisted.
pub(crate) fn signed_in_server_store(user_id: &str) -> LocalStore {
    let store = memory_store();
    store.save_profile(&profile(user_id)).unwrap();
    ModeSelector::new(store.clone())
        .set_mode(StorageMode::Server)
        .unwrap();
    store
}

pub(crate) struct Harness {
    pub store: LocalStore,
    pub remote: Arc<MockRemote>,
    pub notifier: RecordingNotifier,
    pub money: MoneyStore,
}

pub(crate) fn harness(store: LocalStore) -> Harness {
    let remote = Arc::new(MockRemote::new());
    let notifier = RecordingNotifier::new();
    let money = MoneyStore::new(store.clone(), remote.clone(), Arc::new(notifier.clone()));
    Harness { store, remote, notifier, money }
}

// =============================================================================
// MOCK REMOTE
// =============================================================================

/// In-memory remote keyed by idempotency key, with a switch to simulate an
/// unreachable server.
pub(crate) struct MockRemote {
    records: Mutex<HashMap<(Entity, String), Value>>,
    /// Insertion order so `list` is deterministic.
    order: Mutex<Vec<(Entity, String)>>,
    pub calls: AtomicUsize,
    pub creates: AtomicUsize,
    offline: AtomicBool,
    /// Fail every create whose key matches with a 422.
    reject_key: Mutex<Option<Uuid>>,
}

impl MockRemote {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            reject_key: Mutex::new(None),
        }
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn reject_creates_for(&self, key: Uuid) {
        *self.reject_key.lock().unwrap() = Some(key);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub(crate) fn record_count(&self, entity: Entity) -> usize {
        self.records
            .lock()
            .unwrap()
            .keys()
            .filter(|(e, _)| *e == entity)
            .count()
    }

    pub(crate) fn get(&self, entity: Entity, key: &str) -> Option<Value> {
        self.records
            .lock()
            .unwrap()
            .get(&(entity, key.to_owned()))
            .cloned()
    }

    pub(crate) fn seed(&self, entity: Entity, key: &str, body: Value) {
        self.records
            .lock()
            .unwrap()
            .insert((entity, key.to_owned()), body);
        self.order.lock().unwrap().push((entity, key.to_owned()));
    }

    fn begin(&self) -> Result<(), StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::RemoteUnavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteBackend for MockRemote {
    async fn list(&self, entity: Entity) -> Result<Vec<Value>, StorageError> {
        self.begin()?;
        let records = self.records.lock().unwrap();
        Ok(self
            .order
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| *e == entity)
            .filter_map(|k| records.get(k).cloned())
            .collect())
    }

    async fn create(&self, entity: Entity, key: Uuid, body: Value) -> Result<Value, StorageError> {
        self.begin()?;
        if *self.reject_key.lock().unwrap() == Some(key) {
            return Err(StorageError::Remote { status: 422, status_text: "Unprocessable Entity".into(), body: String::new() });
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        let slot = (entity, key.to_string());
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get(&slot) {
            return Ok(existing.clone());
        }
        records.insert(slot.clone(), body.clone());
        self.order.lock().unwrap().push(slot);
        Ok(body)
    }

    async fn update(&self, entity: Entity, key: &str, body: Value) -> Result<Value, StorageError> {
        self.begin()?;
        let slot = (entity, key.to_owned());
        let mut records = self.records.lock().unwrap();
        if !records.contains_key(&slot) {
            return Err(StorageError::Remote { status: 404, status_text: "Not Found".into(), body: String::new() });
        }
        records.insert(slot, body.clone());
        Ok(body)
    }

    async fn delete(&self, entity: Entity, key: &str) -> Result<(), StorageError> {
        self.begin()?;
        let slot = (entity, key.to_owned());
        self.records.lock().unwrap().remove(&slot);
        self.order.lock().unwrap().retain(|k| *k != slot);
        Ok(())
    }

    async fn probe(&self) -> bool {
        self.begin().is_ok()
    }
}

// =============================================================================
// FAKE HTTP API
// =============================================================================

#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub user_id: Option<String>,
    pub idempotency_key: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub(crate) struct FakeApi {
    pub requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl FakeApi {
    pub(crate) fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn last(&self) -> CapturedRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("at least one request")
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
}

/// Routes:
/// - `/api/status/{code}` answers with that status
/// - `/api/garbage` answers 200 with a non-JSON body
/// - GET answers `{"data": []}`, POST echoes `{"data": body}` with 201,
///   PUT echoes the bare body, DELETE answers 204
async fn fake_handler(State(api): State<FakeApi>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path = uri.path().to_owned();
    let json_body = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    api.requests.lock().unwrap().push(CapturedRequest {
        method: method.to_string(),
        path: path.clone(),
        authorization: header(&headers, "authorization"),
        user_id: header(&headers, "x-user-id"),
        idempotency_key: header(&headers, "idempotency-key"),
        body: json_body.clone(),
    });

    if let Some(code) = path.strip_prefix("/api/status/") {
        let status = code
            .parse::<u16>()
            .ok()
            .and_then(|c| StatusCode::from_u16(c).ok())
            .unwrap_or(StatusCode::BAD_REQUEST);
        return (status, "{\"error\":\"forced\"}").into_response();
    }
    if path == "/api/garbage" {
        return (StatusCode::OK, "<html>not json</html>").into_response();
    }

    match method {
        Method::GET => axum::Json(serde_json::json!({ "data": [] })).into_response(),
        Method::POST => (StatusCode::CREATED, axum::Json(serde_json::json!({ "data": json_body }))).into_response(),
        Method::PUT => axum::Json(json_body).into_response(),
        Method::DELETE => StatusCode::NO_CONTENT.into_response(),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

/// Spawn the fake API on an ephemeral port; returns its `/api` base URL.
pub(crate) async fn spawn_fake_api() -> (String, FakeApi) {
    let api = FakeApi::default();
    let app = Router::new()
        .fallback(fake_handler)
        .with_state(api.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api"), api)
}

pub(crate) fn config_for(base_url: &str) -> StoreConfig {
    StoreConfig { api_base_url: base_url.to_owned(), ..StoreConfig::default() }
}
