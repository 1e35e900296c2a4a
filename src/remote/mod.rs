//! Remote API access.
//!
//! DESIGN
//! ======
//! `RemoteBackend` is the seam the orchestrator and sync routine depend on.
//! It speaks in entities and JSON bodies so one implementation serves both
//! collections; `ApiClient` implements it over HTTP, tests substitute an
//! in-memory mock. Every HTTP response is normalized into `ApiResponse`
//! whether the server wraps its payload in `{"data": ...}` or not.

pub mod client;
pub mod rate_limit;

pub use client::ApiClient;
pub use rate_limit::{RateLimitConfig, RateLimitError, RateLimiter};

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::Entity;

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

/// Normalized response: HTTP status plus the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub data: T,
}

impl ApiResponse<Value> {
    /// Unwrap a `{"data": ...}` envelope when present; bare bodies pass through.
    #[must_use]
    pub fn from_body(status: u16, body: Value) -> Self {
        let data = match body {
            Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
            other => other,
        };
        Self { status, data }
    }

    /// # Errors
    ///
    /// Returns `MalformedResponse` when the payload does not match `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<ApiResponse<T>, StorageError> {
        let data = serde_json::from_value(self.data).map_err(|e| StorageError::MalformedResponse(e.to_string()))?;
        Ok(ApiResponse { status: self.status, data })
    }
}

// =============================================================================
// BACKEND TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Every record of `entity` visible to the signed-in user.
    async fn list(&self, entity: Entity) -> Result<Vec<Value>, StorageError>;

    /// Create a record. `key` is the idempotency key: repeating a create
    /// with the same key must not produce a second record.
    async fn create(&self, entity: Entity, key: Uuid, body: Value) -> Result<Value, StorageError>;

    /// Replace the record addressed by `key`.
    async fn update(&self, entity: Entity, key: &str, body: Value) -> Result<Value, StorageError>;

    /// Delete the record addressed by `key`.
    async fn delete(&self, entity: Entity, key: &str) -> Result<(), StorageError>;

    /// Availability check used before switching to server mode.
    async fn probe(&self) -> bool;
}
