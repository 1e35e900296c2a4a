//! HTTP client for the money-manager REST API.
//!
//! Thin wrapper over `reqwest`: rate check, auth headers from the stored
//! profile, status-to-notice mapping, and envelope normalization. There is
//! no retry here; a failed call is reported to the caller, who decides
//! whether to fall back to local storage.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::rate_limit::{RateLimiter, rate_limit_key};
use super::{ApiResponse, RemoteBackend};
use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::local::LocalStore;
use crate::models::Entity;
use crate::notify::{NETWORK_ERROR, Notice, Notifier};

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

// =============================================================================
// CLIENT
// =============================================================================

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: LocalStore,
    limiter: RateLimiter,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    /// Build a client; the profile for auth headers is read from `store` on
    /// every call, so logins and logouts take effect immediately.
    ///
    /// # Errors
    ///
    /// Returns `RemoteUnavailable` if the HTTP client cannot be built.
    pub fn new(
        config: &StoreConfig,
        store: LocalStore,
        limiter: RateLimiter,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| StorageError::RemoteUnavailable(format!("http client build failed: {e}")))?;
        Ok(Self { http, base_url: config.api_base_url.clone(), store, limiter, notifier })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request against `endpoint` (relative to the base URL).
    ///
    /// # Errors
    ///
    /// - `RateLimited` before any I/O when the user's window is full
    /// - `RemoteUnavailable` when the request cannot be sent or read
    /// - `Remote` for non-2xx statuses
    /// - `MalformedResponse` for a 2xx body that is not JSON
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        data: Option<Value>,
    ) -> Result<ApiResponse<Value>, StorageError> {
        self.send(endpoint, method, data, None).await
    }

    async fn send(
        &self,
        endpoint: &str,
        method: Method,
        data: Option<Value>,
        idempotency_key: Option<Uuid>,
    ) -> Result<ApiResponse<Value>, StorageError> {
        let profile = self.store.load_profile();
        let user_id = profile.as_ref().map(|p| p.id.as_str());

        if let Err(e) = self.limiter.check_and_record(&rate_limit_key(user_id)) {
            warn!(endpoint, user_id = user_id.unwrap_or("anonymous"), "remote call rate limited");
            self.notifier.notify(Notice::warning(super::rate_limit::RATE_LIMIT_MESSAGE));
            return Err(e.into());
        }

        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let token = profile
            .as_ref()
            .and_then(|p| p.access_token.as_deref())
            .unwrap_or_default();

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(USER_ID_HEADER, user_id.unwrap_or("anonymous"));
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key.to_string());
        }
        if let Some(body) = &data {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, %method, %url, "remote request failed");
                self.notifier.notify(Notice::error(NETWORK_ERROR));
                return Err(StorageError::RemoteUnavailable(e.to_string()));
            }
        };

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            self.notifier.notify(Notice::error(NETWORK_ERROR));
            StorageError::RemoteUnavailable(e.to_string())
        })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), %method, %url, "remote returned error status");
            self.notifier.notify(Notice::for_status(status.as_u16()));
            return Err(StorageError::Remote {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_owned(),
                body: text,
            });
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| StorageError::MalformedResponse(e.to_string()))?
        };
        debug!(status = status.as_u16(), %method, %url, "remote call ok");
        Ok(ApiResponse::from_body(status.as_u16(), body))
    }
}

#[async_trait::async_trait]
impl RemoteBackend for ApiClient {
    async fn list(&self, entity: Entity) -> Result<Vec<Value>, StorageError> {
        let resp = self.call(entity.endpoint(), Method::GET, None).await?;
        if resp.data.is_null() {
            return Ok(Vec::new());
        }
        Ok(resp.into_typed::<Vec<Value>>()?.data)
    }

    async fn create(&self, entity: Entity, key: Uuid, body: Value) -> Result<Value, StorageError> {
        let resp = self
            .send(entity.endpoint(), Method::POST, Some(body), Some(key))
            .await?;
        Ok(resp.data)
    }

    async fn update(&self, entity: Entity, key: &str, body: Value) -> Result<Value, StorageError> {
        let endpoint = format!("{}/{key}", entity.endpoint());
        let resp = self.call(&endpoint, Method::PUT, Some(body)).await?;
        Ok(resp.data)
    }

    async fn delete(&self, entity: Entity, key: &str) -> Result<(), StorageError> {
        let endpoint = format!("{}/{key}", entity.endpoint());
        self.call(&endpoint, Method::DELETE, None).await?;
        Ok(())
    }

    async fn probe(&self) -> bool {
        match self.call(Entity::Expense.endpoint(), Method::GET, None).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "server availability probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
