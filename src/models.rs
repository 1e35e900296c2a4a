//! Record types stored locally and exchanged with the remote API.
//!
//! Field names are camelCase on disk and on the wire. Optional fields are
//! omitted when empty so that loading and re-saving a collection produces
//! the same bytes.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Free-form settings blob (currency code, date format, ...).
pub type Settings = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// ENTITY
// =============================================================================

/// Record collections that are mirrored to the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Expense,
    Budget,
}

impl Entity {
    /// Remote collection path segment.
    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Expense => "expenses",
            Self::Budget => "budgets",
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Budget => "budget",
        }
    }
}

/// Common surface of records the orchestrator and sync routine move around.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const ENTITY: Entity;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn client_key(&self) -> Option<Uuid>;
    fn set_client_key(&mut self, key: Uuid);
    fn user_id(&self) -> Option<&str>;
    fn set_user_id(&mut self, user_id: Option<String>);
    fn set_updated_at(&mut self, at: String);

    /// Return the idempotency key, assigning a fresh one to legacy records.
    fn ensure_client_key(&mut self) -> Uuid {
        if let Some(key) = self.client_key() {
            return key;
        }
        let key = Uuid::new_v4();
        self.set_client_key(key);
        key
    }

    /// Path segment that addresses this record on the remote.
    fn remote_key(&self) -> String {
        self.client_key()
            .map_or_else(|| self.id().to_owned(), |key| key.to_string())
    }

    /// True when `needle` is either the local id or the idempotency key.
    fn matches_key(&self, needle: &str) -> bool {
        self.id() == needle || self.client_key().is_some_and(|key| key.to_string() == needle)
    }
}

// =============================================================================
// EXPENSE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub category_id: String,
    /// ISO calendar date (`YYYY-MM-DD`).
    pub date: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<Uuid>,
}

impl Record for Expense {
    const ENTITY: Entity = Entity::Expense;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn client_key(&self) -> Option<Uuid> {
        self.client_key
    }

    fn set_client_key(&mut self, key: Uuid) {
        self.client_key = Some(key);
    }

    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn set_user_id(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }

    fn set_updated_at(&mut self, at: String) {
        self.updated_at = Some(at);
    }
}

/// Amount as typed by a user: form fields deliver strings, API callers numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl From<f64> for AmountInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for AmountInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Input for `add_expense`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub description: String,
    pub amount: AmountInput,
    pub category_id: String,
    pub date: String,
    #[serde(default)]
    pub notes: String,
}

/// Shallow patch for `update_expense`; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountInput>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// BUDGET
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    #[default]
    Monthly,
    Weekly,
}

impl BudgetPeriod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
        }
    }
}

impl std::str::FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "weekly" => Ok(Self::Weekly),
            other => Err(format!("unknown budget period '{other}' (expected 'monthly' or 'weekly')")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub category_id: String,
    pub amount: f64,
    pub period: BudgetPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<Uuid>,
}

impl Record for Budget {
    const ENTITY: Entity = Entity::Budget;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn client_key(&self) -> Option<Uuid> {
        self.client_key
    }

    fn set_client_key(&mut self, key: Uuid) {
        self.client_key = Some(key);
    }

    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn set_user_id(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }

    fn set_updated_at(&mut self, at: String) {
        self.updated_at = Some(at);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    pub category_id: String,
    pub amount: AmountInput,
    #[serde(default)]
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPatch {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountInput>,
    #[serde(default)]
    pub period: Option<BudgetPeriod>,
}

// =============================================================================
// CATEGORY / PROFILE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Emoji shown next to the name.
    pub icon: String,
    /// Hex color, `#rrggbb`.
    pub color: String,
}

/// Signed-in user, written at login and read by every remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub login_time: Option<String>,
}

// =============================================================================
// CLOCK
// =============================================================================

pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Current UTC time as an RFC 3339 timestamp.
pub(crate) fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Timestamp-based id that does not collide with any id in `existing`.
pub(crate) fn next_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let taken: std::collections::HashSet<&str> = existing.into_iter().collect();
    let mut candidate = now_ms();
    while taken.contains(candidate.to_string().as_str()) {
        candidate += 1;
    }
    candidate.to_string()
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
