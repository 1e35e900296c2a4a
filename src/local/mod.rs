//! Local persistence: the key-value store plus typed accessors for each
//! fixed key.

pub mod store;

pub use store::LocalStore;

use crate::error::StorageError;
use crate::categories::default_categories;
use crate::models::{Budget, Category, Entity, Expense, Record, Settings, UserProfile};

pub const EXPENSES_KEY: &str = "money_manager_expenses";
pub const BUDGETS_KEY: &str = "money_manager_budgets";
pub const CATEGORIES_KEY: &str = "money_manager_categories";
pub const SETTINGS_KEY: &str = "money_manager_settings";
pub const USER_PROFILE_KEY: &str = "money_manager_user_profile";
pub const OUTBOX_KEY: &str = "money_manager_outbox";
pub const STORAGE_MODE_KEY: &str = "app_storage_mode";

/// Storage key holding the collection for `entity`.
#[must_use]
pub fn collection_key(entity: Entity) -> &'static str {
    match entity {
        Entity::Expense => EXPENSES_KEY,
        Entity::Budget => BUDGETS_KEY,
    }
}

impl LocalStore {
    /// All records of one collection; empty when missing or unparsable.
    #[must_use]
    pub fn load_records<R: Record>(&self) -> Vec<R> {
        self.get_or(collection_key(R::ENTITY), Vec::new())
    }

    /// # Errors
    ///
    /// Returns `QuotaExceeded`, `Serialization`, or `Io`.
    pub fn save_records<R: Record>(&self, records: &[R]) -> Result<(), StorageError> {
        self.set(collection_key(R::ENTITY), records)
    }

    /// Read-modify-write one collection under the store lock.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or the write error.
    pub fn update_records<R, T, F>(&self, f: F) -> Result<T, StorageError>
    where
        R: Record,
        F: FnOnce(&mut Vec<R>) -> Result<T, StorageError>,
    {
        self.update(collection_key(R::ENTITY), Vec::new(), f)
    }

    #[must_use]
    pub fn load_expenses(&self) -> Vec<Expense> {
        self.load_records()
    }

    /// # Errors
    ///
    /// Returns `QuotaExceeded`, `Serialization`, or `Io`.
    pub fn save_expenses(&self, expenses: &[Expense]) -> Result<(), StorageError> {
        self.save_records(expenses)
    }

    #[must_use]
    pub fn load_budgets(&self) -> Vec<Budget> {
        self.load_records()
    }

    /// # Errors
    ///
    /// Returns `QuotaExceeded`, `Serialization`, or `Io`.
    pub fn save_budgets(&self, budgets: &[Budget]) -> Result<(), StorageError> {
        self.save_records(budgets)
    }

    /// Stored categories, or the default set when none were saved yet.
    #[must_use]
    pub fn load_categories(&self) -> Vec<Category> {
        self.get(CATEGORIES_KEY)
            .unwrap_or_else(default_categories)
    }

    /// # Errors
    ///
    /// Returns `QuotaExceeded`, `Serialization`, or `Io`.
    pub fn save_categories(&self, categories: &[Category]) -> Result<(), StorageError> {
        self.set(CATEGORIES_KEY, categories)
    }

    /// Stored settings merged over the defaults.
    #[must_use]
    pub fn load_settings(&self) -> Settings {
        let mut settings = default_settings();
        let stored: Settings = self.get_or(SETTINGS_KEY, Settings::new());
        settings.extend(stored);
        settings
    }

    /// # Errors
    ///
    /// Returns `QuotaExceeded`, `Serialization`, or `Io`.
    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.set(SETTINGS_KEY, settings)
    }

    /// Shallow-merge `patch` into the stored settings and return the result.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded`, `Serialization`, or `Io`.
    pub fn update_settings(&self, patch: Settings) -> Result<Settings, StorageError> {
        let mut settings = self.load_settings();
        settings.extend(patch);
        self.save_settings(&settings)?;
        Ok(settings)
    }

    #[must_use]
    pub fn load_profile(&self) -> Option<UserProfile> {
        self.get(USER_PROFILE_KEY)
    }

    /// # Errors
    ///
    /// Returns `QuotaExceeded`, `Serialization`, or `Io`.
    pub fn save_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        self.set(USER_PROFILE_KEY, profile)
    }

    /// # Errors
    ///
    /// Returns `Io` if the stored profile cannot be deleted.
    pub fn clear_profile(&self) -> Result<(), StorageError> {
        self.remove(USER_PROFILE_KEY)
    }
}

/// Settings every install starts with.
#[must_use]
pub fn default_settings() -> Settings {
    let mut settings = Settings::new();
    settings.insert("currency".into(), "USD".into());
    settings.insert("dateFormat".into(), "YYYY-MM-DD".into());
    settings
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
