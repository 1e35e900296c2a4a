//! CSV and JSON export of local data, plus backup import.
//!
//! Exports read the local store only; records that live solely on the
//! server are not included. CSV output follows RFC 4180 quoting with
//! amounts rendered to two decimals.

use std::io;

use csv::{QuoteStyle, WriterBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::categories::category_name;
use crate::error::StorageError;
use crate::local::LocalStore;
use crate::models::{Budget, Category, Expense, Settings};

pub const BACKUP_VERSION: &str = "1.0";

pub const EXPENSES_HEADER: [&str; 5] = ["Date", "Description", "Category", "Amount", "Notes"];
pub const BUDGETS_HEADER: [&str; 3] = ["Category", "Amount", "Period"];

// =============================================================================
// CSV
// =============================================================================

/// # Errors
///
/// Returns `Export` if the CSV writer fails.
pub fn export_expenses_csv(store: &LocalStore) -> Result<String, StorageError> {
    let categories = store.load_categories();
    let rows = store.load_expenses().into_iter().map(|e| {
        [
            e.date,
            e.description,
            category_name(&categories, &e.category_id).to_owned(),
            format_amount(e.amount),
            e.notes,
        ]
    });
    render_csv(&EXPENSES_HEADER, rows)
}

/// # Errors
///
/// Returns `Export` if the CSV writer fails.
pub fn export_budgets_csv(store: &LocalStore) -> Result<String, StorageError> {
    let categories = store.load_categories();
    let rows = store.load_budgets().into_iter().map(|b| {
        [
            category_name(&categories, &b.category_id).to_owned(),
            format_amount(b.amount),
            b.period.as_str().to_owned(),
        ]
    });
    render_csv(&BUDGETS_HEADER, rows)
}

fn render_csv<const N: usize>(
    header: &[&str; N],
    rows: impl Iterator<Item = [String; N]>,
) -> Result<String, StorageError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| StorageError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

// =============================================================================
// BACKUP
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub expenses: Vec<Expense>,
    pub categories: Vec<Category>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub export_date: String,
    #[serde(default)]
    pub version: String,
}

/// Counts written by `import_backup_json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub expenses: usize,
    pub categories: usize,
    pub budgets: usize,
}

/// Pretty-printed snapshot of every local collection.
///
/// # Errors
///
/// Returns `Serialization` if the snapshot cannot be rendered.
pub fn export_backup_json(store: &LocalStore) -> Result<String, StorageError> {
    let backup = Backup {
        expenses: store.load_expenses(),
        categories: store.load_categories(),
        budgets: store.load_budgets(),
        settings: store.load_settings(),
        export_date: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
        version: BACKUP_VERSION.to_owned(),
    };
    Ok(serde_json::to_string_pretty(&backup)?)
}

/// Replace local collections with the contents of a backup document.
///
/// # Errors
///
/// `InvalidBackup` when the text is not JSON, lacks an `expenses` or
/// `categories` array, or a record does not parse; store write errors
/// otherwise. Nothing is written unless the whole document parses.
pub fn import_backup_json(store: &LocalStore, text: &str) -> Result<ImportSummary, StorageError> {
    let value: Value = serde_json::from_str(text).map_err(|e| StorageError::InvalidBackup(e.to_string()))?;
    for field in ["expenses", "categories"] {
        if !value.get(field).is_some_and(Value::is_array) {
            return Err(StorageError::InvalidBackup(format!("missing '{field}' array")));
        }
    }
    let backup: Backup = serde_json::from_value(value).map_err(|e| StorageError::InvalidBackup(e.to_string()))?;

    store.save_expenses(&backup.expenses)?;
    store.save_categories(&backup.categories)?;
    store.save_budgets(&backup.budgets)?;
    if !backup.settings.is_empty() {
        store.save_settings(&backup.settings)?;
    }

    let summary = ImportSummary {
        expenses: backup.expenses.len(),
        categories: backup.categories.len(),
        budgets: backup.budgets.len(),
    };
    info!(
        expenses = summary.expenses,
        categories = summary.categories,
        budgets = summary.budgets,
        version = %backup.version,
        "backup imported"
    );
    Ok(summary)
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
