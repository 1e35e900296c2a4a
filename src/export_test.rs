use super::*;
use crate::local::EXPENSES_KEY;
use crate::models::BudgetPeriod;
use crate::test_helpers;

fn read_csv(text: &str) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(text.as_bytes())
        .records()
        .map(|r| r.unwrap().iter().map(ToOwned::to_owned).collect())
        .collect()
}

#[test]
fn expenses_csv_resolves_category_and_formats_amount() {
    let store = test_helpers::memory_store();
    let mut lunch = test_helpers::expense("1", "Lunch, with \"team\"", 12.5);
    lunch.notes = "line one\nline two".into();
    let mut odd = test_helpers::expense("2", "Mystery", 3.0);
    odd.category_id = "unknown".into();
    store.save_expenses(&[lunch, odd]).unwrap();

    let rows = read_csv(&export_expenses_csv(&store).unwrap());

    assert_eq!(rows[0], EXPENSES_HEADER.map(String::from).to_vec());
    assert_eq!(rows[1], vec!["2024-01-01", "Lunch, with \"team\"", "Food & Dining", "12.50", "line one\nline two"]);
    assert_eq!(rows[2][2], "unknown");
    assert_eq!(rows[2][3], "3.00");
}

#[test]
fn empty_store_exports_header_only() {
    let store = test_helpers::memory_store();
    let text = export_expenses_csv(&store).unwrap();
    assert_eq!(read_csv(&text).len(), 1);
    assert!(text.starts_with("\"Date\",\"Description\""));
}

#[test]
fn budgets_csv_lists_period() {
    let store = test_helpers::memory_store();
    let mut weekly = test_helpers::budget("1", "transport", 40.0);
    weekly.period = BudgetPeriod::Weekly;
    store.save_budgets(&[weekly]).unwrap();

    let rows = read_csv(&export_budgets_csv(&store).unwrap());

    assert_eq!(rows[0], vec!["Category", "Amount", "Period"]);
    assert_eq!(rows[1], vec!["Transportation", "40.00", "weekly"]);
}

#[test]
fn backup_contains_every_collection() {
    let store = test_helpers::memory_store();
    store.save_expenses(&[test_helpers::expense("1", "Tea", 2.0)]).unwrap();
    store.save_budgets(&[test_helpers::budget("1", "food", 10.0)]).unwrap();

    let text = export_backup_json(&store).unwrap();
    let value: Value = serde_json::from_str(&text).unwrap();

    assert!(text.contains('\n'));
    assert_eq!(value["expenses"].as_array().unwrap().len(), 1);
    assert_eq!(value["budgets"].as_array().unwrap().len(), 1);
    assert!(!value["categories"].as_array().unwrap().is_empty());
    assert_eq!(value["settings"]["currency"], "USD");
    assert_eq!(value["version"], BACKUP_VERSION);
    assert!(value["exportDate"].as_str().is_some_and(|d| d.contains('T')));
}

#[test]
fn backup_imports_into_fresh_store() {
    let source = test_helpers::memory_store();
    source.save_expenses(&[test_helpers::expense("1", "Tea", 2.0), test_helpers::expense("2", "Cake", 3.0)]).unwrap();
    source.save_budgets(&[test_helpers::budget("1", "food", 10.0)]).unwrap();
    let text = export_backup_json(&source).unwrap();

    let target = test_helpers::memory_store();
    let summary = import_backup_json(&target, &text).unwrap();

    assert_eq!(summary.expenses, 2);
    assert_eq!(summary.budgets, 1);
    assert_eq!(summary.categories, source.load_categories().len());
    assert_eq!(target.get_raw(EXPENSES_KEY), source.get_raw(EXPENSES_KEY));
}

#[test]
fn import_requires_expense_and_category_arrays() {
    let store = test_helpers::memory_store();

    for text in [
        "not json",
        r#"{"categories": []}"#,
        r#"{"expenses": [], "categories": {}}"#,
        r#"{"expenses": [{"id": 1}], "categories": []}"#,
    ] {
        let err = import_backup_json(&store, text).unwrap_err();
        assert!(matches!(err, StorageError::InvalidBackup(_)), "{text} gave {err:?}");
    }
    assert!(store.get_raw(EXPENSES_KEY).is_none());
}

#[test]
fn minimal_backup_imports_with_empty_budgets() {
    let store = test_helpers::memory_store();
    store.save_budgets(&[test_helpers::budget("1", "food", 10.0)]).unwrap();

    let summary = import_backup_json(&store, r#"{"expenses": [], "categories": []}"#).unwrap();

    assert_eq!(summary, ImportSummary { expenses: 0, categories: 0, budgets: 0 });
    assert!(store.load_budgets().is_empty());
    assert_eq!(store.load_settings()["currency"], "USD");
}
