use super::*;
use crate::models::{Entity, Expense};
use crate::notify::SERVER_MODE_UNAVAILABLE;
use crate::test_helpers::{self, harness};

#[test]
fn stored_serializes_location_lowercase() {
    let stored = Stored::local("1".to_owned());
    assert_eq!(serde_json::to_value(&stored).unwrap(), serde_json::json!({"record": "1", "location": "local"}));
    assert!(stored.is_local());
}

#[test]
fn decode_echo_keeps_sent_record_for_partial_echo() {
    let sent = test_helpers::expense("1", "Tea", 2.0);
    assert_eq!(decode_echo(serde_json::json!({"ok": true}), sent.clone()), sent);
    assert_eq!(decode_echo(Value::Null, sent.clone()), sent);

    let mut server = sent.clone();
    server.user_id = Some("u-1".into());
    assert_eq!(decode_echo(serde_json::to_value(&server).unwrap(), sent), server);
}

#[tokio::test]
async fn mode_is_read_fresh_on_every_call() {
    let store = test_helpers::memory_store();
    store.save_profile(&test_helpers::profile("u-1")).unwrap();
    let h = harness(store);

    h.money.get_expenses().await.unwrap();
    assert_eq!(h.remote.calls(), 0);

    h.money.switch_mode(StorageMode::Server).await.unwrap();
    let probes = h.remote.calls();
    h.money.get_expenses().await.unwrap();
    assert_eq!(h.remote.calls(), probes + 1);
    assert_eq!(h.money.mode(), StorageMode::Server);
}

#[tokio::test]
async fn switch_mode_refused_when_server_down() {
    let store = test_helpers::memory_store();
    store.save_profile(&test_helpers::profile("u-1")).unwrap();
    let h = harness(store);
    h.remote.set_offline(true);

    assert!(h.money.switch_mode(StorageMode::Server).await.is_err());
    assert_eq!(h.money.mode(), StorageMode::Local);
    assert_eq!(h.notifier.messages(), vec![SERVER_MODE_UNAVAILABLE.to_owned()]);
}

#[tokio::test]
async fn switching_modes_moves_no_data() {
    let store = test_helpers::memory_store();
    store.save_profile(&test_helpers::profile("u-1")).unwrap();
    store.save_expenses(&[test_helpers::expense("1", "Tea", 2.0)]).unwrap();
    let h = harness(store);

    h.money.switch_mode(StorageMode::Server).await.unwrap();

    assert_eq!(h.remote.record_count(Entity::Expense), 0);
    assert_eq!(h.store.load_expenses().len(), 1);
}

#[tokio::test]
async fn legacy_record_without_key_gets_one_on_fallback_update() {
    let h = harness(test_helpers::signed_in_server_store("u-1"));
    let mut legacy = test_helpers::expense("1", "Tea", 2.0);
    legacy.client_key = None;
    h.store.save_expenses(&[legacy]).unwrap();
    h.remote.set_offline(true);

    let stored = h
        .money
        .replace_record::<Expense, _>("1", |_| Ok(()))
        .await
        .unwrap();

    let key = stored.record.client_key.unwrap();
    assert_eq!(h.store.load_expenses()[0].client_key, Some(key));
    assert!(h.money.outbox().get(Entity::Expense, key).is_some());
}

#[tokio::test]
async fn non_remote_error_is_not_absorbed() {
    let h = harness(test_helpers::signed_in_server_store("u-1"));
    let err = h
        .money
        .replace_record::<Expense, _>("missing", |_| Ok(()))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
    assert!(h.notifier.messages().is_empty());
}
