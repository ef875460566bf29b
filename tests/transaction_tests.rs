/// Transaction tests
///
/// Atomicity of multi-statement write units, rollback on failure and drop,
/// and the bounded transaction timeout.
/// Run with: cargo test --test transaction_tests
use std::time::Duration;

use chrono::{DateTime, Utc};
use contextstore::storage::InstanceKey;
use contextstore::{
    AttributeOp, ConnectionConfig, StorageWriter, StoreConfig, StoreError, TemporalWriteRequest,
};
use serde_json::json;

const VEHICLE: &str = "urn:ngsi-ld:Vehicle:A102";
const SPEED: &str = "https://example.org/vehicle/speed";

fn ts(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap()
}

async fn seed_three_instances(writer: &StorageWriter) {
    let t0 = ts("2026-08-01T12:00:00Z");
    let request = TemporalWriteRequest::attributes(
        VEHICLE,
        vec![(
            SPEED.to_string(),
            AttributeOp::Append(vec![
                json!({"value": 55}),
                json!({"value": 60}),
                json!({"value": 52.5}),
            ]),
        )],
    )
    .with_type("Vehicle")
    .with_timestamps(t0, t0);
    writer.store_temporal_entity(&request).await.unwrap();
}

#[tokio::test]
async fn test_commit_makes_changes_visible() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    let pool = writer.router().pool_for(None).await.unwrap();
    let mut guard = pool.get_connection().await.unwrap();

    let mut txn = guard.begin().await.unwrap();
    assert!(txn.state().is_active());
    txn.upsert_attribute_instance(
        InstanceKey::new(VEHICLE, SPEED, "urn:i:1"),
        json!({"value": 55}),
    )
    .unwrap();
    assert_eq!(txn.change_count(), 1);
    txn.commit().unwrap();
    drop(guard);

    let count = writer
        .with_store(None, |db| db.attribute_instances(VEHICLE, SPEED).len())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_rollback_discards_changes() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    seed_three_instances(&writer).await;

    let pool = writer.router().pool_for(None).await.unwrap();
    let mut guard = pool.get_connection().await.unwrap();

    let mut txn = guard.begin().await.unwrap();
    txn.clear_attribute(VEHICLE, SPEED).unwrap();
    assert!(txn.db().attribute_instances(VEHICLE, SPEED).is_empty());
    txn.rollback().unwrap();
    drop(guard);

    let count = writer
        .with_store(None, |db| db.attribute_instances(VEHICLE, SPEED).len())
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_failure_between_overwrite_delete_and_insert_keeps_prior_set() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    seed_three_instances(&writer).await;

    let pool = writer.router().pool_for(None).await.unwrap();
    let mut guard = pool.get_connection().await.unwrap();

    {
        let mut txn = guard.begin().await.unwrap();
        // Overwrite phase: delete the attribute's prior instance set...
        assert_eq!(txn.clear_attribute(VEHICLE, SPEED).unwrap(), 3);
        // ...then fail before the replacement insert commits.
        let err = txn
            .upsert_attribute_instance(InstanceKey::new(VEHICLE, SPEED, ""), json!({"value": 70}))
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
        // Dropped without commit.
    }
    drop(guard);

    // The pre-write instance set is fully intact: no partial deletion
    // was committed.
    let values: Vec<serde_json::Value> = writer
        .with_store(None, |db| {
            db.attribute_instances(VEHICLE, SPEED)
                .into_iter()
                .map(|record| record.data.clone())
                .collect()
        })
        .await
        .unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[0]["value"], 55);
}

#[tokio::test]
async fn test_failed_coordinator_batch_rolls_back_whole_attribute_unit() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    seed_three_instances(&writer).await;
    let before = writer
        .with_store(None, |db| db.temporal_entity(VEHICLE).cloned())
        .await
        .unwrap()
        .unwrap();

    // The second instance of the batch fails on an empty instance id, after
    // the overwrite delete and the first insert already ran in the same
    // transaction.
    let t1 = ts("2026-08-01T12:30:00Z");
    let request = TemporalWriteRequest::attributes(
        VEHICLE,
        vec![(
            SPEED.to_string(),
            AttributeOp::Append(vec![
                json!({"value": 70}),
                json!({"value": 75, "instanceId": ""}),
            ]),
        )],
    )
    .with_type("Vehicle")
    .with_timestamps(before.created_at, t1);

    let err = writer.store_temporal_entity(&request).await.unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));

    let (count, header) = writer
        .with_store(None, |db| {
            (
                db.attribute_instances(VEHICLE, SPEED).len(),
                db.temporal_entity(VEHICLE).cloned(),
            )
        })
        .await
        .unwrap();
    // Prior instances survive and modifiedAt was not bumped.
    assert_eq!(count, 3);
    assert_eq!(header.unwrap().modified_at, before.modified_at);
}

#[tokio::test]
async fn test_transaction_timeout_is_retryable() {
    let config = StoreConfig::new().connection(
        ConnectionConfig::new()
            .max_connections(4)
            .transaction_timeout(Duration::from_millis(100)),
    );
    let writer = StorageWriter::open(config).unwrap();
    let pool = writer.router().pool_for(None).await.unwrap();

    let mut first = pool.get_connection().await.unwrap();
    let txn = first.begin().await.unwrap();

    // A second writer cannot take the store's write guard while the first
    // transaction holds it; the bounded wait surfaces as a retryable
    // timeout.
    let mut second = pool.get_connection().await.unwrap();
    let err = second.begin().await.unwrap_err();
    assert!(matches!(err, StoreError::Timeout(_)));
    assert!(err.is_retryable());

    drop(txn);
    // With the guard released the second writer proceeds.
    let txn = second.begin().await.unwrap();
    txn.commit().unwrap();
}

#[tokio::test]
async fn test_drop_without_commit_rolls_back() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    let pool = writer.router().pool_for(None).await.unwrap();
    let mut guard = pool.get_connection().await.unwrap();

    {
        let mut txn = guard.begin().await.unwrap();
        txn.upsert_temporal_entity(
            VEHICLE,
            "Vehicle",
            ts("2026-08-01T12:00:00Z"),
            ts("2026-08-01T12:00:00Z"),
        )
        .unwrap();
        // Dropped without commit.
    }
    drop(guard);

    let header = writer
        .with_store(None, |db| db.temporal_entity(VEHICLE).is_some())
        .await
        .unwrap();
    assert!(!header);
}
