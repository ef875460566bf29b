/// Temporal write coordinator tests
///
/// Header upsert, the overwrite-on-first-instance convention, and the three
/// deletion granularities.
/// Run with: cargo test --test temporal_writer_tests
use chrono::{DateTime, Utc};
use contextstore::{
    AttributeOp, StorageWriter, StoreConfig, StoreError, TemporalWriteRequest,
};
use serde_json::json;

const VEHICLE: &str = "urn:ngsi-ld:Vehicle:A102";
const SPEED: &str = "https://example.org/vehicle/speed";

fn ts(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap()
}

fn speed_batch(instances: Vec<serde_json::Value>) -> Vec<(String, AttributeOp)> {
    vec![(SPEED.to_string(), AttributeOp::Append(instances))]
}

async fn speed_instances(writer: &StorageWriter) -> Vec<serde_json::Value> {
    writer
        .with_store(None, |db| {
            db.attribute_instances(VEHICLE, SPEED)
                .into_iter()
                .map(|record| record.data.clone())
                .collect()
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_first_batch_writes_header_and_instances() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    let t0 = ts("2026-08-01T12:00:00Z");

    let request = TemporalWriteRequest::attributes(
        VEHICLE,
        speed_batch(vec![
            json!({"value": 55, "providedBy": "Speedometer"}),
            json!({"value": 60, "providedBy": "GPS"}),
            json!({"value": 52.5, "providedBy": "GPS_NEW"}),
        ]),
    )
    .with_type("Vehicle")
    .with_timestamps(t0, t0);

    writer.store_temporal_entity(&request).await.unwrap();

    let header = writer
        .with_store(None, |db| db.temporal_entity(VEHICLE).cloned())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.entity_type, "Vehicle");
    assert_eq!(header.created_at, t0);
    assert_eq!(header.modified_at, t0);

    let instances = speed_instances(&writer).await;
    assert_eq!(instances.len(), 3);
    // Document order is preserved.
    assert_eq!(instances[0]["value"], 55);
    assert_eq!(instances[1]["value"], 60);
    assert_eq!(instances[2]["value"], 52.5);
}

#[tokio::test]
async fn test_overwrite_convention_replaces_instance_set() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    let t0 = ts("2026-08-01T12:00:00Z");
    let t1 = ts("2026-08-01T12:05:00Z");

    let first = TemporalWriteRequest::attributes(
        VEHICLE,
        speed_batch(vec![
            json!({"value": 55}),
            json!({"value": 60}),
            json!({"value": 52.5}),
        ]),
    )
    .with_type("Vehicle")
    .with_timestamps(t0, t0);
    writer.store_temporal_entity(&first).await.unwrap();
    assert_eq!(speed_instances(&writer).await.len(), 3);

    // A follow-up batch of one: its first instance deletes the prior set.
    let second = TemporalWriteRequest::attributes(
        VEHICLE,
        speed_batch(vec![json!({"value": 70, "providedBy": "GPS"})]),
    )
    .with_modified_at(t1);
    writer.store_temporal_entity(&second).await.unwrap();

    let instances = speed_instances(&writer).await;
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0]["value"], 70);

    let header = writer
        .with_store(None, |db| db.temporal_entity(VEHICLE).cloned())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.modified_at, t1);
    // createdAt and type were not resupplied and are unchanged.
    assert_eq!(header.created_at, t0);
    assert_eq!(header.entity_type, "Vehicle");
}

#[tokio::test]
async fn test_overwrite_of_two_over_three() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    let t0 = ts("2026-08-01T12:00:00Z");

    let first = TemporalWriteRequest::attributes(
        VEHICLE,
        speed_batch(vec![
            json!({"value": 1}),
            json!({"value": 2}),
            json!({"value": 3}),
        ]),
    )
    .with_type("Vehicle")
    .with_timestamps(t0, t0);
    writer.store_temporal_entity(&first).await.unwrap();

    let second = TemporalWriteRequest::attributes(
        VEHICLE,
        speed_batch(vec![json!({"value": 4}), json!({"value": 5})]),
    )
    .with_modified_at(ts("2026-08-01T12:10:00Z"));
    writer.store_temporal_entity(&second).await.unwrap();

    let instances = speed_instances(&writer).await;
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0]["value"], 4);
    assert_eq!(instances[1]["value"], 5);
}

#[tokio::test]
async fn test_header_resupply_overwrites_created_at() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    let t0 = ts("2026-08-01T12:00:00Z");
    let t1 = ts("2026-08-02T09:00:00Z");

    let first = TemporalWriteRequest::attributes(VEHICLE, speed_batch(vec![json!({"value": 1})]))
        .with_type("Vehicle")
        .with_timestamps(t0, t0);
    writer.store_temporal_entity(&first).await.unwrap();

    // Resupplying the full header is an idempotent upsert that may move
    // createdAt and type.
    let second = TemporalWriteRequest::attributes(VEHICLE, speed_batch(vec![json!({"value": 2})]))
        .with_type("DeliveryVehicle")
        .with_timestamps(t1, t1);
    writer.store_temporal_entity(&second).await.unwrap();

    let header = writer
        .with_store(None, |db| db.temporal_entity(VEHICLE).cloned())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.entity_type, "DeliveryVehicle");
    assert_eq!(header.created_at, t1);
    assert_eq!(header.modified_at, t1);
}

#[tokio::test]
async fn test_system_attribute_keys_are_skipped() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    let t0 = ts("2026-08-01T12:00:00Z");

    let request = TemporalWriteRequest::attributes(
        VEHICLE,
        vec![
            ("@id".to_string(), AttributeOp::Append(vec![json!(VEHICLE)])),
            (
                "https://uri.etsi.org/ngsi-ld/createdAt".to_string(),
                AttributeOp::Append(vec![json!({"value": "2026-08-01"})]),
            ),
            (
                SPEED.to_string(),
                AttributeOp::Append(vec![json!({"value": 55})]),
            ),
        ],
    )
    .with_type("Vehicle")
    .with_timestamps(t0, t0);
    writer.store_temporal_entity(&request).await.unwrap();

    let total = writer
        .with_store(None, |db| db.instance_count())
        .await
        .unwrap();
    assert_eq!(total, 1); // only the speed instance
}

#[tokio::test]
async fn test_empty_instance_array_is_noop() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();

    let request = TemporalWriteRequest::attributes(VEHICLE, speed_batch(vec![]));
    let summary = writer.store_temporal_entity(&request).await.unwrap();
    assert_eq!(summary.rows_affected, 0);

    let header = writer
        .with_store(None, |db| db.temporal_entity(VEHICLE).is_some())
        .await
        .unwrap();
    assert!(!header);
}

#[tokio::test]
async fn test_instance_level_delete() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    let t0 = ts("2026-08-01T12:00:00Z");

    let request = TemporalWriteRequest::attributes(
        VEHICLE,
        speed_batch(vec![
            json!({"value": 55, "instanceId": "urn:i:1"}),
            json!({"value": 60, "instanceId": "urn:i:2"}),
        ]),
    )
    .with_type("Vehicle")
    .with_timestamps(t0, t0);
    writer.store_temporal_entity(&request).await.unwrap();

    let delete = TemporalWriteRequest::attributes(
        VEHICLE,
        vec![(SPEED.to_string(), AttributeOp::Delete)],
    )
    .with_instance_id("urn:i:1");
    let summary = writer.store_temporal_entity(&delete).await.unwrap();
    assert_eq!(summary.rows_affected, 1);

    let instances = speed_instances(&writer).await;
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0]["value"], 60);

    // Deleting the same instance again is a no-op.
    let summary = writer.store_temporal_entity(&delete).await.unwrap();
    assert_eq!(summary.rows_affected, 0);
}

#[tokio::test]
async fn test_attribute_level_delete() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    let t0 = ts("2026-08-01T12:00:00Z");

    let request = TemporalWriteRequest::attributes(
        VEHICLE,
        speed_batch(vec![json!({"value": 55}), json!({"value": 60})]),
    )
    .with_type("Vehicle")
    .with_timestamps(t0, t0);
    writer.store_temporal_entity(&request).await.unwrap();

    let delete = TemporalWriteRequest::attributes(
        VEHICLE,
        vec![(SPEED.to_string(), AttributeOp::Delete)],
    );
    let summary = writer.store_temporal_entity(&delete).await.unwrap();
    assert_eq!(summary.rows_affected, 2);
    assert!(speed_instances(&writer).await.is_empty());

    // The header row survives an attribute-level delete.
    let header = writer
        .with_store(None, |db| db.temporal_entity(VEHICLE).is_some())
        .await
        .unwrap();
    assert!(header);
}

#[tokio::test]
async fn test_entity_level_delete_cascades() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    let t0 = ts("2026-08-01T12:00:00Z");

    let request = TemporalWriteRequest::attributes(
        VEHICLE,
        speed_batch(vec![json!({"value": 55}), json!({"value": 60})]),
    )
    .with_type("Vehicle")
    .with_timestamps(t0, t0);
    writer.store_temporal_entity(&request).await.unwrap();

    let summary = writer
        .store_temporal_entity(&TemporalWriteRequest::delete(VEHICLE))
        .await
        .unwrap();
    assert_eq!(summary.rows_affected, 1);

    let (header, instances) = writer
        .with_store(None, |db| {
            (db.temporal_entity(VEHICLE).is_some(), db.instance_count())
        })
        .await
        .unwrap();
    assert!(!header);
    assert_eq!(instances, 0);

    // Repeat delete is a no-op, not an error.
    let summary = writer
        .store_temporal_entity(&TemporalWriteRequest::delete(VEHICLE))
        .await
        .unwrap();
    assert_eq!(summary.rows_affected, 0);
}

#[tokio::test]
async fn test_sentinel_payload_parses_to_entity_delete() {
    let request = TemporalWriteRequest::from_raw(VEHICLE, "null").unwrap();
    assert!(matches!(
        request.write,
        contextstore::TemporalWrite::Delete
    ));
}

#[tokio::test]
async fn test_instances_without_header_do_not_create_one() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();

    // No type/createdAt: the header phase is skipped and the modifiedAt
    // bump finds no row to touch.
    let request = TemporalWriteRequest::attributes(
        VEHICLE,
        speed_batch(vec![json!({"value": 55})]),
    )
    .with_modified_at(ts("2026-08-01T12:00:00Z"));
    writer.store_temporal_entity(&request).await.unwrap();

    let (header, instances) = writer
        .with_store(None, |db| {
            (
                db.temporal_entity(VEHICLE).is_some(),
                db.attribute_instances(VEHICLE, SPEED).len(),
            )
        })
        .await
        .unwrap();
    assert!(!header);
    assert_eq!(instances, 1);
}

#[tokio::test]
async fn test_failed_batch_reports_typed_error() {
    let writer = StorageWriter::open(StoreConfig::new()).unwrap();
    let t0 = ts("2026-08-01T12:00:00Z");

    // An instance document carrying an empty instance id fails the
    // composite-key constraint.
    let request = TemporalWriteRequest::attributes(
        VEHICLE,
        speed_batch(vec![json!({"value": 55, "instanceId": ""})]),
    )
    .with_type("Vehicle")
    .with_timestamps(t0, t0);

    let err = writer.store_temporal_entity(&request).await.unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));
}
