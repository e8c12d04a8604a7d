use super::*;
use crate::{
    domain::models::{
        DecodeErr, FailureKind, InvocationOutcome, MetadataRecord, ObjectAttributes,
        ObjectLocation, OutcomeStatus, PersistErr, ResolveErr,
    },
    inbound::fixtures::{minimal_notification_entry, notification_batch, notification_entry},
    outbound::{
        memory::InMemoryRecordStore,
        mock::{ManualTime, MockObjectSource, MockRecordStore},
    },
};
use chrono::{DateTime, Utc};
use cool_asserts::assert_matches;
use std::sync::Arc;

const EVENT_TIME: &str = "2024-01-01T00:00:00Z";

fn now() -> DateTime<Utc> {
    "2024-01-01T00:00:03Z".parse().unwrap()
}

fn attributes(size: u64, content_type: &str) -> ObjectAttributes {
    ObjectAttributes {
        size,
        content_type: content_type.to_string(),
        checksum: "abc123".to_string(),
        last_modified: EVENT_TIME.parse().unwrap(),
    }
}

fn invocation() -> Invocation {
    Invocation {
        request_id: "req-1".to_string(),
        deadline: None,
    }
}

fn event(key: &str) -> DecodedEntry {
    DecodedEntry {
        index: 0,
        event: Ok(ObjectChangeEvent {
            bucket: "b1".to_string(),
            key: key.to_string(),
            event_name: Some("ObjectCreated:Put".to_string()),
            event_time: EVENT_TIME.parse().unwrap(),
            raw_size_hint: None,
            raw_etag_hint: None,
        }),
    }
}

fn numbered(entries: Vec<DecodedEntry>) -> Vec<DecodedEntry> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| DecodedEntry { index, ..entry })
        .collect()
}

fn source_with(size: u64, content_type: &'static str) -> MockObjectSource {
    let mut source = MockObjectSource::new();
    source.expect_head_object().returning(move |_location| {
        Box::pin(async move { Ok(attributes(size, content_type)) })
    });
    source
}

#[tokio::test]
async fn it_stores_the_record_of_a_created_object() {
    let store = InMemoryRecordStore::new();
    let service = MetadataCaptureImpl::new(
        source_with(1024, "application/pdf"),
        store.clone(),
        ManualTime::new(now()),
        CaptureSettings::default(),
    );
    let batch = notification_batch(vec![minimal_notification_entry(
        "b1",
        "docs/report.pdf",
        EVENT_TIME,
    )]);

    let summary = service.capture_batch(invocation(), batch.decode()).await;

    assert_eq!(summary.status_code(), 200);
    assert_eq!(summary.persisted(), 1);
    assert_eq!(
        store.get("docs/report.pdf").unwrap(),
        MetadataRecord {
            object_key: "docs/report.pdf".to_string(),
            bucket_name: "b1".to_string(),
            file_size: 1024,
            content_type: "application/pdf".to_string(),
            checksum: "abc123".to_string(),
            upload_time: EVENT_TIME.parse().unwrap(),
            processed_at: now(),
        }
    );
}

#[tokio::test]
async fn it_stores_objects_with_encoded_keys_under_the_decoded_key() {
    let store = InMemoryRecordStore::new();
    let mut source = MockObjectSource::new();
    source
        .expect_head_object()
        .withf(|location| location.key == "a+b.txt")
        .times(1)
        .returning(|_| Box::pin(async { Ok(attributes(1, "text/plain")) }));
    let service = MetadataCaptureImpl::new(
        source,
        store.clone(),
        ManualTime::new(now()),
        CaptureSettings::default(),
    );
    let batch = notification_batch(vec![notification_entry("b1", "a%2Bb.txt", 1, EVENT_TIME)]);

    service.capture_batch(invocation(), batch.decode()).await;

    assert!(store.get("a+b.txt").is_some());
}

#[tokio::test]
async fn a_malformed_entry_does_not_affect_its_neighbours() {
    let store = InMemoryRecordStore::new();
    let service = MetadataCaptureImpl::new(
        source_with(10, "text/plain"),
        store.clone(),
        ManualTime::new(now()),
        CaptureSettings::default(),
    );
    let mut missing_key = notification_entry("b1", "second.txt", 1, EVENT_TIME);
    missing_key["s3"]["object"]
        .as_object_mut()
        .unwrap()
        .remove("key");
    let batch = notification_batch(vec![
        minimal_notification_entry("b1", "first.txt", EVENT_TIME),
        missing_key,
        minimal_notification_entry("b1", "third.txt", EVENT_TIME),
    ]);

    let summary = service.capture_batch(invocation(), batch.decode()).await;

    assert_eq!(summary.outcome(), InvocationOutcome::PartialFailure);
    assert_eq!(summary.status_code(), 400);
    assert_eq!(summary.persisted(), 2);
    assert_matches!(
        &summary.outcomes[1].status,
        OutcomeStatus::Failed {
            kind: FailureKind::MalformedEvent,
            stage: EventStage::Received,
            ..
        }
    );
    assert!(store.get("first.txt").is_some());
    assert!(store.get("third.txt").is_some());
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn objects_deleted_before_resolution_are_skipped() {
    let mut source = MockObjectSource::new();
    source.expect_head_object().returning(|location: ObjectLocation| {
        Box::pin(async move {
            if location.key == "gone.txt" {
                Err(ResolveErr::ObjectNotFound(location))
            } else {
                Ok(attributes(1, "text/plain"))
            }
        })
    });
    let store = InMemoryRecordStore::new();
    let service = MetadataCaptureImpl::new(
        source,
        store.clone(),
        ManualTime::new(now()),
        CaptureSettings::default(),
    );

    let summary = service
        .capture_batch(invocation(), numbered(vec![event("gone.txt"), event("kept.txt")]))
        .await;

    assert_eq!(summary.outcome(), InvocationOutcome::AllSucceeded);
    assert_eq!(summary.status_code(), 200);
    assert_eq!(
        summary.outcomes[0].failure_kind(),
        Some(FailureKind::ObjectNotFound)
    );
    assert!(store.get("gone.txt").is_none());
    assert!(store.get("kept.txt").is_some());
}

#[tokio::test]
async fn backend_failures_are_retryable() {
    let mut source = MockObjectSource::new();
    source.expect_head_object().returning(|_| {
        Box::pin(async { Err(ResolveErr::BackendUnavailable(anyhow::anyhow!("503"))) })
    });
    let mut store = MockRecordStore::new();
    store.expect_upsert().times(0);
    let service = MetadataCaptureImpl::new(
        source,
        store,
        ManualTime::new(now()),
        CaptureSettings::default(),
    );

    let summary = service
        .capture_batch(invocation(), vec![event("a.txt")])
        .await;

    assert_eq!(summary.outcome(), InvocationOutcome::AllFailed);
    assert_matches!(
        &summary.outcomes[0].status,
        OutcomeStatus::Failed {
            kind: FailureKind::BackendUnavailable,
            stage: EventStage::Decoded,
            ..
        }
    );
    assert_eq!(summary.status_code(), 500);
}

#[tokio::test]
async fn reprocessing_keeps_one_record_with_the_latest_processing_time() {
    let time = Arc::new(ManualTime::new(now()));
    let store = InMemoryRecordStore::new();
    let service = MetadataCaptureImpl::new(
        source_with(1024, "application/pdf"),
        store.clone(),
        time.clone(),
        CaptureSettings::default(),
    );

    service
        .capture_batch(invocation(), vec![event("docs/report.pdf")])
        .await;
    time.advance(TimeDelta::seconds(30));
    let summary = service
        .capture_batch(invocation(), vec![event("docs/report.pdf")])
        .await;

    assert_eq!(summary.status_code(), 200);
    assert_eq!(store.len(), 1);
    let record = store.get("docs/report.pdf").unwrap();
    assert_eq!(record.processed_at, now() + TimeDelta::seconds(30));
    assert_eq!(record.file_size, 1024);
}

#[tokio::test]
async fn a_superseded_write_still_counts_as_persisted() {
    let mut store = MockRecordStore::new();
    store
        .expect_upsert()
        .times(1)
        .returning(|_| Box::pin(async { Ok(PersistOutcome::Superseded) }));
    let service = MetadataCaptureImpl::new(
        source_with(1, "text/plain"),
        store,
        ManualTime::new(now()),
        CaptureSettings::default(),
    );

    let summary = service
        .capture_batch(invocation(), vec![event("a.txt")])
        .await;

    assert_eq!(summary.persisted(), 1);
    assert_eq!(
        summary.outcomes[0].status,
        OutcomeStatus::Persisted(PersistOutcome::Superseded)
    );
}

#[tokio::test]
async fn an_unusable_store_aborts_the_rest_of_the_batch() {
    let mut source = MockObjectSource::new();
    source
        .expect_head_object()
        .times(1)
        .returning(|_| Box::pin(async { Ok(attributes(1, "text/plain")) }));
    let mut store = MockRecordStore::new();
    store.expect_upsert().times(1).returning(|_| {
        Box::pin(async {
            Err(PersistErr::Rejected(anyhow::anyhow!(
                "ResourceNotFoundException: table not found"
            )))
        })
    });
    let service = MetadataCaptureImpl::new(
        source,
        store,
        ManualTime::new(now()),
        CaptureSettings::default(),
    );
    let decoded_error = DecodedEntry {
        index: 0,
        event: Err(DecodeErr::Shape("not an object".to_string())),
    };

    let summary = service
        .capture_batch(
            invocation(),
            numbered(vec![event("a.txt"), event("b.txt"), decoded_error, event("c.txt")]),
        )
        .await;

    let kinds: Vec<_> = summary.outcomes.iter().map(|o| o.failure_kind()).collect();
    assert_eq!(
        kinds,
        vec![
            Some(FailureKind::Persistence),
            Some(FailureKind::Aborted),
            Some(FailureKind::MalformedEvent),
            Some(FailureKind::Aborted),
        ]
    );
    assert_eq!(summary.outcome(), InvocationOutcome::AllFailed);
    assert_eq!(summary.status_code(), 500);
}

#[tokio::test]
async fn throttled_writes_do_not_abort_the_batch() {
    let mut store = MockRecordStore::new();
    store.expect_upsert().times(2).returning(|record| {
        Box::pin(async move {
            if record.object_key == "a.txt" {
                Err(PersistErr::Throttled(anyhow::anyhow!(
                    "ProvisionedThroughputExceededException"
                )))
            } else {
                Ok(PersistOutcome::Written)
            }
        })
    });
    let service = MetadataCaptureImpl::new(
        source_with(1, "text/plain"),
        store,
        ManualTime::new(now()),
        CaptureSettings::default(),
    );

    let summary = service
        .capture_batch(invocation(), numbered(vec![event("a.txt"), event("b.txt")]))
        .await;

    assert_eq!(summary.outcome(), InvocationOutcome::PartialFailure);
    assert_matches!(
        &summary.outcomes[0].status,
        OutcomeStatus::Failed {
            kind: FailureKind::Persistence,
            stage: EventStage::RecordBuilt,
            ..
        }
    );
    assert_eq!(summary.persisted(), 1);
    assert!(summary.is_retryable());
    assert_eq!(summary.status_code(), 500);
}

#[tokio::test]
async fn nothing_is_started_past_the_deadline() {
    let mut source = MockObjectSource::new();
    source.expect_head_object().times(0);
    let mut store = MockRecordStore::new();
    store.expect_upsert().times(0);
    let service = MetadataCaptureImpl::new(
        source,
        store,
        ManualTime::new(now()),
        CaptureSettings::default(),
    );
    let invocation = Invocation {
        request_id: "req-1".to_string(),
        deadline: Some(now() + TimeDelta::milliseconds(100)),
    };

    let summary = service
        .capture_batch(invocation, numbered(vec![event("a.txt"), event("b.txt")]))
        .await;

    assert!(
        summary
            .outcomes
            .iter()
            .all(|o| o.failure_kind() == Some(FailureKind::Timeout))
    );
    assert_eq!(summary.status_code(), 500);
}

#[tokio::test]
async fn an_event_running_past_the_deadline_times_out() {
    let mut source = MockObjectSource::new();
    source.expect_head_object().times(1).returning(|_| {
        Box::pin(async {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            Ok(attributes(1, "text/plain"))
        })
    });
    let mut store = MockRecordStore::new();
    store.expect_upsert().times(0);
    let service = MetadataCaptureImpl::new(
        source,
        store,
        ManualTime::new(now()),
        CaptureSettings::default(),
    );
    let invocation = Invocation {
        request_id: "req-1".to_string(),
        deadline: Some(now() + TimeDelta::milliseconds(550)),
    };

    let summary = service
        .capture_batch(invocation, numbered(vec![event("slow.txt"), event("next.txt")]))
        .await;

    assert_eq!(summary.outcomes.len(), 2);
    assert!(
        summary
            .outcomes
            .iter()
            .all(|o| o.failure_kind() == Some(FailureKind::Timeout))
    );
}

#[tokio::test]
async fn ignored_events_touch_no_backend() {
    let mut source = MockObjectSource::new();
    source.expect_head_object().times(0);
    let mut store = MockRecordStore::new();
    store.expect_upsert().times(0);
    let service = MetadataCaptureImpl::new(
        source,
        store,
        ManualTime::new(now()),
        CaptureSettings {
            ignored_key_prefixes: vec!["temp_files/".to_string()],
            ..CaptureSettings::default()
        },
    );
    let mut removal = notification_entry("b1", "old.txt", 1, EVENT_TIME);
    removal["eventName"] = serde_json::json!("ObjectRemoved:Delete");
    let batch = notification_batch(vec![
        notification_entry("b1", "temp_files/upload.part", 1, EVENT_TIME),
        removal,
    ]);

    let summary = service.capture_batch(invocation(), batch.decode()).await;

    assert_eq!(summary.ignored(), 2);
    assert_eq!(
        summary.outcomes[0].status,
        OutcomeStatus::Ignored(IgnoreReason::IgnoredPrefix("temp_files/".to_string()))
    );
    assert_eq!(
        summary.outcomes[1].status,
        OutcomeStatus::Ignored(IgnoreReason::NotACreationEvent(
            "ObjectRemoved:Delete".to_string()
        ))
    );
    assert_eq!(summary.status_code(), 200);
}
