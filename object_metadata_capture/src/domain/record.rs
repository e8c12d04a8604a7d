//! Maps resolved attributes into the persisted record

use chrono::{DateTime, Utc};

use crate::domain::models::{MetadataRecord, ObjectAttributes, ObjectChangeEvent};

/// Build the record stored for `event`.
/// `processed_at` is always `now`, never the event time, so processing latency can be audited.
pub fn build_record(
    event: &ObjectChangeEvent,
    attributes: ObjectAttributes,
    now: DateTime<Utc>,
) -> MetadataRecord {
    let ObjectAttributes {
        size,
        content_type,
        checksum,
        last_modified,
    } = attributes;

    MetadataRecord {
        object_key: event.key.clone(),
        bucket_name: event.bucket.clone(),
        file_size: size,
        content_type,
        checksum,
        upload_time: last_modified,
        processed_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_uses_authoritative_attributes_over_hints() {
        let event = ObjectChangeEvent {
            bucket: "b1".to_string(),
            key: "docs/report.pdf".to_string(),
            event_name: Some("ObjectCreated:Put".to_string()),
            event_time: "2024-01-01T00:00:00Z".parse().unwrap(),
            raw_size_hint: Some(1),
            raw_etag_hint: Some("stale".to_string()),
        };
        let now: DateTime<Utc> = "2024-01-01T00:00:03Z".parse().unwrap();

        let record = build_record(
            &event,
            ObjectAttributes {
                size: 1024,
                content_type: "application/pdf".to_string(),
                checksum: "abc123".to_string(),
                last_modified: "2024-01-01T00:00:00Z".parse().unwrap(),
            },
            now,
        );

        assert_eq!(
            record,
            MetadataRecord {
                object_key: "docs/report.pdf".to_string(),
                bucket_name: "b1".to_string(),
                file_size: 1024,
                content_type: "application/pdf".to_string(),
                checksum: "abc123".to_string(),
                upload_time: "2024-01-01T00:00:00Z".parse().unwrap(),
                processed_at: now,
            }
        );
    }
}
