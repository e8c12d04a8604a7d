//! Realistic S3 notification payloads for tests

use crate::inbound::decoder::S3NotificationBatch;

/// A complete `ObjectCreated:Put` entry as S3 delivers it. `raw_key` is used verbatim,
/// so it must already be url encoded
pub fn notification_entry(
    bucket: &str,
    raw_key: &str,
    size: i64,
    event_time: &str,
) -> serde_json::Value {
    serde_json::json!({
        "eventVersion": "2.1",
        "eventSource": "aws:s3",
        "awsRegion": "us-east-1",
        "eventTime": event_time,
        "eventName": "ObjectCreated:Put",
        "userIdentity": { "principalId": "AWS:AIDAEXAMPLE" },
        "requestParameters": { "sourceIPAddress": "127.0.0.1" },
        "responseElements": {
            "x-amz-request-id": "C3D13FE58DE4C810",
            "x-amz-id-2": "FMyUVURIY8/IgAtTv8xRjskZQpcIZ9KG4V5Wp6S7S/JRWeUWerMUE5JgHvANOjpD"
        },
        "s3": {
            "s3SchemaVersion": "1.0",
            "configurationId": "metadata-capture",
            "bucket": {
                "name": bucket,
                "ownerIdentity": { "principalId": "A3NL1KOZZKExample" },
                "arn": format!("arn:aws:s3:::{bucket}")
            },
            "object": {
                "key": raw_key,
                "size": size,
                "eTag": "0123456789abcdef0123456789abcdef",
                "sequencer": "0A1B2C3D4E5F678901"
            }
        }
    })
}

/// Wrap entries the way a notification invocation delivers them
pub fn notification_batch(entries: Vec<serde_json::Value>) -> S3NotificationBatch {
    S3NotificationBatch { records: entries }
}

/// An entry with only the bucket, the key and the event time, which is all the
/// decoder needs
pub fn minimal_notification_entry(
    bucket: &str,
    raw_key: &str,
    event_time: &str,
) -> serde_json::Value {
    serde_json::json!({
        "eventTime": event_time,
        "s3": {
            "bucket": { "name": bucket },
            "object": { "key": raw_key }
        }
    })
}
