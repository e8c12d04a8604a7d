//! Turns S3 notification entries into [ObjectChangeEvent]s

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::borrow::Cow;

use crate::domain::{
    models::{DecodeErr, ObjectChangeEvent},
    ports::DecodedEntry,
};

/// The payload of an S3 notification invocation.
/// Entries stay untyped until decoded so that one bad entry cannot fail the whole batch
#[derive(Debug, Default, Clone, serde::Serialize, Deserialize)]
pub struct S3NotificationBatch {
    /// the notification entries, absent for the test event S3 sends on configuration
    #[serde(rename = "Records", default)]
    pub records: Vec<serde_json::Value>,
}

impl S3NotificationBatch {
    /// number of entries in the batch
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// true when the batch has no entries
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// decode entries lazily, in delivery order
    pub fn decode(self) -> impl Iterator<Item = DecodedEntry> + Send {
        self.records
            .into_iter()
            .enumerate()
            .map(|(index, raw)| DecodedEntry {
                index,
                event: decode_entry(raw),
            })
    }
}

/// The fields of a notification entry that are read. Everything else S3 sends
/// (identity, request parameters, sequencer) is ignored
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationEntry {
    event_time: DateTime<Utc>,
    event_name: Option<String>,
    s3: NotificationEntity,
}

#[derive(Debug, Deserialize)]
struct NotificationEntity {
    #[serde(default)]
    bucket: NotificationBucket,
    #[serde(default)]
    object: NotificationObject,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationBucket {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationObject {
    key: Option<String>,
    size: Option<i64>,
    #[serde(rename = "eTag")]
    e_tag: Option<String>,
}

/// Decode one raw notification entry
pub fn decode_entry(raw: serde_json::Value) -> Result<ObjectChangeEvent, DecodeErr> {
    let entry: NotificationEntry =
        serde_json::from_value(raw).map_err(|e| DecodeErr::Shape(e.to_string()))?;

    let NotificationEntry {
        event_time,
        event_name,
        s3: NotificationEntity { bucket, object },
    } = entry;

    let raw_key = object.key.filter(|key| !key.is_empty());

    let Some(bucket) = bucket.name.filter(|bucket| !bucket.is_empty()) else {
        return Err(DecodeErr::MissingBucket { key: raw_key });
    };

    let Some(raw_key) = raw_key else {
        return Err(DecodeErr::MissingKey { bucket });
    };

    let Some(key) = decode_object_key(&raw_key) else {
        return Err(DecodeErr::KeyEncoding {
            bucket,
            key: raw_key,
        });
    };

    Ok(ObjectChangeEvent {
        bucket,
        key,
        event_name,
        event_time,
        raw_size_hint: object.size.and_then(|size| u64::try_from(size).ok()),
        raw_etag_hint: object.e_tag,
    })
}

/// Keys in notifications are form encoded: `+` is a space and everything else is percent encoded.
/// Returns `None` when the decoded bytes are not utf-8
pub fn decode_object_key(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(Cow::into_owned)
}
