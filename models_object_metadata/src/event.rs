use chrono::{DateTime, Utc};
use std::fmt::Display;

/// A bucket + key pair identifying one object
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// One object creation pulled out of a notification entry.
///
/// `key` is already url decoded. The size and etag hints are copied from the
/// notification as-is; they may be stale and are never stored.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectChangeEvent {
    pub bucket: String,
    pub key: String,
    /// e.g. `ObjectCreated:Put`
    pub event_name: Option<String>,
    pub event_time: DateTime<Utc>,
    pub raw_size_hint: Option<u64>,
    pub raw_etag_hint: Option<String>,
}

impl ObjectChangeEvent {
    pub fn location(&self) -> ObjectLocation {
        ObjectLocation {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
        }
    }
}

/// The authoritative attributes of an object as reported by the storage backend
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectAttributes {
    pub size: u64,
    pub content_type: String,
    pub checksum: String,
    pub last_modified: DateTime<Utc>,
}
