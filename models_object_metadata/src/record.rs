use crate::timestamp;
use chrono::{DateTime, Utc};

/// Attribute names of a stored [MetadataRecord] item
pub mod attribute {
    /// partition key
    pub const OBJECT_KEY: &str = "ObjectKey";
    pub const PROCESSED_AT: &str = "ProcessedAt";
}

/// The item persisted for every processed object, one per [MetadataRecord::object_key]
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataRecord {
    pub object_key: String,
    pub bucket_name: String,
    pub file_size: u64,
    pub content_type: String,
    pub checksum: String,
    #[serde(with = "timestamp")]
    pub upload_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub processed_at: DateTime<Utc>,
}
