//! This module defines all of the ports that the capture domain requires

use chrono::{DateTime, Utc};

use crate::domain::models::{
    DecodeErr, Invocation, InvocationSummary, MetadataRecord, ObjectAttributes,
    ObjectChangeEvent, ObjectLocation, PersistErr, PersistOutcome, ResolveErr,
};

/// One notification entry after decoding, tagged with its position in the batch
#[derive(Debug)]
pub struct DecodedEntry {
    /// position of the entry in the delivered batch
    pub index: usize,
    /// the decoded event, or why the entry could not be decoded
    pub event: Result<ObjectChangeEvent, DecodeErr>,
}

/// Trait for reading the authoritative attributes of an object from the storage backend
pub trait ObjectAttributesSource: Send + Sync + 'static {
    /// issue a metadata-only query for the object
    fn head_object(
        &self,
        location: ObjectLocation,
    ) -> impl Future<Output = Result<ObjectAttributes, ResolveErr>> + Send;
}

/// Trait for writing [MetadataRecord]s into the key-value store
pub trait MetadataRecordStore: Send + Sync + 'static {
    /// create or overwrite the record stored under [MetadataRecord::object_key].
    /// A stored record with a later `processed_at` is kept and [PersistOutcome::Superseded] returned
    fn upsert(
        &self,
        record: MetadataRecord,
    ) -> impl Future<Output = Result<PersistOutcome, PersistErr>> + Send;
}

/// port for getting the current system time
/// Having a trait allows tests to be consistent
pub trait TimeGetter: Send + Sync + 'static {
    /// get the current system time
    fn now(&self) -> DateTime<Utc>;
}

/// trait that defines the api for processing one batch of notification entries
pub trait MetadataCaptureService: Send + Sync + 'static {
    /// process every entry in delivery order and report each outcome
    fn capture_batch<I>(
        &self,
        invocation: Invocation,
        entries: I,
    ) -> impl Future<Output = InvocationSummary> + Send
    where
        I: IntoIterator<Item = DecodedEntry> + Send,
        I::IntoIter: Send;
}
