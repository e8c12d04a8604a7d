//! This module provides [mockall::mock] structs for the outbound ports, plus a
//! manually driven clock, which can be used for testing
use crate::domain::{
    models::{
        MetadataRecord, ObjectAttributes, ObjectLocation, PersistErr, PersistOutcome, ResolveErr,
    },
    ports::{MetadataRecordStore, ObjectAttributesSource, TimeGetter},
};
use chrono::{DateTime, TimeDelta, Utc};
use mockall::mock;
use std::sync::{Mutex, PoisonError};

const _NOT_PROD: () = const {
    assert!(
        cfg!(debug_assertions),
        "You are trying to include mock code in a production build please run `cargo tree -i object_metadata_capture -e features -p <FAILING_PACKAGE>` to see how the mock feature is being included in [dependencies]"
    );
};

mock! {
    /// mock of the storage backend
    pub ObjectSource {}
    impl ObjectAttributesSource for ObjectSource {
        fn head_object(&self, location: ObjectLocation) -> impl Future<Output = Result<ObjectAttributes, ResolveErr>> + Send;
    }
}

mock! {
    /// mock of the metadata store
    pub RecordStore {}
    impl MetadataRecordStore for RecordStore {
        fn upsert(&self, record: MetadataRecord) -> impl Future<Output = Result<PersistOutcome, PersistErr>> + Send;
    }
}

/// A clock which only moves when told to
#[derive(Debug)]
pub struct ManualTime(Mutex<DateTime<Utc>>);

impl ManualTime {
    /// create a clock stopped at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// move the clock forward
    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl TimeGetter for ManualTime {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
