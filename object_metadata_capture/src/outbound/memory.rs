//! An in-memory [MetadataRecordStore] with the same last-write-wins semantics as the
//! DynamoDB table

use crate::domain::{
    models::{MetadataRecord, PersistErr, PersistOutcome},
    ports::MetadataRecordStore,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

/// records keyed by [MetadataRecord::object_key]. Clones share the same storage
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<Mutex<HashMap<String, MetadataRecord>>>,
}

impl InMemoryRecordStore {
    /// an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// the record stored under `object_key`
    pub fn get(&self, object_key: &str) -> Option<MetadataRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(object_key)
            .cloned()
    }

    /// number of stored records
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// true when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataRecordStore for InMemoryRecordStore {
    async fn upsert(&self, record: MetadataRecord) -> Result<PersistOutcome, PersistErr> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        match records.get(&record.object_key) {
            Some(stored) if stored.processed_at > record.processed_at => {
                Ok(PersistOutcome::Superseded)
            }
            _ => {
                records.insert(record.object_key.clone(), record);
                Ok(PersistOutcome::Written)
            }
        }
    }
}
