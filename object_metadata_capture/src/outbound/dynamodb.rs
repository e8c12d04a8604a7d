//! [MetadataRecordStore] backed by the DynamoDB metadata table

use crate::domain::{
    models::{MetadataRecord, PersistErr, PersistOutcome},
    ports::MetadataRecordStore,
};
use dynamodb_client::{ObjectMetadataTable, UpsertErr, UpsertFailure, UpsertOutcome};

impl MetadataRecordStore for ObjectMetadataTable {
    async fn upsert(&self, record: MetadataRecord) -> Result<PersistOutcome, PersistErr> {
        self.upsert_metadata_record(&record)
            .await
            .map(|outcome| match outcome {
                UpsertOutcome::Written => PersistOutcome::Written,
                UpsertOutcome::Superseded => PersistOutcome::Superseded,
            })
            .map_err(persist_err)
    }
}

fn persist_err(err: UpsertErr) -> PersistErr {
    let failure = err.failure();
    let source = anyhow::Error::new(err);
    match failure {
        UpsertFailure::Throttled => PersistErr::Throttled(source),
        UpsertFailure::Rejected => PersistErr::Rejected(source),
        UpsertFailure::Unreachable => PersistErr::Unreachable(source),
        UpsertFailure::Unavailable => PersistErr::Unavailable(source),
    }
}
