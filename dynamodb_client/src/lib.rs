use aws_config::SdkConfig;
use models_object_metadata::MetadataRecord;

mod upsert;

pub use upsert::{UpsertErr, UpsertFailure, UpsertOutcome};

#[derive(Debug, Clone)]
pub struct DynamodbClient {
    pub object_metadata: ObjectMetadataTable,
}

impl DynamodbClient {
    pub fn new(aws_config: &SdkConfig, object_metadata_table: &str) -> Self {
        let client = aws_sdk_dynamodb::Client::new(aws_config);

        Self::new_from_client(client, object_metadata_table)
    }

    pub fn new_from_client(client: aws_sdk_dynamodb::Client, object_metadata_table: &str) -> Self {
        Self {
            object_metadata: ObjectMetadataTable {
                table: object_metadata_table.to_string(),
                client,
            },
        }
    }
}

/// The table holding one [MetadataRecord] per object key
#[derive(Debug, Clone)]
pub struct ObjectMetadataTable {
    table: String,
    client: aws_sdk_dynamodb::Client,
}

impl ObjectMetadataTable {
    /// Writes the record unless the stored record for the same key was processed later
    #[tracing::instrument(skip(self, record), fields(table = %self.table, object_key = %record.object_key))]
    pub async fn upsert_metadata_record(
        &self,
        record: &MetadataRecord,
    ) -> Result<UpsertOutcome, UpsertErr> {
        upsert::upsert_metadata_record(&self.client, &self.table, record).await
    }
}
