use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use models_object_metadata::{MetadataRecord, attribute, timestamp};
use serde_dynamo::Item;
use thiserror::Error;

const UPSERT_CONDITION: &str =
    "attribute_not_exists(#object_key) OR #processed_at <= :processed_at";

/// error codes that mean every later write will fail the same way
const REJECTED_CODES: &[&str] = &[
    "AccessDeniedException",
    "UnrecognizedClientException",
    "MissingAuthenticationTokenException",
    "ValidationException",
    "ResourceNotFoundException",
];

const THROTTLED_CODES: &[&str] = &["ThrottlingException", "TooManyRequestsException"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// the record was created or replaced
    Written,
    /// a record processed at a later time is already stored
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertFailure {
    Throttled,
    Rejected,
    Unreachable,
    Unavailable,
}

#[derive(Debug, Error)]
pub enum UpsertErr {
    #[error("could not convert metadata record into an item: {0}")]
    Serialize(#[from] serde_dynamo::Error),
    #[error("could not put metadata record ({failure:?}): {source:#}")]
    Backend {
        failure: UpsertFailure,
        source: anyhow::Error,
    },
}

impl UpsertErr {
    pub fn failure(&self) -> UpsertFailure {
        match self {
            UpsertErr::Serialize(_) => UpsertFailure::Rejected,
            UpsertErr::Backend { failure, .. } => *failure,
        }
    }
}

pub(crate) async fn upsert_metadata_record(
    client: &Client,
    table: &str,
    record: &MetadataRecord,
) -> Result<UpsertOutcome, UpsertErr> {
    let item: Item = serde_dynamo::to_item(record)?;

    let result = client
        .put_item()
        .table_name(table)
        .set_item(Some(item.into()))
        .condition_expression(UPSERT_CONDITION)
        .expression_attribute_names("#object_key", attribute::OBJECT_KEY)
        .expression_attribute_names("#processed_at", attribute::PROCESSED_AT)
        .expression_attribute_values(
            ":processed_at",
            AttributeValue::S(timestamp::format(&record.processed_at)),
        )
        .send()
        .await;

    let err = match result {
        Ok(_) => return Ok(UpsertOutcome::Written),
        Err(err) => err,
    };

    if err
        .as_service_error()
        .is_some_and(PutItemError::is_conditional_check_failed_exception)
    {
        tracing::debug!(object_key = %record.object_key, "stored record is newer, skipping write");
        return Ok(UpsertOutcome::Superseded);
    }

    let failure = classify(&err);
    Err(UpsertErr::Backend {
        failure,
        source: anyhow::Error::new(err).context(format!("could not put item into {table}")),
    })
}

fn classify<R>(err: &SdkError<PutItemError, R>) -> UpsertFailure {
    match err {
        SdkError::ServiceError(service) => classify_service_error(service.err()),
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => UpsertFailure::Unreachable,
        _ => UpsertFailure::Unavailable,
    }
}

fn classify_service_error(err: &PutItemError) -> UpsertFailure {
    if err.is_provisioned_throughput_exceeded_exception() || err.is_request_limit_exceeded() {
        return UpsertFailure::Throttled;
    }

    if err.is_resource_not_found_exception() {
        return UpsertFailure::Rejected;
    }

    match err.code() {
        Some(code) if THROTTLED_CODES.contains(&code) => UpsertFailure::Throttled,
        Some(code) if REJECTED_CODES.contains(&code) => UpsertFailure::Rejected,
        _ => UpsertFailure::Unavailable,
    }
}
