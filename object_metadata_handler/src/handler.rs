use chrono::{DateTime, Utc};
use lambda_runtime::{Error, LambdaEvent, tracing};
use object_metadata_capture::{
    domain::{
        models::{Invocation, InvocationResponse},
        ports::MetadataCaptureService,
    },
    inbound::decoder::S3NotificationBatch,
};

/// Processes one s3 notification batch
#[tracing::instrument(skip(service, event), fields(request_id = %event.context.request_id))]
pub async fn handler<S: MetadataCaptureService>(
    service: &S,
    propagate_retryable_failures: bool,
    event: LambdaEvent<S3NotificationBatch>,
) -> Result<InvocationResponse, Error> {
    let LambdaEvent {
        payload, context, ..
    } = event;
    tracing::info!(record_count = payload.len(), "processing s3 records");

    let invocation = Invocation {
        request_id: context.request_id,
        deadline: deadline(context.deadline),
    };

    let summary = service.capture_batch(invocation, payload.decode()).await;
    let response = summary.response();

    if propagate_retryable_failures && summary.status_code() == 500 {
        return Err(response.body.into());
    }

    Ok(response)
}

/// the platform reports the deadline in epoch millis, 0 when unknown
fn deadline(epoch_millis: u64) -> Option<DateTime<Utc>> {
    if epoch_millis == 0 {
        return None;
    }
    i64::try_from(epoch_millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}
