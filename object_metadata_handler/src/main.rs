#![recursion_limit = "256"]

use aws_config::{meta::region::RegionProviderChain, retry::RetryConfig};
use capture_entrypoint::CaptureEntrypoint;
use dynamodb_client::DynamodbClient;
use lambda_runtime::{
    Error, LambdaEvent, run, service_fn,
    tracing::{self},
};
use object_metadata_capture::{
    domain::services::MetadataCaptureImpl, inbound::decoder::S3NotificationBatch,
};

mod config;
mod handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let entrypoint = CaptureEntrypoint::default().init()?;
    tracing::trace!(environment = %entrypoint.environment(), "initiating lambda");

    let config = config::Config::from_env()?;
    tracing::info!(table = %config.metadata_table, max_attempts = config.store_max_attempts, "loaded config");

    let region = RegionProviderChain::default_provider().or_else("us-east-1");
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(region)
        .retry_config(RetryConfig::standard().with_max_attempts(config.store_max_attempts))
        .load()
        .await;

    let s3_client = s3_client::S3::new(aws_sdk_s3::Client::new(&aws_config));
    tracing::trace!("initialized s3 client");

    let dynamodb_client = DynamodbClient::new(&aws_config, &config.metadata_table);
    tracing::trace!("initialized dynamodb client");

    let service = MetadataCaptureImpl::new_with_default_time(
        s3_client,
        dynamodb_client.object_metadata,
        config.capture_settings(),
    );

    let shared_service = &service;
    let propagate = config.propagate_retryable_failures;

    let func = service_fn(move |event: LambdaEvent<S3NotificationBatch>| async move {
        handler::handler(shared_service, propagate, event).await
    });

    run(func).await
}
