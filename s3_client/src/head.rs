use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// The subset of a head object response the metadata pipeline reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHead {
    pub content_length: Option<i64>,
    pub content_type: Option<String>,
    pub e_tag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl From<&HeadObjectOutput> for ObjectHead {
    fn from(output: &HeadObjectOutput) -> Self {
        Self {
            content_length: output.content_length(),
            content_type: output.content_type().map(str::to_string),
            e_tag: output.e_tag().map(str::to_string),
            last_modified: output
                .last_modified()
                .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
        }
    }
}

#[derive(Debug, Error)]
pub enum HeadObjectErr {
    /// The key does not exist in the bucket
    #[error("object {key} does not exist in bucket {bucket}")]
    NotFound { bucket: String, key: String },
    #[error("failed to perform head object operation: {0:#}")]
    Backend(#[from] anyhow::Error),
}

/// Performs a head object request against the given key
#[tracing::instrument(skip(client))]
pub(crate) async fn head(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
) -> Result<ObjectHead, HeadObjectErr> {
    let resp = client.head_object().bucket(bucket).key(key).send().await;

    match resp {
        Ok(output) => Ok(ObjectHead::from(&output)),
        Err(e) => {
            if e.as_service_error().map(|e| e.is_not_found()) == Some(true) {
                return Err(HeadObjectErr::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                });
            }

            Err(HeadObjectErr::Backend(
                anyhow::Error::new(e).context(format!("could not head {key} in bucket {bucket}")),
            ))
        }
    }
}
