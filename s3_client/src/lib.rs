mod head;

pub use head::{HeadObjectErr, ObjectHead};

#[derive(Clone, Debug)]
pub struct S3 {
    inner: aws_sdk_s3::Client,
}

impl S3 {
    pub fn new(inner: aws_sdk_s3::Client) -> Self {
        Self { inner }
    }

    /// Reads the metadata of the provided key without downloading the body.
    #[tracing::instrument(skip(self))]
    pub async fn head(&self, bucket: &str, key: &str) -> Result<ObjectHead, HeadObjectErr> {
        head::head(&self.inner, bucket, key).await
    }
}
