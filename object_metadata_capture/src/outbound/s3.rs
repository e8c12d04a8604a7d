//! [ObjectAttributesSource] backed by S3 head object requests

use crate::domain::{
    models::{ObjectAttributes, ObjectLocation, ResolveErr, UNKNOWN_ATTRIBUTE},
    ports::ObjectAttributesSource,
};
use s3_client::{HeadObjectErr, ObjectHead, S3};

impl ObjectAttributesSource for S3 {
    #[tracing::instrument(skip(self, location), fields(bucket = %location.bucket, key = %location.key))]
    async fn head_object(&self, location: ObjectLocation) -> Result<ObjectAttributes, ResolveErr> {
        match self.head(&location.bucket, &location.key).await {
            Ok(head) => attributes_from_head(location, head),
            Err(HeadObjectErr::NotFound { .. }) => Err(ResolveErr::ObjectNotFound(location)),
            Err(HeadObjectErr::Backend(e)) => Err(ResolveErr::BackendUnavailable(e)),
        }
    }
}

/// Map a head object response onto [ObjectAttributes].
/// Size and last modified time are mandatory, content type and checksum fall back to [UNKNOWN_ATTRIBUTE]
pub fn attributes_from_head(
    location: ObjectLocation,
    head: ObjectHead,
) -> Result<ObjectAttributes, ResolveErr> {
    let Some(size) = head.content_length.and_then(|len| u64::try_from(len).ok()) else {
        return Err(ResolveErr::IncompleteMetadata {
            location,
            field: "ContentLength",
        });
    };

    let Some(last_modified) = head.last_modified else {
        return Err(ResolveErr::IncompleteMetadata {
            location,
            field: "LastModified",
        });
    };

    let content_type = head
        .content_type
        .filter(|content_type| !content_type.is_empty())
        .unwrap_or_else(|| UNKNOWN_ATTRIBUTE.to_string());

    // etags are returned quoted
    let checksum = head
        .e_tag
        .map(|etag| etag.trim_matches('"').to_string())
        .filter(|etag| !etag.is_empty())
        .unwrap_or_else(|| UNKNOWN_ATTRIBUTE.to_string());

    Ok(ObjectAttributes {
        size,
        content_type,
        checksum,
        last_modified,
    })
}
