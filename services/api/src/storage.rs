//! Remote object storage backed by S3
//!
//! The store is a black box to the rest of the service: a put either
//! acknowledges with the bucket/key/location triple or fails, and that
//! failure propagates as an upload error. Nothing here retries and nothing
//! here deletes; an object, once acknowledged, stays.

use std::path::Path;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tracing::info;

use crate::error::{ApiError, ApiResult};

/// What the object store acknowledged
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub location: String,
}

/// S3-backed object storage
#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
    bucket: String,
}

impl ObjectStorage {
    /// Create a new object storage handle for one bucket
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Stream a local file to the bucket under `key` with a public-read ACL
    pub async fn put_public(
        &self,
        key: &str,
        content_type: &str,
        path: &Path,
    ) -> ApiResult<StoredObject> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| ApiError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::Upload(format!("{}", DisplayErrorContext(&e))))?;

        let stored = StoredObject {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            location: object_url(&self.bucket, key),
        };

        info!("Stored object {} in bucket {}", stored.key, stored.bucket);
        Ok(stored)
    }
}

/// Public URL of an object in a bucket
fn object_url(bucket: &str, key: &str) -> String {
    format!("https://{}.s3.amazonaws.com/{}", bucket, key)
}
