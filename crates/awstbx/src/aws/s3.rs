//! S3 bucket and object operations

use super::context::{AwsContext, FromAwsContext};
use super::error::AwsError;
use aws_sdk_s3::types::{BucketVersioningStatus, Delete, ObjectIdentifier};
use awstbx_core::Page;
use std::future::Future;
use tracing::debug;

/// Largest number of keys a single DeleteObjects call accepts
pub const DELETE_BATCH_SIZE: usize = 1000;

/// An object (or one version of it) to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub key: String,
    pub version_id: Option<String>,
}

impl ObjectRef {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: None,
        }
    }

    pub fn version(key: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: Some(version_id.into()),
        }
    }
}

/// One page of `ListObjectVersions`.
///
/// This listing continues from two markers at once, so it does not fit
/// [`Page`]. Versions and delete markers are merged into `objects`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionPage {
    pub objects: Vec<ObjectRef>,
    pub next_key_marker: Option<String>,
    pub next_version_id_marker: Option<String>,
}

pub trait S3Operations: Send + Sync {
    fn list_buckets_page(
        &self,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<Page<String>, AwsError>> + Send;

    /// Whether the bucket holds at least one current object
    fn bucket_has_objects(&self, bucket: &str)
    -> impl Future<Output = Result<bool, AwsError>> + Send;

    fn versioning_enabled(&self, bucket: &str)
    -> impl Future<Output = Result<bool, AwsError>> + Send;

    /// One page of current object keys
    fn list_objects_page(
        &self,
        bucket: &str,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<Page<String>, AwsError>> + Send;

    fn list_object_versions_page(
        &self,
        bucket: &str,
        key_marker: Option<String>,
        version_id_marker: Option<String>,
    ) -> impl Future<Output = Result<VersionPage, AwsError>> + Send;

    /// Delete up to [`DELETE_BATCH_SIZE`] objects in one call.
    ///
    /// Returns the per-key errors S3 reported for the batch, formatted as
    /// `"<key>: <message> (<code>)"`. An empty vector means every key went.
    fn delete_objects(
        &self,
        bucket: &str,
        objects: &[ObjectRef],
    ) -> impl Future<Output = Result<Vec<String>, AwsError>> + Send;

    fn delete_bucket(&self, bucket: &str) -> impl Future<Output = Result<(), AwsError>> + Send;
}

pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl FromAwsContext for S3Client {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.s3_client(),
        }
    }
}

impl S3Operations for S3Client {
    async fn list_buckets_page(&self, cursor: Option<String>) -> Result<Page<String>, AwsError> {
        let out = self
            .client
            .list_buckets()
            .max_buckets(1000)
            .set_continuation_token(cursor)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        let items = out
            .buckets()
            .iter()
            .filter_map(|b| b.name())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Page::new(items, out.continuation_token().map(str::to_string)))
    }

    async fn bucket_has_objects(&self, bucket: &str) -> Result<bool, AwsError> {
        let out = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(1)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;
        Ok(!out.contents().is_empty())
    }

    async fn versioning_enabled(&self, bucket: &str) -> Result<bool, AwsError> {
        let out = self
            .client
            .get_bucket_versioning()
            .bucket(bucket)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;
        Ok(out.status() == Some(&BucketVersioningStatus::Enabled))
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        cursor: Option<String>,
    ) -> Result<Page<String>, AwsError> {
        let out = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(cursor)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        let items = out
            .contents()
            .iter()
            .filter_map(|o| o.key())
            .map(str::to_string)
            .collect();

        Ok(Page::new(
            items,
            out.next_continuation_token().map(str::to_string),
        ))
    }

    async fn list_object_versions_page(
        &self,
        bucket: &str,
        key_marker: Option<String>,
        version_id_marker: Option<String>,
    ) -> Result<VersionPage, AwsError> {
        let out = self
            .client
            .list_object_versions()
            .bucket(bucket)
            .set_key_marker(key_marker)
            .set_version_id_marker(version_id_marker)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        let versions = out.versions().iter().filter_map(|v| {
            v.key().map(|key| ObjectRef {
                key: key.to_string(),
                version_id: v.version_id().map(str::to_string),
            })
        });
        let markers = out.delete_markers().iter().filter_map(|m| {
            m.key().map(|key| ObjectRef {
                key: key.to_string(),
                version_id: m.version_id().map(str::to_string),
            })
        });

        Ok(VersionPage {
            objects: versions.chain(markers).collect(),
            next_key_marker: out.next_key_marker().map(str::to_string),
            next_version_id_marker: out.next_version_id_marker().map(str::to_string),
        })
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[ObjectRef],
    ) -> Result<Vec<String>, AwsError> {
        if objects.is_empty() {
            return Ok(Vec::new());
        }
        debug!(bucket, count = objects.len(), "Deleting object batch");

        let identifiers = objects
            .iter()
            .map(|o| {
                ObjectIdentifier::builder()
                    .key(&o.key)
                    .set_version_id(o.version_id.clone())
                    .build()
                    .map_err(|e| AwsError::other(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(true)
            .build()
            .map_err(|e| AwsError::other(e.to_string()))?;

        let out = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        Ok(out
            .errors()
            .iter()
            .map(|e| {
                let err = AwsError::new(
                    super::error::classify_code(e.code().unwrap_or_default()),
                    e.code().map(str::to_string),
                    e.message().unwrap_or("delete failed"),
                );
                format!("{}: {err}", e.key().unwrap_or("<unknown key>"))
            })
            .collect())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), AwsError> {
        debug!(bucket, "Deleting bucket");
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;
        Ok(())
    }
}
