//! EFS file system and mount target operations

use super::context::{AwsContext, FromAwsContext};
use super::error::AwsError;
use awstbx_core::Page;
use std::future::Future;
use tracing::debug;

/// A file system as seen by the delete command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystem {
    pub id: String,
    pub tags: Vec<(String, String)>,
}

impl FileSystem {
    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.tags.iter().any(|(k, v)| k == key && v == value)
    }
}

/// EFS operations used by the `efs` commands.
pub trait EfsOperations: Send + Sync {
    /// One page of file systems in the region
    fn list_file_systems_page(
        &self,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<Page<FileSystem>, AwsError>> + Send;

    /// One page of mount target IDs belonging to a file system
    fn list_mount_targets_page(
        &self,
        file_system_id: &str,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<Page<String>, AwsError>> + Send;

    fn delete_mount_target(
        &self,
        mount_target_id: &str,
    ) -> impl Future<Output = Result<(), AwsError>> + Send;

    fn delete_file_system(
        &self,
        file_system_id: &str,
    ) -> impl Future<Output = Result<(), AwsError>> + Send;
}

pub struct EfsClient {
    client: aws_sdk_efs::Client,
}

impl FromAwsContext for EfsClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.efs_client(),
        }
    }
}

impl EfsOperations for EfsClient {
    async fn list_file_systems_page(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<FileSystem>, AwsError> {
        let out = self
            .client
            .describe_file_systems()
            .set_marker(cursor)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        let items = out
            .file_systems()
            .iter()
            .filter(|fs| !fs.file_system_id().is_empty())
            .map(|fs| FileSystem {
                id: fs.file_system_id().to_string(),
                tags: fs
                    .tags()
                    .iter()
                    .map(|t| (t.key().to_string(), t.value().to_string()))
                    .collect(),
            })
            .collect();

        Ok(Page::new(items, out.next_marker().map(str::to_string)))
    }

    async fn list_mount_targets_page(
        &self,
        file_system_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<String>, AwsError> {
        let out = self
            .client
            .describe_mount_targets()
            .file_system_id(file_system_id)
            .set_marker(cursor)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        let items = out
            .mount_targets()
            .iter()
            .map(|mt| mt.mount_target_id().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        Ok(Page::new(items, out.next_marker().map(str::to_string)))
    }

    async fn delete_mount_target(&self, mount_target_id: &str) -> Result<(), AwsError> {
        debug!(mount_target_id, "Deleting mount target");
        self.client
            .delete_mount_target()
            .mount_target_id(mount_target_id)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;
        Ok(())
    }

    async fn delete_file_system(&self, file_system_id: &str) -> Result<(), AwsError> {
        debug!(file_system_id, "Deleting file system");
        self.client
            .delete_file_system()
            .file_system_id(file_system_id)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;
        Ok(())
    }
}
