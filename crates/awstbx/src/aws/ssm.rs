//! SSM parameter operations

use super::context::{AwsContext, FromAwsContext};
use super::error::AwsError;
use std::future::Future;

pub trait SsmOperations: Send + Sync {
    fn delete_parameter(&self, name: &str) -> impl Future<Output = Result<(), AwsError>> + Send;
}

pub struct SsmClient {
    client: aws_sdk_ssm::Client,
}

impl FromAwsContext for SsmClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ssm_client(),
        }
    }
}

impl SsmOperations for SsmClient {
    async fn delete_parameter(&self, name: &str) -> Result<(), AwsError> {
        self.client
            .delete_parameter()
            .name(name)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;
        Ok(())
    }
}
