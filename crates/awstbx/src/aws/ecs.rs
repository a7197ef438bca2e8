//! ECS task definition operations

use super::context::{AwsContext, FromAwsContext};
use super::error::AwsError;
use aws_sdk_ecs::types::{Failure, TaskDefinitionStatus};
use awstbx_core::Page;
use std::future::Future;

pub trait EcsOperations: Send + Sync {
    /// One page of INACTIVE task definition ARNs
    fn list_inactive_task_definitions_page(
        &self,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<Page<String>, AwsError>> + Send;

    /// Delete one task definition.
    ///
    /// The API can accept the call and still refuse the deletion; such a
    /// refusal is returned as `Ok(Some(reason))`.
    fn delete_task_definition(
        &self,
        arn: &str,
    ) -> impl Future<Output = Result<Option<String>, AwsError>> + Send;
}

pub struct EcsClient {
    client: aws_sdk_ecs::Client,
}

impl FromAwsContext for EcsClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ecs_client(),
        }
    }
}

impl EcsOperations for EcsClient {
    async fn list_inactive_task_definitions_page(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<String>, AwsError> {
        let out = self
            .client
            .list_task_definitions()
            .status(TaskDefinitionStatus::Inactive)
            .set_next_token(cursor)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        Ok(Page::new(
            out.task_definition_arns().to_vec(),
            out.next_token().map(str::to_string),
        ))
    }

    async fn delete_task_definition(&self, arn: &str) -> Result<Option<String>, AwsError> {
        let out = self
            .client
            .delete_task_definitions()
            .task_definitions(arn)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        Ok(out.failures().first().map(failure_reason))
    }
}

fn failure_reason(failure: &Failure) -> String {
    format_failure(failure.reason(), failure.detail())
}

/// `"<reason>: <detail>"`, falling back to `unknown failure` for a blank reason.
pub fn format_failure(reason: Option<&str>, detail: Option<&str>) -> String {
    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("unknown failure");
    match detail.map(str::trim).filter(|d| !d.is_empty()) {
        Some(detail) => format!("{reason}: {detail}"),
        None => reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_formatting() {
        assert_eq!(
            format_failure(Some("IN_USE"), Some("referenced by service")),
            "IN_USE: referenced by service"
        );
        assert_eq!(format_failure(Some("MISSING"), None), "MISSING");
        assert_eq!(format_failure(None, Some("")), "unknown failure");
        assert_eq!(format_failure(Some(" "), Some("x")), "unknown failure: x");
    }
}
