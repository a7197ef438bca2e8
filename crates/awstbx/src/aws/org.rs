//! Organizations and IAM Identity Center operations

use super::context::{AwsContext, FromAwsContext};
use super::error::AwsError;
use aws_sdk_ssoadmin::types::{
    AccountAssignmentOperationStatus, PrincipalType as SdkPrincipalType, StatusValues, TargetType,
};
use awstbx_core::{Page, PollStatus};
use std::fmt;
use std::future::Future;
use tracing::debug;

/// A member account of the organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// An IAM Identity Center instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoInstance {
    pub instance_arn: String,
    pub identity_store_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum PrincipalType {
    User,
    Group,
}

impl PrincipalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalType::User => "USER",
            PrincipalType::Group => "GROUP",
        }
    }
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PrincipalType> for SdkPrincipalType {
    fn from(value: PrincipalType) -> Self {
        match value {
            PrincipalType::User => SdkPrincipalType::User,
            PrincipalType::Group => SdkPrincipalType::Group,
        }
    }
}

/// Everything needed to create or delete one account assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub instance_arn: String,
    pub account_id: String,
    pub principal_type: PrincipalType,
    pub principal_id: String,
    pub permission_set_arn: String,
}

pub trait OrgOperations: Send + Sync {
    fn list_accounts_page(
        &self,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<Page<Account>, AwsError>> + Send;

    /// One page of accounts directly under an OU (or the root)
    fn list_accounts_for_parent_page(
        &self,
        parent_id: &str,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<Page<Account>, AwsError>> + Send;

    fn list_sso_instances_page(
        &self,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<Page<SsoInstance>, AwsError>> + Send;

    fn list_permission_sets_page(
        &self,
        instance_arn: &str,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<Page<String>, AwsError>> + Send;

    fn permission_set_name(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> impl Future<Output = Result<String, AwsError>> + Send;

    /// Start creating an assignment; returns the request ID to poll.
    fn create_assignment(
        &self,
        assignment: &Assignment,
    ) -> impl Future<Output = Result<String, AwsError>> + Send;

    /// Start deleting an assignment; returns the request ID to poll.
    fn delete_assignment(
        &self,
        assignment: &Assignment,
    ) -> impl Future<Output = Result<String, AwsError>> + Send;

    fn assignment_creation_status(
        &self,
        instance_arn: &str,
        request_id: &str,
    ) -> impl Future<Output = Result<PollStatus, AwsError>> + Send;

    fn assignment_deletion_status(
        &self,
        instance_arn: &str,
        request_id: &str,
    ) -> impl Future<Output = Result<PollStatus, AwsError>> + Send;
}

pub struct OrgClient {
    organizations: aws_sdk_organizations::Client,
    sso: aws_sdk_ssoadmin::Client,
}

impl FromAwsContext for OrgClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            organizations: ctx.organizations_client(),
            sso: ctx.ssoadmin_client(),
        }
    }
}

fn to_account(account: &aws_sdk_organizations::types::Account) -> Option<Account> {
    let id = account.id().filter(|id| !id.is_empty())?;
    Some(Account {
        id: id.to_string(),
        name: account.name().unwrap_or_default().to_string(),
        email: account.email().unwrap_or_default().to_string(),
    })
}

fn request_id(
    status: Option<&AccountAssignmentOperationStatus>,
    operation: &str,
) -> Result<String, AwsError> {
    status
        .and_then(|s| s.request_id())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AwsError::other(format!("missing assignment {operation} request ID")))
}

/// Map an assignment operation status onto a poll result.
fn poll_status(
    status: Option<&AccountAssignmentOperationStatus>,
    operation: &str,
) -> Result<PollStatus, AwsError> {
    let status = status
        .ok_or_else(|| AwsError::other(format!("empty assignment {operation} status response")))?;

    Ok(match status.status() {
        Some(StatusValues::Succeeded) => PollStatus::Complete,
        Some(StatusValues::Failed) => {
            let reason = status
                .failure_reason()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("assignment {operation} failed"));
            PollStatus::Failed(reason)
        }
        _ => PollStatus::InProgress,
    })
}

impl OrgOperations for OrgClient {
    async fn list_accounts_page(&self, cursor: Option<String>) -> Result<Page<Account>, AwsError> {
        let out = self
            .organizations
            .list_accounts()
            .set_next_token(cursor)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        Ok(Page::new(
            out.accounts().iter().filter_map(to_account).collect(),
            out.next_token().map(str::to_string),
        ))
    }

    async fn list_accounts_for_parent_page(
        &self,
        parent_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<Account>, AwsError> {
        let out = self
            .organizations
            .list_accounts_for_parent()
            .parent_id(parent_id)
            .set_next_token(cursor)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        Ok(Page::new(
            out.accounts().iter().filter_map(to_account).collect(),
            out.next_token().map(str::to_string),
        ))
    }

    async fn list_sso_instances_page(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<SsoInstance>, AwsError> {
        let out = self
            .sso
            .list_instances()
            .set_next_token(cursor)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        let items = out
            .instances()
            .iter()
            .filter_map(|i| {
                Some(SsoInstance {
                    instance_arn: i.instance_arn()?.to_string(),
                    identity_store_id: i.identity_store_id().unwrap_or_default().to_string(),
                })
            })
            .collect();

        Ok(Page::new(items, out.next_token().map(str::to_string)))
    }

    async fn list_permission_sets_page(
        &self,
        instance_arn: &str,
        cursor: Option<String>,
    ) -> Result<Page<String>, AwsError> {
        let out = self
            .sso
            .list_permission_sets()
            .instance_arn(instance_arn)
            .set_next_token(cursor)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        Ok(Page::new(
            out.permission_sets().to_vec(),
            out.next_token().map(str::to_string),
        ))
    }

    async fn permission_set_name(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<String, AwsError> {
        let out = self
            .sso
            .describe_permission_set()
            .instance_arn(instance_arn)
            .permission_set_arn(permission_set_arn)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        Ok(out
            .permission_set()
            .and_then(|p| p.name())
            .unwrap_or_default()
            .to_string())
    }

    async fn create_assignment(&self, assignment: &Assignment) -> Result<String, AwsError> {
        debug!(account_id = %assignment.account_id, principal_id = %assignment.principal_id, "Creating account assignment");
        let out = self
            .sso
            .create_account_assignment()
            .instance_arn(&assignment.instance_arn)
            .target_id(&assignment.account_id)
            .target_type(TargetType::AwsAccount)
            .principal_type(assignment.principal_type.into())
            .principal_id(&assignment.principal_id)
            .permission_set_arn(&assignment.permission_set_arn)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        request_id(out.account_assignment_creation_status(), "creation")
    }

    async fn delete_assignment(&self, assignment: &Assignment) -> Result<String, AwsError> {
        debug!(account_id = %assignment.account_id, principal_id = %assignment.principal_id, "Deleting account assignment");
        let out = self
            .sso
            .delete_account_assignment()
            .instance_arn(&assignment.instance_arn)
            .target_id(&assignment.account_id)
            .target_type(TargetType::AwsAccount)
            .principal_type(assignment.principal_type.into())
            .principal_id(&assignment.principal_id)
            .permission_set_arn(&assignment.permission_set_arn)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        request_id(out.account_assignment_deletion_status(), "deletion")
    }

    async fn assignment_creation_status(
        &self,
        instance_arn: &str,
        request_id: &str,
    ) -> Result<PollStatus, AwsError> {
        let out = self
            .sso
            .describe_account_assignment_creation_status()
            .instance_arn(instance_arn)
            .account_assignment_creation_request_id(request_id)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        poll_status(out.account_assignment_creation_status(), "creation")
    }

    async fn assignment_deletion_status(
        &self,
        instance_arn: &str,
        request_id: &str,
    ) -> Result<PollStatus, AwsError> {
        let out = self
            .sso
            .describe_account_assignment_deletion_status()
            .instance_arn(instance_arn)
            .account_assignment_deletion_request_id(request_id)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;

        poll_status(out.account_assignment_deletion_status(), "deletion")
    }
}
