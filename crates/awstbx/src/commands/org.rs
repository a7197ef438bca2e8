//! `org list-accounts`, `org assign-sso-access` and `org remove-sso-access`

use crate::aws::org::{Account, Assignment, OrgOperations, PrincipalType};
use crate::output::Dataset;
use crate::runtime::CommandRuntime;
use anyhow::{Context, Result, bail};
use awstbx_core::action::{failed_status, initial_status, skipped_if_cancelled};
use awstbx_core::{
    ActionPlan, CancelSignal, Confirm, WaitConfig, WaitOutcome, collect_pages, run_action_plan,
    wait_until_complete,
};
use std::time::Duration;
use tracing::{debug, info};

const ACCOUNT_HEADERS: &[&str] = &["account_id", "name", "email"];
const ACCESS_HEADERS: &[&str] = &[
    "account_id",
    "principal_type",
    "principal_id",
    "permission_set",
    "action",
];
const ASSIGNMENT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// List every account in the organization, or only those directly under
/// `ou_id` when given.
pub async fn list_accounts<O: OrgOperations>(org: &O, ou_id: Option<&str>) -> Result<Dataset> {
    let accounts = accounts_in(org, ou_id).await?;
    let rows = accounts
        .into_iter()
        .map(|a| vec![a.id, a.name, a.email])
        .collect();
    Ok(Dataset::new(ACCOUNT_HEADERS, rows))
}

async fn accounts_in<O: OrgOperations>(org: &O, ou_id: Option<&str>) -> Result<Vec<Account>> {
    let mut accounts = match ou_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(parent) => collect_pages(move |cursor| org.list_accounts_for_parent_page(parent, cursor))
            .await
            .with_context(|| format!("list accounts for {parent}"))?,
        None => collect_pages(|cursor| org.list_accounts_page(cursor))
            .await
            .context("list accounts")?,
    };
    accounts.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(accounts)
}

/// Whether an access change grants or revokes the permission set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessChange {
    Assign,
    Remove,
}

impl AccessChange {
    fn verb(self) -> &'static str {
        match self {
            AccessChange::Assign => "assign",
            AccessChange::Remove => "remove",
        }
    }

    fn done(self) -> &'static str {
        match self {
            AccessChange::Assign => "assigned",
            AccessChange::Remove => "removed",
        }
    }

    fn prompt(self, count: usize) -> String {
        match self {
            AccessChange::Assign => format!("Assign access for {count} account(s)"),
            AccessChange::Remove => format!("Remove access for {count} account(s)"),
        }
    }
}

/// Who gets (or loses) which permission set, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    pub principal_type: PrincipalType,
    pub principal_id: String,
    pub permission_set_name: String,
    pub ou_id: String,
}

impl AccessRequest {
    fn validate(&self) -> Result<()> {
        if self.principal_id.trim().is_empty() {
            bail!("--principal-id is required");
        }
        if self.permission_set_name.trim().is_empty() {
            bail!("--permission-set-name is required");
        }
        if self.ou_id.trim().is_empty() {
            bail!("--ou-id is required");
        }
        Ok(())
    }
}

/// Create or delete the account assignment for every account under the OU.
///
/// Each assignment is asynchronous on the AWS side; a row only reaches
/// `assigned`/`removed` once its request status reports success.
pub async fn change_sso_access<O, C>(
    org: &O,
    runtime: &mut CommandRuntime<C>,
    change: AccessChange,
    request: &AccessRequest,
) -> Result<Dataset>
where
    O: OrgOperations,
    C: Confirm,
{
    request.validate()?;

    let instances = collect_pages(|cursor| org.list_sso_instances_page(cursor))
        .await
        .context("list SSO instances")?;
    let Some(instance) = instances.into_iter().next() else {
        bail!("no IAM Identity Center instances found");
    };
    let permission_set_arn =
        resolve_permission_set(org, &instance.instance_arn, &request.permission_set_name).await?;
    let accounts = accounts_in(org, Some(request.ou_id.as_str())).await?;
    info!(
        count = accounts.len(),
        permission_set = %permission_set_arn,
        change = change.verb(),
        "Resolved SSO access targets"
    );

    let assignments: Vec<Assignment> = accounts
        .into_iter()
        .map(|account| Assignment {
            instance_arn: instance.instance_arn.clone(),
            account_id: account.id,
            principal_type: request.principal_type,
            principal_id: request.principal_id.trim().to_string(),
            permission_set_arn: permission_set_arn.clone(),
        })
        .collect();

    let status = initial_status(runtime.dry_run(), change.verb());
    let rows = assignments
        .iter()
        .map(|a| {
            vec![
                a.account_id.clone(),
                a.principal_type.to_string(),
                a.principal_id.clone(),
                request.permission_set_name.trim().to_string(),
                status.clone(),
            ]
        })
        .collect();

    let options = runtime.plan_options();
    let (assignments, cancel) = (&assignments, &runtime.cancel);
    let plan = ActionPlan {
        rows,
        status_column: 4,
        confirm_prompt: change.prompt(assignments.len()),
        execute: move |i: usize| apply(org, change, &assignments[i], cancel),
    };
    let rows = run_action_plan(plan, options, &mut runtime.confirmer).await?;

    Ok(Dataset::new(ACCESS_HEADERS, rows))
}

/// Find the ARN of the permission set whose name matches, ignoring case.
///
/// Permission sets that cannot be described are passed over.
async fn resolve_permission_set<O: OrgOperations>(
    org: &O,
    instance_arn: &str,
    name: &str,
) -> Result<String> {
    let arns = collect_pages(move |cursor| org.list_permission_sets_page(instance_arn, cursor))
        .await
        .context("list permission sets")?;

    let wanted = name.trim();
    for arn in arns {
        match org.permission_set_name(instance_arn, &arn).await {
            Ok(found) if found.eq_ignore_ascii_case(wanted) => return Ok(arn),
            Ok(_) => {}
            Err(e) => debug!(permission_set = %arn, error = %e, "Could not describe permission set"),
        }
    }
    bail!("permission set not found: {wanted}")
}

async fn apply<O: OrgOperations>(
    org: &O,
    change: AccessChange,
    assignment: &Assignment,
    cancel: &CancelSignal,
) -> String {
    if let Some(skipped) = skipped_if_cancelled(cancel) {
        return skipped;
    }
    let started = match change {
        AccessChange::Assign => org.create_assignment(assignment).await,
        AccessChange::Remove => org.delete_assignment(assignment).await,
    };
    let request_id = match started {
        Ok(id) => id,
        Err(e) => return failed_status(e.to_string()),
    };

    let instance_arn = assignment.instance_arn.as_str();
    let request_id = request_id.as_str();
    let resource = format!(
        "account assignment {} for {}",
        match change {
            AccessChange::Assign => "creation",
            AccessChange::Remove => "deletion",
        },
        assignment.account_id
    );
    let wait = WaitConfig::unbounded(ASSIGNMENT_POLL_INTERVAL);
    let outcome = wait_until_complete(&resource, &wait, cancel, move || async move {
        match change {
            AccessChange::Assign => org.assignment_creation_status(instance_arn, request_id).await,
            AccessChange::Remove => org.assignment_deletion_status(instance_arn, request_id).await,
        }
    })
    .await;

    match outcome {
        WaitOutcome::Succeeded => change.done().to_string(),
        other => failed_status(other.to_string()),
    }
}
