//! `ecs delete-task-definitions` and `ecs publish-image`

use crate::aws::ecs::EcsOperations;
use crate::output::Dataset;
use crate::process::{CommandRunner, display_command};
use crate::runtime::CommandRuntime;
use anyhow::{Context, Result, bail};
use awstbx_core::action::{
    STATUS_DELETED, failed_status, initial_status, mark_pending_skipped, set_status_for_row,
    skipped_if_cancelled,
};
use awstbx_core::{ActionPlan, Confirm, StatusCounts, collect_pages, run_action_plan};
use tracing::{info, warn};

const TASK_DEFINITION_HEADERS: &[&str] = &["task_definition_arn", "region", "action"];
const PUBLISH_HEADERS: &[&str] = &["step", "command", "action"];
const PUBLISH_STATUS_COLUMN: usize = 2;
const STATUS_COMPLETED: &str = "completed";
const LOCAL_IMAGE_NAME: &str = "awstbx-ecs-publish";

/// Delete every INACTIVE task definition revision in the region.
pub async fn delete_task_definitions<E, C>(
    ecs: &E,
    runtime: &mut CommandRuntime<C>,
    region: &str,
) -> Result<Dataset>
where
    E: EcsOperations,
    C: Confirm,
{
    let mut arns = collect_pages(|cursor| ecs.list_inactive_task_definitions_page(cursor))
        .await
        .context("list inactive task definitions")?;
    arns.sort();
    arns.dedup();
    info!(count = arns.len(), region, "Found inactive task definitions");

    let status = initial_status(runtime.dry_run(), "delete");
    let rows = arns
        .iter()
        .map(|arn| vec![arn.clone(), region.to_string(), status.clone()])
        .collect();

    let options = runtime.plan_options();
    let (arns, cancel) = (&arns, &runtime.cancel);
    let plan = ActionPlan {
        rows,
        status_column: 2,
        confirm_prompt: format!("Delete {} inactive ECS task definition(s)", arns.len()),
        execute: move |i: usize| async move {
            if let Some(skipped) = skipped_if_cancelled(cancel) {
                return skipped;
            }
            match ecs.delete_task_definition(&arns[i]).await {
                Ok(None) => STATUS_DELETED.to_string(),
                Ok(Some(reason)) => failed_status(reason),
                Err(e) => failed_status(e.to_string()),
            }
        },
    };
    let rows = run_action_plan(plan, options, &mut runtime.confirmer).await?;

    Ok(Dataset::new(TASK_DEFINITION_HEADERS, rows))
}

/// Where `publish-image` builds from and pushes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Repository URL, e.g. `123456789012.dkr.ecr.us-east-1.amazonaws.com/app`
    pub ecr_url: String,
    pub dockerfile: String,
    pub tag: String,
    pub context: String,
}

impl PublishRequest {
    /// The registry host: everything before the first `/` of the URL.
    pub fn registry(&self) -> &str {
        let url = self.ecr_url.trim();
        url.split_once('/').map_or(url, |(host, _)| host)
    }

    pub fn tag(&self) -> &str {
        match self.tag.trim() {
            "" => "latest",
            tag => tag,
        }
    }

    pub fn local_image(&self) -> String {
        format!("{LOCAL_IMAGE_NAME}:{}", self.tag().replace('/', "-"))
    }

    pub fn remote_image(&self) -> String {
        format!("{}:{}", self.ecr_url.trim(), self.tag())
    }
}

struct Step {
    name: &'static str,
    program: &'static str,
    args: Vec<String>,
}

impl Step {
    fn new(name: &'static str, program: &'static str, args: &[&str]) -> Self {
        Self {
            name,
            program,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn command(&self) -> String {
        display_command(self.program, &self.args)
    }
}

fn publish_steps(request: &PublishRequest) -> Vec<Step> {
    let local = request.local_image();
    let remote = request.remote_image();
    vec![
        Step::new(
            "login",
            "docker",
            &["login", "--username", "AWS", "--password-stdin", request.registry()],
        ),
        Step::new(
            "build",
            "docker",
            &["build", "-t", &local, "-f", &request.dockerfile, &request.context],
        ),
        Step::new("tag", "docker", &["tag", &local, &remote]),
        Step::new("push", "docker", &["push", &remote]),
    ]
}

/// Build a Docker image and push it to ECR.
///
/// Runs four dependent steps (login, build, tag, push). A failing step
/// marks every later step as skipped. There is no confirmation prompt: the
/// pipeline only adds an image tag.
pub async fn publish_image<R, C>(
    runner: &R,
    runtime: &CommandRuntime<C>,
    request: &PublishRequest,
) -> Result<Dataset>
where
    R: CommandRunner,
    C: Confirm,
{
    if request.ecr_url.trim().is_empty() {
        bail!("--ecr-url is required");
    }

    let steps = publish_steps(request);
    let status = initial_status(runtime.dry_run(), "run");
    let mut rows: Vec<Vec<String>> = steps
        .iter()
        .map(|step| vec![step.name.to_string(), step.command(), status.clone()])
        .collect();
    if runtime.dry_run() {
        return Ok(Dataset::new(PUBLISH_HEADERS, rows));
    }

    for (index, step) in steps.iter().enumerate() {
        if runtime.cancel.is_cancelled() {
            mark_pending_skipped(&mut rows, index, PUBLISH_STATUS_COLUMN, &runtime.cancel.cause());
            break;
        }

        let result = if index == 0 {
            login(runner, runtime, step).await
        } else {
            runner
                .run(step.program, &step.args, None)
                .await
                .map(drop)
                .map_err(|e| e.to_string())
        };

        match result {
            Ok(()) => {
                set_status_for_row(&mut rows, index, PUBLISH_STATUS_COLUMN, STATUS_COMPLETED)?;
            }
            Err(reason) => {
                warn!(step = step.name, %reason, "Publish step failed");
                set_status_for_row(&mut rows, index, PUBLISH_STATUS_COLUMN, &failed_status(reason))?;
                mark_pending_skipped(
                    &mut rows,
                    index + 1,
                    PUBLISH_STATUS_COLUMN,
                    "previous step failed",
                );
                break;
            }
        }
    }

    let counts = StatusCounts::tally(&rows, PUBLISH_STATUS_COLUMN);
    info!(%counts, image = %request.remote_image(), "Publish finished");
    Ok(Dataset::new(PUBLISH_HEADERS, rows))
}

/// Fetch an ECR password with the `aws` CLI and hand it to `docker login`.
async fn login<R: CommandRunner, C>(
    runner: &R,
    runtime: &CommandRuntime<C>,
    step: &Step,
) -> Result<(), String> {
    let password = runner
        .run("aws", &password_args(runtime), None)
        .await
        .map_err(|e| e.to_string())?;
    let stdin = format!("{password}\n");
    runner
        .run(step.program, &step.args, Some(&stdin))
        .await
        .map(drop)
        .map_err(|e| e.to_string())
}

fn password_args<C>(runtime: &CommandRuntime<C>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(profile) = runtime.options.profile.as_deref().filter(|p| !p.is_empty()) {
        args.extend(["--profile".to_string(), profile.to_string()]);
    }
    if let Some(region) = runtime.options.region.as_deref().filter(|r| !r.is_empty()) {
        args.extend(["--region".to_string(), region.to_string()]);
    }
    args.extend(["ecr".to_string(), "get-login-password".to_string()]);
    args
}
