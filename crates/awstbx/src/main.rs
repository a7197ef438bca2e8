//! awstbx: list and clean up AWS resources from the command line
//!
//! Destructive commands preview their targets, ask for confirmation and
//! report a per-target outcome in the `action` column.

use anyhow::Result;
use awstbx::aws::org::PrincipalType;
use awstbx::aws::{
    AwsContext, EcsClient, EfsClient, FromAwsContext, OrgClient, S3Client, SsmClient,
};
use awstbx::commands::{ecs, efs, org, s3, ssm};
use awstbx::config::{GlobalOptions, OutputFormat};
use awstbx::output::{Dataset, write_dataset};
use awstbx::process::SystemRunner;
use awstbx::runtime::{CommandRuntime, InterruptibleConfirm};
use awstbx::tags::parse_tag_filter;
use awstbx_core::{CancelSignal, Prompter};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "awstbx")]
#[command(about = "Command-line toolbox for listing and cleaning up AWS resources")]
#[command(version)]
struct Args {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct GlobalArgs {
    /// AWS profile to use
    #[arg(short, long, global = true, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// AWS region to use
    #[arg(short, long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Show what would change without changing anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    no_confirm: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl From<&GlobalArgs> for GlobalOptions {
    fn from(args: &GlobalArgs) -> Self {
        Self {
            profile: args.profile.clone().filter(|p| !p.trim().is_empty()),
            region: args.region.clone().filter(|r| !r.trim().is_empty()),
            dry_run: args.dry_run,
            output: args.output,
            no_confirm: args.no_confirm,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Elastic File System
    #[command(subcommand)]
    Efs(EfsCommand),

    /// S3 buckets
    #[command(subcommand)]
    S3(S3Command),

    /// Systems Manager Parameter Store
    #[command(subcommand)]
    Ssm(SsmCommand),

    /// Elastic Container Service
    #[command(subcommand)]
    Ecs(EcsCommand),

    /// Organizations and IAM Identity Center
    #[command(subcommand)]
    Org(OrgCommand),
}

#[derive(Subcommand, Debug)]
enum EfsCommand {
    /// Delete file systems, removing their mount targets first
    DeleteFilesystems {
        /// Only file systems carrying this tag (KEY=VALUE)
        #[arg(long, default_value = "")]
        filter_tag: String,
    },
}

#[derive(Subcommand, Debug)]
enum S3Command {
    /// Empty and delete buckets
    DeleteBuckets {
        /// Only buckets with no objects and versioning not enabled
        #[arg(long)]
        empty: bool,

        /// Only buckets whose name contains this substring
        #[arg(long)]
        filter_name_contains: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum SsmCommand {
    /// Delete the parameters listed in a JSON file
    DeleteParameters {
        /// JSON file of parameter names or parameter records
        #[arg(long)]
        input_file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum EcsCommand {
    /// Delete every INACTIVE task definition revision
    DeleteTaskDefinitions,

    /// Build a Docker image and push it to ECR
    PublishImage {
        /// ECR repository URL
        #[arg(long)]
        ecr_url: String,

        #[arg(long, default_value = "./Dockerfile")]
        dockerfile: String,

        #[arg(long, default_value = "latest")]
        tag: String,

        /// Docker build context
        #[arg(long, default_value = ".")]
        context: String,
    },
}

#[derive(clap::Args, Debug)]
struct AccessArgs {
    /// Identity Center user or group ID
    #[arg(long)]
    principal_id: String,

    #[arg(long, value_enum)]
    principal_type: PrincipalType,

    /// Permission set name (case-insensitive)
    #[arg(long)]
    permission_set_name: String,

    /// Organizational unit whose accounts are changed
    #[arg(long)]
    ou_id: String,
}

impl From<AccessArgs> for org::AccessRequest {
    fn from(args: AccessArgs) -> Self {
        Self {
            principal_type: args.principal_type,
            principal_id: args.principal_id,
            permission_set_name: args.permission_set_name,
            ou_id: args.ou_id,
        }
    }
}

#[derive(Subcommand, Debug)]
enum OrgCommand {
    /// List accounts in the organization
    ListAccounts {
        /// Only accounts directly under this organizational unit
        #[arg(long)]
        ou_id: Option<String>,
    },

    /// Assign a permission set to a principal in every account of an OU
    AssignSsoAccess(AccessArgs),

    /// Remove a permission set assignment from every account of an OU
    RemoveSsoAccess(AccessArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print the error and its causes to stderr
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }
}

fn init_tracing(verbose: bool) {
    // RUST_LOG wins; otherwise only warnings, or our crates at debug with -v.
    let default = if verbose {
        "warn,awstbx=debug,awstbx_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.global.verbose);

    let options = GlobalOptions::from(&args.global);
    let format = options.output;

    let cancel = CancelSignal::new();
    let prompting = Arc::new(AtomicBool::new(false));
    watch_for_interrupt(cancel.clone(), prompting.clone());

    let aws = AwsContext::load(options.profile.as_deref(), options.region.as_deref()).await?;
    debug!(?aws, command = ?args.command, "Dispatching command");
    let confirmer = InterruptibleConfirm::new(Prompter::stdio(), cancel.clone(), prompting);
    let mut runtime = CommandRuntime::new(options, confirmer, cancel);

    let data = dispatch(args.command, &aws, &mut runtime).await?;

    let mut stdout = std::io::stdout().lock();
    write_dataset(&mut stdout, format, &data)
}

/// The first Ctrl+C fires `cancel` so commands stop before their next
/// change. A second one, or one while a confirmation prompt is waiting on
/// stdin, exits with 130.
fn watch_for_interrupt(cancel: CancelSignal, prompting: Arc<AtomicBool>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if prompting.load(Ordering::SeqCst) || cancel.is_cancelled() {
                eprintln!();
                std::process::exit(130);
            }
            warn!("Interrupted, stopping after the current step (Ctrl+C again to abort)");
            cancel.cancel("interrupted (Ctrl+C)");
        }
    });
}

async fn dispatch<C: awstbx_core::Confirm>(
    command: Command,
    aws: &AwsContext,
    runtime: &mut CommandRuntime<C>,
) -> Result<Dataset> {
    match command {
        Command::Efs(EfsCommand::DeleteFilesystems { filter_tag }) => {
            let filter = parse_tag_filter(&filter_tag)?;
            efs::delete_filesystems(&EfsClient::from_context(aws), runtime, filter.as_ref()).await
        }

        Command::S3(S3Command::DeleteBuckets {
            empty,
            filter_name_contains,
        }) => {
            let filter = s3::BucketFilter {
                empty_only: empty,
                name_contains: filter_name_contains,
            };
            s3::delete_buckets(&S3Client::from_context(aws), runtime, &filter).await
        }

        Command::Ssm(SsmCommand::DeleteParameters { input_file }) => {
            ssm::delete_parameters(&SsmClient::from_context(aws), runtime, &input_file).await
        }

        Command::Ecs(EcsCommand::DeleteTaskDefinitions) => {
            ecs::delete_task_definitions(&EcsClient::from_context(aws), runtime, aws.region()).await
        }

        Command::Ecs(EcsCommand::PublishImage {
            ecr_url,
            dockerfile,
            tag,
            context,
        }) => {
            let request = ecs::PublishRequest {
                ecr_url,
                dockerfile,
                tag,
                context,
            };
            ecs::publish_image(&SystemRunner::default(), runtime, &request).await
        }

        Command::Org(OrgCommand::ListAccounts { ou_id }) => {
            org::list_accounts(&OrgClient::from_context(aws), ou_id.as_deref()).await
        }

        Command::Org(OrgCommand::AssignSsoAccess(access)) => {
            let client = OrgClient::from_context(aws);
            org::change_sso_access(&client, runtime, org::AccessChange::Assign, &access.into())
                .await
        }

        Command::Org(OrgCommand::RemoveSsoAccess(access)) => {
            let client = OrgClient::from_context(aws);
            org::change_sso_access(&client, runtime, org::AccessChange::Remove, &access.into())
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let args = Args::try_parse_from([
            "awstbx",
            "s3",
            "delete-buckets",
            "--empty",
            "--dry-run",
            "-o",
            "json",
            "--region",
            "eu-west-1",
        ])
        .unwrap();

        let options = GlobalOptions::from(&args.global);
        assert!(options.dry_run);
        assert_eq!(options.output, OutputFormat::Json);
        assert_eq!(options.region.as_deref(), Some("eu-west-1"));
        assert!(matches!(
            args.command,
            Command::S3(S3Command::DeleteBuckets { empty: true, .. })
        ));
    }

    #[test]
    fn principal_type_is_upper_case() {
        let args = Args::try_parse_from([
            "awstbx",
            "org",
            "assign-sso-access",
            "--principal-id",
            "g-1",
            "--principal-type",
            "GROUP",
            "--permission-set-name",
            "ReadOnly",
            "--ou-id",
            "ou-1",
        ])
        .unwrap();
        let Command::Org(OrgCommand::AssignSsoAccess(access)) = args.command else {
            panic!("expected assign-sso-access");
        };
        assert_eq!(access.principal_type, PrincipalType::Group);

        let lower = Args::try_parse_from([
            "awstbx",
            "org",
            "remove-sso-access",
            "--principal-id",
            "g-1",
            "--principal-type",
            "group",
            "--permission-set-name",
            "ReadOnly",
            "--ou-id",
            "ou-1",
        ]);
        assert!(lower.is_err());
    }

    #[test]
    fn input_file_is_required() {
        let missing = Args::try_parse_from(["awstbx", "ssm", "delete-parameters"]);
        assert_eq!(
            missing.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );

        let args =
            Args::try_parse_from(["awstbx", "ssm", "delete-parameters", "--input-file", "p.json"])
                .unwrap();
        let Command::Ssm(SsmCommand::DeleteParameters { input_file }) = args.command else {
            panic!("expected delete-parameters");
        };
        assert_eq!(input_file, PathBuf::from("p.json"));
    }

    #[test]
    fn publish_image_defaults() {
        let args = Args::try_parse_from(["awstbx", "ecs", "publish-image", "--ecr-url", "r/app"])
            .unwrap();
        let Command::Ecs(EcsCommand::PublishImage {
            dockerfile,
            tag,
            context,
            ..
        }) = args.command
        else {
            panic!("expected publish-image");
        };
        assert_eq!((dockerfile.as_str(), tag.as_str(), context.as_str()), ("./Dockerfile", "latest", "."));
    }
}
