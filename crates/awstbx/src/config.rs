//! Configuration types shared by every command

use awstbx_core::PlanOptions;
use std::fmt;

/// How a finished dataset is rendered on stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Text,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
        })
    }
}

/// Global flags, resolved once per invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    /// Named AWS profile (overrides default credential resolution)
    pub profile: Option<String>,
    /// AWS region override
    pub region: Option<String>,
    /// Preview destructive actions without executing them
    pub dry_run: bool,
    pub output: OutputFormat,
    /// Skip interactive confirmation prompts
    pub no_confirm: bool,
}

impl GlobalOptions {
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            dry_run: self.dry_run,
            no_confirm: self.no_confirm,
        }
    }
}
