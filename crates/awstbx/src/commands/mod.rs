//! Command implementations
//!
//! Each command lists its targets through a service operations trait,
//! builds rows sorted by their identity column, runs them through the
//! shared action plan and returns a [`Dataset`](crate::output::Dataset)
//! for `main` to render. Listing failures abort the command; per-row
//! failures end up in the row's `action` column.

pub mod ecs;
pub mod efs;
pub mod org;
pub mod s3;
pub mod ssm;

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::GlobalOptions;
    use crate::runtime::CommandRuntime;
    use awstbx_core::{CancelSignal, Prompter};
    use std::io::Cursor;

    pub type ScriptedRuntime = CommandRuntime<Prompter<Cursor<Vec<u8>>, Vec<u8>>>;

    /// A runtime whose confirmation prompt reads `answers`.
    pub fn runtime(dry_run: bool, no_confirm: bool, answers: &str) -> ScriptedRuntime {
        CommandRuntime::new(
            GlobalOptions {
                dry_run,
                no_confirm,
                ..Default::default()
            },
            Prompter::new(Cursor::new(answers.as_bytes().to_vec()), Vec::new()),
            CancelSignal::new(),
        )
    }

    pub fn confirmed() -> ScriptedRuntime {
        runtime(false, false, "y\n")
    }

    pub fn dry_run() -> ScriptedRuntime {
        runtime(true, false, "")
    }

    pub fn declined() -> ScriptedRuntime {
        runtime(false, false, "n\n")
    }
}
