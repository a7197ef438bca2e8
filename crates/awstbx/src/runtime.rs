//! Per-invocation command runtime

use crate::config::GlobalOptions;
use awstbx_core::{CancelSignal, Confirm, CoreError, PlanOptions};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Everything a command needs besides its service client: the parsed
/// global options, the confirmation oracle and the cancellation signal.
pub struct CommandRuntime<C> {
    pub options: GlobalOptions,
    pub confirmer: C,
    pub cancel: CancelSignal,
}

impl<C: Confirm> CommandRuntime<C> {
    pub fn new(options: GlobalOptions, confirmer: C, cancel: CancelSignal) -> Self {
        Self {
            options,
            confirmer,
            cancel,
        }
    }

    pub fn plan_options(&self) -> PlanOptions {
        self.options.plan_options()
    }

    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }
}

/// Confirmation that answers "no" once the cancel signal has fired.
///
/// `prompting` is raised while the inner confirmer waits on the operator.
/// A blocked stdin read cannot observe the signal, so the interrupt handler
/// checks this flag and exits the process instead.
pub struct InterruptibleConfirm<C> {
    inner: C,
    cancel: CancelSignal,
    prompting: Arc<AtomicBool>,
}

impl<C> InterruptibleConfirm<C> {
    pub fn new(inner: C, cancel: CancelSignal, prompting: Arc<AtomicBool>) -> Self {
        Self {
            inner,
            cancel,
            prompting,
        }
    }
}

impl<C: Confirm> Confirm for InterruptibleConfirm<C> {
    fn confirm(&mut self, prompt: &str, bypass: bool) -> Result<bool, CoreError> {
        if self.cancel.is_cancelled() {
            debug!(cause = %self.cancel.cause(), "Interrupted before confirmation");
            return Ok(false);
        }
        if bypass {
            return self.inner.confirm(prompt, true);
        }

        self.prompting.store(true, Ordering::SeqCst);
        let answer = self.inner.confirm(prompt, false);
        self.prompting.store(false, Ordering::SeqCst);

        Ok(answer? && !self.cancel.is_cancelled())
    }
}
