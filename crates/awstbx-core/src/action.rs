//! Destructive action plans
//!
//! A command lists its targets, turns each one into an [`ActionRow`] whose
//! status column starts out as `pending` (or `would-<verb>` in dry-run mode),
//! and hands the rows to [`run_action_plan`] together with a per-row execute
//! closure. The executor then applies the dry-run / confirm / execute
//! protocol and returns the rows with their final statuses for rendering.
//!
//! Per-row failures are never errors here. The execute closure reports them
//! as a `failed: <reason>` status and the plan moves on to the next row.

use crate::cancel::CancelSignal;
use crate::confirm::Confirm;
use crate::error::CoreError;
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};

/// Status of a row awaiting confirmation and execution
pub const STATUS_PENDING: &str = "pending";
/// Status of every row once the operator declines
pub const STATUS_CANCELLED: &str = "cancelled";
/// Success status of delete commands
pub const STATUS_DELETED: &str = "deleted";

const FAILED_PREFIX: &str = "failed";
const SKIPPED_PREFIX: &str = "skipped";
const PREVIEW_PREFIX: &str = "would-";

/// One target's record. The status lives at the plan's status column.
pub type ActionRow = Vec<String>;

/// The status a row starts with: `would-<verb>` in dry-run mode, otherwise `pending`.
pub fn initial_status(dry_run: bool, verb: &str) -> String {
    if dry_run {
        format!("{PREVIEW_PREFIX}{verb}")
    } else {
        STATUS_PENDING.to_string()
    }
}

/// Format a per-row failure. A blank reason becomes `unknown`.
pub fn failed_status(reason: impl AsRef<str>) -> String {
    format!("{FAILED_PREFIX}: {}", reason_or_unknown(reason.as_ref()))
}

/// Format a step that was not attempted. A blank reason becomes `unknown`.
pub fn skipped_status(reason: impl AsRef<str>) -> String {
    format!("{SKIPPED_PREFIX}: {}", reason_or_unknown(reason.as_ref()))
}

/// `skipped: <cause>` once `cancel` has fired.
///
/// Execute closures return this before sending any change, so an interrupt
/// stops the plan at the next row instead of after the last one.
pub fn skipped_if_cancelled(cancel: &CancelSignal) -> Option<String> {
    cancel
        .is_cancelled()
        .then(|| skipped_status(cancel.cause()))
}

fn reason_or_unknown(reason: &str) -> &str {
    let reason = reason.trim();
    if reason.is_empty() { "unknown" } else { reason }
}

/// Whether a status string records a failure.
pub fn is_failed(status: &str) -> bool {
    status == FAILED_PREFIX || status.starts_with("failed:")
}

/// Dry-run and confirmation switches for one plan run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Preview only; execute is never called
    pub dry_run: bool,
    /// Skip the interactive confirmation
    pub no_confirm: bool,
}

/// Rows to act on plus the operation that acts on one of them.
///
/// `execute` receives a row index and returns that row's new status. It is
/// called at most once per row, in row order, and only for rows whose status
/// is still `pending` when their turn comes.
pub struct ActionPlan<F> {
    pub rows: Vec<ActionRow>,
    pub status_column: usize,
    pub confirm_prompt: String,
    pub execute: F,
}

impl<F> fmt::Debug for ActionPlan<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionPlan")
            .field("rows", &self.rows.len())
            .field("status_column", &self.status_column)
            .field("confirm_prompt", &self.confirm_prompt)
            .finish_non_exhaustive()
    }
}

/// Run a plan through dry-run, confirmation and per-row execution.
///
/// Returns the rows with their final statuses. Only setup problems (a bad
/// status column, a failed confirmation read) are returned as errors.
pub async fn run_action_plan<F, Fut, C>(
    plan: ActionPlan<F>,
    options: PlanOptions,
    confirmer: &mut C,
) -> Result<Vec<ActionRow>, CoreError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = String>,
    C: Confirm + ?Sized,
{
    let ActionPlan {
        mut rows,
        status_column,
        confirm_prompt,
        mut execute,
    } = plan;

    validate_status_column(&rows, status_column)?;

    if rows.is_empty() {
        debug!("Action plan has no rows, nothing to do");
        return Ok(rows);
    }
    if options.dry_run {
        info!(rows = rows.len(), "Dry run, no changes made");
        return Ok(rows);
    }

    if !confirmer.confirm(&confirm_prompt, options.no_confirm)? {
        info!(rows = rows.len(), "Operator declined, cancelling plan");
        set_status_for_all(&mut rows, status_column, STATUS_CANCELLED);
        return Ok(rows);
    }

    for index in 0..rows.len() {
        if rows[index][status_column] != STATUS_PENDING {
            debug!(
                row = index,
                status = %rows[index][status_column],
                "Row is not pending, skipping"
            );
            continue;
        }

        let result = execute(index).await;
        let result = result.trim();
        if result.is_empty() {
            continue;
        }
        if is_failed(result) {
            warn!(target_id = %rows[index][0], status = %result, "Action failed");
        } else {
            debug!(target_id = %rows[index][0], status = %result, "Action completed");
        }
        rows[index][status_column] = result.to_string();
    }

    let counts = StatusCounts::tally(&rows, status_column);
    info!(%counts, "Action plan finished");
    Ok(rows)
}

fn validate_status_column(rows: &[ActionRow], column: usize) -> Result<(), CoreError> {
    match rows.iter().position(|row| column >= row.len()) {
        Some(row) => Err(CoreError::StatusColumnOutOfRange {
            row,
            column,
            width: rows[row].len(),
        }),
        None => Ok(()),
    }
}

/// Overwrite the status of every row that is wide enough to have one.
pub fn set_status_for_all(rows: &mut [ActionRow], column: usize, status: &str) {
    for row in rows.iter_mut() {
        if let Some(field) = row.get_mut(column) {
            *field = status.to_string();
        }
    }
}

/// Overwrite the status of a single row.
pub fn set_status_for_row(
    rows: &mut [ActionRow],
    index: usize,
    column: usize,
    status: &str,
) -> Result<(), CoreError> {
    let len = rows.len();
    let row = rows
        .get_mut(index)
        .ok_or(CoreError::RowOutOfBounds { index, len })?;
    let width = row.len();
    let field = row
        .get_mut(column)
        .ok_or(CoreError::StatusColumnOutOfRange {
            row: index,
            column,
            width,
        })?;
    *field = status.to_string();
    Ok(())
}

/// Mark every row from `start` onward that is still exactly `pending` as
/// `skipped: <reason>`. Rows already in any other state are left alone.
///
/// Used after a step of a dependent pipeline fails, so the steps that would
/// have consumed its result are reported rather than attempted.
pub fn mark_pending_skipped(rows: &mut [ActionRow], start: usize, column: usize, reason: &str) {
    let status = skipped_status(reason);
    for row in rows.iter_mut().skip(start) {
        if let Some(field) = row.get_mut(column)
            && *field == STATUS_PENDING
        {
            *field = status.clone();
        }
    }
}

/// Summary of the statuses in a finished plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub pending: usize,
    pub previewed: usize,
}

impl StatusCounts {
    pub fn tally(rows: &[ActionRow], column: usize) -> Self {
        let mut counts = Self::default();
        for status in rows.iter().filter_map(|row| row.get(column)) {
            match status.as_str() {
                STATUS_PENDING => counts.pending += 1,
                STATUS_CANCELLED => counts.cancelled += 1,
                s if is_failed(s) => counts.failed += 1,
                s if s.starts_with(SKIPPED_PREFIX) => counts.skipped += 1,
                s if s.starts_with(PREVIEW_PREFIX) => counts.previewed += 1,
                _ => counts.succeeded += 1,
            }
        }
        counts
    }
}

impl fmt::Display for StatusCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped, {} cancelled",
            self.succeeded, self.failed, self.skipped, self.cancelled
        )
    }
}
