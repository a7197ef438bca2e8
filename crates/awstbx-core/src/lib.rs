//! awstbx-core - orchestration shared by every awstbx command
//!
//! This crate holds the parts of awstbx that are independent of any AWS
//! service, without AWS SDK dependencies so it stays lightweight and easy
//! to test.
//!
//! ## Modules
//!
//! - [`pagination`]: Drain cursor-paginated listings into one sequence
//! - [`action`]: Destructive action plans (dry-run, confirm, execute per row)
//! - [`confirm`]: Interactive yes/no confirmation
//! - [`wait`]: Fixed-interval polling of remote asynchronous operations
//! - [`cancel`]: Cancellation signal that remembers its cause
//! - [`error`]: Core error type

pub mod action;
pub mod cancel;
pub mod confirm;
pub mod error;
pub mod pagination;
pub mod wait;

// Re-export commonly used types
pub use action::{ActionPlan, ActionRow, PlanOptions, StatusCounts, run_action_plan};
pub use cancel::CancelSignal;
pub use confirm::{Confirm, Prompter};
pub use error::CoreError;
pub use pagination::{Page, collect_pages, cursor_present};
pub use wait::{Deadline, PollStatus, WaitConfig, WaitOutcome, wait_until_complete};
