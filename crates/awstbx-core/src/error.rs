//! Core error type
//!
//! Every variant here is a setup-tier failure: it aborts the whole command.
//! Per-row failures are never errors, they are recorded in the row status.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A paginated listing handed back a cursor it already returned
    #[error("paginator returned duplicate cursor {0:?}")]
    DuplicateCursor(String),

    /// Reading the operator's answer or writing the prompt failed
    #[error("confirmation prompt failed")]
    Confirm(#[source] std::io::Error),

    /// The plan's status column does not exist in one of its rows
    #[error("status column {column} is out of range for row {row} (width {width})")]
    StatusColumnOutOfRange {
        row: usize,
        column: usize,
        width: usize,
    },

    /// A row index passed to a status helper does not exist
    #[error("row index out of bounds: {index} (rows: {len})")]
    RowOutOfBounds { index: usize, len: usize },
}
