//! Shared test utilities for awstbx
//!
//! ## Modules
//!
//! - [`aws`]: Per-test resource names and region for live AWS tests
//! - [`files`]: Temporary input files for commands that read JSON from disk

pub mod aws;
pub mod files;

// Re-export commonly used items
pub use aws::{TestRun, live_region};
pub use files::input_file;
