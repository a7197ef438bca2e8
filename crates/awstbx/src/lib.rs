//! awstbx: command-line toolbox for listing and cleaning up AWS resources
//!
//! The binary in `main.rs` parses flags, loads AWS configuration and hands
//! off to a function in [`commands`]. Everything those functions share
//! (pagination, the confirm-then-execute action plan, completion polling)
//! lives in the `awstbx-core` crate.

pub mod aws;
pub mod commands;
pub mod config;
pub mod output;
pub mod process;
pub mod runtime;
pub mod tags;
