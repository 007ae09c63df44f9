//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the memories binary.

mod commands;
mod files;

pub use commands::Cli;
pub use files::{build_manager, handle_command};
