//! CLI module for the deckhand planning tool.
//!
//! This module provides the command-line interface for validating
//! configuration and inspecting plans.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use output::OutputFormatter;
