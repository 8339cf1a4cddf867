//! Command-line interface for cratedigger.
//!
//! Thin layer over the core: every subcommand resolves the active store,
//! calls one core operation, and prints a structured result. No core
//! behavior depends on stdout formatting or process exit codes.

mod commands;

pub use commands::{run_command, Cli, Commands};
