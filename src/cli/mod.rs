//! CLI module for xflow - command-line interface and subcommands.
//!
//! Front-ends (chat, GUI, remote callers) speak to the dispatcher
//! programmatically; this CLI is the thin local caller.

pub mod commands;

pub use commands::Cli;
