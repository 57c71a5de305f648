//! System tools - registered-program and shell command execution
//!
//! These are the non-toolchain tools: `run_program` dispatches to a
//! program registered by alias in configuration, `run_command` is the
//! most permissive tool and hands its argument to the shell.

use serde_json::json;

use crate::error::Result;

use super::descriptor::{ParamType, ToolAction, ToolDescriptor};
use super::registry::ToolRegistry;

/// Register `run_program` and `run_command`
pub fn register_system_tools(registry: &mut ToolRegistry) -> Result<()> {
    registry.register(
        ToolDescriptor::new(
            "run_program",
            "Run a local program registered by alias in the configuration",
            ToolAction::Program,
        )
        .with_required("program", ParamType::String, "Alias of a registered program")
        .with_optional("arguments", ParamType::Array, "Command-line arguments", Some(json!([])))
        .with_optional("working_dir", ParamType::String, "Working directory", None)
        .with_timeout(300_000),
    )?;

    registry.register(
        ToolDescriptor::new("run_command", "Run a shell command", ToolAction::Shell)
            .with_required("command", ParamType::String, "Shell command to execute")
            .with_optional("working_dir", ParamType::String, "Working directory", None)
            .with_timeout(120_000),
    )?;

    Ok(())
}
