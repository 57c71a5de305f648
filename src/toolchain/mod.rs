//! Toolchain tools - Vivado flow steps as registered tools
//!
//! Each flow step is a fixed argument template: validated parameters are
//! interpolated into a Tcl script which runs through the toolchain
//! binary in batch mode. The binary itself is resolved through the
//! program registry under a configurable alias.

pub mod tcl;

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{Map, Value, json};

use crate::error::{Result, XflowError};
use crate::invoker::{Invocation, ProgramRef};
use crate::tools::{ParamType, ToolAction, ToolDescriptor, ToolRegistry};

/// One toolchain flow step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainOp {
    CreateProject,
    OpenProject,
    AddSource,
    RunSynthesis,
    RunImplementation,
    GenerateBitstream,
    ProgramDevice,
    RunSimulation,
    FetchReport,
    RunStatus,
}

/// Settings for building toolchain invocations
#[derive(Debug, Clone)]
pub struct Toolchain {
    alias: String,
    run_timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            alias: "vivado".to_string(),
            // Synthesis and implementation runs are long
            run_timeout: Duration::from_secs(3600),
            working_dir: None,
        }
    }
}

impl Toolchain {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            ..Default::default()
        }
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Alias the toolchain binary is registered under
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Build the invocation for a flow step from validated arguments
    pub fn invocation(&self, op: ToolchainOp, args: &Map<String, Value>) -> Result<Invocation> {
        let script = match op {
            ToolchainOp::CreateProject => tcl::create_project(
                required_str(args, "project_name")?,
                required_str(args, "project_dir")?,
                required_str(args, "part")?,
                opt_str(args, "board"),
            ),
            ToolchainOp::OpenProject => tcl::open_project(required_str(args, "project_path")?),
            ToolchainOp::AddSource => tcl::add_source(
                required_str(args, "project_path")?,
                required_str(args, "file_path")?,
                opt_str(args, "file_type"),
            ),
            ToolchainOp::RunSynthesis => {
                tcl::run_synthesis(required_str(args, "project_path")?, jobs(args))
            }
            ToolchainOp::RunImplementation => {
                tcl::run_implementation(required_str(args, "project_path")?, jobs(args))
            }
            ToolchainOp::GenerateBitstream => tcl::generate_bitstream(
                required_str(args, "project_path")?,
                jobs(args),
                args.get("compress").and_then(Value::as_bool).unwrap_or(false),
            ),
            ToolchainOp::ProgramDevice => tcl::program_device(required_str(args, "bitstream_path")?),
            ToolchainOp::RunSimulation => tcl::run_simulation(
                required_str(args, "project_path")?,
                required_str(args, "testbench")?,
                opt_str(args, "sim_time").unwrap_or("1000ns"),
            ),
            ToolchainOp::FetchReport => {
                let report_type = required_str(args, "report_type")?;
                let command = report_command(report_type)?;
                tcl::fetch_report(required_str(args, "project_path")?, command)
            }
            ToolchainOp::RunStatus => tcl::run_status(
                required_str(args, "project_path")?,
                opt_str(args, "run_name").unwrap_or("synth_1"),
            ),
        };

        let mut invocation = Invocation::new(ProgramRef::Alias(self.alias.clone()))
            .with_args(["-mode", "batch", "-nolog", "-nojournal", "-source", "-"])
            .with_stdin(script)
            .with_timeout(self.run_timeout);
        if let Some(dir) = &self.working_dir {
            invocation = invocation.with_cwd(dir);
        }
        Ok(invocation)
    }
}

fn report_command(report_type: &str) -> Result<&'static str> {
    match report_type {
        "utilization" => Ok("report_utilization"),
        "timing" => Ok("report_timing_summary"),
        "power" => Ok("report_power"),
        other => Err(XflowError::TypeMismatch {
            param: "report_type".to_string(),
            expected: "one of utilization, timing, power".to_string(),
            actual: other.to_string(),
        }),
    }
}

fn required_str<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| XflowError::Internal(format!("validated arguments missing '{name}'")))
}

fn opt_str<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

fn jobs(args: &Map<String, Value>) -> u64 {
    args.get("jobs").and_then(Value::as_u64).unwrap_or(4)
}

/// Register the toolchain flow tools
pub fn register_toolchain_tools(registry: &mut ToolRegistry) -> Result<()> {
    registry.register(
        ToolDescriptor::new(
            "create_project",
            "Create a new toolchain project",
            ToolAction::Toolchain(ToolchainOp::CreateProject),
        )
        .with_required("project_name", ParamType::String, "Project name")
        .with_required("project_dir", ParamType::String, "Directory the project is created in")
        .with_required("part", ParamType::String, "Target device part number")
        .with_optional("board", ParamType::String, "Board part identifier", None)
        .with_project_param("project_dir"),
    )?;

    registry.register(
        ToolDescriptor::new(
            "open_project",
            "Open an existing project and report its state",
            ToolAction::Toolchain(ToolchainOp::OpenProject),
        )
        .with_required("project_path", ParamType::String, "Path to the .xpr project file")
        .with_project_param("project_path"),
    )?;

    registry.register(
        ToolDescriptor::new(
            "add_source",
            "Add a source, constraint, or IP file to a project",
            ToolAction::Toolchain(ToolchainOp::AddSource),
        )
        .with_required("project_path", ParamType::String, "Path to the .xpr project file")
        .with_required("file_path", ParamType::String, "File to add")
        .with_optional("file_type", ParamType::String, "verilog, vhdl, xdc, or ip", None)
        .with_project_param("project_path"),
    )?;

    registry.register(
        ToolDescriptor::new(
            "run_synthesis",
            "Run synthesis on a project",
            ToolAction::Toolchain(ToolchainOp::RunSynthesis),
        )
        .with_required("project_path", ParamType::String, "Path to the .xpr project file")
        .with_optional("jobs", ParamType::Integer, "Parallel jobs", Some(json!(4)))
        .with_project_param("project_path"),
    )?;

    registry.register(
        ToolDescriptor::new(
            "run_implementation",
            "Run implementation (place and route) on a project",
            ToolAction::Toolchain(ToolchainOp::RunImplementation),
        )
        .with_required("project_path", ParamType::String, "Path to the .xpr project file")
        .with_optional("jobs", ParamType::Integer, "Parallel jobs", Some(json!(4)))
        .with_project_param("project_path"),
    )?;

    registry.register(
        ToolDescriptor::new(
            "generate_bitstream",
            "Generate the bitstream for an implemented project",
            ToolAction::Toolchain(ToolchainOp::GenerateBitstream),
        )
        .with_required("project_path", ParamType::String, "Path to the .xpr project file")
        .with_optional("jobs", ParamType::Integer, "Parallel jobs", Some(json!(4)))
        .with_optional("compress", ParamType::Boolean, "Compress the bitstream", Some(json!(false)))
        .with_project_param("project_path"),
    )?;

    registry.register(
        ToolDescriptor::new(
            "program_device",
            "Program a bitstream onto the connected device",
            ToolAction::Toolchain(ToolchainOp::ProgramDevice),
        )
        .with_required("bitstream_path", ParamType::String, "Path to the .bit file")
        .with_timeout(300_000),
    )?;

    registry.register(
        ToolDescriptor::new(
            "run_simulation",
            "Run behavioral simulation with the given testbench",
            ToolAction::Toolchain(ToolchainOp::RunSimulation),
        )
        .with_required("project_path", ParamType::String, "Path to the .xpr project file")
        .with_required("testbench", ParamType::String, "Top module of the testbench")
        .with_optional("sim_time", ParamType::String, "Simulation time, e.g. 1000ns", Some(json!("1000ns")))
        .with_project_param("project_path"),
    )?;

    registry.register(
        ToolDescriptor::new(
            "fetch_report",
            "Print a utilization, timing, or power report",
            ToolAction::Toolchain(ToolchainOp::FetchReport),
        )
        .with_required("project_path", ParamType::String, "Path to the .xpr project file")
        .with_required("report_type", ParamType::String, "utilization, timing, or power")
        .with_project_param("project_path")
        .with_nonzero_ok()
        .with_timeout(600_000),
    )?;

    registry.register(
        ToolDescriptor::new(
            "run_status",
            "Query the status of a synthesis or implementation run",
            ToolAction::Toolchain(ToolchainOp::RunStatus),
        )
        .with_required("project_path", ParamType::String, "Path to the .xpr project file")
        .with_optional("run_name", ParamType::String, "Run to query", Some(json!("synth_1")))
        .with_project_param("project_path")
        .with_timeout(600_000),
    )?;

    Ok(())
}
