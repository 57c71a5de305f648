//! End-to-end dispatch integration tests
//!
//! Exercises the full path caller -> dispatcher -> validator -> process
//! invoker -> formatter against real shell processes.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::TempDir;

use xflow::dispatch::{Dispatcher, QueuePolicy, ToolRequest};
use xflow::error::ErrorKind;
use xflow::invoker::ProcessInvoker;
use xflow::programs::ProgramRegistry;
use xflow::toolchain::register_toolchain_tools;
use xflow::tools::{ParamType, ToolAction, ToolDescriptor, ToolRegistry, register_system_tools};

fn full_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_toolchain_tools(&mut registry).unwrap();
    register_system_tools(&mut registry).unwrap();
    registry
}

fn dispatcher_with(registry: ToolRegistry, programs: ProgramRegistry) -> Dispatcher {
    let programs = Arc::new(programs);
    let invoker = Arc::new(ProcessInvoker::new(programs));
    Dispatcher::new(registry, invoker)
}

/// A shell-backed tool bound to a project resource, with a short timeout
fn project_tool(name: &str, timeout_ms: u64) -> ToolDescriptor {
    ToolDescriptor::new(name, "Project-bound shell tool", ToolAction::Shell)
        .with_required("command", ParamType::String, "Shell command")
        .with_required("project_path", ParamType::String, "Project file")
        .with_project_param("project_path")
        .with_timeout(timeout_ms)
}

#[test]
fn test_registry_advertises_all_toolchain_subcommands() {
    let registry = full_registry();
    for name in [
        "create_project",
        "open_project",
        "add_source",
        "run_synthesis",
        "run_implementation",
        "generate_bitstream",
        "program_device",
        "run_simulation",
        "fetch_report",
        "run_status",
        "run_program",
        "run_command",
    ] {
        assert!(registry.contains(name), "missing tool {name}");
    }
}

#[tokio::test]
async fn test_run_command_end_to_end() {
    let dispatcher = dispatcher_with(full_registry(), ProgramRegistry::new());

    let result = dispatcher
        .dispatch(ToolRequest::new("run_command", json!({"command": "echo OK"})))
        .await;

    assert!(result.success);
    assert_eq!(result.stdout.trim(), "OK");
    assert_eq!(result.exit_code, Some(0));
    assert!(result.error_kind.is_none());
}

#[tokio::test]
async fn test_unknown_tool_end_to_end() {
    let dispatcher = dispatcher_with(full_registry(), ProgramRegistry::new());

    let result = dispatcher.dispatch(ToolRequest::new("melt_fpga", json!({}))).await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::UnknownTool));
    assert!(result.exit_code.is_none());
}

#[tokio::test]
async fn test_missing_parameter_end_to_end() {
    let dispatcher = dispatcher_with(full_registry(), ProgramRegistry::new());

    let result = dispatcher
        .dispatch(ToolRequest::new("run_synthesis", json!({"jobs": 8})))
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::MissingParameter));
    assert_eq!(result.reason.as_deref(), Some("Missing required parameter: project_path"));
}

#[tokio::test]
async fn test_nonzero_exit_reported_with_exit_code() {
    let dispatcher = dispatcher_with(full_registry(), ProgramRegistry::new());

    let result = dispatcher
        .dispatch(ToolRequest::new("run_command", json!({"command": "echo failing; exit 5"})))
        .await;

    assert!(!result.success);
    assert_eq!(result.exit_code, Some(5));
    assert_eq!(result.error_kind, Some(ErrorKind::NonZeroExit));
    assert_eq!(result.stdout.trim(), "failing");
}

#[tokio::test]
async fn test_timeout_bounded() {
    let mut registry = ToolRegistry::new();
    registry.register(project_tool("slow_step", 100)).unwrap();
    let dispatcher = dispatcher_with(registry, ProgramRegistry::new());

    let started = Instant::now();
    let result = dispatcher
        .dispatch(ToolRequest::new(
            "slow_step",
            json!({"command": "sleep 10", "project_path": "/work/p.xpr"}),
        ))
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
    assert!(started.elapsed() < Duration::from_millis(250));
}

#[tokio::test]
async fn test_cancellation_end_to_end() {
    let dispatcher = Arc::new(dispatcher_with(full_registry(), ProgramRegistry::new()));

    let pending = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            dispatcher
                .dispatch(
                    ToolRequest::new("run_command", json!({"command": "sleep 10"}))
                        .with_request_id("req-cancel-me"),
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(dispatcher.cancel("req-cancel-me").await);

    let result = pending.await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Cancelled));
}

#[tokio::test]
async fn test_program_alias_round_trip() {
    let mut programs = ProgramRegistry::new();
    programs.register("shell", Path::new("/bin/sh")).unwrap();
    let dispatcher = dispatcher_with(full_registry(), programs);

    let result = dispatcher
        .dispatch(ToolRequest::new(
            "run_program",
            json!({"program": "shell", "arguments": ["-c", "echo via-alias"]}),
        ))
        .await;

    assert!(result.success);
    assert_eq!(result.stdout.trim(), "via-alias");
}

#[tokio::test]
async fn test_unregistered_alias_end_to_end() {
    let dispatcher = dispatcher_with(full_registry(), ProgramRegistry::new());

    let result = dispatcher
        .dispatch(ToolRequest::new("run_program", json!({"program": "gtkwave"})))
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::UnknownProgram));
    assert!(result.reason.as_deref().unwrap().contains("gtkwave"));
}

#[tokio::test]
async fn test_output_truncation_end_to_end() {
    let mut programs = ProgramRegistry::new();
    programs.register("shell", Path::new("/bin/sh")).unwrap();
    let invoker = Arc::new(ProcessInvoker::new(Arc::new(programs)));
    let dispatcher = Dispatcher::new(full_registry(), invoker).with_max_output(64);

    let result = dispatcher
        .dispatch(ToolRequest::new(
            "run_command",
            json!({"command": "for i in $(seq 1 200); do echo line $i; done"}),
        ))
        .await;

    assert!(result.success);
    assert!(result.truncated);
    assert_eq!(result.stdout.len(), 64);
}

#[tokio::test]
async fn test_wait_policy_serializes_real_processes() {
    let mut registry = ToolRegistry::new();
    registry.register(project_tool("flow_step", 5_000)).unwrap();
    let dispatcher = Arc::new(
        dispatcher_with(registry, ProgramRegistry::new()).with_queue_policy(QueuePolicy::Wait),
    );

    let dir = TempDir::new().unwrap();
    let counter = dir.path().join("active");
    // Each run records overlap by failing if the marker already exists
    let command = format!(
        "test ! -e {marker} && touch {marker} && sleep 0.15 && rm {marker}",
        marker = counter.display()
    );

    let args = json!({"command": command, "project_path": "/work/p.xpr"});
    let started = Instant::now();
    let (first, second) = tokio::join!(
        dispatcher.dispatch(ToolRequest::new("flow_step", args.clone())),
        dispatcher.dispatch(ToolRequest::new("flow_step", args.clone())),
    );

    // Overlap would have failed one of the runs with a non-zero exit
    assert!(first.success, "first run overlapped: {:?}", first.reason);
    assert!(second.success, "second run overlapped: {:?}", second.reason);
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_reject_policy_returns_busy_immediately() {
    let mut registry = ToolRegistry::new();
    registry.register(project_tool("flow_step", 5_000)).unwrap();
    let dispatcher = Arc::new(
        dispatcher_with(registry, ProgramRegistry::new()).with_queue_policy(QueuePolicy::Reject),
    );

    let args = json!({"command": "sleep 0.5", "project_path": "/work/p.xpr"});
    let first = {
        let dispatcher = Arc::clone(&dispatcher);
        let args = args.clone();
        tokio::spawn(async move { dispatcher.dispatch(ToolRequest::new("flow_step", args)).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = dispatcher.dispatch(ToolRequest::new("flow_step", args)).await;
    assert!(!second.success);
    assert_eq!(second.error_kind, Some(ErrorKind::Busy));

    assert!(first.await.unwrap().success);
}

/// A stand-in toolchain binary that echoes the Tcl script it receives
fn fake_vivado(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("vivado");
    std::fs::write(&path, "#!/bin/sh\ncat -\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn test_toolchain_flow_reaches_registered_binary() {
    let dir = TempDir::new().unwrap();
    let vivado = fake_vivado(dir.path());

    let mut programs = ProgramRegistry::new();
    programs.register("vivado", &vivado).unwrap();
    let dispatcher = dispatcher_with(full_registry(), programs);

    let result = dispatcher
        .dispatch(ToolRequest::new(
            "run_status",
            json!({"project_path": "/work/blinky/blinky.xpr"}),
        ))
        .await;

    assert!(result.success, "fake toolchain run failed: {:?}", result.reason);
    // The fake binary echoes the script fed over stdin
    assert!(result.stdout.contains("open_project {/work/blinky/blinky.xpr}"));
    assert!(result.stdout.contains("get_property STATUS [get_runs {synth_1}]"));
}

#[tokio::test]
async fn test_synthesis_template_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let vivado = fake_vivado(dir.path());

    let mut programs = ProgramRegistry::new();
    programs.register("vivado", &vivado).unwrap();
    let dispatcher = dispatcher_with(full_registry(), programs);

    let result = dispatcher
        .dispatch(ToolRequest::new("run_synthesis", json!({"project_path": "/work/p.xpr"})))
        .await;

    assert!(result.success);
    assert!(result.stdout.contains("launch_runs synth_1 -jobs 4"));
    assert!(result.stdout.contains("wait_on_run synth_1"));
}
