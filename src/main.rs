use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

use xflow::dispatch::{Dispatcher, ToolRequest};
use xflow::invoker::ProcessInvoker;
use xflow::programs::ProgramRegistry;
use xflow::toolchain::{Toolchain, register_toolchain_tools};
use xflow::tools::{ToolRegistry, register_system_tools};

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Results go to stdout; logs go to a file under the data dir
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("xflow")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("xflow.log");
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_registry() -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_toolchain_tools(&mut registry)?;
    register_system_tools(&mut registry)?;
    Ok(registry)
}

fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let registry = build_registry()?;
    let programs = Arc::new(ProgramRegistry::from_entries(&config.programs)?);
    let invoker = Arc::new(ProcessInvoker::new(Arc::clone(&programs)));

    let mut toolchain = Toolchain::new(config.toolchain.alias.as_str())
        .with_run_timeout(Duration::from_millis(config.toolchain.run_timeout_ms));
    if let Some(dir) = &config.toolchain.working_dir {
        toolchain = toolchain.with_working_dir(dir);
    }

    Ok(Dispatcher::new(registry, invoker)
        .with_toolchain(toolchain)
        .with_queue_policy(config.dispatch.queue_policy)
        .with_wait_timeout(Duration::from_millis(config.dispatch.wait_timeout_ms))
        .with_max_output(config.output.max_output_bytes))
}

fn print_tools_json(registry: &ToolRegistry) -> Result<()> {
    let schemas: Vec<serde_json::Value> = registry
        .iter()
        .map(|tool| {
            serde_json::json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.input_schema(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(())
}

fn print_tools(registry: &ToolRegistry) {
    for tool in registry.iter() {
        println!("{}  {}", tool.name.cyan().bold(), tool.description);
        let mut params: Vec<_> = tool.params.iter().collect();
        params.sort_by_key(|(name, _)| name.as_str());
        for (name, spec) in params {
            let requirement = if spec.required { "required" } else { "optional" };
            println!("    {} ({}, {})  {}", name.yellow(), spec.param_type.name(), requirement, spec.description);
        }
    }
}

fn print_programs(programs: &ProgramRegistry) {
    if programs.is_empty() {
        println!("{}", "No programs registered".yellow());
        return;
    }
    for program in programs.iter() {
        let status = if program.path.exists() {
            "ok".green()
        } else {
            "missing".red()
        };
        println!("{}  {}  [{}]", program.alias.cyan().bold(), program.path.display(), status);
    }
}

async fn run_call(config: &Config, tool: String, args: String, request_id: Option<String>) -> Result<bool> {
    let arguments: serde_json::Value =
        serde_json::from_str(&args).context("--args must be valid JSON")?;
    eyre::ensure!(arguments.is_object(), "--args must be a JSON object");

    let dispatcher = build_dispatcher(config)?;
    let mut request = ToolRequest::new(tool, arguments);
    if let Some(id) = request_id {
        request = request.with_request_id(id);
    }

    let result = dispatcher.dispatch(request).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.success)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    setup_logging(config.log_level.as_deref())?;

    if cli.is_verbose() {
        println!("{}", format!("Config: {}", cli.config.clone().unwrap_or_else(Config::default_path).display()).yellow());
    }

    match cli.command {
        Commands::Tools { json } => {
            let registry = build_registry()?;
            if json {
                print_tools_json(&registry)?;
            } else {
                print_tools(&registry);
            }
        }
        Commands::Programs => {
            let programs = ProgramRegistry::from_entries(&config.programs)?;
            print_programs(&programs);
        }
        Commands::Call { tool, args, request_id } => {
            let success = run_call(&config, tool, args, request_id).await?;
            if !success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
