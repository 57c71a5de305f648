//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "xflow", about = "Dispatch validated tool requests to a local FPGA toolchain", version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered tools and their parameters
    Tools {
        /// Emit the tool schemas as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// List registered programs
    Programs,
    /// Dispatch a single tool request and print the result envelope
    Call {
        /// Tool name
        tool: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
        /// Request identifier, used for fault correlation
        #[arg(long)]
        request_id: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_tools() {
        let cli = Cli::try_parse_from(["xflow", "tools"]).unwrap();
        assert!(matches!(cli.command, Commands::Tools { json: false }));
        assert!(!cli.is_verbose());
    }

    #[test]
    fn test_cli_parses_tools_json() {
        let cli = Cli::try_parse_from(["xflow", "tools", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Tools { json: true }));
    }

    #[test]
    fn test_cli_parses_call_with_args() {
        let cli = Cli::try_parse_from([
            "xflow",
            "call",
            "run_synthesis",
            "--args",
            r#"{"project_path": "/work/p.xpr"}"#,
        ])
        .unwrap();

        match cli.command {
            Commands::Call { tool, args, request_id } => {
                assert_eq!(tool, "run_synthesis");
                assert!(args.contains("project_path"));
                assert!(request_id.is_none());
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_call_args_default_to_empty_object() {
        let cli = Cli::try_parse_from(["xflow", "call", "tools_status"]).unwrap();
        match cli.command {
            Commands::Call { args, .. } => assert_eq!(args, "{}"),
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from(["xflow", "--verbose", "--config", "/etc/xflow.toml", "programs"]).unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/etc/xflow.toml")));
        assert!(matches!(cli.command, Commands::Programs));
    }
}
