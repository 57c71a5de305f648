use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use xflow::dispatch::QueuePolicy;
use xflow::programs::RegisteredProgram;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub dispatch: DispatchConfig,
    pub output: OutputConfig,
    pub toolchain: ToolchainConfig,
    /// `[[program]]` entries: alias to executable path
    #[serde(rename = "program")]
    pub programs: Vec<RegisteredProgram>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub queue_policy: QueuePolicy,
    pub wait_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_policy: QueuePolicy::Wait,
            wait_timeout_ms: 600_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub max_output_bytes: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: xflow::format::DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Alias the toolchain binary is registered under
    pub alias: String,
    pub run_timeout_ms: u64,
    pub working_dir: Option<PathBuf>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            alias: "vivado".to_string(),
            run_timeout_ms: 3_600_000,
            working_dir: None,
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults when no file exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("xflow")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dispatch.queue_policy, QueuePolicy::Wait);
        assert_eq!(config.dispatch.wait_timeout_ms, 600_000);
        assert_eq!(config.output.max_output_bytes, 1024 * 1024);
        assert_eq!(config.toolchain.alias, "vivado");
        assert_eq!(config.toolchain.run_timeout_ms, 3_600_000);
        assert!(config.programs.is_empty());
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
log_level = "debug"

[dispatch]
queue_policy = "reject"
wait_timeout_ms = 30000

[output]
max_output_bytes = 65536

[toolchain]
alias = "vivado-2024"
run_timeout_ms = 7200000
working_dir = "/work/fpga"

[[program]]
alias = "vivado-2024"
path = "/opt/Xilinx/Vivado/2024.1/bin/vivado"

[[program]]
alias = "gtkwave"
path = "/usr/bin/gtkwave"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.dispatch.queue_policy, QueuePolicy::Reject);
        assert_eq!(config.dispatch.wait_timeout_ms, 30_000);
        assert_eq!(config.output.max_output_bytes, 65_536);
        assert_eq!(config.toolchain.alias, "vivado-2024");
        assert_eq!(config.toolchain.working_dir.as_deref(), Some(Path::new("/work/fpga")));
        assert_eq!(config.programs.len(), 2);
        assert_eq!(config.programs[1].alias, "gtkwave");
    }

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config: Config = toml::from_str("[dispatch]\nqueue_policy = \"reject\"\n").unwrap();
        assert_eq!(config.dispatch.queue_policy, QueuePolicy::Reject);
        // Untouched sections fall back to defaults
        assert_eq!(config.dispatch.wait_timeout_ms, 600_000);
        assert_eq!(config.toolchain.alias, "vivado");
    }

    #[test]
    fn test_parse_invalid_config_fails() {
        assert!(toml::from_str::<Config>("dispatch = \"nope\"").is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.toolchain.alias, "vivado");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[toolchain]\nalias = \"vivado-lab\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.toolchain.alias, "vivado-lab");
    }
}
