//! Registered programs - alias to executable path mapping
//!
//! Loaded once at startup from `[[program]]` entries in the config file
//! and read-only afterwards. Malformed entries fail the load with a
//! diagnostic naming the offending alias.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, XflowError};

/// A single alias to executable path binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredProgram {
    pub alias: String,
    pub path: PathBuf,
}

/// Registry of programs invocable by alias
#[derive(Debug, Clone, Default)]
pub struct ProgramRegistry {
    programs: HashMap<String, RegisteredProgram>,
}

impl ProgramRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration entries
    pub fn from_entries(entries: &[RegisteredProgram]) -> Result<Self> {
        let mut registry = Self::new();
        for entry in entries {
            registry.register(&entry.alias, &entry.path)?;
        }
        Ok(registry)
    }

    /// Register one alias; fails on an empty alias/path or a duplicate
    pub fn register(&mut self, alias: &str, path: &Path) -> Result<()> {
        if alias.is_empty() {
            return Err(XflowError::ProgramConfig("program entry with empty alias".to_string()));
        }
        if path.as_os_str().is_empty() {
            return Err(XflowError::ProgramConfig(format!(
                "program '{alias}' has an empty path"
            )));
        }
        if self.programs.contains_key(alias) {
            return Err(XflowError::ProgramConfig(format!(
                "duplicate program alias: {alias}"
            )));
        }
        self.programs.insert(
            alias.to_string(),
            RegisteredProgram {
                alias: alias.to_string(),
                path: path.to_path_buf(),
            },
        );
        Ok(())
    }

    /// Resolve an alias to its executable path
    pub fn resolve(&self, alias: &str) -> Result<&Path> {
        self.programs
            .get(alias)
            .map(|p| p.path.as_path())
            .ok_or_else(|| XflowError::UnknownProgram(alias.to_string()))
    }

    /// Get a program entry by alias
    pub fn get(&self, alias: &str) -> Option<&RegisteredProgram> {
        self.programs.get(alias)
    }

    /// Iterate all registered programs
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredProgram> {
        self.programs.values()
    }

    /// Number of registered programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(alias: &str, path: &str) -> RegisteredProgram {
        RegisteredProgram {
            alias: alias.to_string(),
            path: PathBuf::from(path),
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ProgramRegistry::new();
        registry.register("gtkwave", Path::new("/usr/bin/gtkwave")).unwrap();

        assert_eq!(registry.resolve("gtkwave").unwrap(), Path::new("/usr/bin/gtkwave"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_alias() {
        let registry = ProgramRegistry::new();
        let err = registry.resolve("vivado").unwrap_err();
        assert!(matches!(err, XflowError::UnknownProgram(_)));
        assert_eq!(err.to_string(), "Unknown program: vivado");
    }

    #[test]
    fn test_from_entries() {
        let registry = ProgramRegistry::from_entries(&[
            entry("vivado", "/opt/Xilinx/Vivado/2024.1/bin/vivado"),
            entry("gtkwave", "/usr/bin/gtkwave"),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("vivado").is_some());
    }

    #[test]
    fn test_duplicate_alias_rejected_with_diagnostic() {
        let err = ProgramRegistry::from_entries(&[
            entry("vivado", "/opt/vivado/bin/vivado"),
            entry("vivado", "/usr/local/bin/vivado"),
        ])
        .unwrap_err();

        assert!(err.to_string().contains("duplicate program alias: vivado"));
    }

    #[test]
    fn test_empty_path_rejected_with_diagnostic() {
        let err = ProgramRegistry::from_entries(&[entry("gtkwave", "")]).unwrap_err();
        assert!(err.to_string().contains("program 'gtkwave' has an empty path"));
    }

    #[test]
    fn test_empty_alias_rejected() {
        let err = ProgramRegistry::from_entries(&[entry("", "/usr/bin/true")]).unwrap_err();
        assert!(err.to_string().contains("empty alias"));
    }

    #[test]
    fn test_iter() {
        let registry = ProgramRegistry::from_entries(&[
            entry("vivado", "/opt/vivado/bin/vivado"),
            entry("gtkwave", "/usr/bin/gtkwave"),
        ])
        .unwrap();

        let aliases: Vec<&str> = registry.iter().map(|p| p.alias.as_str()).collect();
        assert_eq!(aliases.len(), 2);
        assert!(aliases.contains(&"vivado"));
        assert!(aliases.contains(&"gtkwave"));
    }
}
