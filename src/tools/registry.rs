//! Tool registry - append-only name to descriptor mapping
//!
//! Built once at process start from static registration calls; never
//! mutated afterwards. Iteration preserves registration order so the
//! advertised capability list is stable.

use std::collections::HashMap;

use crate::error::{Result, XflowError};

use super::descriptor::ToolDescriptor;

/// Registry of tool descriptors
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor; fails if the name is already taken
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        if self.index.contains_key(&descriptor.name) {
            return Err(XflowError::Registry(format!(
                "duplicate tool registration: {}",
                descriptor.name
            )));
        }
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    /// Get a descriptor by name
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Get a descriptor by name, or an UnknownTool error
    pub fn lookup(&self, name: &str) -> Result<&ToolDescriptor> {
        self.get(name)
            .ok_or_else(|| XflowError::UnknownTool(name.to_string()))
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// List tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamType, ToolAction};

    fn shell_tool(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, format!("{name} tool"), ToolAction::Shell)
            .with_required("command", ParamType::String, "Shell command")
    }

    #[test]
    fn test_registry_new_empty() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_and_lookup_exact() {
        let mut registry = ToolRegistry::new();
        let tool = shell_tool("run_command").with_timeout(120_000);
        registry.register(tool).unwrap();

        let found = registry.lookup("run_command").unwrap();
        assert_eq!(found.name, "run_command");
        assert_eq!(found.description, "run_command tool");
        assert_eq!(found.timeout_ms, Some(120_000));
        assert!(found.params.contains_key("command"));
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(shell_tool("run_command")).unwrap();

        let err = registry.register(shell_tool("run_command")).unwrap_err();
        assert!(err.to_string().contains("duplicate tool registration: run_command"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("nonexistent").unwrap_err();
        assert!(matches!(err, XflowError::UnknownTool(_)));
        assert_eq!(err.to_string(), "Unknown tool: nonexistent");
    }

    #[test]
    fn test_get_nonexistent() {
        let registry = ToolRegistry::new();
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_contains() {
        let mut registry = ToolRegistry::new();
        registry.register(shell_tool("run_command")).unwrap();
        assert!(registry.contains("run_command"));
        assert!(!registry.contains("run_simulation"));
    }

    #[test]
    fn test_iter_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["charlie", "alpha", "bravo"] {
            registry.register(shell_tool(name)).unwrap();
        }

        let names: Vec<&str> = registry.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["charlie", "alpha", "bravo"]);
        assert_eq!(registry.names(), vec!["charlie", "alpha", "bravo"]);
    }

    #[test]
    fn test_iter_restartable() {
        let mut registry = ToolRegistry::new();
        registry.register(shell_tool("one")).unwrap();
        registry.register(shell_tool("two")).unwrap();

        assert_eq!(registry.iter().count(), 2);
        // A fresh iterator starts over
        assert_eq!(registry.iter().count(), 2);
    }
}
