//! Tool descriptors and parameter specifications
//!
//! A descriptor binds a tool name to its parameter schema and the action
//! that turns validated arguments into a process invocation.

use std::collections::HashMap;

use serde_json::{Map, Value, json};

use crate::toolchain::ToolchainOp;

/// Declared type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Name used in schemas and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Check whether a JSON value satisfies this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// Specification of a single tool parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    /// Applied when an optional parameter is absent from the request
    pub default: Option<Value>,
}

/// The capability a tool dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAction {
    /// A fixed toolchain flow step, argument template filled from params
    Toolchain(ToolchainOp),
    /// A registered program, alias taken from the `program` argument
    Program,
    /// An arbitrary shell command, taken from the `command` argument
    Shell,
}

/// An immutable tool definition
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// Tool name, unique within a registry
    pub name: String,
    /// Human-readable description advertised to callers
    pub description: String,
    /// Parameter name to specification
    pub params: HashMap<String, ParamSpec>,
    /// What execution the tool maps to
    pub action: ToolAction,
    /// Treat a non-zero exit code as success (report-query tools)
    pub nonzero_ok: bool,
    /// Parameter whose value identifies the project resource for locking
    pub project_param: Option<String>,
    /// Timeout in milliseconds; the dispatcher's default applies if unset
    pub timeout_ms: Option<u64>,
}

impl ToolDescriptor {
    /// Create a descriptor with no parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>, action: ToolAction) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: HashMap::new(),
            action,
            nonzero_ok: false,
            project_param: None,
            timeout_ms: None,
        }
    }

    /// Declare a required parameter
    pub fn with_required(mut self, name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        self.params.insert(
            name.into(),
            ParamSpec {
                param_type,
                description: description.into(),
                required: true,
                default: None,
            },
        );
        self
    }

    /// Declare an optional parameter with an optional default
    pub fn with_optional(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
        default: Option<Value>,
    ) -> Self {
        self.params.insert(
            name.into(),
            ParamSpec {
                param_type,
                description: description.into(),
                required: false,
                default,
            },
        );
        self
    }

    /// Treat non-zero exit codes as success
    pub fn with_nonzero_ok(mut self) -> Self {
        self.nonzero_ok = true;
        self
    }

    /// Name the parameter that identifies the project resource
    pub fn with_project_param(mut self, param: impl Into<String>) -> Self {
        self.project_param = Some(param.into());
        self
    }

    /// Set the execution timeout
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// JSON schema advertised to callers
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required: Vec<&str> = Vec::new();
        for (name, spec) in &self.params {
            let mut prop = Map::new();
            prop.insert("type".to_string(), Value::String(spec.param_type.name().to_string()));
            prop.insert("description".to_string(), Value::String(spec.description.clone()));
            if let Some(default) = &spec.default {
                prop.insert("default".to_string(), default.clone());
            }
            properties.insert(name.clone(), Value::Object(prop));
            if spec.required {
                required.push(name.as_str());
            }
        }
        required.sort();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
