//! Argument validation against a tool's declared parameter schema
//!
//! Validation is pure: it inspects the request arguments and the
//! descriptor, nothing else. Failures here never reach the invoker.

use serde_json::{Map, Value};

use crate::error::{Result, XflowError};

use super::descriptor::ToolDescriptor;

/// Validate request arguments against a descriptor.
///
/// Returns the effective argument map: declared parameters only, with
/// defaults merged for absent optionals. Undeclared arguments are
/// dropped silently so older callers keep working against newer tools.
pub fn validate_args(tool: &ToolDescriptor, arguments: &Map<String, Value>) -> Result<Map<String, Value>> {
    let mut effective = Map::new();

    for (name, spec) in &tool.params {
        match arguments.get(name) {
            Some(value) => {
                if !spec.param_type.matches(value) {
                    return Err(XflowError::TypeMismatch {
                        param: name.clone(),
                        expected: spec.param_type.name().to_string(),
                        actual: json_type_name(value).to_string(),
                    });
                }
                effective.insert(name.clone(), value.clone());
            }
            None if spec.required => {
                return Err(XflowError::MissingParameter(name.clone()));
            }
            None => {
                if let Some(default) = &spec.default {
                    effective.insert(name.clone(), default.clone());
                }
            }
        }
    }

    Ok(effective)
}

/// Human-readable name of a JSON value's type
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
