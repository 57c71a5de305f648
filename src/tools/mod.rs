//! Tool system - descriptors, registry, and argument validation
//!
//! A tool is a named, schema-validated operation ultimately backed by a
//! local process invocation. Descriptors are immutable once registered.

mod descriptor;
mod registry;
mod system;
mod validate;

pub use descriptor::{ParamSpec, ParamType, ToolAction, ToolDescriptor};
pub use registry::ToolRegistry;
pub use system::register_system_tools;
pub use validate::validate_args;
