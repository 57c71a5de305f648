//! xflow - a tool-dispatch boundary for a local FPGA toolchain
//!
//! xflow maps named, schema-validated tools onto external process
//! invocations: Vivado batch flows, programs registered by alias, and
//! shell commands. The dispatcher serializes requests per project
//! resource and converts every fault into a well-formed result envelope.

pub mod dispatch;
pub mod error;
pub mod format;
pub mod id;
pub mod invoker;
pub mod programs;
pub mod toolchain;
pub mod tools;

pub use error::{Result, XflowError};
