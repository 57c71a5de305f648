//! Result formatting - the ExecutionResult envelope
//!
//! Every invocation, success or failure, is shaped into one envelope
//! before it reaches the caller. Oversized output is capped so chat
//! transcripts and GUIs never receive unbounded payloads.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::invoker::RawOutcome;

/// Default output cap: 1 MiB per stream
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Per-tool formatting policy
#[derive(Debug, Clone)]
pub struct OutputPolicy {
    /// Byte cap applied to stdout and stderr independently
    pub max_output_bytes: usize,
    /// Treat a non-zero exit code as success
    pub nonzero_ok: bool,
}

impl Default for OutputPolicy {
    fn default() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            nonzero_ok: false,
        }
    }
}

/// The structured envelope returned for every tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// Present whenever the process actually ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Human-readable reason accompanying any failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub truncated: bool,
}

impl ExecutionResult {
    /// A failure that never produced a process, so no exit code
    pub fn failure(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            error_kind: Some(kind),
            reason: Some(reason.into()),
            truncated: false,
        }
    }
}

/// Shape a raw invocation outcome into the result envelope
pub fn format_outcome(outcome: RawOutcome, policy: &OutputPolicy) -> ExecutionResult {
    match outcome {
        RawOutcome::Completed { stdout, stderr, exit_code } => {
            let (stdout, out_cut) = truncate_to(stdout, policy.max_output_bytes);
            let (stderr, err_cut) = truncate_to(stderr, policy.max_output_bytes);
            let truncated = out_cut || err_cut;

            if exit_code == 0 || policy.nonzero_ok {
                ExecutionResult {
                    success: true,
                    stdout,
                    stderr,
                    exit_code: Some(exit_code),
                    error_kind: None,
                    reason: None,
                    truncated,
                }
            } else {
                ExecutionResult {
                    success: false,
                    stdout,
                    stderr,
                    exit_code: Some(exit_code),
                    error_kind: Some(ErrorKind::NonZeroExit),
                    reason: Some(format!("Process exited with code {exit_code}")),
                    truncated,
                }
            }
        }
        RawOutcome::Aborted { kind, reason } => ExecutionResult::failure(kind, reason),
    }
}

/// Cap a string at `cap` bytes, backing up to a character boundary
fn truncate_to(mut s: String, cap: usize) -> (String, bool) {
    if s.len() <= cap {
        return (s, false);
    }
    let mut end = cap;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    (s, true)
}
