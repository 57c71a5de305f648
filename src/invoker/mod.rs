//! Process invocation - the boundary to external programs
//!
//! The `Invoke` trait lets the dispatcher run against a real process
//! spawner in production and a recording mock in tests.

mod process;

pub use process::ProcessInvoker;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::ErrorKind;

/// Reference to the program an invocation runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramRef {
    /// An explicit executable path
    Path(PathBuf),
    /// A program registered by alias in configuration
    Alias(String),
    /// The shell; the first argument is the command line
    Shell,
}

/// A fully-specified external process invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: ProgramRef,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Payload written to the child's stdin, then closed
    pub stdin: Option<String>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: ProgramRef) -> Self {
        Self {
            program,
            args: Vec::new(),
            cwd: None,
            stdin: None,
            timeout: None,
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Raw outcome of one invocation, before formatting
#[derive(Debug, Clone)]
pub enum RawOutcome {
    /// The process ran to completion; the exit code may be non-zero
    Completed {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },
    /// The process never ran or was stopped before completion
    Aborted { kind: ErrorKind, reason: String },
}

impl RawOutcome {
    pub fn aborted(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self::Aborted {
            kind,
            reason: reason.into(),
        }
    }
}

/// Handle for cancelling one in-flight invocation.
///
/// A cancellation requested before the invoker starts waiting is not
/// lost; the notify permit is stored.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the associated invocation
    pub fn cancel(&self) {
        self.notify.notify_one();
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        self.notify.notified().await;
    }
}

/// Executes invocations against external processes
#[async_trait]
pub trait Invoke: Send + Sync {
    /// Run the invocation to completion, capturing all output.
    ///
    /// Every failure mode is data in the outcome; this never returns a
    /// Rust error.
    async fn invoke(&self, invocation: Invocation, cancel: CancelToken) -> RawOutcome;
}
