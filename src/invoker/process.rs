//! Real process invoker backed by tokio subprocesses
//!
//! Captures stdout and stderr fully (not streamed); downstream report
//! consumers need the complete text. Capture runs on dedicated tasks so
//! a slow child never blocks the caller's request handling.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::error::{ErrorKind, Result};
use crate::programs::ProgramRegistry;

use super::{CancelToken, Invocation, Invoke, ProgramRef, RawOutcome};

/// Spawns external processes and captures their output
pub struct ProcessInvoker {
    programs: Arc<ProgramRegistry>,
}

impl ProcessInvoker {
    pub fn new(programs: Arc<ProgramRegistry>) -> Self {
        Self { programs }
    }

    /// Resolve a program reference to the executable that will be spawned
    pub fn resolve(&self, program: &ProgramRef) -> Result<PathBuf> {
        match program {
            ProgramRef::Path(path) => Ok(path.clone()),
            ProgramRef::Alias(alias) => self.programs.resolve(alias).map(|p| p.to_path_buf()),
            ProgramRef::Shell => Ok(PathBuf::from("sh")),
        }
    }

    fn spawn_reader(stream: Option<impl AsyncReadExt + Unpin + Send + 'static>) -> Option<JoinHandle<Vec<u8>>> {
        stream.map(|mut s| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = s.read_to_end(&mut buf).await;
                buf
            })
        })
    }

    async fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
        match reader {
            Some(handle) => String::from_utf8_lossy(&handle.await.unwrap_or_default()).into_owned(),
            None => String::new(),
        }
    }
}

#[async_trait]
impl Invoke for ProcessInvoker {
    async fn invoke(&self, invocation: Invocation, cancel: CancelToken) -> RawOutcome {
        let path = match self.resolve(&invocation.program) {
            Ok(path) => path,
            Err(e) => return RawOutcome::aborted(ErrorKind::UnknownProgram, e.to_string()),
        };

        let mut cmd = Command::new(&path);
        if invocation.program == ProgramRef::Shell {
            cmd.arg("-c");
        }
        cmd.args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        debug!("spawning {} {:?}", path.display(), invocation.args);
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return RawOutcome::aborted(
                    ErrorKind::SpawnFailure,
                    format!("Failed to spawn {}: {}", path.display(), e),
                );
            }
        };

        // Start capture before feeding stdin so a chatty child cannot
        // fill a pipe and deadlock against the write.
        let stdout_reader = Self::spawn_reader(child.stdout.take());
        let stderr_reader = Self::spawn_reader(child.stderr.take());

        if let Some(payload) = &invocation.stdin {
            if let Some(mut sink) = child.stdin.take() {
                if let Err(e) = sink.write_all(payload.as_bytes()).await {
                    // The child may legitimately exit without draining stdin
                    debug!("stdin write ended early: {e}");
                }
            }
        }

        let timed_out = async {
            match invocation.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        enum Waited {
            Done(std::io::Result<std::process::ExitStatus>),
            TimedOut,
            Cancelled,
        }

        let waited = tokio::select! {
            status = child.wait() => Waited::Done(status),
            _ = timed_out => Waited::TimedOut,
            _ = cancel.cancelled() => Waited::Cancelled,
        };

        match waited {
            Waited::Done(Ok(status)) => {
                let stdout = Self::collect(stdout_reader).await;
                let stderr = Self::collect(stderr_reader).await;
                RawOutcome::Completed {
                    stdout,
                    stderr,
                    exit_code: status.code().unwrap_or(-1),
                }
            }
            Waited::Done(Err(e)) => RawOutcome::aborted(
                ErrorKind::SpawnFailure,
                format!("Failed waiting on {}: {}", path.display(), e),
            ),
            Waited::TimedOut => {
                if let Err(e) = child.kill().await {
                    warn!("failed to kill timed-out process {}: {}", path.display(), e);
                }
                let millis = invocation.timeout.map(|t| t.as_millis()).unwrap_or_default();
                RawOutcome::aborted(ErrorKind::Timeout, format!("Process did not finish within {millis}ms"))
            }
            Waited::Cancelled => {
                if let Err(e) = child.kill().await {
                    warn!("failed to kill cancelled process {}: {}", path.display(), e);
                }
                RawOutcome::aborted(ErrorKind::Cancelled, "Cancelled by caller")
            }
        }
    }
}
