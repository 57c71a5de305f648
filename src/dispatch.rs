//! Request dispatch - the fault boundary between callers and processes
//!
//! The dispatcher sequences lookup, validation, locking, execution, and
//! formatting. Callers always get a well-formed ExecutionResult back;
//! internal faults surface as InternalFault with a correlation id and
//! nothing else.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::{ErrorKind, Result, XflowError};
use crate::format::{DEFAULT_MAX_OUTPUT_BYTES, ExecutionResult, OutputPolicy, format_outcome};
use crate::id::generate_request_id;
use crate::invoker::{CancelToken, Invocation, Invoke, ProgramRef};
use crate::toolchain::Toolchain;
use crate::tools::{ToolAction, ToolDescriptor, ToolRegistry, validate_args};

/// What happens when a request targets a busy project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum QueuePolicy {
    /// Return Busy immediately
    Reject,
    /// Wait for the in-flight request, up to the configured bound
    #[default]
    Wait,
}

/// One tool invocation request
#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Caller-chosen identifier, used to cancel the request in flight
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ToolRequest {
    /// Build a request from a tool name and a JSON object of arguments
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            arguments,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Dispatches tool requests to the invoker
pub struct Dispatcher {
    registry: ToolRegistry,
    invoker: Arc<dyn Invoke>,
    toolchain: Toolchain,
    queue_policy: QueuePolicy,
    wait_timeout: Duration,
    max_output_bytes: usize,
    /// Per-project mutual exclusion; entries live for the process lifetime
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Cancel handles for requests currently executing
    inflight: Mutex<HashMap<String, CancelToken>>,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, invoker: Arc<dyn Invoke>) -> Self {
        Self {
            registry,
            invoker,
            toolchain: Toolchain::default(),
            queue_policy: QueuePolicy::default(),
            wait_timeout: Duration::from_secs(600),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            locks: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    pub fn with_queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.queue_policy = policy;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_max_output(mut self, max_bytes: usize) -> Self {
        self.max_output_bytes = max_bytes;
        self
    }

    /// The registry, for advertising capabilities to callers
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Dispatch one request to completion.
    ///
    /// Never returns a raw error: every fault becomes a well-formed
    /// ExecutionResult.
    pub async fn dispatch(&self, request: ToolRequest) -> ExecutionResult {
        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(generate_request_id);
        info!("dispatch [{}] tool={}", request_id, request.name);

        match self.run(&request_id, request).await {
            Ok(result) => result,
            Err(err) => self.fault(&request_id, err),
        }
    }

    /// Cancel an in-flight request by its identifier.
    ///
    /// Returns false if no request with that id is executing.
    pub async fn cancel(&self, request_id: &str) -> bool {
        match self.inflight.lock().await.get(request_id) {
            Some(token) => {
                info!("cancel requested [{}]", request_id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    async fn run(&self, request_id: &str, request: ToolRequest) -> Result<ExecutionResult> {
        // Received: unknown tools fail before anything else happens
        let tool = self.registry.lookup(&request.name)?;

        // Validated: bad arguments never reach the invoker
        let args = validate_args(tool, &request.arguments)?;

        let invocation = self.build_invocation(tool, &args)?;

        // Serialize per project resource; unrelated requests proceed
        let _guard = match project_key(tool, &args) {
            Some(key) => Some(self.acquire(key).await?),
            None => None,
        };

        // Executing: run on its own task so a panic in the execution
        // path cannot tear down the caller
        let cancel = CancelToken::new();
        self.inflight
            .lock()
            .await
            .insert(request_id.to_string(), cancel.clone());

        let invoker = Arc::clone(&self.invoker);
        let handle = tokio::spawn(async move { invoker.invoke(invocation, cancel).await });
        let joined = handle.await;
        self.inflight.lock().await.remove(request_id);

        let outcome = joined.map_err(|e| XflowError::Internal(format!("execution task failed: {e}")))?;

        // Completed
        let policy = OutputPolicy {
            max_output_bytes: self.max_output_bytes,
            nonzero_ok: tool.nonzero_ok,
        };
        Ok(format_outcome(outcome, &policy))
    }

    /// Turn the tool's action binding and validated arguments into an
    /// invocation
    fn build_invocation(&self, tool: &ToolDescriptor, args: &Map<String, Value>) -> Result<Invocation> {
        let mut invocation = match tool.action {
            ToolAction::Toolchain(op) => self.toolchain.invocation(op, args)?,
            ToolAction::Program => {
                let alias = args
                    .get("program")
                    .and_then(Value::as_str)
                    .ok_or_else(|| XflowError::Internal("validated arguments missing 'program'".to_string()))?;
                let arguments: Vec<String> = args
                    .get("arguments")
                    .and_then(Value::as_array)
                    .map(|values| values.iter().map(argument_string).collect())
                    .unwrap_or_default();
                let mut inv = Invocation::new(ProgramRef::Alias(alias.to_string())).with_args(arguments);
                if let Some(dir) = args.get("working_dir").and_then(Value::as_str) {
                    inv = inv.with_cwd(dir);
                }
                inv
            }
            ToolAction::Shell => {
                let command = args
                    .get("command")
                    .and_then(Value::as_str)
                    .ok_or_else(|| XflowError::Internal("validated arguments missing 'command'".to_string()))?;
                let mut inv = Invocation::new(ProgramRef::Shell).with_arg(command);
                if let Some(dir) = args.get("working_dir").and_then(Value::as_str) {
                    inv = inv.with_cwd(dir);
                }
                inv
            }
        };

        if let Some(timeout_ms) = tool.timeout_ms {
            invocation = invocation.with_timeout(Duration::from_millis(timeout_ms));
        }
        Ok(invocation)
    }

    /// Take the lock for a project resource according to the queue policy
    async fn acquire(&self, key: String) -> Result<tokio::sync::OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        match self.queue_policy {
            QueuePolicy::Reject => lock
                .try_lock_owned()
                .map_err(|_| XflowError::Busy(key)),
            QueuePolicy::Wait => tokio::time::timeout(self.wait_timeout, lock.lock_owned())
                .await
                .map_err(|_| XflowError::Busy(key)),
        }
    }

    /// Convert any error into the caller-facing envelope.
    ///
    /// Validation and lookup errors carry their own reason; everything
    /// else is reported as InternalFault with only the correlation id.
    fn fault(&self, request_id: &str, err: XflowError) -> ExecutionResult {
        let kind = err.kind();
        if kind == ErrorKind::InternalFault {
            error!("internal fault [{}]: {}", request_id, err);
            ExecutionResult::failure(kind, format!("Internal fault, correlation id {request_id}"))
        } else {
            warn!("dispatch failed [{}]: {}", request_id, err);
            ExecutionResult::failure(kind, err.to_string())
        }
    }
}

/// Value of the argument that identifies the project resource, if any
fn project_key(tool: &ToolDescriptor, args: &Map<String, Value>) -> Option<String> {
    tool.project_param
        .as_ref()
        .and_then(|param| args.get(param))
        .and_then(Value::as_str)
        .map(String::from)
}

/// Render one element of an `arguments` array as a command-line string
fn argument_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
