//! Tool call dispatch.
//!
//! Bridges untyped, model-issued call requests to the typed tool methods in
//! the registry. Every failure mode is folded into a [`ToolResult`] that
//! travels back through the conversation; nothing here can take down the
//! turn loop.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::schema::{ParamKind, ToolSpec};
use crate::tools::{Arguments, ToolRegistry};
use crate::types::{CallErrorKind, ToolCall, ToolResult};

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    /// Wall-clock deadline per invocation, imposed on the orchestrator's
    /// behalf. The registry and tools themselves are timeout-free.
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve, validate, and invoke a single call request.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let handle = match self.registry.get(&call.name) {
            Some(h) => h,
            None => {
                warn!("Unknown tool requested: {}", call.name);
                return ToolResult::error(
                    &call.id,
                    CallErrorKind::UnknownTool,
                    format!("no tool named '{}'", call.name),
                );
            }
        };

        let args = match validate_arguments(&handle.spec, &call.arguments) {
            Ok(args) => args,
            Err(message) => {
                warn!("Invalid arguments for {}: {}", call.name, message);
                return ToolResult::error(&call.id, CallErrorKind::InvalidArguments, message);
            }
        };

        debug!("Invoking tool {}", call.name);
        let invocation = handle.invoke(&args);
        let outcome = match self.timeout {
            Some(deadline) => match tokio::time::timeout(deadline, invocation).await {
                Ok(result) => result,
                Err(_) => {
                    return ToolResult::error(
                        &call.id,
                        CallErrorKind::ExecutionFailed,
                        format!("tool '{}' timed out after {:?}", call.name, deadline),
                    );
                }
            },
            None => invocation.await,
        };

        match outcome {
            Ok(value) => ToolResult::ok(&call.id, value),
            Err(e) => {
                warn!("Tool {} failed: {:#}", call.name, e);
                ToolResult::error(&call.id, CallErrorKind::ExecutionFailed, e.to_string())
            }
        }
    }

    /// Dispatch every call of one round concurrently. Each call is
    /// independent data over the read-only registry, so the invocations
    /// run in parallel; the returned results match the request order
    /// regardless of completion order.
    pub async fn dispatch_round(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.dispatch(call))).await
    }
}

// ---------------------------------------------------------------------------
// Validation and coercion
// ---------------------------------------------------------------------------

/// Check the supplied arguments against the declared parameters and coerce
/// compatible representations. Pure: the same spec and payload always yield
/// the same outcome. Unknown extra arguments are ignored, tolerating model
/// over-generation; the error message names the first failing parameter.
pub fn validate_arguments(spec: &ToolSpec, arguments: &Value) -> Result<Arguments, String> {
    let empty = serde_json::Map::new();
    let supplied = match arguments {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(format!(
                "arguments must be an object, got {}",
                json_kind(other)
            ))
        }
    };

    let mut validated = Arguments::new();
    for param in &spec.parameters {
        match supplied.get(&param.name) {
            Some(value) => {
                let coerced = coerce(param.kind, value).ok_or_else(|| {
                    format!(
                        "parameter '{}' expects {}, got {}",
                        param.name,
                        param.kind,
                        json_kind(value)
                    )
                })?;
                validated.insert(param.name.clone(), coerced);
            }
            None if param.required => {
                return Err(format!("missing required parameter '{}'", param.name));
            }
            None => {}
        }
    }
    Ok(validated)
}

/// One-shot, deterministic coercion of a value to the declared kind.
/// Returns `None` when the value cannot represent the kind.
fn coerce(kind: ParamKind, value: &Value) -> Option<Value> {
    match (kind, value) {
        (ParamKind::String, Value::String(_)) => Some(value.clone()),
        (ParamKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ParamKind::Boolean, Value::String(s)) => match s.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        (ParamKind::Integer, Value::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                Some(value.clone())
            } else {
                // Whole-valued floats are representational, not semantic.
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    Some(Value::Number(serde_json::Number::from(f as i64)))
                } else {
                    None
                }
            }
        }
        (ParamKind::Integer, Value::String(s)) => {
            s.trim().parse::<i64>().ok().map(|n| Value::Number(n.into()))
        }
        (ParamKind::Number, Value::Number(_)) => Some(value.clone()),
        (ParamKind::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        (ParamKind::Array, Value::Array(_)) => Some(value.clone()),
        (ParamKind::Object, Value::Object(_)) => Some(value.clone()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
