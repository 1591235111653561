use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use trace_core::{
    collect_additional_info, copy_trace_data, distinct_accounts, AccountId, Trace, TraceError,
    TraceId,
};

use crate::cache::SharedSource;
use crate::error::{InspectError, Result};

// ============================================================================
// Protocol Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct InspectParams {
    trace: Trace,
}

#[derive(Debug, Deserialize)]
struct RefreshParams {
    /// Previously inspected version of the trace
    cached: Trace,
    trace: Trace,
}

/// What a client learns about one trace.
#[derive(Debug, Serialize)]
pub struct TraceSummary {
    pub trace_id: TraceId,
    pub in_progress: bool,
    pub progress: f32,
    pub distinct_accounts: Vec<AccountId>,
    pub trace: Trace,
}

// ============================================================================
// Handlers
// ============================================================================

pub struct Inspector {
    source: Option<SharedSource>,
    max_trace_length: usize,
    shutdown: CancellationToken,
}

impl Inspector {
    pub fn new(source: Option<SharedSource>, max_trace_length: usize, shutdown: CancellationToken) -> Self {
        Self {
            source,
            max_trace_length,
            shutdown,
        }
    }

    /// Collect additional info for a trace and summarize it
    pub async fn inspect(&self, trace: Trace) -> Result<TraceSummary> {
        let length = trace.node_count();
        if length > self.max_trace_length {
            tracing::warn!(
                hash = %trace.transaction.hash,
                length = length,
                max = self.max_trace_length,
                "Rejecting trace"
            );
            return Err(TraceError::TraceTooLong.into());
        }

        let cancel = self.shutdown.child_token();
        collect_additional_info(&cancel, self.source.as_deref(), &trace).await?;

        let mut accounts = distinct_accounts(&trace);
        accounts.sort();
        Ok(TraceSummary {
            trace_id: TraceId::from_trace(&trace),
            in_progress: trace.in_progress(),
            progress: trace.calculate_progress(),
            distinct_accounts: accounts,
            trace,
        })
    }

    /// Carry known data over from a cached trace, then inspect the new one
    pub async fn refresh(&self, cached: &Trace, mut trace: Trace) -> Result<TraceSummary> {
        copy_trace_data(cached, &mut trace);
        self.inspect(trace).await
    }
}

/// Decodes `line` without serde_json's nesting limit, growing the stack on
/// demand instead.
fn from_str_unbounded<T: DeserializeOwned>(line: &str) -> serde_json::Result<T> {
    let mut de = serde_json::Deserializer::from_str(line);
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

fn from_value_unbounded<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
    T::deserialize(serde_stacker::Deserializer::new(value))
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    from_value_unbounded(params).map_err(|e| InspectError::InvalidParams(e.to_string()))
}

async fn handle_inspect(inspector: &Inspector, params: Value) -> Result<Value> {
    let params: InspectParams = parse_params(params)?;
    let summary = inspector.inspect(params.trace).await?;
    Ok(serde_json::to_value(summary)?)
}

async fn handle_refresh(inspector: &Inspector, params: Value) -> Result<Value> {
    let params: RefreshParams = parse_params(params)?;
    let summary = inspector.refresh(&params.cached, params.trace).await?;
    Ok(serde_json::to_value(summary)?)
}

fn error_response(id: Value, error: &InspectError) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code: error.code(),
            message: error.to_string(),
        }),
    }
}

/// Answers one line read from the client, including lines that are not a
/// valid request.
pub async fn handle_line(inspector: &Inspector, line: &str) -> JsonRpcResponse {
    let value: Value = match from_str_unbounded(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Error parsing request");
            return error_response(Value::Null, &InspectError::Parse(e.to_string()));
        }
    };

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match from_value_unbounded(value) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "Malformed request");
            return error_response(id, &InspectError::InvalidRequest(e.to_string()));
        }
    };

    tracing::debug!(method = %request.method, "Received request");
    handle_request(inspector, request).await
}

pub async fn handle_request(inspector: &Inspector, request: JsonRpcRequest) -> JsonRpcResponse {
    let outcome = match request.method.as_str() {
        "trace/inspect" => handle_inspect(inspector, request.params).await,
        "trace/refresh" => handle_refresh(inspector, request.params).await,
        _ => {
            return JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {}", request.method),
                }),
            };
        }
    };

    match outcome {
        Ok(result) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(result),
            error: None,
        },
        Err(e) => {
            tracing::warn!(method = %request.method, error = %e, "Request failed");
            error_response(request.id, &e)
        }
    }
}
