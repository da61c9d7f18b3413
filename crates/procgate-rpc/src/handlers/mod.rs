//! JSON-RPC request handlers.

mod process;

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use procgate_core::{ProcgateApi, ProcgateError, ServiceConfig, ToolResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

// ============================================================================
// Parameter extraction helpers
// ============================================================================

fn lookup<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a Value> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .filter(|v| !v.is_null())
}

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    lookup(params, snake, camel).and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
pub(crate) fn require_str_param(
    params: &Value,
    snake: &str,
    camel: &str,
) -> procgate_core::Result<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| ProcgateError::InvalidParams {
            message: format!("Missing required parameter: {}", snake),
        })
}

/// Extract a required non-negative integer parameter bounded by `max`.
pub(crate) fn require_uint_param(
    params: &Value,
    snake: &str,
    camel: &str,
    max: u64,
) -> procgate_core::Result<u64> {
    let value = lookup(params, snake, camel).ok_or_else(|| ProcgateError::InvalidParams {
        message: format!("Missing required parameter: {}", snake),
    })?;
    match value.as_u64() {
        Some(n) if n <= max => Ok(n),
        _ => Err(ProcgateError::InvalidParams {
            message: format!("Parameter {} must be an integer between 0 and {}", snake, max),
        }),
    }
}

/// Run an API call on the blocking pool and serialize its response.
pub(crate) async fn run_blocking<F>(state: &AppState, op: F) -> procgate_core::Result<Value>
where
    F: FnOnce(&ProcgateApi) -> ToolResponse + Send + 'static,
{
    let api = Arc::clone(&state.api);
    let response = tokio::task::spawn_blocking(move || op(api.as_ref()))
        .await
        .map_err(|e| ProcgateError::Other(format!("Blocking task failed: {}", e)))?;
    Ok(serde_json::to_value(response)?)
}

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": ServiceConfig::SERVICE_NAME}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(id, json!({"status": "ok"}))),
        );
    }

    match dispatch_method(&state, method, &params).await {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            let code = e.to_rpc_error_code();
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(id, code, e.to_string())),
            )
        }
    }
}

// ============================================================================
// Method dispatcher
// ============================================================================

async fn dispatch_method(
    state: &AppState,
    method: &str,
    params: &Value,
) -> procgate_core::Result<Value> {
    match method {
        "list_processes" => process::list_processes(state, params).await,
        "find_processes" => process::find_processes(state, params).await,
        "get_process_info" => process::get_process_info(state, params).await,
        "terminate_process" => process::terminate_process(state, params).await,
        "get_process_by_port" => process::get_process_by_port(state, params).await,
        "get_user_info" => process::get_user_info(state, params).await,

        _ => {
            warn!("Method not found: {}", method);
            Err(ProcgateError::MethodNotFound {
                method: method.to_string(),
            })
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
