use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::rpc::{
    CallToolParams, IncomingMessage, InitializeResult, JsonRpcResponse, ListToolsResult, RequestId,
    RpcError, ServerCapabilities, ServerInfo, ToolsCapability, JSONRPC_VERSION,
    MCP_PROTOCOL_VERSION,
};
use crate::tools;
use crate::AppState;

pub const SERVICE_NAME: &str = "va";

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// JSON-RPC endpoint. Every POST is self-contained; there is no session.
pub async fn mcp(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let message: IncomingMessage = match serde_json::from_slice::<Value>(&body) {
        Err(e) => return reply(RequestId::Null, Err(RpcError::Parse(e.to_string()))),
        Ok(value) => match serde_json::from_value(value) {
            Ok(message) => message,
            Err(e) => return reply(RequestId::Null, Err(RpcError::InvalidRequest(e.to_string()))),
        },
    };

    if message.jsonrpc != JSONRPC_VERSION {
        let id = message.id.unwrap_or(RequestId::Null);
        return reply(
            id,
            Err(RpcError::InvalidRequest(format!(
                "unsupported jsonrpc version '{}'",
                message.jsonrpc
            ))),
        );
    }

    if message.is_notification() {
        debug!(method = %message.method, "Notification received");
        return StatusCode::ACCEPTED.into_response();
    }

    let id = message.id.clone().unwrap_or(RequestId::Null);
    let result = route(&state, &message.method, message.params).await;
    reply(id, result)
}

async fn route(state: &AppState, method: &str, params: Value) -> Result<Value, RpcError> {
    debug!(method = %method, "Handling request");
    match method {
        "initialize" => to_value(InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: SERVICE_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }),
        "ping" => Ok(json!({})),
        "tools/list" => to_value(ListToolsResult {
            tools: tools::list_tools(),
        }),
        "tools/call" => {
            let params: CallToolParams = serde_json::from_value(params)
                .map_err(|e| RpcError::InvalidParams(format!("Invalid tools/call params: {}", e)))?;
            let arguments = params
                .arguments
                .unwrap_or_else(|| Value::Object(Default::default()));
            match tools::call_tool(state, &params.name, arguments).await {
                Some(result) => to_value(result),
                None => Err(RpcError::InvalidParams(format!("Unknown tool: {}", params.name))),
            }
        }
        other => Err(RpcError::MethodNotFound(other.to_string())),
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Internal(e.to_string()))
}

fn reply(id: RequestId, result: Result<Value, RpcError>) -> Response {
    let response = match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(err) => JsonRpcResponse::failure(id, err),
    };
    Json(response).into_response()
}
