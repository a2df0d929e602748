//! A small MCP server over streamable HTTP that looks up (fake) addresses by zip code
//! and tells the time. Every request is answered with a single JSON body; the server
//! keeps no session state.
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

pub mod rpc;
pub mod tools;

use rpc::{
    failure, success, RpcError, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND, PARSE_ERROR,
};

pub const SERVER_NAME: &str = "remote-address-lookup-server";
pub const SERVER_VERSION: &str = "0.0.1";
pub const INSTRUCTIONS: &str =
    "A remote address lookup server that returns fake addresses for zip codes";
/// Used when the client does not name a protocol version
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// `POST /mcp` carries JSON-RPC; other methods on `/mcp` are refused
pub fn routes() -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let messages = warp::path("mcp")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::bytes())
        .map(|body: Bytes| handle_body(&body));

    // No server-initiated stream and no sessions to delete
    let unsupported = warp::path("mcp")
        .and(warp::path::end())
        .map(|| StatusCode::METHOD_NOT_ALLOWED.into_response());

    messages.or(unsupported).unify()
}

pub fn handle_body(body: &[u8]) -> Response {
    let message: Value = match serde_json::from_slice(body) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable request body");
            let error = RpcError::new(PARSE_ERROR, format!("Parse error: {e}"));
            return warp::reply::json(&failure(&Value::Null, error)).into_response();
        }
    };

    match dispatch(&message) {
        Some(response) => warp::reply::json(&response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Answer one JSON-RPC message; notifications and client responses get no answer
pub fn dispatch(message: &Value) -> Option<Value> {
    let id = message.get("id");
    let Some(method) = message.get("method").and_then(Value::as_str) else {
        if id.is_some() && (message.get("result").is_some() || message.get("error").is_some()) {
            return None;
        }
        let error = RpcError::new(INVALID_REQUEST, "Invalid Request");
        return Some(failure(id.unwrap_or(&Value::Null), error));
    };

    let Some(id) = id else {
        tracing::debug!(method, "Notification received");
        return None;
    };

    tracing::info!(method, %id, "Handling request");
    let params = message.get("params").unwrap_or(&Value::Null);
    let result = match method {
        "initialize" => Ok(initialize(params)),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": tools::list() })),
        "tools/call" => call_tool(params),
        other => Err(RpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        )),
    };

    Some(match result {
        Ok(result) => success(id, result),
        Err(error) => {
            tracing::warn!(method, code = error.code, message = %error.message, "Request failed");
            failure(id, error)
        }
    })
}

fn initialize(params: &Value) -> Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": {"tools": {"listChanged": false}},
        "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
        "instructions": INSTRUCTIONS,
    })
}

fn call_tool(params: &Value) -> Result<Value, RpcError> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::new(INVALID_PARAMS, "Missing tool name"))?;
    let no_arguments = json!({});
    let arguments = params.get("arguments").unwrap_or(&no_arguments);

    let result = tools::call(name, arguments)?;
    tracing::info!(tool = name, is_error = result.is_error, "Tool called");
    serde_json::to_value(result).map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))
}
