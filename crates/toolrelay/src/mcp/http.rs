use anyhow::{anyhow, Result};
use eventsource_stream::Eventsource;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::convert::Infallible;

pub const ACCEPT: &str = "application/json, text/event-stream";
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Decode a JSON-RPC response body, which streamable HTTP servers may send either as
/// plain JSON or as an event stream. For event streams the last event whose data
/// parses as JSON wins.
pub async fn decode_rpc_body(content_type: Option<&str>, body: &str) -> Result<Value> {
    let is_event_stream = content_type
        .map(|ct| ct.starts_with("text/event-stream"))
        .unwrap_or(false);

    if !is_event_stream {
        return serde_json::from_str(body.trim()).map_err(|e| anyhow!("invalid JSON body: {e}"));
    }

    let events: Vec<_> = stream::iter([Ok::<_, Infallible>(body.to_owned())])
        .eventsource()
        .collect()
        .await;

    events
        .into_iter()
        .filter_map(|event| event.ok())
        .filter_map(|event| serde_json::from_str::<Value>(event.data.trim()).ok())
        .last()
        .ok_or_else(|| anyhow!("event stream carried no JSON data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_plain_json() {
        let value = decode_rpc_body(
            Some("application/json"),
            r#"{"jsonrpc":"2.0","id":1,"result":{}}"#,
        )
        .await
        .unwrap();
        assert_eq!(value["id"], 1);
    }

    #[tokio::test]
    async fn test_event_stream_takes_last_data() {
        let body = "event: message\ndata: {\"id\":1,\"result\":\"first\"}\n\ndata: not json\n\ndata: {\"id\":1,\"result\":\"last\"}\n\n";
        let value = decode_rpc_body(Some("text/event-stream; charset=utf-8"), body)
            .await
            .unwrap();
        assert_eq!(value, json!({"id": 1, "result": "last"}));
    }

    #[tokio::test]
    async fn test_event_stream_multiline_data() {
        let body = "id: 7\ndata: {\"id\":1,\ndata: \"result\":{}}\n\n";
        let value = decode_rpc_body(Some("text/event-stream"), body).await.unwrap();
        assert_eq!(value, json!({"id": 1, "result": {}}));
    }

    #[tokio::test]
    async fn test_errors() {
        assert!(decode_rpc_body(None, "<html>").await.is_err());
        assert!(decode_rpc_body(Some("text/event-stream"), ": keepalive\n\n")
            .await
            .is_err());
    }
}
