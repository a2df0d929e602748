use anyhow::{anyhow, Context, Result};
use reqwest::header::{ACCEPT as ACCEPT_HEADER, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use super::http::{decode_rpc_body, ACCEPT, SESSION_HEADER};

pub const PROXY_TIMEOUT: Duration = Duration::from_secs(30);

pub const PARSE_ERROR: i64 = -32700;
pub const INTERNAL_ERROR: i64 = -32603;

/// Relays newline-delimited JSON-RPC from a stdio host to a streamable HTTP endpoint
pub struct StdioProxy {
    target_url: String,
    client: Client,
    session_id: Mutex<Option<String>>,
}

impl StdioProxy {
    pub fn new(target_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(target_url, PROXY_TIMEOUT)
    }

    pub fn with_timeout(target_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            target_url: target_url.into(),
            client,
            session_id: Mutex::new(None),
        })
    }

    /// Forward every line of `input` until EOF, writing one response line per reply
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(target_url = %self.target_url, "Starting stdio proxy");

        let mut lines = input.lines();
        let mut count = 0usize;
        while let Some(line) = lines.next_line().await.context("error reading stdin")? {
            if line.trim().is_empty() {
                continue;
            }
            count += 1;
            tracing::debug!(message = count, raw = %line, "Received from stdin");

            if let Some(response) = self.handle_line(&line).await {
                let mut encoded = serde_json::to_string(&response)?;
                encoded.push('\n');
                output.write_all(encoded.as_bytes()).await?;
                output.flush().await?;
            }
        }

        tracing::info!(messages = count, "Stdin closed, proxy stopping");
        Ok(())
    }

    /// Produce the line to write back for one input line, if any
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let request: Value = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid JSON from stdin");
                return Some(error_response(None, PARSE_ERROR, &format!("Parse error: {e}")));
            }
        };

        match self.forward(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to forward request");
                Some(error_response(
                    request.get("id"),
                    INTERNAL_ERROR,
                    &format!("Internal error: {e:#}"),
                ))
            }
        }
    }

    async fn forward(&self, request: &Value) -> Result<Option<Value>> {
        let mut builder = self
            .client
            .post(&self.target_url)
            .header(ACCEPT_HEADER, ACCEPT)
            .json(request);
        if let Some(session) = self.session_id.lock().await.as_deref() {
            builder = builder.header(SESSION_HEADER, session);
        }

        let started = std::time::Instant::now();
        let response = builder.send().await.context("HTTP request failed")?;
        let status = response.status();
        tracing::debug!(elapsed = ?started.elapsed(), %status, "HTTP response received");

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().await = Some(session.to_string());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await.context("failed to read response")?;

        if body.trim().is_empty() {
            if status.is_success() {
                // Accepted notification or response, nothing to relay
                return Ok(None);
            }
            return Err(anyhow!("server returned {status} with an empty body"));
        }

        decode_rpc_body(content_type.as_deref(), &body)
            .await
            .map(Some)
            .with_context(|| format!("failed to parse response from server ({status})"))
    }
}

fn error_response(id: Option<&Value>, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id.cloned().unwrap_or(Value::Null),
        "error": {"code": code, "message": message},
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn output_lines(output: Vec<u8>) -> Vec<Value> {
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_relays_requests_and_session() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "initialize"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Mcp-Session-Id", "session-1")
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {"protocolVersion": "2024-11-05"}})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "notifications/initialized"})))
            .and(header("Mcp-Session-Id", "session-1"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "tools/list"})))
            .and(header("Mcp-Session-Id", "session-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    "data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"tools\":[]}}\n\n",
                    "text/event-stream",
                ),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let proxy = StdioProxy::new(format!("{}/mcp", mock_server.uri()))?;
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let mut output = Vec::new();
        proxy.run(Cursor::new(input.as_bytes()), &mut output).await?;

        let lines = output_lines(output);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(lines[1]["result"]["tools"], json!([]));
        Ok(())
    }

    #[tokio::test]
    async fn test_parse_error_response() -> Result<()> {
        let proxy = StdioProxy::new("http://127.0.0.1:9/mcp")?;
        let mut output = Vec::new();
        proxy
            .run(Cursor::new(b"{not json\n".as_slice()), &mut output)
            .await?;

        let lines = output_lines(output);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["error"]["code"], PARSE_ERROR);
        assert!(lines[0]["id"].is_null());
        assert!(lines[0]["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Parse error"));
        Ok(())
    }

    #[tokio::test]
    async fn test_forward_failure_keeps_request_id() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let proxy = StdioProxy::new(mock_server.uri())?;
        let response = proxy
            .handle_line(r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#)
            .await
            .unwrap();

        assert_eq!(response["id"], "abc");
        assert_eq!(response["error"]["code"], INTERNAL_ERROR);
        Ok(())
    }
}
