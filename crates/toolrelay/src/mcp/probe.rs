use anyhow::{Context, Result};
use reqwest::header::{ACCEPT as ACCEPT_HEADER, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::http::{decode_rpc_body, ACCEPT};

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const PROBE_PROTOCOL_VERSION: &str = "2024-11-05";

/// Outcome of one leg of the probe
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The server answered; `body` is the decoded JSON on success, else the raw text
    Responded { status: u16, body: Option<Value>, raw: Option<String> },
    Failed(String),
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Responded { status, .. } if *status == 200)
    }
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub base_url: String,
    pub base: ProbeOutcome,
    pub mcp_url: String,
    pub initialize: ProbeOutcome,
}

/// Check that an MCP endpoint is reachable without going through an MCP client
///
/// Requests the server root, then sends a bare `initialize` request to the endpoint.
/// Failures on either leg are recorded in the report.
pub async fn probe(server_url: &str, timeout: Duration) -> Result<ProbeReport> {
    let mcp_url = Url::parse(server_url).with_context(|| format!("invalid server url: {server_url}"))?;
    let mut base_url = mcp_url.clone();
    base_url.set_path("");
    base_url.set_query(None);

    let client = Client::builder().timeout(timeout).build()?;

    let base = match client.get(base_url.as_str()).send().await {
        Ok(response) => ProbeOutcome::Responded {
            status: response.status().as_u16(),
            body: None,
            raw: None,
        },
        Err(e) => ProbeOutcome::Failed(e.to_string()),
    };
    tracing::debug!(url = %base_url, ?base, "Probed base url");

    let initialize = probe_initialize(&client, mcp_url.as_str()).await;
    tracing::debug!(url = %mcp_url, ?initialize, "Probed initialize");

    Ok(ProbeReport {
        base_url: base_url.to_string(),
        base,
        mcp_url: mcp_url.to_string(),
        initialize,
    })
}

fn initialize_request() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": PROBE_PROTOCOL_VERSION,
            "capabilities": {"tools": {}, "resources": {}, "prompts": {}},
            "clientInfo": {"name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION")}
        }
    })
}

async fn probe_initialize(client: &Client, url: &str) -> ProbeOutcome {
    let response = match client
        .post(url)
        .header(ACCEPT_HEADER, ACCEPT)
        .json(&initialize_request())
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return ProbeOutcome::Failed(e.to_string()),
    };

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return ProbeOutcome::Failed(e.to_string()),
    };

    if status == 200 {
        match decode_rpc_body(content_type.as_deref(), &text).await {
            Ok(body) => ProbeOutcome::Responded { status, body: Some(body), raw: None },
            Err(_) => ProbeOutcome::Responded { status, body: None, raw: Some(text) },
        }
    } else {
        ProbeOutcome::Responded { status, body: None, raw: Some(text) }
    }
}
