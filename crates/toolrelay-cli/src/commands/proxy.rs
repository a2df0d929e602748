use anyhow::Result;
use tokio::io::{stdin, stdout, BufReader};

use toolrelay::mcp::proxy::StdioProxy;

/// Relay until stdin closes or the process is interrupted
pub async fn run(server_url: &str) -> Result<()> {
    let proxy = StdioProxy::new(server_url)?;
    eprintln!("Starting MCP proxy, forwarding to: {server_url}");

    tokio::select! {
        result = proxy.run(BufReader::new(stdin()), stdout()) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, proxy stopping");
            Ok(())
        }
    }
}
