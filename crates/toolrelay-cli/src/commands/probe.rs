use anyhow::Result;
use console::style;
use std::time::Duration;

use toolrelay::mcp::probe::{probe, ProbeOutcome};

use crate::render;

pub async fn run(server_url: &str, timeout_secs: u64) -> Result<()> {
    println!("Testing MCP server connectivity...");
    let report = probe(server_url, Duration::from_secs(timeout_secs)).await?;

    print_outcome("Base URL", &report.base_url, &report.base);
    print_outcome("MCP endpoint", &report.mcp_url, &report.initialize);

    if let ProbeOutcome::Responded { body, raw, .. } = &report.initialize {
        if let Some(body) = body {
            println!("Server info:");
            render::print_json(body);
        } else if let Some(raw) = raw {
            println!("Response: {raw}");
        }
    }
    Ok(())
}

fn print_outcome(label: &str, url: &str, outcome: &ProbeOutcome) {
    match outcome {
        ProbeOutcome::Responded { status, .. } => println!(
            "{} {} accessible: {} {}",
            if outcome.is_success() {
                style("✓").green()
            } else {
                style("!").yellow()
            },
            label,
            status,
            style(url).dim()
        ),
        ProbeOutcome::Failed(e) => println!(
            "{} {} failed: {} {}",
            style("✗").red(),
            label,
            e,
            style(url).dim()
        ),
    }
}
