use anyhow::Result;
use cliclack::spinner;
use console::style;

use toolrelay::models::message::{Message, MessageContent};
use toolrelay::models::tool::Tool;
use toolrelay::orchestrator::Orchestrator;

use super::chat::SAMPLE_QUERIES;
use crate::render;
use crate::session;
use crate::{ExchangeArgs, ModelArgs};

/// Run every sample query in order against one connection
pub async fn run(server_url: &str, model: &ModelArgs, exchange: &ExchangeArgs) -> Result<()> {
    let provider = session::provider(model)?;
    let (server, tools) = session::connect(server_url).await?;
    render::render_tools(&tools, false);

    let orchestrator = session::orchestrator(provider, exchange, &server);
    run_samples(&orchestrator, &tools, exchange.max_iterations).await;
    drop(orchestrator);

    session::release(server).await;
    Ok(())
}

/// A failing query is reported and the run moves on to the next one
async fn run_samples(orchestrator: &Orchestrator<'_>, tools: &[Tool], max_iterations: usize) {
    let total = SAMPLE_QUERIES.len();
    let mut failures = 0;

    for (i, query) in SAMPLE_QUERIES.iter().enumerate() {
        println!(
            "{} {}",
            style(format!("[{}/{}]", i + 1, total)).dim(),
            style(query).bold()
        );

        let spin = spinner();
        spin.start("awaiting reply");
        let result = orchestrator.exchange(query, tools, max_iterations).await;
        spin.stop("");

        match result {
            Ok(outcome) => {
                if outcome.rounds > 0 {
                    let failed = failed_tool_calls(&outcome.messages);
                    println!(
                        "{}",
                        style(format!("({} tool rounds, {failed} failed calls)", outcome.rounds)).dim()
                    );
                }
                render::print_markdown(&outcome.text);
                println!("\n");
            }
            Err(e) => {
                failures += 1;
                render::print_error(query, format!("{e:#}"));
            }
        }
    }

    if failures > 0 {
        println!(
            "{}",
            style(format!("{failures} of {total} sample queries failed")).yellow()
        );
    }
}

fn failed_tool_calls(messages: &[Message]) -> usize {
    messages
        .iter()
        .flat_map(|message| &message.content)
        .filter_map(MessageContent::as_tool_response)
        .filter(|response| response.is_error())
        .count()
}
