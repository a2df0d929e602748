use anyhow::Result;
use console::style;
use futures::StreamExt;

use toolrelay::models::tool::Tool;
use toolrelay::orchestrator::{ExchangeEvent, Orchestrator};

use crate::prompt::{Busy, Input, RustylinePrompt};
use crate::render;
use crate::session;
use crate::{ExchangeArgs, ModelArgs};

pub const SAMPLE_QUERIES: &[&str] = &[
    "What tools do you have available?",
    "Look up the address for zip code 10001",
    "Can you find addresses for zip codes 90210 and 94102?",
    "What's the address for Beverly Hills zip code 90210?",
    "Look up multiple zip codes: 10001, 60601, and 30301",
];

pub async fn run(
    server_url: &str,
    model: &ModelArgs,
    exchange: &ExchangeArgs,
    query: Option<String>,
) -> Result<()> {
    let provider = session::provider(model)?;
    let (server, tools) = session::connect(server_url).await?;

    let orchestrator = session::orchestrator(provider, exchange, &server);
    let result = match query {
        Some(query) => {
            process(&orchestrator, &query, &tools, exchange.max_iterations).await;
            Ok(())
        }
        None => interactive(&orchestrator, &tools, exchange.max_iterations).await,
    };
    drop(orchestrator);

    session::release(server).await;
    result
}

async fn interactive(
    orchestrator: &Orchestrator<'_>,
    tools: &[Tool],
    max_iterations: usize,
) -> Result<()> {
    render::render_tools(tools, false);

    println!("Sample queries you can try:");
    for (i, query) in SAMPLE_QUERIES.iter().enumerate() {
        println!("  {}. {}", i + 1, query);
    }
    println!(
        "\n{}\n",
        style("Type \"quit\" to exit. Ctrl+C abandons a running query.").dim()
    );

    let mut prompt = RustylinePrompt::new()?;
    loop {
        match prompt.get_input()? {
            Input::Message(text) => process(orchestrator, &text, tools, max_iterations).await,
            Input::AskAgain => continue,
            Input::Exit => break,
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Run one exchange, rendering it as it streams. Errors are reported, not returned,
/// so an interactive session survives them.
async fn process(
    orchestrator: &Orchestrator<'_>,
    query: &str,
    tools: &[Tool],
    max_iterations: usize,
) {
    let mut busy = Busy::new();
    busy.show("awaiting reply");

    let mut stream = orchestrator.reply(query, tools, max_iterations);
    loop {
        tokio::select! {
            event = stream.next() => {
                busy.hide();
                match event {
                    Some(Ok(event)) => {
                        render::render_event(&event);
                        if waits_for_more(&event) {
                            busy.show("awaiting reply");
                        }
                    }
                    Some(Err(e)) => {
                        render::print_error("Query failed", format!("{e:#}"));
                        break;
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                busy.hide();
                println!("{}", style("Interrupted: abandoning this query.").yellow());
                break;
            }
        }
    }
    println!();
}

fn waits_for_more(event: &ExchangeEvent) -> bool {
    match event {
        ExchangeEvent::Assistant { message, stop_reason } => {
            stop_reason.is_tool_use() && !message.tool_requests().is_empty()
        }
        ExchangeEvent::ToolResult(_) => true,
        ExchangeEvent::LimitReached { .. } => false,
    }
}
