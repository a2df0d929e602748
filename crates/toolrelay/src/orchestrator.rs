//! Tool call loop between a chat-completion provider and a tool server.
//!
//! One exchange starts from a single user message and alternates model calls with tool
//! invocations until the model stops asking for tools:
//! 1. Send the history and tool catalog to the provider
//! 2. If the model stopped for `tool_use`, invoke every requested tool in order and append
//!    one result turn per request
//! 3. Repeat until the model ends its turn or the round limit is hit
//!
//! Tool failures are relayed to the model as error results. Provider failures end the
//! exchange and are returned to the caller.

use anyhow::{anyhow, Result};
use futures::stream::BoxStream;
use futures::TryStreamExt;

use crate::models::message::{Message, ToolRequest};
use crate::models::role::Role;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, ProviderResponse, StopReason};
use crate::tools::ToolServer;

/// Default bound on tool rounds per exchange
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Progress of an exchange, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeEvent {
    /// A model response and the reason generation stopped
    Assistant {
        message: Message,
        stop_reason: StopReason,
    },
    /// The result of one tool invocation, recorded as a user turn
    ToolResult(Message),
    /// The model still wanted tools after the last permitted round
    LimitReached { rounds: usize },
}

/// Outcome of a completed exchange
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Full history, starting with the user message
    pub messages: Vec<Message>,
    /// Text blocks of the final model response
    pub text: String,
    /// Number of tool rounds executed
    pub rounds: usize,
    pub stop_reason: StopReason,
    pub limit_reached: bool,
}

/// Drives the multi-turn exchange that lets the model use remote tools
pub struct Orchestrator<'a> {
    provider: Box<dyn Provider>,
    tools: &'a dyn ToolServer,
    system_prompt: String,
}

impl<'a> Orchestrator<'a> {
    pub fn new(provider: Box<dyn Provider>, tools: &'a dyn ToolServer) -> Self {
        Self {
            provider,
            tools,
            system_prompt: String::new(),
        }
    }

    pub fn with_system_prompt<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Run one exchange and return the final text
    pub async fn run(
        &self,
        user_message: &str,
        catalog: &[Tool],
        max_iterations: usize,
    ) -> Result<String> {
        Ok(self.exchange(user_message, catalog, max_iterations).await?.text)
    }

    /// Run one exchange and keep the whole history
    pub async fn exchange(
        &self,
        user_message: &str,
        catalog: &[Tool],
        max_iterations: usize,
    ) -> Result<Exchange> {
        let initial = Message::user().with_text(user_message);
        let mut messages = vec![initial.clone()];
        let mut last_response: Option<(Message, StopReason)> = None;
        let mut responses = 0;
        let mut limit_reached = false;

        let mut stream = self.reply_to(initial, catalog, max_iterations);
        while let Some(event) = stream.try_next().await? {
            match event {
                ExchangeEvent::Assistant {
                    message,
                    stop_reason,
                } => {
                    responses += 1;
                    messages.push(message.clone());
                    last_response = Some((message, stop_reason));
                }
                ExchangeEvent::ToolResult(message) => messages.push(message),
                ExchangeEvent::LimitReached { .. } => limit_reached = true,
            }
        }

        let (last, stop_reason) =
            last_response.ok_or_else(|| anyhow!("The model returned no response"))?;

        let mut text = last.text();
        if text.is_empty() && limit_reached {
            // Fall back to the latest assistant text rather than returning nothing
            text = messages
                .iter()
                .rev()
                .filter(|message| message.role == Role::Assistant)
                .map(Message::text)
                .find(|text| !text.is_empty())
                .unwrap_or_default();
        }

        Ok(Exchange {
            messages,
            text,
            rounds: responses - 1,
            stop_reason,
            limit_reached,
        })
    }

    /// Stream the exchange as it happens: every model response, every tool result turn,
    /// and a final marker if the round limit cut it short.
    pub fn reply<'b>(
        &'b self,
        user_message: &str,
        catalog: &'b [Tool],
        max_iterations: usize,
    ) -> BoxStream<'b, Result<ExchangeEvent>> {
        self.reply_to(Message::user().with_text(user_message), catalog, max_iterations)
    }

    fn reply_to<'b>(
        &'b self,
        initial: Message,
        catalog: &'b [Tool],
        max_iterations: usize,
    ) -> BoxStream<'b, Result<ExchangeEvent>> {
        let mut messages = vec![initial];

        Box::pin(async_stream::try_stream! {
            let mut rounds = 0;
            loop {
                let ProviderResponse { message, stop_reason, usage } = self
                    .provider
                    .complete(&self.system_prompt, &messages, catalog)
                    .await?;

                let requests: Vec<ToolRequest> =
                    message.tool_requests().into_iter().cloned().collect();
                let wants_tools = stop_reason.is_tool_use() && !requests.is_empty();

                tracing::info!(
                    round = rounds + 1,
                    stop_reason = %stop_reason,
                    tool_requests = requests.len(),
                    output_tokens = ?usage.output_tokens,
                    "Model responded"
                );

                messages.push(message.clone());
                yield ExchangeEvent::Assistant { message, stop_reason };

                if !wants_tools {
                    break;
                }
                if rounds >= max_iterations {
                    tracing::warn!(
                        rounds,
                        max_iterations,
                        "Model still requesting tools at the round limit"
                    );
                    yield ExchangeEvent::LimitReached { rounds };
                    break;
                }

                // Requests are served one at a time, in the order the model emitted them
                for request in requests {
                    tracing::info!(
                        server = self.tools.name(),
                        tool = %request.tool_call.name,
                        id = %request.id,
                        "Invoking tool"
                    );
                    let result = self.tools.call_tool(request.tool_call).await;
                    if let Err(e) = &result {
                        tracing::warn!(id = %request.id, error = %e, "Tool invocation failed");
                    }

                    let turn = Message::user().with_tool_response(request.id, result);
                    messages.push(turn.clone());
                    yield ExchangeEvent::ToolResult(turn);
                }
                rounds += 1;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ToolError, ToolResult};
    use crate::models::content::Content;
    use crate::models::message::MessageContent;
    use crate::models::tool::ToolCall;
    use crate::providers::mock::MockProvider;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    // Mock tool server for testing
    struct MockToolServer {
        tools: Vec<Tool>,
        calls: Mutex<Vec<ToolCall>>,
    }

    impl MockToolServer {
        fn new() -> Self {
            Self {
                tools: vec![
                    Tool::new(
                        "remote_address_lookup",
                        "Find an address by his zip code",
                        json!({"type": "object", "properties": {"zip_code": {"type": "string"}}, "required": ["zip_code"]}),
                    ),
                    Tool::new("explode", "Always fails", json!({"type": "object"})),
                ],
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<ToolCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolServer for MockToolServer {
        fn name(&self) -> &str {
            "mock"
        }

        async fn list_tools(&self) -> Result<Vec<Tool>> {
            Ok(self.tools.clone())
        }

        async fn call_tool(&self, tool_call: ToolCall) -> ToolResult<Vec<Content>> {
            self.calls.lock().unwrap().push(tool_call.clone());
            match tool_call.name.as_str() {
                "remote_address_lookup" => {
                    let zip = tool_call.arguments["zip_code"].as_str().unwrap_or("");
                    Ok(vec![Content::text(format!(
                        "Address found for zip code {zip}: 5954A Bartonsville Road"
                    ))])
                }
                "explode" => Err(ToolError::ExecutionError("kaboom".to_string())),
                _ => Err(ToolError::ToolNotFound(tool_call.name)),
            }
        }
    }

    fn lookup(id: &str, zip: &str) -> Message {
        Message::assistant().with_tool_request(
            id,
            ToolCall::new("remote_address_lookup", json!({"zip_code": zip})),
        )
    }

    #[tokio::test]
    async fn test_simple_response_calls_provider_once() -> Result<()> {
        let provider = MockProvider::new(vec![Message::assistant()
            .with_text("Hello")
            .with_text(", world")]);
        let server = MockToolServer::new();
        let orchestrator = Orchestrator::new(Box::new(provider.clone()), &server);

        let text = orchestrator.run("Hi", &server.tools, 5).await?;

        assert_eq!(text, "Hello, world");
        assert_eq!(provider.call_count(), 1);
        assert!(server.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_address_lookup_round_trip() -> Result<()> {
        let provider = MockProvider::new(vec![
            lookup("toolu_1", "10001"),
            Message::assistant().with_text("The address is 5954A Bartonsville Road."),
        ]);
        let server = MockToolServer::new();
        let orchestrator = Orchestrator::new(Box::new(provider.clone()), &server);

        let exchange = orchestrator
            .exchange("What is the address for zip 10001?", &server.tools, 5)
            .await?;

        assert_eq!(exchange.text, "The address is 5954A Bartonsville Road.");
        assert_eq!(exchange.rounds, 1);
        assert_eq!(exchange.stop_reason, StopReason::EndTurn);
        assert!(!exchange.limit_reached);
        assert_eq!(server.calls(), vec![ToolCall::new("remote_address_lookup", json!({"zip_code": "10001"}))]);

        // The second model call saw the request and its correlated result
        let histories = provider.histories();
        assert_eq!(histories.len(), 2);
        let second = &histories[1];
        assert_eq!(second.len(), 3);
        assert_eq!(second[2].role, Role::User);
        let response = second[2].tool_responses()[0];
        assert_eq!(response.id, "toolu_1");
        assert_eq!(
            response.tool_result.as_ref().unwrap()[0].as_text(),
            Some("Address found for zip code 10001: 5954A Bartonsville Road")
        );

        // The catalog is forwarded on every call
        assert!(provider.tools_seen().iter().all(|tools| tools.len() == 2));
        Ok(())
    }

    #[tokio::test]
    async fn test_one_result_turn_per_request_in_order() -> Result<()> {
        let provider = MockProvider::new(vec![
            Message::assistant()
                .with_text("Looking up three zip codes.")
                .with_tool_request("a", ToolCall::new("remote_address_lookup", json!({"zip_code": "90210"})))
                .with_tool_request("b", ToolCall::new("explode", json!({})))
                .with_tool_request("c", ToolCall::new("remote_address_lookup", json!({"zip_code": "60601"}))),
            Message::assistant().with_text("Done"),
        ]);
        let server = MockToolServer::new();
        let orchestrator = Orchestrator::new(Box::new(provider.clone()), &server);

        let exchange = orchestrator.exchange("Three lookups", &server.tools, 5).await?;

        // user, assistant, three results, final assistant
        assert_eq!(exchange.messages.len(), 6);
        let result_ids: Vec<_> = exchange.messages[2..5]
            .iter()
            .map(|m| {
                assert_eq!(m.role, Role::User);
                assert_eq!(m.content.len(), 1);
                m.tool_responses()[0].id.clone()
            })
            .collect();
        assert_eq!(result_ids, vec!["a", "b", "c"]);

        let called: Vec<_> = server.calls().into_iter().map(|c| c.name).collect();
        assert_eq!(called, vec!["remote_address_lookup", "explode", "remote_address_lookup"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_tool_is_relayed_not_raised() -> Result<()> {
        let provider = MockProvider::new(vec![
            Message::assistant().with_tool_request("x", ToolCall::new("explode", json!({}))),
            Message::assistant().with_text("The tool failed, sorry."),
        ]);
        let server = MockToolServer::new();
        let orchestrator = Orchestrator::new(Box::new(provider.clone()), &server);

        let exchange = orchestrator.exchange("Break it", &server.tools, 5).await?;

        assert_eq!(exchange.text, "The tool failed, sorry.");
        let result = exchange.messages[2].tool_responses()[0].clone();
        assert_eq!(result.id, "x");
        assert_eq!(
            result.tool_result,
            Err(ToolError::ExecutionError("kaboom".to_string()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool_is_relayed_as_error() -> Result<()> {
        let provider = MockProvider::new(vec![
            Message::assistant().with_tool_request("1", ToolCall::new("missing", json!({}))),
            Message::assistant().with_text("Error occurred"),
        ]);
        let server = MockToolServer::new();
        let orchestrator = Orchestrator::new(Box::new(provider), &server);

        let exchange = orchestrator.exchange("Invalid tool", &server.tools, 5).await?;

        assert_eq!(exchange.text, "Error occurred");
        assert!(matches!(
            exchange.messages[2].content[0],
            MessageContent::ToolResponse(ref response)
                if matches!(response.tool_result, Err(ToolError::ToolNotFound(_)))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_iteration_limit_stops_the_loop() -> Result<()> {
        let provider = MockProvider::new(vec![
            Message::assistant()
                .with_text("Checking 10001")
                .with_tool_request("1", ToolCall::new("remote_address_lookup", json!({"zip_code": "10001"}))),
            lookup("2", "10002"),
            lookup("3", "10003"),
            lookup("4", "10004"),
        ]);
        let server = MockToolServer::new();
        let orchestrator = Orchestrator::new(Box::new(provider.clone()), &server);

        let exchange = orchestrator.exchange("Loop forever", &server.tools, 2).await?;

        assert!(exchange.limit_reached);
        assert_eq!(exchange.rounds, 2);
        assert_eq!(provider.call_count(), 3);
        assert_eq!(server.calls().len(), 2);
        assert_eq!(exchange.stop_reason, StopReason::ToolUse);
        // The final response had no text, so the latest available text is returned
        assert_eq!(exchange.text, "Checking 10001");
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_iterations_never_invokes_tools() -> Result<()> {
        let provider = MockProvider::new(vec![Message::assistant()
            .with_text("I would look that up.")
            .with_tool_request("1", ToolCall::new("remote_address_lookup", json!({"zip_code": "10001"})))]);
        let server = MockToolServer::new();
        let orchestrator = Orchestrator::new(Box::new(provider.clone()), &server);

        let text = orchestrator.run("Lookup", &server.tools, 0).await?;

        assert_eq!(text, "I would look that up.");
        assert_eq!(provider.call_count(), 1);
        assert!(server.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_use_without_requests_ends_the_exchange() -> Result<()> {
        let provider = MockProvider::with_stop_reasons(vec![
            (Message::assistant().with_text("Let me think."), StopReason::ToolUse),
            (Message::assistant().with_text("unused"), StopReason::EndTurn),
        ]);
        let server = MockToolServer::new();
        let orchestrator = Orchestrator::new(Box::new(provider.clone()), &server);

        let exchange = orchestrator.exchange("Lookup", &server.tools, 5).await?;

        assert_eq!(exchange.text, "Let me think.");
        assert_eq!(exchange.rounds, 0);
        assert_eq!(exchange.stop_reason, StopReason::ToolUse);
        assert!(!exchange.limit_reached);
        assert_eq!(provider.call_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_requests_under_other_stop_reason_are_not_served() -> Result<()> {
        let truncated = Message::assistant()
            .with_text("Looking up")
            .with_tool_request("1", ToolCall::new("remote_address_lookup", json!({"zip_code": "10001"})));
        let provider = MockProvider::with_stop_reasons(vec![(truncated, StopReason::MaxTokens)]);
        let server = MockToolServer::new();
        let orchestrator = Orchestrator::new(Box::new(provider.clone()), &server);

        let exchange = orchestrator.exchange("Lookup", &server.tools, 5).await?;

        assert_eq!(exchange.text, "Looking up");
        assert_eq!(exchange.stop_reason, StopReason::MaxTokens);
        assert_eq!(exchange.messages.len(), 2);
        assert_eq!(provider.call_count(), 1);
        assert!(server.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_the_exchange() {
        let provider = MockProvider::with_results(vec![
            Ok(lookup("1", "10001")),
            Err("Server error: 529".to_string()),
        ]);
        let server = MockToolServer::new();
        let orchestrator = Orchestrator::new(Box::new(provider), &server);

        let err = orchestrator
            .run("Lookup", &server.tools, 5)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Server error: 529");
        assert_eq!(server.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_reply_streams_events_in_order() -> Result<()> {
        let provider = MockProvider::new(vec![
            lookup("1", "10001"),
            Message::assistant().with_text("Done"),
        ]);
        let server = MockToolServer::new();
        let orchestrator = Orchestrator::new(Box::new(provider), &server);

        let events: Vec<ExchangeEvent> = orchestrator
            .reply("Lookup", &server.tools, 5)
            .try_collect()
            .await?;

        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            ExchangeEvent::Assistant { stop_reason: StopReason::ToolUse, .. }
        ));
        assert!(matches!(&events[1], ExchangeEvent::ToolResult(_)));
        assert!(matches!(
            &events[2],
            ExchangeEvent::Assistant { stop_reason: StopReason::EndTurn, .. }
        ));
        Ok(())
    }
}
