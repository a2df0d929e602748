use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, ProviderResponse, StopReason, Usage};

/// A mock provider that returns pre-configured responses for testing
///
/// Unless scripted with `with_stop_reasons`, a response carrying tool requests is
/// reported with a `tool_use` stop reason and anything else ends the turn. Every call
/// records the history it was given.
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Result<(Message, StopReason), String>>>>,
    calls: Arc<Mutex<Vec<(Vec<Message>, Vec<Tool>)>>>,
}

impl MockProvider {
    pub fn new(responses: Vec<Message>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<Result<Message, String>>) -> Self {
        Self::scripted(
            responses
                .into_iter()
                .map(|response| response.map(|message| {
                    let stop_reason = inferred_stop_reason(&message);
                    (message, stop_reason)
                }))
                .collect(),
        )
    }

    /// Responses reported with exactly the given stop reasons
    pub fn with_stop_reasons(responses: Vec<(Message, StopReason)>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    fn scripted(responses: Vec<Result<(Message, StopReason), String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The conversation history passed on each call, in call order
    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(messages, _)| messages.clone())
            .collect()
    }

    pub fn tools_seen(&self) -> Vec<Vec<Tool>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, tools)| tools.clone())
            .collect()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<ProviderResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), tools.to_vec()));

        let mut responses = self.responses.lock().unwrap();
        let (message, stop_reason) = if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            (Message::assistant().with_text(""), StopReason::EndTurn)
        } else {
            responses.remove(0).map_err(|e| anyhow!(e))?
        };

        Ok(ProviderResponse {
            message,
            stop_reason,
            usage: Usage::default(),
        })
    }
}

fn inferred_stop_reason(message: &Message) -> StopReason {
    if message.tool_requests().is_empty() {
        StopReason::EndTurn
    } else {
        StopReason::ToolUse
    }
}
