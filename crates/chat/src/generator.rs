//! Answer generation with the bounded tool loop.
//!
//! A query makes at most two model calls. The first offers the search tool;
//! if the model asks for it, exactly one execution happens and a second,
//! tool-free call synthesizes the final answer from the result. The model
//! is never given the chance to chain searches.

use lectern_core::{AppError, AppResult};
use lectern_llm::{ChatClient, ChatMessage, ChatRequest, StopReason};
use lectern_retrieval::{Source, ToolRegistry};
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are an AI assistant for course materials. \
You have a search tool for course content; use it only for questions about \
specific course material, and at most once per question. General knowledge \
questions you answer directly without searching. Ground your answer in the \
search results when you search. If the search returns nothing useful, say \
so instead of guessing. Answer concisely and do not mention the search \
process itself.";

/// What one generation produced.
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Drives model calls for a single query.
pub struct Generator {
    client: Arc<dyn ChatClient>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl Generator {
    pub fn new(
        client: Arc<dyn ChatClient>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    fn base_request(&self, history: Option<&str>) -> ChatRequest {
        let system = match history {
            Some(history) => format!("{}\n\nPrevious conversation:\n{}", SYSTEM_PROMPT, history),
            None => SYSTEM_PROMPT.to_string(),
        };

        ChatRequest::new(&self.model)
            .with_system(system)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Answer a query, searching at most once.
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: &ToolRegistry,
    ) -> AppResult<GeneratedAnswer> {
        let mut messages = vec![ChatMessage::user(query)];

        let first = self
            .client
            .chat(
                &self
                    .base_request(history)
                    .with_messages(messages.clone())
                    .with_tools(tools.definitions()),
            )
            .await?;

        if first.stop_reason != StopReason::ToolUse || first.tool_calls.is_empty() {
            return Ok(GeneratedAnswer {
                answer: first.content,
                sources: Vec::new(),
            });
        }

        // One execution per query: extra requested calls are dropped
        if first.tool_calls.len() > 1 {
            tracing::warn!(
                "Model requested {} tool calls; executing only the first",
                first.tool_calls.len()
            );
        }
        let call = &first.tool_calls[0];

        tracing::debug!("Model requested tool '{}'", call.name);

        let (tool_content, sources) = match tools.execute(&call.name, &call.arguments).await {
            Ok(outcome) => (outcome.content, outcome.sources),
            // Bad tool input reads back to the model; infrastructure faults abort
            Err(AppError::Tool(message)) => (format!("Tool error: {}", message), Vec::new()),
            Err(other) => return Err(other),
        };

        messages.push(ChatMessage::assistant(
            first.content,
            first.tool_calls.clone(),
        ));
        messages.push(ChatMessage::tool(tool_content));

        let second = self
            .client
            .chat(&self.base_request(history).with_messages(messages))
            .await?;

        Ok(GeneratedAnswer {
            answer: second.content,
            sources,
        })
    }
}
