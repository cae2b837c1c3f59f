//! Query orchestration: sessions, generation, and source attribution.

use crate::generator::Generator;
use crate::session::{SessionStore, TurnRole};
use lectern_core::AppResult;
use lectern_retrieval::{Source, ToolRegistry};
use std::sync::Arc;

/// The answer to one query, with everything the caller needs to render it.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<Source>,
    pub session_id: String,
}

/// Ties the session store, tool registry, and generator together.
pub struct ChatEngine {
    generator: Generator,
    sessions: Arc<SessionStore>,
    tools: ToolRegistry,
}

impl ChatEngine {
    pub fn new(generator: Generator, sessions: Arc<SessionStore>, tools: ToolRegistry) -> Self {
        Self {
            generator,
            sessions,
            tools,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Answer a query within a session.
    ///
    /// A missing session id starts a new session; the returned outcome
    /// always carries the id to use for follow-ups. The exchange is recorded
    /// only after generation succeeds, so a failed query leaves no partial
    /// history behind.
    pub async fn handle_query(
        &self,
        query: &str,
        session_id: Option<&str>,
    ) -> AppResult<QueryOutcome> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create_session()?,
        };

        let history = self.sessions.history(&session_id)?;
        let formatted = SessionStore::format_history(&history);

        let generated = self
            .generator
            .generate(query, formatted.as_deref(), &self.tools)
            .await?;

        self.sessions
            .add_turn(&session_id, TurnRole::User, query)?;
        self.sessions
            .add_turn(&session_id, TurnRole::Assistant, &generated.answer)?;

        Ok(QueryOutcome {
            answer: generated.answer,
            sources: generated.sources,
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lectern_core::AppError;
    use lectern_llm::{ChatClient, ChatRequest, ChatResponse, StopReason, ToolCall};
    use lectern_retrieval::embeddings::providers::trigram::TrigramProvider;
    use lectern_retrieval::{process_document, CourseIndex, SearchTool};
    use serde_json::json;
    use std::sync::Mutex;

    const DOC: &str = "\
Course Title: MCP: Build Rich-Context AI Apps
Course Link: https://example.com/mcp
Course Instructor: Ada Lovelace

Lesson 2: Tool Servers
Lesson Link: https://example.com/mcp/lesson2
A tool server exposes named capabilities with schemas. Clients discover and call them over the wire.
";

    /// Always searches on the first call, then answers with fixed text.
    struct SearchThenAnswer {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl ChatClient for SearchThenAnswer {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;

            if !request.tools.is_empty() {
                return Ok(ChatResponse {
                    content: String::new(),
                    stop_reason: StopReason::ToolUse,
                    tool_calls: vec![ToolCall {
                        name: "search_course_content".to_string(),
                        arguments: json!({"query": "tool servers", "course_name": "MCP"}),
                    }],
                    usage: Default::default(),
                });
            }

            Ok(ChatResponse {
                content: "Tool servers expose capabilities.".to_string(),
                stop_reason: StopReason::EndTurn,
                tool_calls: Vec::new(),
                usage: Default::default(),
            })
        }
    }

    /// Echoes how many history turns it saw in the system prompt.
    struct HistoryReporter;

    #[async_trait]
    impl ChatClient for HistoryReporter {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
            let has_history = request
                .system
                .as_deref()
                .map(|s| s.contains("Previous conversation:"))
                .unwrap_or(false);

            Ok(ChatResponse {
                content: if has_history { "with history" } else { "fresh" }.to_string(),
                stop_reason: StopReason::EndTurn,
                tool_calls: Vec::new(),
                usage: Default::default(),
            })
        }
    }

    struct FailingClient;

    #[async_trait]
    impl ChatClient for FailingClient {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, _request: &ChatRequest) -> AppResult<ChatResponse> {
            Err(AppError::Llm("connection refused".to_string()))
        }
    }

    async fn indexed_registry() -> ToolRegistry {
        let index = Arc::new(
            CourseIndex::in_memory(Arc::new(TrigramProvider::new(384)), 5).unwrap(),
        );
        let (course, chunks) = process_document(DOC, 200, 40).unwrap();
        index.upsert_course(&course, &chunks).await.unwrap();

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchTool::new(index)));
        registry
    }

    fn engine_with(client: Arc<dyn ChatClient>, registry: ToolRegistry) -> ChatEngine {
        ChatEngine::new(
            Generator::new(client, "test-model", 0.0, 100),
            Arc::new(SessionStore::new(2)),
            registry,
        )
    }

    #[tokio::test]
    async fn test_query_through_search_returns_sources() {
        let engine = engine_with(
            Arc::new(SearchThenAnswer {
                calls: Mutex::new(0),
            }),
            indexed_registry().await,
        );

        let outcome = engine
            .handle_query("How do tool servers work?", None)
            .await
            .unwrap();

        assert_eq!(outcome.answer, "Tool servers expose capabilities.");
        assert_eq!(outcome.sources.len(), 1);
        assert_eq!(
            outcome.sources[0].label,
            "MCP: Build Rich-Context AI Apps - Lesson 2"
        );
        assert!(!outcome.session_id.is_empty());
    }

    #[tokio::test]
    async fn test_session_continuity() {
        let engine = engine_with(Arc::new(HistoryReporter), indexed_registry().await);

        let first = engine.handle_query("first question", None).await.unwrap();
        assert_eq!(first.answer, "fresh");

        let second = engine
            .handle_query("follow-up", Some(&first.session_id))
            .await
            .unwrap();
        assert_eq!(second.answer, "with history");
        assert_eq!(second.session_id, first.session_id);
    }

    #[tokio::test]
    async fn test_failed_query_records_no_history() {
        let engine = engine_with(Arc::new(FailingClient), indexed_registry().await);
        let sessions = engine.sessions().clone();
        let session_id = sessions.create_session().unwrap();

        let result = engine.handle_query("q", Some(&session_id)).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
        assert!(sessions.history(&session_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_recorded_after_success() {
        let engine = engine_with(Arc::new(HistoryReporter), indexed_registry().await);

        let outcome = engine.handle_query("first question", None).await.unwrap();
        let history = engine.sessions().history(&outcome.session_id).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "first question");
        assert_eq!(history[1].content, "fresh");
    }
}
