//! Command handlers for the Lectern CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod ingest;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;

use lectern_chat::{ChatEngine, Generator, SessionStore};
use lectern_core::{config::RagConfig, AppResult};
use lectern_llm::create_client;
use lectern_retrieval::{create_provider, CourseIndex, SearchTool, ToolRegistry};
use std::sync::Arc;

/// Open the workspace index with the configured embedding provider.
pub(crate) fn open_index(config: &RagConfig) -> AppResult<Arc<CourseIndex>> {
    let embedder = create_provider(
        &config.embedding_provider,
        &config.embedding_model,
        &config.endpoint,
        config.embedding_dim,
    )?;

    Ok(Arc::new(CourseIndex::open(
        &config.index_path(),
        embedder,
        config.max_results,
    )?))
}

/// Wire the full query path: index, search tool, model client, sessions.
pub(crate) fn build_engine(config: &RagConfig) -> AppResult<ChatEngine> {
    let index = open_index(config)?;

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(SearchTool::new(index)));

    let client = create_client(&config.provider, Some(&config.endpoint), None)?;
    let generator = Generator::new(
        client,
        &config.generation_model,
        config.temperature,
        config.max_tokens,
    );

    Ok(ChatEngine::new(
        generator,
        Arc::new(SessionStore::new(config.max_history_turns)),
        tools,
    ))
}
