//! Tools exposed to the language model.
//!
//! A tool executes against the index and returns both the text the model
//! sees and the source attributions the caller surfaces to the user. Input
//! problems (unknown course, empty results) come back as tool output so the
//! model can react; only infrastructure failures surface as errors.

use crate::document::Course;
use crate::index::CourseIndex;
use async_trait::async_trait;
use lectern_core::{AppError, AppResult};
use lectern_llm::ToolDefinition;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// A source attribution for one search hit.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Source {
    /// Display label, e.g. "MCP: Build Rich-Context AI Apps - Lesson 2"
    pub label: String,

    /// Link to the lesson (or the course when no lesson link exists)
    pub link: Option<String>,
}

/// What a tool execution produced.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// Text handed back to the model
    pub content: String,

    /// Attributions for the content, in hit order
    pub sources: Vec<Source>,
}

impl ToolOutcome {
    /// Outcome with content but nothing to attribute.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema advertised to the model.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the model-provided arguments.
    async fn execute(&self, arguments: &serde_json::Value) -> AppResult<ToolOutcome>;
}

/// Semantic search over indexed course content.
pub struct SearchTool {
    index: Arc<CourseIndex>,
}

impl SearchTool {
    pub const NAME: &'static str = "search_course_content";

    pub fn new(index: Arc<CourseIndex>) -> Self {
        Self { index }
    }

    fn hit_sources(&self, outcome: &crate::search::SearchOutcome) -> AppResult<Vec<Source>> {
        let mut courses: HashMap<String, Option<Course>> = HashMap::new();
        let mut sources = Vec::with_capacity(outcome.hits.len());

        for hit in &outcome.hits {
            let course = match courses.get(&hit.course_title) {
                Some(cached) => cached.clone(),
                None => {
                    let loaded = self.index.course(&hit.course_title)?;
                    courses.insert(hit.course_title.clone(), loaded.clone());
                    loaded
                }
            };

            let label = match hit.lesson_number {
                Some(number) => format!("{} - Lesson {}", hit.course_title, number),
                None => hit.course_title.clone(),
            };

            // Prefer the lesson link, fall back to the course link
            let link = course.as_ref().and_then(|c| {
                hit.lesson_number
                    .and_then(|n| c.lesson_link(n).map(str::to_string))
                    .or_else(|| c.link.clone())
            });

            sources.push(Source { label, link });
        }

        Ok(sources)
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, arguments: &serde_json::Value) -> AppResult<ToolOutcome> {
        let query = arguments
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::Tool("Missing required argument 'query'".to_string()))?;

        let course_name = arguments.get("course_name").and_then(|v| v.as_str());
        let lesson_number = arguments
            .get("lesson_number")
            .and_then(|v| v.as_u64())
            .map(|n| n as u32);

        tracing::debug!(
            "Executing search: query='{}', course={:?}, lesson={:?}",
            query,
            course_name,
            lesson_number
        );

        let outcome = self
            .index
            .search(query, course_name, lesson_number, None)
            .await?;

        // Resolution failures go to the model verbatim
        if let Some(error) = outcome.error {
            return Ok(ToolOutcome::text(error));
        }

        if outcome.hits.is_empty() {
            let mut message = String::from("No relevant content found");
            match (course_name, lesson_number) {
                (Some(course), Some(lesson)) => {
                    message.push_str(&format!(" in course '{}' in lesson {}", course, lesson));
                }
                (Some(course), None) => {
                    message.push_str(&format!(" in course '{}'", course));
                }
                (None, Some(lesson)) => {
                    message.push_str(&format!(" in lesson {}", lesson));
                }
                (None, None) => {}
            }
            message.push('.');
            return Ok(ToolOutcome::text(message));
        }

        let sources = self.hit_sources(&outcome)?;

        let blocks: Vec<String> = outcome
            .hits
            .iter()
            .zip(&sources)
            .map(|(hit, source)| format!("[{}]\n{}", source.label, hit.text))
            .collect();

        Ok(ToolOutcome {
            content: blocks.join("\n\n"),
            sources,
        })
    }
}

/// Name-keyed collection of tools offered to the model.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.definition().name, tool);
    }

    /// Definitions for every registered tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        arguments: &serde_json::Value,
    ) -> AppResult<ToolOutcome> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AppError::Tool(format!("Tool '{}' not found", name)))?;
        tool.execute(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::processor::process_document;

    const DOC: &str = "\
Course Title: MCP: Build Rich-Context AI Apps
Course Link: https://example.com/mcp
Course Instructor: Ada Lovelace

Lesson 2: Tool Servers
Lesson Link: https://example.com/mcp/lesson2
A tool server exposes named capabilities with schemas. Clients discover and call them over the wire.
";

    async fn sample_tool() -> SearchTool {
        let index = Arc::new(
            CourseIndex::in_memory(Arc::new(TrigramProvider::new(384)), 5).unwrap(),
        );
        let (course, chunks) = process_document(DOC, 200, 40).unwrap();
        index.upsert_course(&course, &chunks).await.unwrap();
        SearchTool::new(index)
    }

    #[tokio::test]
    async fn test_execute_formats_hits_and_sources() {
        let tool = sample_tool().await;

        let outcome = tool
            .execute(&json!({"query": "tool server capabilities"}))
            .await
            .unwrap();

        assert!(outcome
            .content
            .starts_with("[MCP: Build Rich-Context AI Apps - Lesson 2]\n"));
        assert_eq!(outcome.sources.len(), 1);
        assert_eq!(
            outcome.sources[0].link.as_deref(),
            Some("https://example.com/mcp/lesson2")
        );
    }

    #[tokio::test]
    async fn test_missing_query_is_tool_error() {
        let tool = sample_tool().await;
        let result = tool.execute(&json!({"course_name": "MCP"})).await;
        assert!(matches!(result, Err(AppError::Tool(_))));
    }

    #[tokio::test]
    async fn test_unknown_course_returned_as_content() {
        let tool = sample_tool().await;

        let outcome = tool
            .execute(&json!({"query": "anything", "course_name": "Basket Weaving"}))
            .await
            .unwrap();

        assert_eq!(outcome.content, "No course found matching 'Basket Weaving'");
        assert!(outcome.sources.is_empty());
    }

    #[tokio::test]
    async fn test_empty_results_name_the_filters() {
        let tool = sample_tool().await;

        let outcome = tool
            .execute(&json!({"query": "anything", "course_name": "MCP", "lesson_number": 99}))
            .await
            .unwrap();

        assert_eq!(
            outcome.content,
            "No relevant content found in course 'MCP' in lesson 99."
        );
        assert!(outcome.sources.is_empty());
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let tool = sample_tool().await;
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(tool));

        assert_eq!(registry.definitions().len(), 1);
        assert_eq!(registry.definitions()[0].name, SearchTool::NAME);

        let outcome = registry
            .execute(SearchTool::NAME, &json!({"query": "tool server"}))
            .await
            .unwrap();
        assert!(!outcome.content.is_empty());

        let missing = registry.execute("nope", &json!({})).await;
        assert!(matches!(missing, Err(AppError::Tool(_))));
    }
}
