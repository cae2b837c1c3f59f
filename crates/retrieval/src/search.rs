//! Search result types.

use serde::{Deserialize, Serialize};

/// One matched chunk from a vector search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Prefixed chunk text
    pub text: String,

    /// Owning course title
    pub course_title: String,

    /// Lesson the chunk came from
    pub lesson_number: Option<u32>,

    /// Position within the course's chunk sequence
    pub chunk_index: u32,

    /// Cosine distance to the query (lower is closer)
    pub distance: f32,
}

/// The transient outcome of a search.
///
/// Retrieval misses that the model should see (unresolved course name) are
/// carried as an error string here rather than raised; the tool layer hands
/// the string to the model verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Matched chunks, ordered by ascending distance
    pub hits: Vec<SearchHit>,

    /// Set when the search could not be performed meaningfully
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    /// Create a successful outcome.
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits, error: None }
    }

    /// Create a failed outcome carrying an error string for the model.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            hits: Vec::new(),
            error: Some(message.into()),
        }
    }

    /// Whether the search produced no hits and no error.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty() && self.error.is_none()
    }
}
