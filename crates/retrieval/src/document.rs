//! Course document type definitions.

use serde::{Deserialize, Serialize};

/// A course parsed from a transcript document.
///
/// The title is the primary key for all downstream metadata lookups. It is
/// stored exactly as written in the document and matched fuzzily only at
/// query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Course title (unique identifier)
    pub title: String,

    /// Course page URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Instructor name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,

    /// Lessons ordered by number (not necessarily contiguous)
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Find a lesson's link by lesson number.
    pub fn lesson_link(&self, number: u32) -> Option<&str> {
        self.lessons
            .iter()
            .find(|lesson| lesson.number == number)
            .and_then(|lesson| lesson.link.as_deref())
    }
}

/// A lesson within a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number, unique within the course
    pub number: u32,

    /// Lesson title
    pub title: String,

    /// Lesson page URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A bounded, context-prefixed span of course text.
///
/// This is the unit of embedding and retrieval. The text carries a
/// deterministic `"Course {title} Lesson {number} content: "` prefix so
/// lesson-scoped queries embed well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseChunk {
    /// Prefixed chunk text
    pub text: String,

    /// Back-reference to the owning course title
    pub course_title: String,

    /// Lesson the chunk came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_number: Option<u32>,

    /// Position within the course's full chunk sequence (stable id)
    pub chunk_index: u32,
}
