//! Course transcript parsing and chunking.
//!
//! Turns raw transcript text into a [`Course`] with ordered lessons and a
//! flat sequence of context-prefixed [`CourseChunk`]s ready for embedding.
//!
//! Expected document format:
//! ```text
//! Course Title: <text>
//! Course Link: <url>
//! Course Instructor: <name>
//!
//! Lesson 0: Introduction
//! Lesson Link: <url>
//! <free-form transcript text...>
//! Lesson 1: Next topic
//! ...
//! ```

use crate::document::{Course, CourseChunk, Lesson};
use lectern_core::{AppError, AppResult};

/// Parse a transcript document and chunk its lesson bodies.
///
/// The first three lines must carry the title, link, and instructor headers
/// in that order; link and instructor values may be empty but the lines must
/// be present. Returns `AppError::Parse` otherwise.
///
/// Chunk indices are assigned sequentially across the whole course, which is
/// the stable id used for idempotent re-indexing.
pub fn process_document(
    raw: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> AppResult<(Course, Vec<CourseChunk>)> {
    let mut lines = raw.lines();

    let title = header_value(lines.next(), "Course Title:")?;
    let link = header_value(lines.next(), "Course Link:")?;
    let instructor = header_value(lines.next(), "Course Instructor:")?;

    if title.is_empty() {
        return Err(AppError::Parse("Course title must not be empty".to_string()));
    }

    let mut lessons: Vec<Lesson> = Vec::new();
    let mut bodies: Vec<String> = Vec::new();
    // True only on the line directly after a lesson marker, where an
    // optional "Lesson Link:" line may appear.
    let mut at_marker = false;

    for line in lines {
        if let Some((number, lesson_title)) = parse_lesson_marker(line) {
            lessons.push(Lesson {
                number,
                title: lesson_title,
                link: None,
            });
            bodies.push(String::new());
            at_marker = true;
            continue;
        }

        if at_marker {
            at_marker = false;
            if let Some(url) = line.strip_prefix("Lesson Link:") {
                if let Some(last) = lessons.last_mut() {
                    let url = url.trim();
                    last.link = (!url.is_empty()).then(|| url.to_string());
                }
                continue;
            }
        }

        if let Some(body) = bodies.last_mut() {
            body.push_str(line);
            body.push('\n');
        }
        // Text before the first lesson marker has no lesson to belong to
        // and is dropped.
    }

    let mut chunks = Vec::new();
    let mut chunk_index = 0u32;

    for (lesson, body) in lessons.iter().zip(&bodies) {
        let sentences = split_sentences(body);
        for piece in chunk_sentences(&sentences, chunk_size, chunk_overlap) {
            chunks.push(CourseChunk {
                text: format!(
                    "Course {} Lesson {} content: {}",
                    title, lesson.number, piece
                ),
                course_title: title.clone(),
                lesson_number: Some(lesson.number),
                chunk_index,
            });
            chunk_index += 1;
        }
    }

    tracing::debug!(
        "Processed course '{}': {} lessons, {} chunks",
        title,
        lessons.len(),
        chunks.len()
    );

    let course = Course {
        title,
        link: (!link.is_empty()).then_some(link),
        instructor: (!instructor.is_empty()).then_some(instructor),
        lessons,
    };

    Ok((course, chunks))
}

/// Extract a mandatory header line's value.
fn header_value(line: Option<&str>, prefix: &str) -> AppResult<String> {
    let line = line.ok_or_else(|| {
        AppError::Parse(format!("Missing header line '{}' in document", prefix))
    })?;

    let value = line.strip_prefix(prefix).ok_or_else(|| {
        AppError::Parse(format!(
            "Expected header line starting with '{}', got '{}'",
            prefix, line
        ))
    })?;

    Ok(value.trim().to_string())
}

/// Parse a "Lesson <N>: <title>" boundary marker.
///
/// The keyword is case-sensitive and the number must be a bare integer.
fn parse_lesson_marker(line: &str) -> Option<(u32, String)> {
    let rest = line.strip_prefix("Lesson ")?;
    let colon = rest.find(':')?;
    let number_str = &rest[..colon];

    if number_str.is_empty() || !number_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let number = number_str.parse().ok()?;
    Some((number, rest[colon + 1..].trim().to_string()))
}

/// Split text into sentences with normalized whitespace.
///
/// A sentence ends at '.', '!', or '?' followed by whitespace. This is a
/// deliberately simple splitter; chunk boundaries only need to land near
/// sentence ends, not be linguistically exact.
fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = normalized.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?') {
            if let Some((next_i, next_ch)) = chars.peek().copied() {
                if next_ch == ' ' {
                    sentences.push(normalized[start..=i].to_string());
                    start = next_i + 1;
                    chars.next();
                }
            }
        }
    }

    if start < normalized.len() {
        sentences.push(normalized[start..].to_string());
    }

    sentences
}

/// Pack sentences into chunks of at most `chunk_size` characters, with each
/// chunk after the first overlapping the previous chunk's trailing sentences
/// by roughly `overlap` characters.
///
/// A single sentence longer than `chunk_size` becomes its own oversized
/// chunk; splitting mid-sentence would cost more retrieval quality than the
/// size bound buys.
fn chunk_sentences(sentences: &[String], chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut i = 0;

    while i < sentences.len() {
        let mut current = String::new();
        let mut j = i;

        while j < sentences.len() {
            let sentence = &sentences[j];
            let projected = if current.is_empty() {
                sentence.chars().count()
            } else {
                current.chars().count() + 1 + sentence.chars().count()
            };

            if projected > chunk_size && !current.is_empty() {
                break;
            }

            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(sentence);
            j += 1;

            if current.chars().count() >= chunk_size {
                break;
            }
        }

        chunks.push(current);

        if j >= sentences.len() {
            break;
        }

        // Walk back over trailing sentences until the carried tail would
        // exceed the overlap budget. Always advance by at least one.
        let mut next = j;
        if overlap > 0 {
            let mut carried = 0;
            while next > i + 1 {
                let len = sentences[next - 1].chars().count();
                if carried + len > overlap {
                    break;
                }
                carried += len + 1;
                next -= 1;
            }
        }
        i = next.max(i + 1);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Course Title: MCP: Build Rich-Context AI Apps
Course Link: https://example.com/mcp
Course Instructor: Ada Lovelace

Lesson 0: Introduction
Lesson Link: https://example.com/mcp/lesson0
Welcome to the course. This lesson covers the basics of context protocols.
Lesson 1: Core Concepts
Servers expose tools. Clients call them. Everything else follows.
Lesson 2: Wrap Up
";

    #[test]
    fn test_parse_headers() {
        let (course, _) = process_document(SAMPLE, 800, 100).unwrap();
        assert_eq!(course.title, "MCP: Build Rich-Context AI Apps");
        assert_eq!(course.link.as_deref(), Some("https://example.com/mcp"));
        assert_eq!(course.instructor.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_missing_header_is_parse_error() {
        let result = process_document("Course Title: Only a title\n", 800, 100);
        assert!(matches!(result, Err(AppError::Parse(_))));

        let result = process_document("Wrong: header\nCourse Link:\nCourse Instructor:\n", 800, 100);
        assert!(matches!(result, Err(AppError::Parse(_))));
    }

    #[test]
    fn test_empty_link_and_instructor_are_allowed() {
        let doc = "Course Title: Minimal\nCourse Link:\nCourse Instructor:\n\nLesson 0: Only\nBody text here.\n";
        let (course, chunks) = process_document(doc, 800, 100).unwrap();
        assert!(course.link.is_none());
        assert!(course.instructor.is_none());
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_lesson_parsing() {
        let (course, _) = process_document(SAMPLE, 800, 100).unwrap();
        assert_eq!(course.lessons.len(), 3);
        assert_eq!(course.lessons[0].number, 0);
        assert_eq!(course.lessons[0].title, "Introduction");
        assert_eq!(
            course.lessons[0].link.as_deref(),
            Some("https://example.com/mcp/lesson0")
        );
        assert_eq!(course.lessons[1].number, 1);
        assert!(course.lessons[1].link.is_none());
    }

    #[test]
    fn test_lesson_link_excluded_from_content() {
        let (_, chunks) = process_document(SAMPLE, 800, 100).unwrap();
        assert!(chunks.iter().all(|c| !c.text.contains("Lesson Link:")));
    }

    #[test]
    fn test_empty_lesson_produces_no_chunks() {
        let (_, chunks) = process_document(SAMPLE, 800, 100).unwrap();
        // Lesson 2 has no body
        assert!(chunks.iter().all(|c| c.lesson_number != Some(2)));
    }

    #[test]
    fn test_chunk_prefix_and_sequential_indices() {
        let (_, chunks) = process_document(SAMPLE, 800, 100).unwrap();
        assert!(!chunks.is_empty());

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            let lesson = chunk.lesson_number.unwrap();
            let prefix = format!(
                "Course MCP: Build Rich-Context AI Apps Lesson {} content: ",
                lesson
            );
            assert!(chunk.text.starts_with(&prefix), "bad prefix: {}", chunk.text);
        }
    }

    #[test]
    fn test_reprocessing_is_deterministic() {
        let (_, first) = process_document(SAMPLE, 800, 100).unwrap();
        let (_, second) = process_document(SAMPLE, 800, 100).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_lesson_marker_rejects_non_integers() {
        assert!(parse_lesson_marker("Lesson one: Title").is_none());
        assert!(parse_lesson_marker("lesson 1: Title").is_none());
        assert!(parse_lesson_marker("Lesson : Title").is_none());
        assert_eq!(
            parse_lesson_marker("Lesson 12: Deep Dive"),
            Some((12, "Deep Dive".to_string()))
        );
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("One here. Two there! Three? Four trailing");
        assert_eq!(
            sentences,
            vec!["One here.", "Two there!", "Three?", "Four trailing"]
        );
    }

    #[test]
    fn test_split_sentences_collapses_whitespace() {
        let sentences = split_sentences("Spread\nacross   lines. Second one.");
        assert_eq!(sentences, vec!["Spread across lines.", "Second one."]);
    }

    #[test]
    fn test_chunks_respect_size_bound() {
        let body: Vec<String> = (0..40).map(|i| format!("Sentence number {}.", i)).collect();
        let chunks = chunk_sentences(&body, 100, 20);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100, "oversized chunk: {}", chunk);
        }
    }

    #[test]
    fn test_chunks_overlap_on_sentence_boundaries() {
        let body: Vec<String> = (0..40).map(|i| format!("Sentence number {}.", i)).collect();
        let chunks = chunk_sentences(&body, 100, 40);

        for pair in chunks.windows(2) {
            // The next chunk must start with a sentence the previous one ends with
            let first_sentence = pair[1].split(". ").next().unwrap();
            assert!(
                pair[0].contains(first_sentence),
                "no overlap between '{}' and '{}'",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_oversized_sentence_becomes_own_chunk() {
        let long = "x".repeat(500);
        let body = vec![format!("{}.", long), "Short tail.".to_string()];
        let chunks = chunk_sentences(&body, 100, 10);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].len() > 100);
        assert_eq!(chunks[1], "Short tail.");
    }
}
