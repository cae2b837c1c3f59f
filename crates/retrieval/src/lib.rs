//! Retrieval layer: transcript parsing, chunking, embeddings, and the
//! SQLite vector index, plus the search tool the model calls.

pub mod document;
pub mod embeddings;
pub mod index;
pub mod processor;
pub mod search;
pub mod tool;

pub use document::{Course, CourseChunk, Lesson};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::{CatalogStats, CourseIndex};
pub use processor::process_document;
pub use search::{SearchHit, SearchOutcome};
pub use tool::{SearchTool, Source, Tool, ToolOutcome, ToolRegistry};

use lectern_core::AppResult;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

/// What a directory ingestion did.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IngestStats {
    /// Courses successfully indexed
    pub courses: u32,

    /// Chunks written for those courses
    pub chunks: u32,

    /// Files skipped because they failed to parse
    pub skipped: u32,
}

/// Ingest every transcript file under a directory.
///
/// Walks the tree for `.txt` and `.md` files, parses and chunks each one,
/// and upserts it into the index. Files that fail to parse are logged and
/// skipped so one bad transcript does not abort the batch.
pub async fn ingest_directory(
    index: &Arc<CourseIndex>,
    dir: &Path,
    chunk_size: usize,
    chunk_overlap: usize,
) -> AppResult<IngestStats> {
    let mut stats = IngestStats::default();

    let mut paths: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("txt") | Some("md")
            )
        })
        .collect();
    paths.sort();

    for path in paths {
        let raw = std::fs::read_to_string(&path)?;

        match process_document(&raw, chunk_size, chunk_overlap) {
            Ok((course, chunks)) => {
                index.upsert_course(&course, &chunks).await?;
                stats.courses += 1;
                stats.chunks += chunks.len() as u32;
            }
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                stats.skipped += 1;
            }
        }
    }

    tracing::info!(
        "Ingested {} courses ({} chunks), skipped {} files",
        stats.courses,
        stats.chunks,
        stats.skipped
    );

    Ok(stats)
}
