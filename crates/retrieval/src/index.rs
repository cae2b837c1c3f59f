//! SQLite-backed vector index for course content.
//!
//! Two logical collections live here:
//! - `courses`: one row per course with its metadata, lesson list, and a
//!   title embedding used for fuzzy course-name resolution.
//! - `chunks`: the content chunks with their embeddings, keyed by
//!   (course_title, chunk_index) so re-ingestion is idempotent.
//!
//! Similarity is cosine, computed in process over little-endian f32 BLOBs.

use crate::document::{Course, CourseChunk};
use crate::embeddings::EmbeddingProvider;
use crate::search::{SearchHit, SearchOutcome};
use lectern_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Similarity floor for fuzzy title resolution. A query sharing no
/// vocabulary with any stored title is a miss, not a match; the floor sits
/// well below what a single shared word scores but above collision noise.
const MIN_TITLE_SIMILARITY: f32 = 0.1;

/// Catalog statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CatalogStats {
    /// Number of indexed courses
    pub course_count: u32,

    /// Number of indexed chunks
    pub chunk_count: u32,

    /// Stored course titles
    pub titles: Vec<String>,
}

/// Vector index over courses and their content chunks.
///
/// Reads are safe to share across concurrent queries; the connection mutex
/// serializes individual statements.
pub struct CourseIndex {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
    max_results: usize,
}

impl CourseIndex {
    /// Open (or create) an index at the given path.
    pub fn open(
        path: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        max_results: usize,
    ) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Index(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;

        Self::init_schema(&conn)?;

        tracing::debug!("Opened course index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
            max_results,
        })
    }

    /// Create an in-memory index (used by tests).
    pub fn in_memory(
        embedder: Arc<dyn EmbeddingProvider>,
        max_results: usize,
    ) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Index(format!("Failed to open in-memory index: {}", e)))?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
            max_results,
        })
    }

    fn init_schema(conn: &Connection) -> AppResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS courses (
                title TEXT PRIMARY KEY,
                link TEXT,
                instructor TEXT,
                lessons TEXT NOT NULL,
                embedding BLOB NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
                course_title TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                lesson_number INTEGER,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (course_title, chunk_index)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_title);
            "#,
        )
        .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Index("Index connection lock poisoned".to_string()))
    }

    /// Insert or replace all records for a course.
    ///
    /// Existing chunks for the same title are deleted first, so re-ingesting
    /// a course leaves exactly one record set behind.
    pub async fn upsert_course(&self, course: &Course, chunks: &[CourseChunk]) -> AppResult<()> {
        let title_embedding = self.embedder.embed(&course.title).await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let chunk_embeddings = self.embedder.embed_batch(&texts).await?;

        if chunk_embeddings.len() != chunks.len() {
            return Err(AppError::Index(format!(
                "Embedding count mismatch: {} chunks, {} embeddings",
                chunks.len(),
                chunk_embeddings.len()
            )));
        }

        let lessons_json = serde_json::to_string(&course.lessons)?;

        let mut guard = self.lock()?;
        let tx = guard
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to start transaction: {}", e)))?;

        tx.execute("DELETE FROM chunks WHERE course_title = ?1", params![course.title])
            .map_err(|e| AppError::Index(format!("Failed to clear old chunks: {}", e)))?;

        tx.execute(
            "INSERT OR REPLACE INTO courses (title, link, instructor, lessons, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                course.title,
                course.link,
                course.instructor,
                lessons_json,
                embedding_to_bytes(&title_embedding),
            ],
        )
        .map_err(|e| AppError::Index(format!("Failed to upsert course: {}", e)))?;

        for (chunk, embedding) in chunks.iter().zip(&chunk_embeddings) {
            tx.execute(
                "INSERT INTO chunks (course_title, chunk_index, lesson_number, text, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    chunk.course_title,
                    chunk.chunk_index as i64,
                    chunk.lesson_number.map(|n| n as i64),
                    chunk.text,
                    embedding_to_bytes(embedding),
                ],
            )
            .map_err(|e| AppError::Index(format!("Failed to insert chunk: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit upsert: {}", e)))?;

        tracing::info!(
            "Indexed course '{}' ({} chunks)",
            course.title,
            chunks.len()
        );

        Ok(())
    }

    /// Resolve a possibly partial course name to a stored title.
    ///
    /// An exact stored title short-circuits; otherwise the closest catalog
    /// title by cosine similarity wins, provided it clears the similarity
    /// floor. Returns `None` when the catalog is empty or nothing matches.
    pub async fn resolve_course_name(&self, query: &str) -> AppResult<Option<String>> {
        // Exact match needs no embedding round-trip
        {
            let guard = self.lock()?;
            let exact: Option<String> = guard
                .query_row(
                    "SELECT title FROM courses WHERE title = ?1",
                    params![query],
                    |row| row.get(0),
                )
                .ok();
            if exact.is_some() {
                return Ok(exact);
            }
        }

        let query_embedding = self.embedder.embed(query).await?;

        let guard = self.lock()?;
        let mut stmt = guard
            .prepare("SELECT title, embedding FROM courses")
            .map_err(|e| AppError::Index(format!("Failed to prepare catalog query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let title: String = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                Ok((title, blob))
            })
            .map_err(|e| AppError::Index(format!("Failed to query catalog: {}", e)))?;

        let mut best: Option<(String, f32)> = None;
        for row in rows {
            let (title, blob) =
                row.map_err(|e| AppError::Index(format!("Failed to read catalog row: {}", e)))?;
            let embedding = bytes_to_embedding(&blob)?;
            let similarity = cosine_similarity(&query_embedding, &embedding);

            if best.as_ref().map_or(true, |(_, s)| similarity > *s) {
                best = Some((title, similarity));
            }
        }

        match best {
            Some((title, similarity)) if similarity > MIN_TITLE_SIMILARITY => {
                tracing::debug!(
                    "Resolved course name '{}' to '{}' (similarity {:.3})",
                    query,
                    title,
                    similarity
                );
                Ok(Some(title))
            }
            _ => Ok(None),
        }
    }

    /// Search content chunks by semantic similarity.
    ///
    /// A non-empty `course_filter` is resolved through
    /// [`Self::resolve_course_name`]; if it cannot be resolved the whole
    /// search fails with an error outcome rather than falling back to an
    /// unfiltered search. `limit` defaults to the configured maximum.
    pub async fn search(
        &self,
        query: &str,
        course_filter: Option<&str>,
        lesson_filter: Option<u32>,
        limit: Option<usize>,
    ) -> AppResult<SearchOutcome> {
        let resolved_course = match course_filter.filter(|f| !f.is_empty()) {
            Some(filter) => match self.resolve_course_name(filter).await? {
                Some(title) => Some(title),
                None => {
                    return Ok(SearchOutcome::error(format!(
                        "No course found matching '{}'",
                        filter
                    )))
                }
            },
            None => None,
        };

        let query_embedding = self.embedder.embed(query).await?;

        let mut sql = String::from(
            "SELECT course_title, chunk_index, lesson_number, text, embedding FROM chunks",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(title) = &resolved_course {
            clauses.push("course_title = ?");
            values.push(title.clone().into());
        }
        if let Some(number) = lesson_filter {
            clauses.push("lesson_number = ?");
            values.push((number as i64).into());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(&sql)
            .map_err(|e| AppError::Index(format!("Failed to prepare search query: {}", e)))?;

        let rows = stmt
            .query_map(rusqlite::params_from_iter(values), |row| {
                let course_title: String = row.get(0)?;
                let chunk_index: i64 = row.get(1)?;
                let lesson_number: Option<i64> = row.get(2)?;
                let text: String = row.get(3)?;
                let blob: Vec<u8> = row.get(4)?;
                Ok((course_title, chunk_index, lesson_number, text, blob))
            })
            .map_err(|e| AppError::Index(format!("Failed to query chunks: {}", e)))?;

        let mut hits = Vec::new();
        for row in rows {
            let (course_title, chunk_index, lesson_number, text, blob) =
                row.map_err(|e| AppError::Index(format!("Failed to read chunk row: {}", e)))?;
            let embedding = bytes_to_embedding(&blob)?;

            hits.push(SearchHit {
                text,
                course_title,
                lesson_number: lesson_number.map(|n| n as u32),
                chunk_index: chunk_index as u32,
                distance: 1.0 - cosine_similarity(&query_embedding, &embedding),
            });
        }

        // Ascending distance, chunk index breaks ties for determinism
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        hits.truncate(limit.unwrap_or(self.max_results));

        tracing::debug!(
            "Search returned {} hits (course filter: {:?}, lesson filter: {:?})",
            hits.len(),
            resolved_course,
            lesson_filter
        );

        Ok(SearchOutcome::new(hits))
    }

    /// Load a stored course with its lesson list.
    pub fn course(&self, title: &str) -> AppResult<Option<Course>> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT title, link, instructor, lessons FROM courses WHERE title = ?1",
                params![title],
                |row| {
                    let title: String = row.get(0)?;
                    let link: Option<String> = row.get(1)?;
                    let instructor: Option<String> = row.get(2)?;
                    let lessons_json: String = row.get(3)?;
                    Ok((title, link, instructor, lessons_json))
                },
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(AppError::Index(format!("Failed to load course: {}", other))),
            })?;

        match row {
            Some((title, link, instructor, lessons_json)) => {
                let lessons = serde_json::from_str(&lessons_json)?;
                Ok(Some(Course {
                    title,
                    link,
                    instructor,
                    lessons,
                }))
            }
            None => Ok(None),
        }
    }

    /// Get catalog statistics.
    pub fn stats(&self) -> AppResult<CatalogStats> {
        let guard = self.lock()?;

        let course_count: u32 = guard
            .query_row("SELECT COUNT(*) FROM courses", [], |row| {
                row.get::<_, i64>(0).map(|v| v as u32)
            })
            .map_err(|e| AppError::Index(format!("Failed to count courses: {}", e)))?;

        let chunk_count: u32 = guard
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
                row.get::<_, i64>(0).map(|v| v as u32)
            })
            .map_err(|e| AppError::Index(format!("Failed to count chunks: {}", e)))?;

        let mut stmt = guard
            .prepare("SELECT title FROM courses ORDER BY title")
            .map_err(|e| AppError::Index(format!("Failed to list titles: {}", e)))?;
        let titles = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| AppError::Index(format!("Failed to list titles: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Index(format!("Failed to read title row: {}", e)))?;

        Ok(CatalogStats {
            course_count,
            chunk_count,
            titles,
        })
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    let mut embedding = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        embedding.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(embedding)
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
