//! Ingest command handler.
//!
//! Parses, chunks, embeds, and indexes course transcripts from a directory.

use clap::Args;
use lectern_core::{config::RagConfig, AppResult};
use lectern_retrieval::ingest_directory;
use std::path::PathBuf;

/// Ingest course transcripts into the index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Directory containing transcript files (.txt or .md)
    pub path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &RagConfig) -> AppResult<()> {
        tracing::info!("Ingesting transcripts from {:?}", self.path);

        if !self.path.is_dir() {
            return Err(lectern_core::AppError::Config(format!(
                "Not a directory: {:?}",
                self.path
            )));
        }

        let index = super::open_index(config)?;
        let stats =
            ingest_directory(&index, &self.path, config.chunk_size, config.chunk_overlap).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Ingested {} courses ({} chunks), skipped {} files",
                stats.courses, stats.chunks, stats.skipped
            );
        }

        Ok(())
    }
}
