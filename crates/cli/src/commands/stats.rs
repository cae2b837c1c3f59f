//! Stats command handler.
//!
//! Reports what the index currently holds.

use clap::Args;
use lectern_core::{config::RagConfig, AppResult};

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &RagConfig) -> AppResult<()> {
        let index = super::open_index(config)?;
        let stats = index.stats()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Courses: {}", stats.course_count);
            println!("Chunks:  {}", stats.chunk_count);

            if !stats.titles.is_empty() {
                println!();
                println!("Indexed courses:");
                for title in &stats.titles {
                    println!("  {}", title);
                }
            }
        }

        Ok(())
    }
}
