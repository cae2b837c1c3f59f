//! Ask command handler.
//!
//! Answers a single question through the retrieval-augmented query path.

use clap::Args;
use lectern_core::{config::RagConfig, AppResult};

/// Ask one question about the indexed courses
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Continue an existing session
    #[arg(short, long)]
    pub session: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &RagConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let engine = super::build_engine(config)?;
        let outcome = engine
            .handle_query(&self.question, self.session.as_deref())
            .await?;

        if self.json {
            let output = serde_json::json!({
                "answer": outcome.answer,
                "sources": outcome.sources,
                "sessionId": outcome.session_id,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", outcome.answer);

            if !outcome.sources.is_empty() {
                println!();
                println!("Sources:");
                for source in &outcome.sources {
                    match &source.link {
                        Some(link) => println!("  {} <{}>", source.label, link),
                        None => println!("  {}", source.label),
                    }
                }
            }
        }

        Ok(())
    }
}
