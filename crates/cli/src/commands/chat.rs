//! Chat command handler.
//!
//! Interactive loop over the same query path as `ask`, keeping one session
//! for the whole conversation so follow-up questions carry context.

use clap::Args;
use lectern_core::{config::RagConfig, AppResult};
use std::io::{BufRead, Write};

/// Interactive question-and-answer session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Hide source attributions
    #[arg(long)]
    pub no_sources: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &RagConfig) -> AppResult<()> {
        let engine = super::build_engine(config)?;
        let mut session_id: Option<String> = None;

        println!("Ask about your courses. Type 'exit' to quit.");

        let stdin = std::io::stdin();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question == "exit" || question == "quit" {
                break;
            }

            match engine.handle_query(question, session_id.as_deref()).await {
                Ok(outcome) => {
                    session_id = Some(outcome.session_id.clone());

                    println!("{}", outcome.answer);
                    if !self.no_sources && !outcome.sources.is_empty() {
                        println!();
                        println!("Sources:");
                        for source in &outcome.sources {
                            match &source.link {
                                Some(link) => println!("  {} <{}>", source.label, link),
                                None => println!("  {}", source.label),
                            }
                        }
                    }
                    println!();
                }
                Err(e) => {
                    // Keep the session alive through transient failures
                    eprintln!("Error: {}", e);
                }
            }
        }

        Ok(())
    }
}
