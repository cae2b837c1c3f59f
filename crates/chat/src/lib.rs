//! Conversation layer: bounded session history and the query orchestration
//! loop that drives retrieval-augmented answers.

pub mod engine;
pub mod generator;
pub mod session;

pub use engine::{ChatEngine, QueryOutcome};
pub use generator::{GeneratedAnswer, Generator};
pub use session::{ConversationTurn, SessionStore, TurnRole};
