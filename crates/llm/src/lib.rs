//! Lectern LLM Library
//!
//! Provider-agnostic chat abstraction with tool-call support.
//!
//! The [`ChatClient`] trait models one generation call: it takes a system
//! prompt, a message transcript, and an optional set of tool definitions,
//! and returns text together with a stop reason and any requested tool
//! calls. Orchestration (deciding whether to execute a tool and call again)
//! lives upstream in `lectern-chat`.

pub mod client;
pub mod factory;
pub mod providers;

// Re-export commonly used types
pub use client::{
    ChatClient, ChatMessage, ChatRequest, ChatResponse, LlmUsage, Role, StopReason, ToolCall,
    ToolDefinition,
};
pub use factory::create_client;
