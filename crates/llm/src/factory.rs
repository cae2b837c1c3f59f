//! Chat client factory.
//!
//! This module provides a factory for creating chat clients based on
//! application configuration. The generation and embedding model vendors are
//! pluggable capabilities; everything upstream talks to the `ChatClient`
//! trait only.

use crate::client::ChatClient;
use crate::providers::OllamaClient;
use lectern_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a chat client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai", "claude")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or required
/// credentials are missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn ChatClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            let client = OllamaClient::with_base_url(base_url);
            Ok(Arc::new(client))
        }
        "openai" => {
            if api_key.is_none() {
                return Err(AppError::Config(
                    "OpenAI provider requires API key".to_string(),
                ));
            }
            Err(AppError::Config(
                "OpenAI provider not yet implemented".to_string(),
            ))
        }
        "claude" | "anthropic" => {
            if api_key.is_none() {
                return Err(AppError::Config(
                    "Claude provider requires API key".to_string(),
                ));
            }
            Err(AppError::Config(
                "Claude provider not yet implemented".to_string(),
            ))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None) {
            Err(err) => assert!(err.to_string().contains("OpenAI provider requires API key")),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
