//! Ollama chat provider implementation.
//!
//! This module provides integration with Ollama's chat endpoint, including
//! tool calling. Ollama API:
//! https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{
    ChatClient, ChatMessage, ChatRequest, ChatResponse, LlmUsage, Role, StopReason, ToolCall,
};
use lectern_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Ollama /api/chat request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama message format (shared by request and response).
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
}

/// Ollama tool definition wrapper.
#[derive(Debug, Serialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    kind: String,
    function: OllamaFunctionDef,
}

#[derive(Debug, Serialize)]
struct OllamaFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// Ollama /api/chat response format.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama chat client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Convert ChatRequest to Ollama format.
    ///
    /// The system prompt becomes the leading message; tool definitions are
    /// wrapped in Ollama's `function` envelope.
    fn to_ollama_request(&self, request: &ChatRequest) -> OllamaChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system) = &request.system {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.clone(),
                tool_calls: Vec::new(),
            });
        }

        for message in &request.messages {
            messages.push(OllamaMessage {
                role: match message.role {
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                    Role::Tool => "tool".to_string(),
                },
                content: message.content.clone(),
                tool_calls: message
                    .tool_calls
                    .iter()
                    .map(|call| OllamaToolCall {
                        function: OllamaFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect(),
            });
        }

        let tools = request
            .tools
            .iter()
            .map(|tool| OllamaTool {
                kind: "function".to_string(),
                function: OllamaFunctionDef {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect();

        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        OllamaChatRequest {
            model: request.model.clone(),
            messages,
            tools,
            options,
            stream: false,
        }
    }

    /// Convert Ollama response to ChatResponse.
    fn convert_response(&self, response: OllamaChatResponse) -> ChatResponse {
        let tool_calls: Vec<ToolCall> = response
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        // Tool calls take precedence; Ollama reports done_reason "stop" even
        // when the message carries tool calls.
        let stop_reason = if !tool_calls.is_empty() {
            StopReason::ToolUse
        } else {
            match response.done_reason.as_deref() {
                Some("stop") | None => StopReason::EndTurn,
                Some("length") => StopReason::MaxTokens,
                Some(_) => StopReason::Other,
            }
        };

        ChatResponse {
            content: response.message.content,
            stop_reason,
            tool_calls,
            usage: LlmUsage::new(
                response.prompt_eval_count.unwrap_or(0),
                response.eval_count.unwrap_or(0),
            ),
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ChatClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        tracing::info!(
            "Sending chat request to Ollama ({} messages, {} tools)",
            request.messages.len(),
            request.tools.len()
        );

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let ollama_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        let chat_response = self.convert_response(ollama_response);

        tracing::info!(
            "Received Ollama response (stop_reason: {:?}, {} tool calls)",
            chat_response.stop_reason,
            chat_response.tool_calls.len()
        );

        Ok(chat_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ToolDefinition;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_request_conversion_inlines_system_prompt() {
        let client = OllamaClient::new();
        let request = ChatRequest::new("llama3.2")
            .with_system("system text")
            .with_messages(vec![ChatMessage::user("question")])
            .with_temperature(0.0)
            .with_max_tokens(100);

        let ollama_req = client.to_ollama_request(&request);
        assert_eq!(ollama_req.messages.len(), 2);
        assert_eq!(ollama_req.messages[0].role, "system");
        assert_eq!(ollama_req.messages[1].role, "user");
        assert!(!ollama_req.stream);

        let options = ollama_req.options.unwrap();
        assert_eq!(options.temperature, Some(0.0));
        assert_eq!(options.num_predict, Some(100));
    }

    #[test]
    fn test_request_conversion_wraps_tools() {
        let client = OllamaClient::new();
        let request = ChatRequest::new("llama3.2").with_tools(vec![ToolDefinition {
            name: "search_course_content".to_string(),
            description: "Search course materials".to_string(),
            parameters: serde_json::json!({ "type": "object" }),
        }]);

        let ollama_req = client.to_ollama_request(&request);
        assert_eq!(ollama_req.tools.len(), 1);
        assert_eq!(ollama_req.tools[0].kind, "function");
        assert_eq!(ollama_req.tools[0].function.name, "search_course_content");
    }

    #[test]
    fn test_response_with_tool_calls_maps_to_tool_use() {
        let client = OllamaClient::new();
        let response = OllamaChatResponse {
            message: OllamaMessage {
                role: "assistant".to_string(),
                content: String::new(),
                tool_calls: vec![OllamaToolCall {
                    function: OllamaFunctionCall {
                        name: "search_course_content".to_string(),
                        arguments: serde_json::json!({ "query": "rag" }),
                    },
                }],
            },
            done_reason: Some("stop".to_string()),
            prompt_eval_count: Some(10),
            eval_count: Some(5),
        };

        let converted = client.convert_response(response);
        assert_eq!(converted.stop_reason, StopReason::ToolUse);
        assert_eq!(converted.tool_calls.len(), 1);
        assert_eq!(converted.tool_calls[0].name, "search_course_content");
    }

    #[test]
    fn test_response_without_tool_calls_maps_to_end_turn() {
        let client = OllamaClient::new();
        let response = OllamaChatResponse {
            message: OllamaMessage {
                role: "assistant".to_string(),
                content: "final answer".to_string(),
                tool_calls: Vec::new(),
            },
            done_reason: Some("stop".to_string()),
            prompt_eval_count: None,
            eval_count: None,
        };

        let converted = client.convert_response(response);
        assert_eq!(converted.stop_reason, StopReason::EndTurn);
        assert_eq!(converted.content, "final answer");
    }

    #[test]
    fn test_length_done_reason_maps_to_max_tokens() {
        let client = OllamaClient::new();
        let response = OllamaChatResponse {
            message: OllamaMessage {
                role: "assistant".to_string(),
                content: "truncated".to_string(),
                tool_calls: Vec::new(),
            },
            done_reason: Some("length".to_string()),
            prompt_eval_count: None,
            eval_count: None,
        };

        let converted = client.convert_response(response);
        assert_eq!(converted.stop_reason, StopReason::MaxTokens);
    }
}
