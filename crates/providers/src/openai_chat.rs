//! OpenAI-compatible chat generator.
//!
//! Works with any backend exposing a `/chat/completions` endpoint:
//! OpenAI, OpenRouter, vLLM, Ollama, Together AI.
//!
//! Supports:
//! - Non-streaming completions (planning, summarization)
//! - Streaming SSE completions (answer synthesis deltas)

use async_trait::async_trait;
use coinsage_core::error::GenerationError;
use coinsage_core::generation::{ChatMessage, ChatRole, GenerationRequest, Generator};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

/// An OpenAI-compatible chat backend.
pub struct OpenAiChatGenerator {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiChatGenerator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    fn to_api_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        ChatRole::System => "system",
                        ChatRole::User => "user",
                        ChatRole::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect()
    }

    fn build_body(&self, request: &GenerationRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": stream,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }

    fn classify_status(status: u16, body: String) -> GenerationError {
        match status {
            429 => GenerationError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => GenerationError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => GenerationError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }
}

#[async_trait]
impl Generator for OpenAiChatGenerator {
    fn name(&self) -> &str {
        "openai_chat"
    }

    async fn complete(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(&request, false);

        debug!(model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(e.to_string())
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(Self::classify_status(status, error_body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| GenerationError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn stream(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<String, GenerationError>>,
        GenerationError,
    > {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(&request, true);

        debug!(model = %self.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(e.to_string())
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend streaming error");
            return Err(Self::classify_status(status, error_body));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Read the SSE byte stream line by line and forward content deltas.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(GenerationError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let data = data.trim();

                    if data == "[DONE]" {
                        return;
                    }

                    let Ok(chunk) = serde_json::from_str::<ApiStreamChunk>(data) else {
                        continue;
                    };

                    let delta = chunk
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta.content);

                    if let Some(delta) = delta
                        && !delta.is_empty()
                        && tx.send(Ok(delta)).await.is_err()
                    {
                        // Consumer is gone; stop reading the upstream.
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

// --- API wire types ---

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiStreamChunk {
    choices: Vec<ApiStreamChoice>,
}

#[derive(Deserialize)]
struct ApiStreamChoice {
    delta: ApiStreamDelta,
}

#[derive(Deserialize, Default)]
struct ApiStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = OpenAiChatGenerator::new("https://api.example.com/v1/", "key", "model", 30);
        assert_eq!(backend.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn body_includes_messages_and_temperature() {
        let backend = OpenAiChatGenerator::new("https://api.example.com/v1", "key", "test-model", 30);
        let request = GenerationRequest::new(vec![
            ChatMessage::system("You are terse."),
            ChatMessage::user("hi"),
        ])
        .with_temperature(0.1);

        let body = backend.build_body(&request, true);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            OpenAiChatGenerator::classify_status(429, String::new()),
            GenerationError::RateLimited { .. }
        ));
        assert!(matches!(
            OpenAiChatGenerator::classify_status(401, String::new()),
            GenerationError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            OpenAiChatGenerator::classify_status(500, "boom".into()),
            GenerationError::ApiError {
                status_code: 500,
                ..
            }
        ));
    }

    #[test]
    fn stream_chunk_parses_delta() {
        let json = r#"{"choices":[{"delta":{"content":"Hel"}}]}"#;
        let chunk: ApiStreamChunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hel"));
    }

    #[test]
    fn stream_chunk_tolerates_empty_delta() {
        let json = r#"{"choices":[{"delta":{}}]}"#;
        let chunk: ApiStreamChunk = serde_json::from_str(json).unwrap();
        assert!(chunk.choices[0].delta.content.is_none());
    }
}
