//! Generator trait — the abstraction over the text-generation backend.
//!
//! The backend is a black box that accepts a prompt/context and produces
//! either a complete string or a stream of text deltas. The orchestration
//! loop never depends on a concrete backend — tests stub this trait.

use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message role understood by chat-style backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A generation request: messages plus sampling knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: 0.2,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// The generation backend boundary.
///
/// `stream` yields text deltas over an mpsc channel; the channel closing
/// without an error is the completion signal.
#[async_trait]
pub trait Generator: Send + Sync {
    /// A human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Send a request and get the complete response text.
    async fn complete(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<String, GenerationError>;

    /// Send a request and get a stream of text deltas.
    ///
    /// Default implementation calls `complete()` and yields it as one delta.
    async fn stream(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<String, GenerationError>>,
        GenerationError,
    > {
        let text = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx.send(Ok(text)).await;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneShot;

    #[async_trait]
    impl Generator for OneShot {
        fn name(&self) -> &str {
            "oneshot"
        }

        async fn complete(
            &self,
            _request: GenerationRequest,
        ) -> std::result::Result<String, GenerationError> {
            Ok("hello".into())
        }
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let backend = OneShot;
        let mut rx = backend
            .stream(GenerationRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap();
        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first, "hello");
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn chat_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, ChatRole::System);
        assert_eq!(ChatMessage::user("u").role, ChatRole::User);
        assert_eq!(ChatMessage::assistant("a").role, ChatRole::Assistant);
    }
}
