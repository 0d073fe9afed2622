use async_trait::async_trait;

use super::types::{ChatRequest, ChatResponse, ProviderError};

/// A chat-completion backend. One call is one non-streaming request.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}
