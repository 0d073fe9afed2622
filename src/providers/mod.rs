pub mod openai;
pub mod traits;
pub mod types;

pub use openai::OpenAiProvider;
pub use traits::CompletionProvider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, ProviderError};
