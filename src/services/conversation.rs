use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use thiserror::Error;

use crate::config::CompletionConfig;
use crate::models::ChatExchange;
use crate::providers::{ChatMessage, ChatRequest, CompletionProvider, ProviderError};
use crate::services::store::ExchangeStore;

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Completion request failed: {0}")]
    Transport(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Persistence(String),

    #[error("Cannot delete an exchange that was never saved")]
    InvalidDeleteTarget,
}

impl ConversationError {
    fn persistence(err: anyhow::Error) -> Self {
        ConversationError::Persistence(format!("{:#}", err))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Pending,
    EmptyDraft,
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Submitted(ChatExchange),
    Skipped(SkipReason),
}

#[derive(Debug, Default)]
struct ViewState {
    exchanges: Vec<ChatExchange>,
    draft_question: String,
    search_text: String,
}

/// Single-slot token for the in-flight completion request. Released on drop.
struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PendingGuard(flag))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the cached exchange list plus the draft and search inputs, and runs
/// the ask → store → refresh workflow.
///
/// The cache is only replaced after a successful mutation. There is no
/// timeout on the completion request: if it never returns, `is_pending`
/// stays true and further submits are skipped.
pub struct ConversationController {
    provider: Arc<dyn CompletionProvider>,
    store: Arc<dyn ExchangeStore>,
    config: CompletionConfig,
    state: Mutex<ViewState>,
    pending: AtomicBool,
}

impl ConversationController {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        store: Arc<dyn ExchangeStore>,
        config: CompletionConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            state: Mutex::new(ViewState::default()),
            pending: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn initialize(&self) -> Result<(), ConversationError> {
        self.refresh().await?;
        tracing::debug!("Loaded {} exchanges", self.state().exchanges.len());
        Ok(())
    }

    /// Re-reads every exchange from the store into the cache.
    pub async fn refresh(&self) -> Result<(), ConversationError> {
        match self.store.list_all().await {
            Ok(exchanges) => {
                self.state().exchanges = exchanges;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load exchanges: {:#}", e);
                Err(ConversationError::persistence(e))
            }
        }
    }

    pub fn set_draft_question(&self, text: impl Into<String>) {
        self.state().draft_question = text.into();
    }

    pub fn set_search_text(&self, text: impl Into<String>) {
        self.state().search_text = text.into();
    }

    pub fn draft_question(&self) -> String {
        self.state().draft_question.clone()
    }

    pub fn search_text(&self) -> String {
        self.state().search_text.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether the send action should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_pending() && !self.state().draft_question.is_empty()
    }

    pub fn exchanges(&self) -> Vec<ChatExchange> {
        self.state().exchanges.clone()
    }

    /// Cached exchanges narrowed by the search text, computed on every call.
    pub fn visible_exchanges(&self) -> Vec<ChatExchange> {
        let state = self.state();
        if state.search_text.is_empty() {
            return state.exchanges.clone();
        }
        state
            .exchanges
            .iter()
            .filter(|e| e.matches(&state.search_text))
            .cloned()
            .collect()
    }

    fn build_request(&self, question: &str) -> ChatRequest {
        ChatRequest {
            api_key: self.config.api_key.clone(),
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(question)],
        }
    }

    /// Sends the draft question, stores the answer, then refreshes the cache
    /// and clears the draft. On any failure the draft is kept for a retry.
    pub async fn submit(&self) -> Result<SubmitOutcome, ConversationError> {
        let Some(_pending) = PendingGuard::acquire(&self.pending) else {
            tracing::debug!("Submit ignored: a request is already in flight");
            return Ok(SubmitOutcome::Skipped(SkipReason::Pending));
        };

        let question = self.draft_question();
        if question.is_empty() {
            tracing::debug!("Submit ignored: draft question is empty");
            return Ok(SubmitOutcome::Skipped(SkipReason::EmptyDraft));
        }

        let request = self.build_request(&question);
        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Completion request via {} failed: {}", self.provider.name(), e);
                return Err(e.into());
            }
        };

        let created_at = Utc::now();
        let id = match self
            .store
            .insert(&question, &response.content, created_at)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Failed to save exchange: {:#}", e);
                return Err(ConversationError::persistence(e));
            }
        };

        tracing::info!(
            id,
            model = %response.model,
            tokens_in = ?response.tokens_in,
            tokens_out = ?response.tokens_out,
            "Saved exchange"
        );

        // The exchange is durable at this point; a failed re-read only leaves
        // the cache stale and is already logged.
        let _ = self.refresh().await;
        self.state().draft_question.clear();

        Ok(SubmitOutcome::Submitted(ChatExchange {
            id: Some(id),
            question,
            answer: response.content,
            created_at: Some(created_at),
        }))
    }

    /// Deletes a stored exchange. Not gated by the pending flag.
    pub async fn delete(&self, id: Option<i64>) -> Result<(), ConversationError> {
        let Some(id) = id else {
            tracing::error!("Cannot delete exchange: id is missing");
            return Err(ConversationError::InvalidDeleteTarget);
        };

        if let Err(e) = self.store.delete_by_id(id).await {
            tracing::error!("Failed to delete exchange {}: {:#}", id, e);
            return Err(ConversationError::persistence(e));
        }

        // Same as submit: the row is gone, a failed re-read only leaves the
        // cache stale.
        let _ = self.refresh().await;
        Ok(())
    }
}
