use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::ChatExchange;

/// Durable home of chat exchanges. Exchanges are only ever created or deleted.
#[async_trait]
pub trait ExchangeStore: Send + Sync {
    /// Every stored exchange, oldest first.
    async fn list_all(&self) -> Result<Vec<ChatExchange>>;

    /// Stores a new exchange and returns its freshly assigned id.
    async fn insert(&self, question: &str, answer: &str, created_at: DateTime<Utc>)
        -> Result<i64>;

    /// Removes the exchange with `id`. Missing ids are not an error.
    async fn delete_by_id(&self, id: i64) -> Result<()>;
}
