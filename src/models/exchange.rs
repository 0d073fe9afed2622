use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One question/answer pair. `id` and `created_at` are filled in by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub id: Option<i64>,
    pub question: String,
    pub answer: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatExchange {
    /// Case-insensitive substring match on the question.
    pub fn matches(&self, needle: &str) -> bool {
        self.question
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}
