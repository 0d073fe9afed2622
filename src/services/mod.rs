pub mod conversation;
pub mod database;
pub mod export;
pub mod store;

pub use conversation::{ConversationController, SkipReason, SubmitOutcome};
pub use database::Database;
