pub mod exchange;
pub mod message;

pub use exchange::ChatExchange;
pub use message::Role;
