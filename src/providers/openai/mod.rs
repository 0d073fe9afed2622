pub mod adapter;
pub mod models;

#[cfg(test)]
pub(crate) mod stub;

pub use adapter::OpenAiProvider;
