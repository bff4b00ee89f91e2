//! Core type definitions shared across Specify crates.

mod provider;

pub use provider::{ProviderKind, DEFAULT_OLLAMA_HOST};
