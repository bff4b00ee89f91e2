//! # specify-core
//!
//! Shared building blocks for the Specify crates:
//!
//! - **Providers**: the closed set of supported LLM backends and their
//!   environment variables
//! - **Paths**: resolution of the configuration directory and the files in it
//! - **Utilities**: environment lookup and redacting secret strings

pub mod env;
pub mod error;
pub mod paths;
pub mod secret;
pub mod types;

pub use error::{ConfigError, Result};
pub use secret::{mask, SecretString};
pub use types::ProviderKind;
