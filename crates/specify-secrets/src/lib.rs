//! Machine-bound encrypted credential storage for Specify.
//!
//! Credentials are encrypted with AES-256-GCM under a key derived from the
//! host's machine identifier, so a copied `keys.json` is useless elsewhere.

pub mod crypto;
pub mod error;
pub mod machine_id;
pub mod store;
pub mod types;

pub use crypto::{CryptoManager, KDF_ITERATIONS};
pub use error::{Result, SecretError};
pub use machine_id::{MachineId, MachineIdSource};
pub use store::{EnvLookup, FileSecretStore, SecretStore};
pub use types::DecryptedSecret;
