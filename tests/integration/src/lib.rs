//! Shared fixtures for the integration tests.

use std::path::Path;

use specify_secrets::{CryptoManager, FileSecretStore, MachineId};

/// PBKDF2 rounds used by fixtures; far below production strength.
pub const TEST_ITERATIONS: u32 = 1_000;

/// Crypto manager bound to a fixed machine identifier.
pub fn test_crypto(dir: &Path, machine: &str) -> CryptoManager {
    CryptoManager::with_machine_id(dir, MachineId::new(machine)).with_iterations(TEST_ITERATIONS)
}

/// Store in `dir` that ignores the process environment.
pub fn test_store(dir: &Path) -> FileSecretStore {
    FileSecretStore::with_crypto(dir, test_crypto(dir, "integration-machine"))
        .with_env_lookup(|_| None)
}
