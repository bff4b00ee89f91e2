//! Machine-bound AES-256-GCM encryption with PBKDF2-HMAC-SHA256 key derivation.
//!
//! The key is derived from the host's [`MachineId`] and a 16-byte salt that is
//! generated once and persisted next to the credential file. Each encryption
//! uses a fresh random nonce, which is prepended to the ciphertext; the whole
//! thing is base64-encoded so it can live in a JSON string.

use std::path::{Path, PathBuf};

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::OnceCell;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::{Result, SecretError};
use crate::machine_id::{MachineId, MachineIdSource};

/// PBKDF2 iteration count for the derived key.
pub const KDF_ITERATIONS: u32 = 1_200_000;

const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const SALT_SIZE: usize = 16;
const KEY_SIZE: usize = 32;

/// Appended to every decryption failure so users know how to recover.
const REPROVISION_HINT: &str = "The credential file was written on a different machine or is \
     corrupted. Re-enter your keys with `specify config set-key --provider <name> --key <key>` \
     or remove them with `specify config delete-key --provider <name>`.";

type DerivedKey = Zeroizing<[u8; KEY_SIZE]>;

/// Derives a machine-bound key and encrypts short secrets with it.
///
/// The key is derived at most once per instance, on first use or through
/// [`CryptoManager::unlock`]; concurrent first use derives it only once.
pub struct CryptoManager {
    salt_path: PathBuf,
    machine_id: Option<MachineId>,
    iterations: u32,
    key: OnceCell<DerivedKey>,
    source: OnceCell<MachineIdSource>,
}

impl CryptoManager {
    /// Create a manager whose salt lives in `config_dir`, keyed to this host.
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            salt_path: specify_core::paths::salt_file(config_dir.as_ref()),
            machine_id: None,
            iterations: KDF_ITERATIONS,
            key: OnceCell::new(),
            source: OnceCell::new(),
        }
    }

    /// Create a manager keyed to an explicit identifier instead of this host.
    pub fn with_machine_id(config_dir: impl AsRef<Path>, machine_id: MachineId) -> Self {
        Self {
            machine_id: Some(machine_id),
            ..Self::new(config_dir)
        }
    }

    /// Override the PBKDF2 iteration count.
    ///
    /// Values below [`KDF_ITERATIONS`] weaken the key and exist for tests.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    /// Path of the persisted salt.
    pub fn salt_path(&self) -> &Path {
        &self.salt_path
    }

    /// Source of the machine identifier, once the key has been derived.
    ///
    /// `Some(MachineIdSource::HostUser)` means the weaker fallback was used.
    pub fn machine_id_source(&self) -> Option<MachineIdSource> {
        self.source.get().copied()
    }

    /// Derive the key now rather than on first use.
    ///
    /// This is CPU-heavy; async callers should run it on a blocking thread.
    pub fn unlock(&self) -> Result<()> {
        self.key().map(|_| ())
    }

    /// Encrypt `plaintext`, returning base64(nonce || ciphertext || tag).
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = Aes256Gcm::new_from_slice(self.key()?.as_slice())
            .map_err(|e| SecretError::EncryptionFailed(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| SecretError::EncryptionFailed(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    /// Decrypt a value produced by [`CryptoManager::encrypt`].
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let sealed = BASE64
            .decode(encoded.trim())
            .map_err(|e| decryption_error(format!("value is not valid base64 ({e})")))?;

        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(decryption_error("value is too short to be a ciphertext"));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);

        let key = self.key().map_err(|e| match e {
            SecretError::EncryptionFailed(msg) => decryption_error(msg),
            other => other,
        })?;
        let cipher = Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|e| decryption_error(e.to_string()))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| decryption_error("authentication tag mismatch"))?;

        String::from_utf8(plaintext)
            .map_err(|_| decryption_error("decrypted value is not valid UTF-8"))
    }

    fn key(&self) -> Result<&DerivedKey> {
        self.key.get_or_try_init(|| {
            let machine_id = match &self.machine_id {
                Some(id) => id.clone(),
                None => MachineId::resolve()?,
            };
            let _ = self.source.set(machine_id.source());
            if machine_id.source().is_fallback() {
                warn!(
                    source = %machine_id.source(),
                    "encryption key is bound to a weak machine identifier"
                );
            }

            let salt = load_or_create_salt(&self.salt_path)?;

            debug!(iterations = self.iterations, "deriving encryption key");
            let mut key = Zeroizing::new([0u8; KEY_SIZE]);
            pbkdf2::pbkdf2_hmac::<Sha256>(
                machine_id.as_bytes(),
                &salt,
                self.iterations,
                key.as_mut_slice(),
            );
            Ok(key)
        })
    }
}

impl std::fmt::Debug for CryptoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoManager")
            .field("salt_path", &self.salt_path)
            .field("iterations", &self.iterations)
            .field("unlocked", &self.key.get().is_some())
            .finish()
    }
}

fn decryption_error(detail: impl std::fmt::Display) -> SecretError {
    SecretError::DecryptionFailed(format!("{detail}. {REPROVISION_HINT}"))
}

/// Load the salt at `path`, creating it if missing or not exactly 16 bytes.
fn load_or_create_salt(path: &Path) -> Result<[u8; SALT_SIZE]> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.len() == SALT_SIZE => {
            let mut salt = [0u8; SALT_SIZE];
            salt.copy_from_slice(&bytes);
            return Ok(salt);
        }
        Ok(bytes) => {
            warn!(
                path = %path.display(),
                len = bytes.len(),
                "salt file has unexpected length; generating a new salt"
            );
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(SecretError::EncryptionFailed(format!(
                "could not read salt file {}: {e}",
                path.display()
            )))
        }
    }

    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    write_salt(path, &salt).map_err(|e| {
        SecretError::EncryptionFailed(format!(
            "could not write salt file {}: {e}",
            path.display()
        ))
    })?;
    debug!(path = %path.display(), "created new salt");
    Ok(salt)
}

fn write_salt(path: &Path, salt: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        specify_core::paths::ensure_private_dir(dir).map_err(|e| match e {
            specify_core::ConfigError::Io(io) => io,
            other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        })?;
    }

    std::fs::write(path, salt)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
