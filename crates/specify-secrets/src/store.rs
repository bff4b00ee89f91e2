//! Credential storage backends.
//!
//! Defines the [`SecretStore`] trait and provides [`FileSecretStore`], which
//! keeps one encrypted JSON file (`keys.json`) in the Specify configuration
//! directory, falling back to environment variables for reads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use specify_core::{env, mask, paths, ProviderKind};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::crypto::CryptoManager;
use crate::error::{Result, SecretError};
use crate::types::{DecryptedSecret, FileFormat, KeyFile};

/// Looks up an environment variable; empty values count as unset.
pub type EnvLookup = fn(&str) -> Option<String>;

/// Async trait for credential storage backends.
///
/// Provider names are case-insensitive and must be one of the supported
/// providers.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Encrypt and persist `value` (trimmed) for `provider`.
    async fn store(&self, provider: &str, value: &str) -> Result<()>;

    /// Retrieve the credential for `provider`, local value first, then env.
    async fn get(&self, provider: &str) -> Result<DecryptedSecret>;

    /// Masked credentials for every provider with a local or env value.
    async fn list(&self) -> Result<BTreeMap<ProviderKind, String>>;

    /// Remove the locally stored credential. Environment values are untouched.
    async fn delete(&self, provider: &str) -> Result<()>;

    /// Whether a local or env value exists for `provider`.
    async fn exists(&self, provider: &str) -> Result<bool>;
}

/// A file-backed credential store.
///
/// All credentials live in `{config_dir}/keys.json`, created with mode `0600`
/// on Unix inside a `0700` directory. Writes replace the file atomically.
pub struct FileSecretStore {
    keys_path: PathBuf,
    crypto: Arc<CryptoManager>,
    write_lock: Mutex<()>,
    env_lookup: EnvLookup,
}

impl FileSecretStore {
    /// Create a store rooted at `config_dir`, keyed to this machine.
    ///
    /// Does not touch the filesystem; see [`FileSecretStore::open`].
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        let crypto = CryptoManager::new(config_dir.as_ref());
        Self::with_crypto(config_dir, crypto)
    }

    /// Create a store rooted at `config_dir` using an explicit crypto manager.
    pub fn with_crypto(config_dir: impl AsRef<Path>, crypto: CryptoManager) -> Self {
        Self {
            keys_path: paths::keys_file(config_dir.as_ref()),
            crypto: Arc::new(crypto),
            write_lock: Mutex::new(()),
            env_lookup: env::get_var,
        }
    }

    /// Replace the environment lookup used for fallback reads.
    pub fn with_env_lookup(mut self, lookup: EnvLookup) -> Self {
        self.env_lookup = lookup;
        self
    }

    /// Create a store in `config_dir` and migrate a legacy file if present.
    pub async fn open(config_dir: impl AsRef<Path>) -> Result<Self> {
        let store = Self::new(config_dir);
        store.migrate().await?;
        Ok(store)
    }

    /// Open the store in the default configuration directory.
    ///
    /// Honours `SPECIFY_CONFIG_DIR`, otherwise `~/.specify`.
    pub async fn open_default() -> Result<Self> {
        let dir = paths::config_dir()?;
        Self::open(dir).await
    }

    /// Path of the credential file.
    pub fn keys_path(&self) -> &Path {
        &self.keys_path
    }

    /// The crypto manager backing this store.
    pub fn crypto(&self) -> &CryptoManager {
        &self.crypto
    }

    /// Rewrite a legacy plaintext file in encrypted form.
    ///
    /// Returns `true` if a migration happened. Reads never migrate on their
    /// own; call this once at startup.
    pub async fn migrate(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let Some(file) = self.read_file().await? else {
            return Ok(false);
        };
        if !file.needs_migration() {
            return Ok(false);
        }

        let count = file.entries.len();
        let ciphertexts = self.encrypt_all(&file.entries).await?;
        self.write_ciphertexts(&ciphertexts).await?;
        info!(
            path = %self.keys_path.display(),
            count,
            "migrated plaintext keys file to encrypted format"
        );
        Ok(true)
    }

    /// Derive the key off the async executor.
    async fn unlock(&self) -> Result<()> {
        let crypto = Arc::clone(&self.crypto);
        tokio::task::spawn_blocking(move || crypto.unlock())
            .await
            .map_err(|e| SecretError::EncryptionFailed(format!("key derivation task failed: {e}")))?
    }

    async fn read_file(&self) -> Result<Option<KeyFile>> {
        match tokio::fs::read_to_string(&self.keys_path).await {
            Ok(data) => KeyFile::parse(&data, &self.keys_path).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Local ciphertext for every stored provider.
    ///
    /// Encrypted entries pass through untouched, so entries this machine cannot
    /// decrypt survive a write for another provider. Legacy plaintext is
    /// encrypted on the way through.
    async fn load_ciphertexts(&self) -> Result<BTreeMap<ProviderKind, String>> {
        let Some(file) = self.read_file().await? else {
            return Ok(BTreeMap::new());
        };

        match file.format {
            FileFormat::Encrypted => Ok(file.entries),
            FileFormat::Unrecognized => Ok(BTreeMap::new()),
            FileFormat::Legacy => self.encrypt_all(&file.entries).await,
        }
    }

    /// Local plaintext values, decrypting when the file is encrypted.
    async fn load_local(&self) -> Result<BTreeMap<ProviderKind, String>> {
        let Some(file) = self.read_file().await? else {
            return Ok(BTreeMap::new());
        };

        match file.format {
            FileFormat::Legacy => Ok(file.entries),
            FileFormat::Unrecognized => Ok(BTreeMap::new()),
            FileFormat::Encrypted => {
                if !file.entries.is_empty() {
                    self.unlock().await?;
                }
                file.entries
                    .into_iter()
                    .map(|(provider, ciphertext)| {
                        self.decrypt_entry(provider, &ciphertext)
                            .map(|plaintext| (provider, plaintext))
                    })
                    .collect()
            }
        }
    }

    /// Local plaintext value for a single provider.
    async fn load_one(&self, provider: ProviderKind) -> Result<Option<String>> {
        let Some(mut file) = self.read_file().await? else {
            return Ok(None);
        };
        let Some(raw) = file.entries.remove(&provider) else {
            return Ok(None);
        };

        match file.format {
            FileFormat::Legacy => Ok(Some(raw)),
            FileFormat::Unrecognized => Ok(None),
            FileFormat::Encrypted => {
                self.unlock().await?;
                self.decrypt_entry(provider, &raw).map(Some)
            }
        }
    }

    fn decrypt_entry(&self, provider: ProviderKind, ciphertext: &str) -> Result<String> {
        self.crypto.decrypt(ciphertext).map_err(|e| match e {
            SecretError::DecryptionFailed(msg) => SecretError::DecryptionFailed(format!(
                "could not decrypt the {provider} key in {}: {msg}",
                self.keys_path.display()
            )),
            other => other,
        })
    }

    async fn encrypt_all(
        &self,
        plaintexts: &BTreeMap<ProviderKind, String>,
    ) -> Result<BTreeMap<ProviderKind, String>> {
        self.unlock().await?;
        plaintexts
            .iter()
            .map(|(provider, plaintext)| Ok((*provider, self.crypto.encrypt(plaintext)?)))
            .collect()
    }

    /// Atomically replace the credential file with `ciphertexts`.
    async fn write_ciphertexts(&self, ciphertexts: &BTreeMap<ProviderKind, String>) -> Result<()> {
        let json = KeyFile::encrypted_json(ciphertexts)?;

        if let Some(dir) = self.keys_path.parent() {
            paths::ensure_private_dir(dir)?;
        }

        let tmp_path = self.keys_path.with_extension("json.tmp");
        debug!(path = %self.keys_path.display(), count = ciphertexts.len(), "writing keys file");
        write_private_file(&tmp_path, json.as_bytes()).await?;
        tokio::fs::rename(&tmp_path, &self.keys_path).await?;
        Ok(())
    }

    fn env_value(&self, provider: ProviderKind) -> Option<String> {
        (self.env_lookup)(provider.env_var())
    }
}

impl std::fmt::Debug for FileSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSecretStore")
            .field("keys_path", &self.keys_path)
            .field("crypto", &self.crypto)
            .finish_non_exhaustive()
    }
}

/// Parse a provider name, reporting unknown names as validation errors.
fn parse_provider(name: &str) -> Result<ProviderKind> {
    name.parse::<ProviderKind>()
        .map_err(|e| SecretError::validation(e.to_string()))
}

/// Write `data` to `path` with mode 0600 on Unix.
async fn write_private_file(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(path, perms).await?;
    }

    Ok(())
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn store(&self, provider: &str, value: &str) -> Result<()> {
        let provider = parse_provider(provider)?;
        let value = value.trim();
        if value.is_empty() {
            return Err(SecretError::validation(format!(
                "Key for {provider} must not be empty"
            )));
        }

        let _guard = self.write_lock.lock().await;
        let mut ciphertexts = self.load_ciphertexts().await?;
        self.unlock().await?;
        ciphertexts.insert(provider, self.crypto.encrypt(value)?);
        self.write_ciphertexts(&ciphertexts).await?;

        info!(%provider, "stored key");
        Ok(())
    }

    async fn get(&self, provider: &str) -> Result<DecryptedSecret> {
        let provider = parse_provider(provider)?;

        if let Some(value) = self.load_one(provider).await? {
            debug!(%provider, "using stored key");
            return Ok(DecryptedSecret::new(value));
        }
        if let Some(value) = self.env_value(provider) {
            debug!(%provider, var = provider.env_var(), "using key from environment");
            return Ok(DecryptedSecret::new(value));
        }
        Err(SecretError::NotFound(provider.to_string()))
    }

    async fn list(&self) -> Result<BTreeMap<ProviderKind, String>> {
        let mut masked: BTreeMap<ProviderKind, String> = self
            .load_local()
            .await?
            .into_iter()
            .map(|(provider, value)| (provider, mask(&value)))
            .collect();

        for provider in ProviderKind::ALL {
            if masked.contains_key(&provider) {
                continue;
            }
            if let Some(value) = self.env_value(provider) {
                masked.insert(provider, mask(&value));
            }
        }
        Ok(masked)
    }

    async fn delete(&self, provider: &str) -> Result<()> {
        let provider = parse_provider(provider)?;

        let _guard = self.write_lock.lock().await;
        let mut ciphertexts = self.load_ciphertexts().await?;
        if ciphertexts.remove(&provider).is_none() {
            return Err(SecretError::NotFound(provider.to_string()));
        }
        self.write_ciphertexts(&ciphertexts).await?;

        info!(%provider, "deleted key");
        Ok(())
    }

    async fn exists(&self, provider: &str) -> Result<bool> {
        let provider = parse_provider(provider)?;

        let local = match self.read_file().await? {
            Some(file) if file.format != FileFormat::Unrecognized => {
                file.entries.contains_key(&provider)
            }
            _ => false,
        };
        Ok(local || self.env_value(provider).is_some())
    }
}
