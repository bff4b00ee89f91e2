//! Core types for credential storage.
//!
//! Provides the in-memory form of a credential and the on-disk layout of the
//! credential file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde_json::Value;
use specify_core::{ProviderKind, SecretString};
use tracing::warn;

use crate::error::{Result, SecretError};

/// Marker key set to `true` in files whose values are ciphertext.
pub const ENCRYPTED_MARKER: &str = "_encrypted";

/// Marker key holding the file format version.
pub const VERSION_MARKER: &str = "_version";

/// Current file format version.
pub const FORMAT_VERSION: u64 = 2;

/// A decrypted credential held in memory.
///
/// Wraps `SecretString` so the plaintext is zeroed on drop. Debug and Display
/// both emit `[REDACTED]` to prevent accidental logging.
#[derive(Clone)]
pub struct DecryptedSecret {
    inner: SecretString,
}

impl DecryptedSecret {
    /// Create a new decrypted secret from raw plaintext.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::new(value),
        }
    }

    /// Expose the plaintext value. Use sparingly.
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Masked form suitable for display.
    pub fn masked(&self) -> String {
        self.inner.masked()
    }
}

impl fmt::Debug for DecryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for DecryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for DecryptedSecret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// How the values in a credential file are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileFormat {
    /// Values are ciphertext produced by the crypto manager.
    Encrypted,
    /// Values are plaintext; written by releases before encryption.
    Legacy,
    /// The top-level value is not an object; treated as holding nothing.
    Unrecognized,
}

/// Parsed contents of the credential file.
///
/// `entries` holds the raw string values: ciphertext for
/// [`FileFormat::Encrypted`], plaintext for [`FileFormat::Legacy`].
#[derive(Debug)]
pub(crate) struct KeyFile {
    pub format: FileFormat,
    pub entries: BTreeMap<ProviderKind, String>,
}

impl KeyFile {
    /// Parse the file contents read from `path`.
    ///
    /// Unknown provider names and non-string values are skipped with a warning.
    pub fn parse(data: &str, path: &Path) -> Result<Self> {
        let value: Value = serde_json::from_str(data).map_err(|e| {
            SecretError::validation(format!(
                "Invalid keys file format: {e}. Please fix or delete the file at {}",
                path.display()
            ))
        })?;

        let Value::Object(map) = value else {
            warn!(path = %path.display(), "keys file is not a JSON object; ignoring its contents");
            return Ok(Self {
                format: FileFormat::Unrecognized,
                entries: BTreeMap::new(),
            });
        };

        let format = match map.get(ENCRYPTED_MARKER) {
            Some(Value::Bool(true)) => FileFormat::Encrypted,
            _ => FileFormat::Legacy,
        };
        if format == FileFormat::Encrypted {
            if let Some(version) = map.get(VERSION_MARKER).and_then(Value::as_u64) {
                if version != FORMAT_VERSION {
                    warn!(version, expected = FORMAT_VERSION, "unexpected keys file version");
                }
            }
        }

        let mut entries = BTreeMap::new();
        for (key, value) in map {
            if key.starts_with('_') {
                continue;
            }
            let Ok(provider) = key.parse::<ProviderKind>() else {
                warn!(key = %key, "skipping unknown provider in keys file");
                continue;
            };
            match value {
                Value::String(s) => {
                    entries.insert(provider, s);
                }
                _ => warn!(%provider, "skipping non-string value in keys file"),
            }
        }

        Ok(Self { format, entries })
    }

    /// Whether the file holds plaintext values that should be rewritten.
    pub fn needs_migration(&self) -> bool {
        self.format == FileFormat::Legacy && !self.entries.is_empty()
    }

    /// Serialize ciphertext entries with the format markers, keys sorted.
    pub fn encrypted_json(ciphertexts: &BTreeMap<ProviderKind, String>) -> Result<String> {
        let mut doc: BTreeMap<&str, Value> = BTreeMap::new();
        doc.insert(ENCRYPTED_MARKER, Value::Bool(true));
        doc.insert(VERSION_MARKER, Value::from(FORMAT_VERSION));
        for (provider, ciphertext) in ciphertexts {
            doc.insert(provider.as_str(), Value::String(ciphertext.clone()));
        }
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}
