//! Host identification used to bind the encryption key to this machine.
//!
//! The platform identifier comes from `machine_uid`: the systemd/D-Bus
//! machine-id on Linux, `IOPlatformUUID` on macOS, and the cryptography
//! `MachineGuid` on Windows. When none is available the hostname combined with
//! the user name is used instead. That value is guessable, so it is reported as
//! a fallback through [`MachineIdSource::is_fallback`] and a `warn!` event.

use std::fmt;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::{Result, SecretError};

/// Where a [`MachineId`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineIdSource {
    /// systemd / D-Bus machine id file.
    LinuxMachineId,
    /// macOS hardware UUID.
    MacHardwareUuid,
    /// Windows cryptography machine GUID.
    WindowsMachineGuid,
    /// Host identifier on other platforms (BSD hostid, illumos).
    Platform,
    /// Hostname and user name; weaker than the platform sources.
    HostUser,
    /// Supplied explicitly by the caller.
    Provided,
}

impl MachineIdSource {
    /// The source `machine_uid` reads on this target.
    fn current_platform() -> Self {
        if cfg!(target_os = "linux") {
            Self::LinuxMachineId
        } else if cfg!(target_os = "macos") {
            Self::MacHardwareUuid
        } else if cfg!(target_os = "windows") {
            Self::WindowsMachineGuid
        } else {
            Self::Platform
        }
    }

    /// Whether this source is the guessable hostname/user fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::HostUser)
    }
}

impl fmt::Display for MachineIdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LinuxMachineId => "machine-id file",
            Self::MacHardwareUuid => "hardware UUID",
            Self::WindowsMachineGuid => "registry MachineGuid",
            Self::Platform => "platform host identifier",
            Self::HostUser => "hostname and user name",
            Self::Provided => "caller-provided identifier",
        };
        f.write_str(label)
    }
}

/// Opaque bytes identifying the host.
#[derive(Clone)]
pub struct MachineId {
    value: Zeroizing<Vec<u8>>,
    source: MachineIdSource,
}

impl MachineId {
    /// Wrap an identifier supplied by the caller.
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: Zeroizing::new(value.into()),
            source: MachineIdSource::Provided,
        }
    }

    /// Resolve the identifier of the current host.
    pub fn resolve() -> Result<Self> {
        match machine_uid::get() {
            Ok(value) => {
                if let Some(value) = non_empty(&value) {
                    let source = MachineIdSource::current_platform();
                    debug!(%source, "resolved machine identifier");
                    return Ok(Self::from_source(value, source));
                }
            }
            Err(e) => debug!(error = %e, "platform machine identifier unavailable"),
        }

        let value = host_user_fallback()?;
        warn!(
            "no platform machine identifier available; falling back to hostname and \
             user name, which makes the stored credentials easier to decrypt elsewhere"
        );
        Ok(Self::from_source(value, MachineIdSource::HostUser))
    }

    fn from_source(value: String, source: MachineIdSource) -> Self {
        Self {
            value: Zeroizing::new(value.into_bytes()),
            source,
        }
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// Where the identifier came from.
    pub fn source(&self) -> MachineIdSource {
        self.source
    }
}

impl fmt::Debug for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineId")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

fn host_user_fallback() -> Result<String> {
    let host = hostname::get()
        .ok()
        .and_then(|h| non_empty(&h.to_string_lossy()));
    let user = non_empty(&whoami::username());

    match (host, user) {
        (None, None) => Err(SecretError::MachineId(
            "no platform identifier, hostname, or user name is available".to_string(),
        )),
        (host, user) => Ok(format!(
            "{}:{}",
            host.unwrap_or_default(),
            user.unwrap_or_default()
        )),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_returns_identifier() {
        let id = MachineId::resolve().unwrap();
        assert!(!id.as_bytes().is_empty());
    }

    #[test]
    fn test_resolve_is_stable() {
        let a = MachineId::resolve().unwrap();
        let b = MachineId::resolve().unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(a.source(), b.source());
    }

    #[test]
    fn test_provided_identifier() {
        let id = MachineId::new("fixed-id");
        assert_eq!(id.as_bytes(), b"fixed-id");
        assert_eq!(id.source(), MachineIdSource::Provided);
        assert!(!id.source().is_fallback());
    }

    #[test]
    fn test_only_host_user_is_fallback() {
        assert!(MachineIdSource::HostUser.is_fallback());
        assert!(!MachineIdSource::LinuxMachineId.is_fallback());
        assert!(!MachineIdSource::MacHardwareUuid.is_fallback());
        assert!(!MachineIdSource::WindowsMachineGuid.is_fallback());
        assert!(!MachineIdSource::Platform.is_fallback());
    }

    #[test]
    fn test_debug_hides_value() {
        let id = MachineId::new("very-private-id");
        assert!(!format!("{id:?}").contains("very-private-id"));
    }

    #[test]
    fn test_platform_source_matches_target() {
        let source = MachineIdSource::current_platform();
        assert!(!source.is_fallback());
        if cfg!(target_os = "linux") {
            assert_eq!(source, MachineIdSource::LinuxMachineId);
        }
    }

    #[test]
    fn test_host_user_fallback_format() {
        let value = host_user_fallback().unwrap();
        assert!(value.contains(':'));
    }
}
