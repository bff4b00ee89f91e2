//! Key store integration tests.
//!
//! These tests exercise the store through its public API only: encrypted
//! persistence, legacy migration, and binding to the machine identifier.

use specify_core::{paths, ProviderKind};
use specify_integration_tests::{test_crypto, test_store};
use specify_secrets::{FileSecretStore, SecretError, SecretStore};
use tempfile::TempDir;

#[tokio::test]
async fn test_every_provider_roundtrips() {
    let dir = TempDir::new().unwrap();
    let store = test_store(dir.path());

    for provider in ProviderKind::ALL {
        let value = format!("  {provider}-secret-value  ");
        store.store(provider.as_str(), &value).await.unwrap();
    }

    let reopened = test_store(dir.path());
    for provider in ProviderKind::ALL {
        let secret = reopened.get(provider.as_str()).await.unwrap();
        assert_eq!(secret.expose(), format!("{provider}-secret-value"));
    }
}

#[tokio::test]
async fn test_list_is_masked() {
    let dir = TempDir::new().unwrap();
    let store = test_store(dir.path());
    store.store("openai", "sk-proj-abc123").await.unwrap();
    store.store("anthropic", "abc").await.unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed[&ProviderKind::OpenAi], "sk-...123");
    assert_eq!(listed[&ProviderKind::Anthropic], "***");
    assert!(!listed.contains_key(&ProviderKind::Ollama));
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = test_store(dir.path());
    store.store("openai", "sk-abc123").await.unwrap();

    store.delete("openai").await.unwrap();
    assert!(store.get("openai").await.unwrap_err().is_not_found());
    assert!(store.delete("openai").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_migrate_encrypts_legacy_file() {
    let dir = TempDir::new().unwrap();
    let keys = paths::keys_file(dir.path());
    std::fs::write(&keys, r#"{"openai": "sk-plain-text-key"}"#).unwrap();

    let store = test_store(dir.path());
    assert!(store.migrate().await.unwrap());

    assert_eq!(store.get("openai").await.unwrap().expose(), "sk-plain-text-key");

    let raw = std::fs::read_to_string(&keys).unwrap();
    assert!(!raw.contains("sk-plain-text-key"));
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["_encrypted"], true);
    assert_eq!(json["_version"], 2);
}

#[tokio::test]
async fn test_keys_do_not_decrypt_on_another_machine() {
    let dir = TempDir::new().unwrap();
    test_store(dir.path())
        .store("anthropic", "sk-ant-secret")
        .await
        .unwrap();

    let elsewhere = FileSecretStore::with_crypto(dir.path(), test_crypto(dir.path(), "other-host"))
        .with_env_lookup(|_| None);
    let err = elsewhere.get("anthropic").await.unwrap_err();
    assert!(matches!(err, SecretError::DecryptionFailed(_)));
}

#[tokio::test]
async fn test_copied_file_without_salt_cannot_decrypt() {
    let original = TempDir::new().unwrap();
    test_store(original.path())
        .store("openai", "sk-abc123")
        .await
        .unwrap();

    let copy = TempDir::new().unwrap();
    std::fs::copy(
        paths::keys_file(original.path()),
        paths::keys_file(copy.path()),
    )
    .unwrap();

    let err = test_store(copy.path()).get("openai").await.unwrap_err();
    assert!(matches!(err, SecretError::DecryptionFailed(_)));
}

#[tokio::test]
async fn test_env_fallback_when_nothing_stored() {
    let dir = TempDir::new().unwrap();
    let store = test_store(dir.path()).with_env_lookup(|name| {
        (name == "ANTHROPIC_API_KEY").then(|| "sk-ant-from-env".to_string())
    });

    assert!(store.exists("anthropic").await.unwrap());
    assert_eq!(store.get("anthropic").await.unwrap().expose(), "sk-ant-from-env");
    assert!(!paths::keys_file(dir.path()).exists());
}

#[tokio::test]
async fn test_open_migrates_with_host_binding() {
    let dir = TempDir::new().unwrap();
    let keys = paths::keys_file(dir.path());
    std::fs::write(&keys, r#"{"openai": "sk-plain-text-key"}"#).unwrap();

    let store = FileSecretStore::open(dir.path()).await.unwrap();
    assert_eq!(store.get("openai").await.unwrap().expose(), "sk-plain-text-key");
    assert!(store.crypto().machine_id_source().is_some());

    let raw = std::fs::read_to_string(&keys).unwrap();
    assert!(!raw.contains("sk-plain-text-key"));
    assert!(paths::salt_file(dir.path()).exists());
}
