//! Session credential store and remote session retrieval.
//!
//! Credentials are an opaque blob owned by the protocol library; this module
//! only decides where they live and how they get there. Startup resolution
//! order: existing local file, then a remote encrypted blob addressed by a
//! `StatusBot~<fileId>#<decryptKey>` identifier, then interactive QR pairing.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ctr::cipher::{KeyIvInit, StreamCipher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::retry::{is_transient, retry_with_backoff};
use super::traits::{AuthMode, WaError, WaResult};

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

/// Marker token prefixing every recognized remote session identifier.
pub const SESSION_MARKER: &str = "StatusBot~";

/// Filename of the credential snapshot inside the session directory.
const CREDS_FILE: &str = "creds.json";

/// Transient fetch failures retried before giving up on the remote blob.
const DOWNLOAD_RETRIES: u32 = 2;

/// Parsed remote session identifier: `StatusBot~<fileId>#<decryptKey>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSessionId {
    pub file_id: String,
    pub decrypt_key: String,
}

impl RemoteSessionId {
    /// Parse the composite identifier. Returns `None` for anything that is
    /// not marker + `fileId#decryptKey` with both parts non-empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let (_, rest) = raw.split_once(SESSION_MARKER)?;
        let (file_id, decrypt_key) = rest.split_once('#')?;
        if file_id.is_empty() || decrypt_key.is_empty() {
            return None;
        }
        Some(Self {
            file_id: file_id.to_string(),
            decrypt_key: decrypt_key.to_string(),
        })
    }
}

/// Remote file storage holding encrypted session blobs.
///
/// The production implementation is HTTP; tests substitute a scripted vault.
#[async_trait]
pub trait SessionVault: Send + Sync {
    async fn fetch(&self, file_id: &str) -> WaResult<Vec<u8>>;
}

/// HTTP session vault.
pub struct HttpSessionVault {
    base_url: String,
    http: reqwest::Client,
}

impl HttpSessionVault {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SessionVault for HttpSessionVault {
    async fn fetch(&self, file_id: &str) -> WaResult<Vec<u8>> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), file_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| WaError::Network(format!("vault request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(WaError::Session(format!(
                "vault returned {} for {file_id}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WaError::Network(format!("vault body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Decrypt a session blob with the vault's folded-key scheme: the URL-safe
/// base64 key decodes to 32 bytes, the AES-128 key is the XOR of its two
/// halves, and the CTR nonce is bytes 16..24 padded with zeros.
pub(crate) fn decrypt_session_blob(decrypt_key: &str, mut data: Vec<u8>) -> WaResult<Vec<u8>> {
    let key_bytes = URL_SAFE_NO_PAD
        .decode(decrypt_key)
        .map_err(|e| WaError::Session(format!("invalid decrypt key encoding: {e}")))?;
    if key_bytes.len() != 32 {
        return Err(WaError::Session(format!(
            "decrypt key must decode to 32 bytes, got {}",
            key_bytes.len()
        )));
    }

    let mut key = [0u8; 16];
    for i in 0..16 {
        key[i] = key_bytes[i] ^ key_bytes[i + 16];
    }
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&key_bytes[16..24]);

    let mut cipher = Aes128Ctr::new(&key.into(), &iv.into());
    cipher.apply_keystream(&mut data);
    Ok(data)
}

/// Local credential store under a session directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    session_dir: PathBuf,
}

impl SessionStore {
    pub fn new(session_dir: impl AsRef<Path>) -> Self {
        Self {
            session_dir: session_dir.as_ref().to_path_buf(),
        }
    }

    pub fn creds_path(&self) -> PathBuf {
        self.session_dir.join(CREDS_FILE)
    }

    pub fn has_local_session(&self) -> bool {
        self.creds_path().is_file()
    }

    /// Write the latest credential snapshot, overwriting any prior one.
    pub fn persist_credentials(&self, blob: &[u8]) -> WaResult<()> {
        fs::create_dir_all(&self.session_dir)
            .map_err(|e| WaError::Session(format!("cannot create session dir: {e}")))?;
        fs::write(self.creds_path(), blob)
            .map_err(|e| WaError::Session(format!("cannot write credentials: {e}")))?;
        Ok(())
    }

    /// Fetch, decrypt and persist a remote session blob. Returns `false` on
    /// any failure — malformed identifiers fail before any vault access —
    /// and the caller falls back to QR pairing.
    pub async fn download_remote_session<V: SessionVault>(
        &self,
        session_id: &str,
        vault: &V,
    ) -> bool {
        let parsed = match RemoteSessionId::parse(session_id) {
            Some(parsed) => parsed,
            None => {
                warn!("invalid SESSION_ID format, expected {SESSION_MARKER}<fileId>#<decryptKey>");
                return false;
            }
        };

        match self.try_download(&parsed, vault).await {
            Ok(()) => {
                info!("remote session downloaded and persisted");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to download remote session");
                false
            }
        }
    }

    async fn try_download<V: SessionVault>(
        &self,
        id: &RemoteSessionId,
        vault: &V,
    ) -> WaResult<()> {
        let encrypted = retry_with_backoff(
            || vault.fetch(&id.file_id),
            is_transient,
            DOWNLOAD_RETRIES,
        )
        .await?;
        let blob = decrypt_session_blob(&id.decrypt_key, encrypted)?;
        self.persist_credentials(&blob)
    }

    /// Startup auth resolution: local file, then remote download, then QR.
    pub async fn resolve_auth_mode<V: SessionVault>(
        &self,
        session_id: Option<&str>,
        vault: &V,
    ) -> AuthMode {
        if self.has_local_session() {
            info!("session file found");
            return AuthMode::Restored;
        }
        if let Some(id) = session_id {
            if self.download_remote_session(id, vault).await {
                return AuthMode::Restored;
            }
        }
        info!("no usable session, falling back to QR pairing");
        AuthMode::QrPairing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    // 32 zero bytes, URL-safe base64 without padding.
    const ZERO_KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    struct ScriptedVault {
        fetches: AtomicU32,
        responses: Mutex<Vec<WaResult<Vec<u8>>>>,
    }

    impl ScriptedVault {
        fn new(responses: Vec<WaResult<Vec<u8>>>) -> Self {
            Self {
                fetches: AtomicU32::new(0),
                responses: Mutex::new(responses),
            }
        }

        fn fetch_count(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionVault for ScriptedVault {
        async fn fetch(&self, _file_id: &str) -> WaResult<Vec<u8>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(WaError::Session("vault script exhausted".to_string()));
            }
            responses.remove(0)
        }
    }

    #[test]
    fn parse_accepts_well_formed_identifier() {
        let id = RemoteSessionId::parse("StatusBot~abc123#secretKey").unwrap();
        assert_eq!(id.file_id, "abc123");
        assert_eq!(id.decrypt_key, "secretKey");
    }

    #[test]
    fn parse_rejects_missing_marker() {
        assert!(RemoteSessionId::parse("abc123#secretKey").is_none());
    }

    #[test]
    fn parse_rejects_missing_hash() {
        assert!(RemoteSessionId::parse("StatusBot~abc123secretKey").is_none());
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert!(RemoteSessionId::parse("StatusBot~#secretKey").is_none());
        assert!(RemoteSessionId::parse("StatusBot~abc123#").is_none());
    }

    proptest! {
        #[test]
        fn parse_never_accepts_markerless_input(raw in "[a-zA-Z0-9#_-]{0,64}") {
            prop_assume!(!raw.contains(SESSION_MARKER));
            prop_assert!(RemoteSessionId::parse(&raw).is_none());
        }

        #[test]
        fn parse_never_accepts_hashless_input(tail in "[a-zA-Z0-9_-]{0,64}") {
            let raw = format!("{SESSION_MARKER}{tail}");
            prop_assert!(RemoteSessionId::parse(&raw).is_none());
        }
    }

    #[test]
    fn decrypt_rejects_short_keys() {
        let result = decrypt_session_blob("c2hvcnQ", b"data".to_vec());
        assert!(result.is_err());
    }

    #[test]
    fn decrypt_rejects_invalid_base64() {
        let result = decrypt_session_blob("not!valid!", b"data".to_vec());
        assert!(result.is_err());
    }

    #[test]
    fn decrypt_is_a_ctr_involution() {
        // CTR is keystream XOR, so "decrypting" plaintext yields the
        // ciphertext the vault would hold, and decrypting that round-trips.
        let plaintext = b"{\"noiseKey\":\"...\"}".to_vec();
        let ciphertext = decrypt_session_blob(ZERO_KEY, plaintext.clone()).unwrap();
        assert_ne!(ciphertext, plaintext);
        let recovered = decrypt_session_blob(ZERO_KEY, ciphertext).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[tokio::test]
    async fn malformed_identifier_never_touches_the_vault() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));
        let vault = ScriptedVault::new(vec![]);

        assert!(!store.download_remote_session("garbage", &vault).await);
        assert!(!store.download_remote_session("StatusBot~nohash", &vault).await);
        assert_eq!(vault.fetch_count(), 0);
        assert!(!store.has_local_session());
    }

    #[tokio::test]
    async fn successful_download_writes_decrypted_blob() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));

        let plaintext = b"persisted credential blob".to_vec();
        let ciphertext = decrypt_session_blob(ZERO_KEY, plaintext.clone()).unwrap();
        let vault = ScriptedVault::new(vec![Ok(ciphertext)]);

        let id = format!("StatusBot~file42#{ZERO_KEY}");
        assert!(store.download_remote_session(&id, &vault).await);
        assert_eq!(vault.fetch_count(), 1);
        assert_eq!(fs::read(store.creds_path()).unwrap(), plaintext);
    }

    #[tokio::test(start_paused = true)]
    async fn download_retries_transient_fetch_failures() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));

        let plaintext = b"blob".to_vec();
        let ciphertext = decrypt_session_blob(ZERO_KEY, plaintext.clone()).unwrap();
        let vault = ScriptedVault::new(vec![
            Err(WaError::Network("timeout".to_string())),
            Ok(ciphertext),
        ]);

        let id = format!("StatusBot~file42#{ZERO_KEY}");
        assert!(store.download_remote_session(&id, &vault).await);
        assert_eq!(vault.fetch_count(), 2);
    }

    #[tokio::test]
    async fn non_transient_fetch_failure_returns_false() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));
        let vault = ScriptedVault::new(vec![Err(WaError::Session("gone".to_string()))]);

        let id = format!("StatusBot~file42#{ZERO_KEY}");
        assert!(!store.download_remote_session(&id, &vault).await);
        assert_eq!(vault.fetch_count(), 1);
        assert!(!store.has_local_session());
    }

    #[tokio::test]
    async fn persist_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));

        store.persist_credentials(b"first").unwrap();
        store.persist_credentials(b"second").unwrap();
        assert_eq!(fs::read(store.creds_path()).unwrap(), b"second");
    }

    #[tokio::test]
    async fn resolve_prefers_local_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));
        store.persist_credentials(b"existing").unwrap();

        let vault = ScriptedVault::new(vec![]);
        let mode = store
            .resolve_auth_mode(Some("StatusBot~file#key"), &vault)
            .await;
        assert_eq!(mode, AuthMode::Restored);
        assert_eq!(vault.fetch_count(), 0);
    }

    #[tokio::test]
    async fn resolve_falls_back_to_qr_without_session_id() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));
        let vault = ScriptedVault::new(vec![]);

        assert_eq!(
            store.resolve_auth_mode(None, &vault).await,
            AuthMode::QrPairing
        );
    }

    #[tokio::test]
    async fn resolve_falls_back_to_qr_on_failed_download() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));
        let vault = ScriptedVault::new(vec![Err(WaError::Session("gone".to_string()))]);

        let id = format!("StatusBot~file42#{ZERO_KEY}");
        assert_eq!(
            store.resolve_auth_mode(Some(&id), &vault).await,
            AuthMode::QrPairing
        );
    }
}
