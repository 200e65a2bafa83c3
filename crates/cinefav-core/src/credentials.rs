use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::models::{Credential, Profile};

const TOKEN_KEY: &str = "token";
const PROFILE_KEY: &str = "user";

/// Minimal persistent key-value storage the credential store sits on
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> crate::Result<Option<String>>;

    /// Write every entry or none of them
    fn set_many(&self, entries: &[(&str, &str)]) -> crate::Result<()>;

    fn remove(&self, key: &str) -> crate::Result<()>;
}

impl KeyValueStore for cinefav_cache::CacheManager {
    fn get(&self, key: &str) -> crate::Result<Option<String>> {
        Ok(cinefav_cache::CacheManager::get(self, key)?)
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> crate::Result<()> {
        Ok(cinefav_cache::CacheManager::set_many(self, entries)?)
    }

    fn remove(&self, key: &str) -> crate::Result<()> {
        Ok(cinefav_cache::CacheManager::remove(self, key)?)
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> crate::Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| crate::Error::StorageError("memory store lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> crate::Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| crate::Error::StorageError("memory store lock poisoned".into()))?;
        for (key, value) in entries {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> crate::Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| crate::Error::StorageError("memory store lock poisoned".into()))?;
        values.remove(key);
        Ok(())
    }
}

/// Profile as written under the `user` key
#[derive(Debug, Serialize, Deserialize)]
struct StoredProfile {
    #[serde(flatten)]
    profile: Profile,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
}

/// Persists the bearer token and the cached profile across restarts.
///
/// The token is XOR'd with a machine-specific key and base64 encoded before
/// it hits storage. That keeps it out of casual `sqlite3` sessions; it is not
/// encryption.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Read token and profile. Anything unreadable counts as signed out.
    pub fn load(&self) -> Option<Credential> {
        let token = self.read_token()?;

        let raw_profile = match self.store.get(PROFILE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read stored profile: {}", e);
                return None;
            }
        };

        let stored: StoredProfile = match serde_json::from_str(&raw_profile) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Stored profile is unreadable, treating as signed out: {}", e);
                return None;
            }
        };

        Some(Credential {
            token,
            profile: stored.profile,
            saved_at: stored.saved_at.unwrap_or_default(),
        })
    }

    /// Overwrite token and profile in one write
    pub fn save(&self, credential: &Credential) -> crate::Result<()> {
        let stored = StoredProfile {
            profile: credential.profile.clone(),
            saved_at: Some(credential.saved_at),
        };
        let profile_json = serde_json::to_string(&stored)
            .map_err(|e| crate::Error::StorageError(format!("Failed to serialize profile: {}", e)))?;
        let token = encode_token(&credential.token);

        self.store
            .set_many(&[(TOKEN_KEY, token.as_str()), (PROFILE_KEY, profile_json.as_str())])?;
        info!("Saved credential for {}", credential.profile.username);
        Ok(())
    }

    /// Remove the cached profile. The token stays behind.
    pub fn clear(&self) -> crate::Result<()> {
        self.store.remove(PROFILE_KEY)?;
        debug!("Cleared stored profile");
        Ok(())
    }

    /// Remove profile and token
    pub fn forget(&self) -> crate::Result<()> {
        self.store.remove(PROFILE_KEY)?;
        self.store.remove(TOKEN_KEY)?;
        debug!("Forgot stored credential");
        Ok(())
    }

    /// Whether a token is on disk, with or without a profile
    pub fn has_token(&self) -> bool {
        self.read_token().is_some()
    }

    fn read_token(&self) -> Option<String> {
        match self.store.get(TOKEN_KEY) {
            Ok(Some(raw)) => {
                let token = decode_token(&raw);
                if token.is_none() {
                    warn!("Stored token is unreadable, treating as signed out");
                }
                token
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read stored token: {}", e);
                None
            }
        }
    }
}

fn encode_token(token: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(xor_with_machine_key(token.as_bytes()))
}

fn decode_token(raw: &str) -> Option<String> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(raw.trim()).ok()?;
    let token = String::from_utf8(xor_with_machine_key(&bytes)).ok()?;
    (!token.is_empty()).then_some(token)
}

fn xor_with_machine_key(data: &[u8]) -> Vec<u8> {
    let key = machine_key();
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}

/// 32-byte key seeded from hostname + username.
///
/// FNV-1a rather than std's DefaultHasher, whose output may change between
/// toolchains and would lock users out after an upgrade.
fn machine_key() -> Vec<u8> {
    let hostname = hostname::get()
        .unwrap_or_else(|_| std::ffi::OsString::from("unknown"))
        .to_string_lossy()
        .to_string();
    let username = whoami::username();
    let seed = format!("cinefav-{}-{}", hostname, username);

    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in seed.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }

    let mut key = Vec::with_capacity(32);
    let mut val = hash;
    for _ in 0..4 {
        key.extend_from_slice(&val.to_le_bytes());
        val = val.wrapping_mul(1103515245).wrapping_add(12345);
    }
    key
}
