//! Encrypted persistence for the local collection of key-pairs.
//!
//! On-disk format: `u8(salt_len) || if salt_len>0 { salt(salt_len) ||
//! ciphertext } else { plaintext }`. A zero salt length means the store
//! is held in cleartext (no password set for this profile).

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use satchel_stream::{ChunkedCipher, DEFAULT_CHUNK_SIZE, SALT_LEN};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::{canonical_name, KeyPairInfo};

#[derive(Serialize, Deserialize)]
struct KeyPairRecord {
    name: String,
    cipher_seed: [u8; 32],
    signing_seed: [u8; 32],
}

impl From<&KeyPairInfo> for KeyPairRecord {
    fn from(kp: &KeyPairInfo) -> Self {
        KeyPairRecord {
            name: kp.name().to_string(),
            cipher_seed: *kp.cipher_seed(),
            signing_seed: *kp.signing_seed(),
        }
    }
}

impl From<KeyPairRecord> for KeyPairInfo {
    fn from(r: KeyPairRecord) -> Self {
        KeyPairInfo::from_seeds(r.name, r.cipher_seed, r.signing_seed)
    }
}

/// Keyed by the upper-cased name; lookups are case-insensitive.
pub struct IdentityStore {
    entries: Mutex<HashMap<String, KeyPairInfo>>,
}

impl IdentityStore {
    pub fn new() -> Self {
        IdentityStore {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, keypair: KeyPairInfo) -> Result<()> {
        let key = canonical_name(keypair.name());
        let mut guard = self.entries.lock().expect("identity store mutex poisoned");
        if guard.contains_key(&key) {
            return Err(Error::NameConflict(keypair.name().to_string()));
        }
        guard.insert(key, keypair);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<KeyPairInfo> {
        let key = canonical_name(name);
        self.entries
            .lock()
            .expect("identity store mutex poisoned")
            .remove(&key)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn with<R>(&self, name: &str, f: impl FnOnce(&KeyPairInfo) -> R) -> Result<R> {
        let key = canonical_name(name);
        let guard = self.entries.lock().expect("identity store mutex poisoned");
        guard
            .get(&key)
            .map(f)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        let key = canonical_name(name);
        self.entries
            .lock()
            .expect("identity store mutex poisoned")
            .contains_key(&key)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("identity store mutex poisoned")
            .values()
            .map(|kp| kp.name().to_string())
            .collect()
    }

    fn to_records(&self) -> Vec<KeyPairRecord> {
        self.entries
            .lock()
            .expect("identity store mutex poisoned")
            .values()
            .map(KeyPairRecord::from)
            .collect()
    }

    /// Serialise and optionally encrypt the whole store.
    pub fn save_bytes(&self, password: Option<&[u8]>) -> Result<Vec<u8>> {
        let records = self.to_records();
        let plain = postcard::to_allocvec(&records)
            .map_err(|e| Error::BadFrame(format!("identity store serialisation: {e}")))?;

        match password {
            None => {
                let mut out = Vec::with_capacity(1 + plain.len());
                out.push(0u8);
                out.extend_from_slice(&plain);
                Ok(out)
            }
            Some(pw) => {
                let cipher = ChunkedCipher::for_encrypt(pw, None)?;
                let salt = cipher.salt();
                let mut ciphertext = Vec::new();
                cipher.encrypt(Cursor::new(plain), &mut ciphertext, DEFAULT_CHUNK_SIZE)?;

                let mut out = Vec::with_capacity(1 + SALT_LEN + ciphertext.len());
                out.push(SALT_LEN as u8);
                out.extend_from_slice(&salt);
                out.extend_from_slice(&ciphertext);
                Ok(out)
            }
        }
    }

    /// Reconstruct a store from bytes produced by [`Self::save_bytes`].
    pub fn load_bytes(bytes: &[u8], password: Option<&[u8]>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::BadFrame("empty identity store file".into()));
        }
        let salt_len = bytes[0] as usize;
        let rest = &bytes[1..];

        let plain = if salt_len == 0 {
            rest.to_vec()
        } else {
            if rest.len() < salt_len {
                return Err(Error::ShortRead {
                    expected: salt_len,
                    got: rest.len(),
                });
            }
            let password = password.ok_or(Error::PasswordRequired)?;
            let mut salt = [0u8; SALT_LEN];
            salt.copy_from_slice(&rest[..salt_len]);
            let ciphertext = &rest[salt_len..];

            let cipher = ChunkedCipher::for_decrypt(password, salt)?;
            let mut plain = Vec::new();
            cipher
                .decrypt(Cursor::new(ciphertext), &mut plain, DEFAULT_CHUNK_SIZE)
                .map_err(|e| match e {
                    satchel_stream::Error::AuthFail(_) => Error::PasswordMismatch,
                    other => other.into(),
                })?;
            plain
        };

        let records: Vec<KeyPairRecord> = postcard::from_bytes(&plain)
            .map_err(|e| Error::BadFrame(format!("identity store deserialisation: {e}")))?;

        let store = IdentityStore::new();
        let mut guard = store.entries.lock().expect("identity store mutex poisoned");
        for record in records {
            let kp: KeyPairInfo = record.into();
            guard.insert(canonical_name(kp.name()), kp);
        }
        drop(guard);
        Ok(store)
    }
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_without_password() {
        let store = IdentityStore::new();
        store.insert(KeyPairInfo::new_keypair_with_seeds("alice")).unwrap();
        let bytes = store.save_bytes(None).unwrap();

        let reloaded = IdentityStore::load_bytes(&bytes, None).unwrap();
        assert!(reloaded.contains("ALICE"));
        assert_eq!(reloaded.names().len(), 1);
    }

    #[test]
    fn round_trip_with_password() {
        let store = IdentityStore::new();
        store.insert(KeyPairInfo::new_keypair_with_seeds("alice")).unwrap();
        store.insert(KeyPairInfo::new_keypair_with_seeds("bob")).unwrap();
        let bytes = store.save_bytes(Some(b"hunter2")).unwrap();

        let reloaded = IdentityStore::load_bytes(&bytes, Some(b"hunter2")).unwrap();
        assert_eq!(reloaded.names().len(), 2);

        let err = IdentityStore::load_bytes(&bytes, Some(b"hunter3")).unwrap_err();
        assert!(matches!(err, Error::PasswordMismatch | Error::AuthFail { .. }));
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        let store = IdentityStore::new();
        store.insert(KeyPairInfo::new_keypair_with_seeds("Alice")).unwrap();
        assert!(store.contains("alice"));
        assert!(store.contains("ALICE"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let store = IdentityStore::new();
        store.insert(KeyPairInfo::new_keypair_with_seeds("alice")).unwrap();
        let err = store
            .insert(KeyPairInfo::new_keypair_with_seeds("ALICE"))
            .unwrap_err();
        assert!(matches!(err, Error::NameConflict(_)));
    }
}
