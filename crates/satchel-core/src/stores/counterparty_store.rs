//! Encrypted persistence for the collection of other users' public keys.
//!
//! Persisted as a bundle (see [`crate::bundle`]) whose sender and
//! receiver are two fixed system identities, `_write` and `_read`, held
//! in the identity store. Loading the counterparty store therefore
//! always requires the identity store to be open first: a two-phase
//! load, not a cyclic dependency, since the system identities are
//! ordinary [`KeyPairInfo`] records created up front by
//! [`ensure_system_identities`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::io::Cursor;

use satchel_stream::DEFAULT_CHUNK_SIZE;

use crate::bundle::{self, EncodeRequest, InputSource};
use crate::error::{Error, Result};
use crate::identity::{canonical_name, KeyInfo, KeyPairInfo, SYSTEM_READ_NAME, SYSTEM_WRITE_NAME};
use crate::stores::IdentityStore;

/// Create the `_read`/`_write` system identities if they are not already
/// present. Must run before the counterparty store is first saved or
/// loaded for a profile.
pub fn ensure_system_identities(identity_store: &IdentityStore) -> Result<()> {
    for name in [SYSTEM_READ_NAME, SYSTEM_WRITE_NAME] {
        if !identity_store.contains(name) {
            identity_store.insert(KeyPairInfo::new_keypair_with_seeds(name))?;
        }
    }
    Ok(())
}

pub struct CounterpartyStore {
    entries: Mutex<HashMap<String, KeyInfo>>,
}

impl CounterpartyStore {
    pub fn new() -> Self {
        CounterpartyStore {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, info: KeyInfo) -> Result<()> {
        let key = canonical_name(info.name());
        let mut guard = self.entries.lock().expect("counterparty store mutex poisoned");
        if guard.contains_key(&key) {
            return Err(Error::NameConflict(info.name().to_string()));
        }
        guard.insert(key, info);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<KeyInfo> {
        let key = canonical_name(name);
        self.entries
            .lock()
            .expect("counterparty store mutex poisoned")
            .remove(&key)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<KeyInfo> {
        let key = canonical_name(name);
        self.entries
            .lock()
            .expect("counterparty store mutex poisoned")
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("counterparty store mutex poisoned")
            .values()
            .map(|i| i.name().to_string())
            .collect()
    }

    /// Serialise the store as a bundle addressed from `_write` to `_read`.
    pub fn save_bytes(&self, identity_store: &IdentityStore) -> Result<Vec<u8>> {
        let records: Vec<KeyInfo> = self
            .entries
            .lock()
            .expect("counterparty store mutex poisoned")
            .values()
            .cloned()
            .collect();
        let plain = postcard::to_allocvec(&records)
            .map_err(|e| Error::BadFrame(format!("counterparty store serialisation: {e}")))?;

        let receiver_info = identity_store.with(SYSTEM_READ_NAME, |kp| kp.to_key_info())?;

        identity_store.with(SYSTEM_WRITE_NAME, |sender| {
            let req = EncodeRequest {
                sender,
                receiver: &receiver_info,
                input_source: InputSource::Direct,
                original_file_name: None,
                original_file_date: None,
                chunk_size: DEFAULT_CHUNK_SIZE,
            };
            let mut out = Vec::new();
            bundle::encode_combined(&req, Cursor::new(plain), &mut out)?;
            Ok(out)
        })?
    }

    /// Reconstruct the store from bytes produced by [`Self::save_bytes`].
    pub fn load_bytes(bytes: &[u8], identity_store: &IdentityStore) -> Result<Self> {
        let sender_info = identity_store.with(SYSTEM_WRITE_NAME, |kp| kp.to_key_info())?;

        let plain = identity_store.with(SYSTEM_READ_NAME, |receiver| {
            let mut out = Vec::new();
            bundle::decode_combined(
                receiver,
                &sender_info,
                bytes,
                &mut out,
                DEFAULT_CHUNK_SIZE,
                Some(InputSource::Direct),
            )?;
            Ok::<_, Error>(out)
        })??;

        let records: Vec<KeyInfo> = postcard::from_bytes(&plain)
            .map_err(|e| Error::BadFrame(format!("counterparty store deserialisation: {e}")))?;

        let store = CounterpartyStore::new();
        let mut guard = store.entries.lock().expect("counterparty store mutex poisoned");
        for info in records {
            guard.insert(canonical_name(info.name()), info);
        }
        drop(guard);
        Ok(store)
    }
}

impl Default for CounterpartyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_requires_system_identities() {
        let identities = IdentityStore::new();
        ensure_system_identities(&identities).unwrap();

        let store = CounterpartyStore::new();
        store
            .insert(KeyInfo::new("bob", [1u8; 32], [2u8; 32]))
            .unwrap();

        let bytes = store.save_bytes(&identities).unwrap();
        let reloaded = CounterpartyStore::load_bytes(&bytes, &identities).unwrap();
        assert_eq!(reloaded.names(), vec!["bob".to_string()]);
    }

    #[test]
    fn removing_system_identities_makes_store_irrecoverable() {
        let identities = IdentityStore::new();
        ensure_system_identities(&identities).unwrap();

        let store = CounterpartyStore::new();
        let bytes = store.save_bytes(&identities).unwrap();

        identities.remove(SYSTEM_READ_NAME).unwrap();
        let fresh = IdentityStore::new();
        ensure_system_identities(&fresh).unwrap();
        assert!(CounterpartyStore::load_bytes(&bytes, &fresh).is_err());
    }
}
