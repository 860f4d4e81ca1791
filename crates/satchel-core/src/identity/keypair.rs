//! Local identity: a name paired with a Curve25519 seed and an Ed25519 seed.

use crate::primitives::{sealed, signing, wipe};

use super::KeyInfo;

/// A local identity held in the identity store. Carries secret seed
/// material; never serialised in cleartext outside of [`crate::stores`]
/// and [`crate::export`], both of which apply password-based encryption.
pub struct KeyPairInfo {
    name: String,
    cipher_seed: [u8; signing::SEED_LEN],
    signing_seed: [u8; signing::SEED_LEN],
}

impl KeyPairInfo {
    /// Generate a fresh key-pair: a new Curve25519 seed and a new Ed25519 seed.
    pub fn new_keypair_with_seeds(name: impl Into<String>) -> Self {
        KeyPairInfo {
            name: name.into(),
            cipher_seed: sealed::generate_seed(),
            signing_seed: signing::generate_seed(),
        }
    }

    /// Reconstruct a key-pair from existing seeds (import path).
    pub fn from_seeds(
        name: impl Into<String>,
        cipher_seed: [u8; sealed::SECRET_LEN],
        signing_seed: [u8; signing::SEED_LEN],
    ) -> Self {
        KeyPairInfo {
            name: name.into(),
            cipher_seed,
            signing_seed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cipher_seed(&self) -> &[u8; sealed::SECRET_LEN] {
        &self.cipher_seed
    }

    pub fn signing_seed(&self) -> &[u8; signing::SEED_LEN] {
        &self.signing_seed
    }

    /// Derive this identity's public keys.
    pub fn public_keys(&self) -> ([u8; sealed::PUBLIC_LEN], [u8; signing::PUBLIC_LEN]) {
        (
            sealed::public_key(&self.cipher_seed),
            signing::public_key(&self.signing_seed),
        )
    }

    /// Build the [`KeyInfo`] counterparty record that other profiles would
    /// store for this identity.
    pub fn to_key_info(&self) -> KeyInfo {
        let (cipher_pub, signing_pub) = self.public_keys();
        KeyInfo::new(self.name.clone(), cipher_pub, signing_pub)
    }

    /// Sign a fresh random challenge, producing the 96-byte `sender_sig`
    /// field embedded in a bundle header.
    pub fn sign_random(&self) -> [u8; signing::SENDER_SIG_LEN] {
        signing::sign_random(&self.signing_seed)
    }
}

impl Drop for KeyPairInfo {
    fn drop(&mut self) {
        wipe::wipe(&mut self.cipher_seed);
        wipe::wipe(&mut self.signing_seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keypair_has_matching_public_keys() {
        let kp = KeyPairInfo::new_keypair_with_seeds("alice");
        let (cipher_pub, signing_pub) = kp.public_keys();
        assert_eq!(cipher_pub, sealed::public_key(kp.cipher_seed()));
        assert_eq!(signing_pub, signing::public_key(kp.signing_seed()));
    }

    #[test]
    fn to_key_info_preserves_name_and_public_keys() {
        let kp = KeyPairInfo::new_keypair_with_seeds("alice");
        let (cipher_pub, signing_pub) = kp.public_keys();
        let info = kp.to_key_info();
        assert_eq!(info.name(), "alice");
        assert_eq!(*info.cipher_pub(), cipher_pub);
        assert_eq!(*info.signing_pub(), signing_pub);
    }

    #[test]
    fn sign_random_verifies_against_own_key_info() {
        let kp = KeyPairInfo::new_keypair_with_seeds("alice");
        let info = kp.to_key_info();
        let sig = kp.sign_random();
        assert!(info.verify_random_signature(&sig).unwrap());
    }
}
