//! Counterparty record: another profile's public keys, as held in the
//! counterparty store. Contains no secret material.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::primitives::signing;

use super::token;

/// Another user's public keys, addressable by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    name: String,
    cipher_pub: [u8; 32],
    signing_pub: [u8; 32],
}

impl KeyInfo {
    pub fn new(name: impl Into<String>, cipher_pub: [u8; 32], signing_pub: [u8; 32]) -> Self {
        KeyInfo {
            name: name.into(),
            cipher_pub,
            signing_pub,
        }
    }

    /// Build a record from base32 tokens, e.g. when importing from text.
    pub fn from_tokens(name: impl Into<String>, cipher_token: &str, signing_token: &str) -> Result<Self> {
        Ok(KeyInfo::new(
            name,
            token::decode(cipher_token)?,
            token::decode(signing_token)?,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cipher_pub(&self) -> &[u8; 32] {
        &self.cipher_pub
    }

    pub fn signing_pub(&self) -> &[u8; 32] {
        &self.signing_pub
    }

    pub fn cipher_pub_token(&self) -> String {
        token::encode(&self.cipher_pub)
    }

    pub fn signing_pub_token(&self) -> String {
        token::encode(&self.signing_pub)
    }

    /// Verify a `sender_sig` field (challenge || signature) against this
    /// record's signing public key.
    pub fn verify_random_signature(&self, sender_sig: &[u8]) -> Result<bool> {
        signing::verify_random_signature(&self.signing_pub, sender_sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let info = KeyInfo::new("bob", [1u8; 32], [2u8; 32]);
        let reloaded =
            KeyInfo::from_tokens("bob", &info.cipher_pub_token(), &info.signing_pub_token()).unwrap();
        assert_eq!(info, reloaded);
    }
}
