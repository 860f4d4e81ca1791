//! Ed25519 signing: binds a sender's signing seed to a random challenge
//! embedded in a bundle header. This is deliberately independent of the
//! sealed-box key-agreement layer in [`super::sealed`] — the two checks are
//! redundant by design (see `DESIGN.md`).

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};

use super::fill_random;
use crate::error::{Error, Result};

pub const SEED_LEN: usize = 32;
pub const PUBLIC_LEN: usize = 32;
pub const CHALLENGE_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;
/// Length of a `sender_sig` field: the random challenge followed by its signature.
pub const SENDER_SIG_LEN: usize = CHALLENGE_LEN + SIGNATURE_LEN;

/// Generate a fresh 32-byte Ed25519 seed.
pub fn generate_seed() -> [u8; SEED_LEN] {
    let mut seed = [0u8; SEED_LEN];
    fill_random(&mut seed);
    seed
}

/// Derive the Ed25519 public key for a signing seed.
pub fn public_key(seed: &[u8; SEED_LEN]) -> [u8; PUBLIC_LEN] {
    SigningKey::from_bytes(seed).verifying_key().to_bytes()
}

/// Generate a random 32-byte challenge, sign it with `seed`, and return
/// `challenge || signature` (96 bytes) ready to embed as `sender_sig`.
pub fn sign_random(seed: &[u8; SEED_LEN]) -> [u8; SENDER_SIG_LEN] {
    let mut challenge = [0u8; CHALLENGE_LEN];
    fill_random(&mut challenge);

    let signing_key = SigningKey::from_bytes(seed);
    let signature: Signature = signing_key.sign(&challenge);

    let mut out = [0u8; SENDER_SIG_LEN];
    out[..CHALLENGE_LEN].copy_from_slice(&challenge);
    out[CHALLENGE_LEN..].copy_from_slice(&signature.to_bytes());
    out
}

/// Verify a `sender_sig` field (challenge || signature) against a signing
/// public key. Returns `Ok(true)`/`Ok(false)` for a well-formed but
/// mismatched signature, and `Err` only if the input is malformed.
pub fn verify_random_signature(
    signing_pub: &[u8; PUBLIC_LEN],
    sender_sig: &[u8],
) -> Result<bool> {
    if sender_sig.len() != SENDER_SIG_LEN {
        return Err(Error::BadFrame(format!(
            "sender_sig must be {SENDER_SIG_LEN} bytes, got {}",
            sender_sig.len()
        )));
    }
    let challenge = &sender_sig[..CHALLENGE_LEN];
    let sig_bytes: [u8; SIGNATURE_LEN] = sender_sig[CHALLENGE_LEN..]
        .try_into()
        .expect("slice length checked above");

    let verifying_key = VerifyingKey::from_bytes(signing_pub)
        .map_err(|e| Error::BadFrame(format!("invalid signing public key: {e}")))?;
    let signature = Signature::from_bytes(&sig_bytes);

    Ok(verifying_key.verify(challenge, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let seed = generate_seed();
        let pk = public_key(&seed);
        let sig = sign_random(&seed);
        assert!(verify_random_signature(&pk, &sig).unwrap());
    }

    #[test]
    fn verify_fails_for_wrong_key() {
        let seed = generate_seed();
        let other_pk = public_key(&generate_seed());
        let sig = sign_random(&seed);
        assert!(!verify_random_signature(&other_pk, &sig).unwrap());
    }

    #[test]
    fn verify_rejects_malformed_input() {
        let pk = public_key(&generate_seed());
        assert!(verify_random_signature(&pk, &[0u8; 10]).is_err());
    }
}
