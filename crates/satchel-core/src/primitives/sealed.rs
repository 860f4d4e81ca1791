//! Sealed hybrid box: authenticated public-key encryption over Curve25519
//! key agreement with an XSalsa20-Poly1305 AEAD (the libsodium/NaCl "box"
//! construction, via the `crypto_box` crate). Unlike an anonymous sealed
//! box, both the sender's secret and the receiver's public key are known
//! inputs, so the shared secret itself authenticates the sender to the
//! receiver. This is a separate authentication layer from the Ed25519
//! signature carried inside the bundle header (see [`super::signing`]).

use crypto_box::{
    aead::{Aead, AeadCore},
    PublicKey, SalsaBox, SecretKey,
};

use super::fill_random;
use crate::error::{Error, Result};

pub const SECRET_LEN: usize = 32;
pub const PUBLIC_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;
pub const TAG_LEN: usize = 16;

/// Generate a fresh Curve25519 seed for sealed-box key agreement.
pub fn generate_seed() -> [u8; SECRET_LEN] {
    let mut seed = [0u8; SECRET_LEN];
    fill_random(&mut seed);
    seed
}

/// Derive the Curve25519 public key for a cipher seed.
pub fn public_key(seed: &[u8; SECRET_LEN]) -> [u8; PUBLIC_LEN] {
    SecretKey::from(*seed).public_key().to_bytes()
}

/// Seal `plaintext` so only the holder of `receiver_public`'s matching
/// secret can open it, authenticated as coming from `sender_secret`.
/// Returns `nonce(24) || ciphertext_with_tag`.
pub fn seal(
    sender_secret: &[u8; SECRET_LEN],
    receiver_public: &[u8; PUBLIC_LEN],
    plaintext: &[u8],
) -> Vec<u8> {
    let sk = SecretKey::from(*sender_secret);
    let pk = PublicKey::from(*receiver_public);
    let salsa_box = SalsaBox::new(&pk, &sk);

    let nonce = SalsaBox::generate_nonce(&mut crypto_box::aead::OsRng);
    let ciphertext = salsa_box
        .encrypt(&nonce, plaintext)
        .expect("sealing with a freshly generated nonce cannot fail");

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    out
}

/// Open a sealed box produced by [`seal`]. Fails with [`Error::AuthFail`] if
/// the tag does not verify (wrong keys, or the bytes were tampered with).
pub fn open(
    receiver_secret: &[u8; SECRET_LEN],
    sender_public: &[u8; PUBLIC_LEN],
    sealed: &[u8],
) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(Error::ShortRead {
            expected: NONCE_LEN + TAG_LEN,
            got: sealed.len(),
        });
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = crypto_box::Nonce::from_slice(nonce_bytes);

    let sk = SecretKey::from(*receiver_secret);
    let pk = PublicKey::from(*sender_public);
    let salsa_box = SalsaBox::new(&pk, &sk);

    salsa_box
        .decrypt(nonce, ciphertext)
        .map_err(|_| Error::AuthFail { chunk: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let sender = generate_seed();
        let receiver = generate_seed();
        let sender_pub = public_key(&sender);
        let receiver_pub = public_key(&receiver);

        let ct = seal(&sender, &receiver_pub, b"top secret header");
        let pt = open(&receiver, &sender_pub, &ct).unwrap();
        assert_eq!(pt, b"top secret header");
    }

    #[test]
    fn open_fails_for_wrong_receiver() {
        let sender = generate_seed();
        let receiver = generate_seed();
        let intruder = generate_seed();
        let sender_pub = public_key(&sender);
        let receiver_pub = public_key(&receiver);

        let ct = seal(&sender, &receiver_pub, b"data");
        assert!(open(&intruder, &sender_pub, &ct).is_err());
    }

    #[test]
    fn open_fails_for_tampered_ciphertext() {
        let sender = generate_seed();
        let receiver = generate_seed();
        let sender_pub = public_key(&sender);
        let receiver_pub = public_key(&receiver);

        let mut ct = seal(&sender, &receiver_pub, b"data");
        let last = ct.len() - 1;
        ct[last] ^= 0x01;
        assert!(open(&receiver, &sender_pub, &ct).is_err());
    }
}
