//! Standalone known-answer-test checker for satchel's cryptographic
//! primitives. Loads a JSON vector file and asserts each derived or
//! decrypted value matches what the vector expects, printing `KAT OK` on
//! success. Every vector here exercises deterministic inputs only: the
//! chunk cipher and sealed box both draw fresh random nonces on encrypt, so
//! what's checked is always the decrypt/verify direction against a fixed,
//! already-produced ciphertext, plus the Argon2id key derivation itself.

use argon2::{Algorithm, Argon2, Params, Version};
use satchel_core::primitives::{sealed, signing};
use satchel_stream::ChunkedCipher;
use serde::Deserialize;

#[derive(Deserialize)]
struct KatFile {
    #[serde(default)]
    kdf: Vec<KdfKat>,
    #[serde(default)]
    chunk: Vec<ChunkKat>,
    #[serde(default)]
    sealed_box: Vec<SealedBoxKat>,
    #[serde(default)]
    signature: Vec<SignatureKat>,
}

/// Argon2id key derivation: fixed time=5, memory=65536 KiB, parallelism=4,
/// 32-byte output, matching the parameters `satchel_stream` hard-codes.
#[derive(Deserialize)]
struct KdfKat {
    name: String,
    password_utf8: String,
    salt_hex: String,
    expected_key_hex: String,
}

/// Chunked XChaCha20-Poly1305 decrypt: chunk-index-as-AD, nonce-prefixed
/// records, terminated by EOF. `chunk_size` only bounds the read buffer.
#[derive(Deserialize)]
struct ChunkKat {
    name: String,
    password_utf8: String,
    salt_hex: String,
    chunk_size: usize,
    ciphertext_hex: String,
    expected_plaintext_hex: String,
}

/// `crypto_box` sealed-box open between a fixed sender/receiver pair.
#[derive(Deserialize)]
struct SealedBoxKat {
    name: String,
    receiver_secret_hex: String,
    sender_public_hex: String,
    sealed_hex: String,
    expected_plaintext_hex: String,
}

/// Ed25519 verification of a `challenge || signature` sender_sig field.
#[derive(Deserialize)]
struct SignatureKat {
    name: String,
    signing_pub_hex: String,
    sender_sig_hex: String,
    expected_valid: bool,
}

fn hex_to<const N: usize>(s: &str) -> anyhow::Result<[u8; N]> {
    let v = hex::decode(s)?;
    anyhow::ensure!(v.len() == N, "expected {N} bytes, got {}", v.len());
    let mut out = [0u8; N];
    out.copy_from_slice(&v);
    Ok(out)
}

fn check_kdf(kat: &KdfKat) -> anyhow::Result<()> {
    let salt = hex_to::<32>(&kat.salt_hex)?;
    let expected = hex::decode(&kat.expected_key_hex)?;

    let params = Params::new(65536, 5, 4, Some(32)).expect("fixed Argon2id parameters are always valid");
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut got = [0u8; 32];
    argon2
        .hash_password_into(kat.password_utf8.as_bytes(), &salt, &mut got)
        .map_err(|e| anyhow::anyhow!("argon2id: {e}"))?;

    anyhow::ensure!(got.as_slice() == expected.as_slice(), "kdf vector '{}': key mismatch", kat.name);
    Ok(())
}

fn check_chunk(kat: &ChunkKat) -> anyhow::Result<()> {
    let salt = hex_to::<32>(&kat.salt_hex)?;
    let ciphertext = hex::decode(&kat.ciphertext_hex)?;
    let expected_plaintext = hex::decode(&kat.expected_plaintext_hex)?;

    let cipher = ChunkedCipher::for_decrypt(kat.password_utf8.as_bytes(), salt)?;
    let mut got = Vec::new();
    cipher.decrypt(ciphertext.as_slice(), &mut got, kat.chunk_size)?;

    anyhow::ensure!(got == expected_plaintext, "chunk vector '{}': plaintext mismatch", kat.name);
    Ok(())
}

fn check_sealed_box(kat: &SealedBoxKat) -> anyhow::Result<()> {
    let receiver_secret = hex_to::<{ sealed::SECRET_LEN }>(&kat.receiver_secret_hex)?;
    let sender_public = hex_to::<{ sealed::PUBLIC_LEN }>(&kat.sender_public_hex)?;
    let sealed_bytes = hex::decode(&kat.sealed_hex)?;
    let expected_plaintext = hex::decode(&kat.expected_plaintext_hex)?;

    let got = sealed::open(&receiver_secret, &sender_public, &sealed_bytes)?;
    anyhow::ensure!(got == expected_plaintext, "sealed-box vector '{}': plaintext mismatch", kat.name);
    Ok(())
}

fn check_signature(kat: &SignatureKat) -> anyhow::Result<()> {
    let signing_pub = hex_to::<{ signing::PUBLIC_LEN }>(&kat.signing_pub_hex)?;
    let sender_sig = hex::decode(&kat.sender_sig_hex)?;

    let valid = signing::verify_random_signature(&signing_pub, &sender_sig)?;
    anyhow::ensure!(valid == kat.expected_valid, "signature vector '{}': verification result mismatch", kat.name);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).expect("usage: kat-check <file.json>");
    let data = std::fs::read_to_string(&path)?;
    let kats: KatFile = serde_json::from_str(&data)?;

    let mut checked = 0usize;
    for kat in &kats.kdf {
        check_kdf(kat)?;
        checked += 1;
    }
    for kat in &kats.chunk {
        check_chunk(kat)?;
        checked += 1;
    }
    for kat in &kats.sealed_box {
        check_sealed_box(kat)?;
        checked += 1;
    }
    for kat in &kats.signature {
        check_signature(kat)?;
        checked += 1;
    }

    anyhow::ensure!(checked > 0, "no known-answer vectors found in {path}");
    println!("KAT OK ({checked} vectors)");
    Ok(())
}
