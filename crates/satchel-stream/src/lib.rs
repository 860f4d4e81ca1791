//! Streaming XChaCha20-Poly1305 AEAD cipher.
//!
//! Encrypts a `Read` into a `Write` in fixed-size chunks. Each chunk gets a
//! fresh random 24-byte nonce and is bound to its 1-based position in the
//! stream via `AD = ascii(chunk_index)`, so reordering, insertion, or
//! truncation between chunks is caught as an authentication failure rather
//! than silently accepted.
//!
//! The symmetric key is derived from a password (or any other byte string,
//! such as a per-bundle payload key) and a 32-byte salt via Argon2id. Every
//! higher-level container in this workspace (bundle bodies, symfiles,
//! encrypted identity/counterparty stores, encrypted exports) is ultimately
//! just this cipher run over a different plaintext stream.

use std::io::{Read, Write};

use aead::{Aead, KeyInit, Payload};
use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use zeroize::Zeroize;

/// Default plaintext chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 64_000;
/// Chunks larger than this are rejected outright; guards against
/// accidental multi-gigabyte single-chunk allocations.
pub const MAX_CHUNK_SIZE: usize = 4 * 1024 * 1024;
/// A stream may not exceed this many chunks; guards against a chunk
/// index wrapping or an unbounded input exhausting memory one chunk at
/// a time.
pub const MAX_CHUNKS: u64 = 1 << 32;
/// Nonce length for XChaCha20-Poly1305.
pub const NONCE_LEN: usize = 24;
/// Poly1305 tag length.
pub const TAG_LEN: usize = 16;
/// Salt length fed to Argon2id.
pub const SALT_LEN: usize = 32;
/// Derived key length.
pub const KEY_LEN: usize = 32;

/// Fixed Argon2id tuning: time=5, memory=64 MiB, parallelism=4, output=32 bytes.
fn argon2id() -> Argon2<'static> {
    let params = Params::new(65536, 5, 4, Some(KEY_LEN))
        .expect("fixed Argon2id parameters are always valid");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chunk {0} is smaller than the nonce")]
    ShortChunk(u64),
    #[error("authentication failed at chunk {0}")]
    AuthFail(u64),
    #[error("key derivation failed: {0}")]
    Kdf(String),
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),
    #[error("too many chunks: {0}")]
    TooManyChunks(u64),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A derived 32-byte stream key, wiped on drop.
struct StreamKey(Secret<[u8; KEY_LEN]>);

impl StreamKey {
    fn derive(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<Self> {
        let mut out = [0u8; KEY_LEN];
        argon2id()
            .hash_password_into(password, salt, &mut out)
            .map_err(|e| Error::Kdf(e.to_string()))?;
        let key = Self(Secret::new(out));
        Ok(key)
    }
}

/// Streaming AEAD cipher over arbitrary `Read`/`Write` pairs.
///
/// Construct via [`ChunkedCipher::for_encrypt`] (generates a fresh salt) or
/// [`ChunkedCipher::for_decrypt`] (salt supplied by the caller, typically read
/// from a container header).
pub struct ChunkedCipher {
    aead: XChaCha20Poly1305,
    salt: [u8; SALT_LEN],
}

impl ChunkedCipher {
    /// Derive a cipher for encryption. If `salt` is `None`, 32 random bytes
    /// are generated; either way the salt used is returned in
    /// [`ChunkedCipher::salt`] so the caller can transmit it to the receiver.
    pub fn for_encrypt(password: &[u8], salt: Option<[u8; SALT_LEN]>) -> Result<Self> {
        let salt = salt.unwrap_or_else(|| {
            let mut s = [0u8; SALT_LEN];
            fill_random(&mut s);
            s
        });
        Self::with_salt(password, salt)
    }

    /// Derive a cipher for decryption from a known salt.
    pub fn for_decrypt(password: &[u8], salt: [u8; SALT_LEN]) -> Result<Self> {
        Self::with_salt(password, salt)
    }

    fn with_salt(password: &[u8], salt: [u8; SALT_LEN]) -> Result<Self> {
        let key = StreamKey::derive(password, &salt)?;
        let aead = XChaCha20Poly1305::new(Key::from_slice(key.0.expose_secret()));
        Ok(Self { aead, salt })
    }

    /// The salt used for key derivation (generated or supplied at construction).
    pub fn salt(&self) -> [u8; SALT_LEN] {
        self.salt
    }

    /// Encrypt `reader` into `writer` in chunks of `chunk_size` plaintext
    /// bytes (must not exceed [`MAX_CHUNK_SIZE`]).
    pub fn encrypt<R: Read, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
        chunk_size: usize,
    ) -> Result<()> {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::InvalidChunkSize(chunk_size));
        }

        let mut buf = vec![0u8; chunk_size];
        let mut chunk_index: u64 = 1;

        loop {
            let n = read_fill_or_eof(&mut reader, &mut buf)?;
            if n == 0 {
                break;
            }
            if chunk_index > MAX_CHUNKS {
                return Err(Error::TooManyChunks(chunk_index));
            }

            let mut nonce_bytes = [0u8; NONCE_LEN];
            fill_random(&mut nonce_bytes);
            let nonce = XNonce::from_slice(&nonce_bytes);
            let ad = chunk_ad(chunk_index);

            let ct = self
                .aead
                .encrypt(nonce, Payload { msg: &buf[..n], aad: &ad })
                .map_err(|_| Error::AuthFail(chunk_index))?;

            writer.write_all(&nonce_bytes)?;
            writer.write_all(&ct)?;

            buf[..n].zeroize();
            chunk_index += 1;
        }

        Ok(())
    }

    /// Decrypt `reader` into `writer`. `chunk_size` only bounds the read
    /// buffer; it may differ from the chunk size used at encryption time, as
    /// the wire framing is self-describing (nonce + variable-length sealed
    /// body per record, terminated by EOF).
    pub fn decrypt<R: Read, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
        chunk_size: usize,
    ) -> Result<()> {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::InvalidChunkSize(chunk_size));
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        let mut body = vec![0u8; chunk_size + TAG_LEN];
        let mut chunk_index: u64 = 1;

        loop {
            let nonce_n = read_fill_or_eof(&mut reader, &mut nonce_bytes)?;
            if nonce_n == 0 {
                break;
            }
            if nonce_n < NONCE_LEN {
                return Err(Error::ShortChunk(chunk_index));
            }
            if chunk_index > MAX_CHUNKS {
                return Err(Error::TooManyChunks(chunk_index));
            }

            let body_n = read_fill_or_eof(&mut reader, &mut body)?;
            if body_n < TAG_LEN {
                return Err(Error::ShortChunk(chunk_index));
            }

            let nonce = XNonce::from_slice(&nonce_bytes);
            let ad = chunk_ad(chunk_index);
            let pt = self
                .aead
                .decrypt(nonce, Payload { msg: &body[..body_n], aad: &ad })
                .map_err(|_| Error::AuthFail(chunk_index))?;

            writer.write_all(&pt)?;
            chunk_index += 1;
        }

        Ok(())
    }
}

impl Drop for ChunkedCipher {
    fn drop(&mut self) {
        self.salt.zeroize();
    }
}

/// ASCII decimal encoding of the 1-based chunk index, used as AEAD
/// associated data so chunk reordering/truncation/insertion fails closed.
fn chunk_ad(chunk_index: u64) -> Vec<u8> {
    chunk_index.to_string().into_bytes()
}

/// Fill `buf` completely from `reader`, or return the number of bytes
/// actually read if the reader hit EOF first (0 means clean end of stream).
fn read_fill_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// CSRNG fill bounded to 1 KiB per syscall, per the wipe/RNG primitive
/// contract shared across the workspace.
pub fn fill_random(buf: &mut [u8]) {
    use rand::rngs::OsRng;
    let mut rng = OsRng;
    for chunk in buf.chunks_mut(1024) {
        rng.fill_bytes(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_small() {
        let cipher = ChunkedCipher::for_encrypt(b"hunter2", None).unwrap();
        let salt = cipher.salt();
        let plaintext = b"My voice is my passport. Verify me.";
        let mut ct = Vec::new();
        cipher.encrypt(Cursor::new(plaintext), &mut ct, 16).unwrap();

        let dec = ChunkedCipher::for_decrypt(b"hunter2", salt).unwrap();
        let mut pt = Vec::new();
        dec.decrypt(Cursor::new(ct), &mut pt, 65535).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn different_chunk_sizes_round_trip() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let cipher = ChunkedCipher::for_encrypt(b"pw", None).unwrap();
        let salt = cipher.salt();
        let mut ct = Vec::new();
        cipher.encrypt(Cursor::new(&data), &mut ct, 32_000).unwrap();

        let dec = ChunkedCipher::for_decrypt(b"pw", salt).unwrap();
        let mut pt = Vec::new();
        dec.decrypt(Cursor::new(ct), &mut pt, 65_535).unwrap();
        assert_eq!(pt, data);
    }

    #[test]
    fn tampered_body_fails_auth_at_correct_chunk() {
        let cipher = ChunkedCipher::for_encrypt(b"pw", None).unwrap();
        let salt = cipher.salt();
        let mut ct = Vec::new();
        cipher
            .encrypt(Cursor::new(b"hello world, chunk one"), &mut ct, 8)
            .unwrap();

        // Flip a byte inside the ciphertext body of the first chunk (after the nonce).
        let idx = NONCE_LEN + 2;
        ct[idx] ^= 0x01;

        let dec = ChunkedCipher::for_decrypt(b"pw", salt).unwrap();
        let mut pt = Vec::new();
        let err = dec.decrypt(Cursor::new(ct), &mut pt, 8).unwrap_err();
        match err {
            Error::AuthFail(1) => {}
            other => panic!("expected AuthFail(1), got {other:?}"),
        }
    }

    #[test]
    fn truncated_stream_never_yields_plaintext_on_success() {
        let cipher = ChunkedCipher::for_encrypt(b"pw", None).unwrap();
        let salt = cipher.salt();
        let mut ct = Vec::new();
        cipher
            .encrypt(Cursor::new(b"0123456789abcdef"), &mut ct, 8)
            .unwrap();
        ct.truncate(ct.len() - 3);

        let dec = ChunkedCipher::for_decrypt(b"pw", salt).unwrap();
        let mut pt = Vec::new();
        assert!(dec.decrypt(Cursor::new(ct), &mut pt, 8).is_err());
    }

    #[test]
    fn wrong_password_fails() {
        let cipher = ChunkedCipher::for_encrypt(b"right", None).unwrap();
        let salt = cipher.salt();
        let mut ct = Vec::new();
        cipher.encrypt(Cursor::new(b"secret"), &mut ct, 8).unwrap();

        let dec = ChunkedCipher::for_decrypt(b"wrong", salt).unwrap();
        let mut pt = Vec::new();
        assert!(dec.decrypt(Cursor::new(ct), &mut pt, 8).is_err());
    }

    #[test]
    fn zero_chunk_size_is_rejected_without_panicking() {
        let cipher = ChunkedCipher::for_encrypt(b"pw", None).unwrap();
        let mut ct = Vec::new();
        let err = cipher.encrypt(Cursor::new(b"data"), &mut ct, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidChunkSize(0)));

        let dec = ChunkedCipher::for_decrypt(b"pw", cipher.salt()).unwrap();
        let mut pt = Vec::new();
        let err = dec.decrypt(Cursor::new(Vec::new()), &mut pt, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidChunkSize(0)));
    }

    #[test]
    fn oversized_chunk_size_is_rejected_without_panicking() {
        let cipher = ChunkedCipher::for_encrypt(b"pw", None).unwrap();
        let mut ct = Vec::new();
        let err = cipher.encrypt(Cursor::new(b"data"), &mut ct, MAX_CHUNK_SIZE + 1).unwrap_err();
        assert!(matches!(err, Error::InvalidChunkSize(n) if n == MAX_CHUNK_SIZE + 1));
    }
}
