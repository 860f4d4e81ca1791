//! Hybrid bundle codec: a sealed header carrying a per-bundle payload key
//! and sender attestation, followed by the body streamed through the
//! chunked AEAD cipher under that key.
//!
//! Wire format (combined): `u16_be(header_len) || header_len bytes sealed
//! header || chunked_aead_stream(body)`. Split form routes the two
//! segments to separate sinks; the bytes are identical either way.

use std::io::{Read, Write};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use satchel_stream::ChunkedCipher;

use crate::error::{Error, Result};
use crate::identity::{KeyInfo, KeyPairInfo};
use crate::primitives::{fill_random, signing};

const HDR_VER: u16 = 1;
const DATA_VER: u16 = 1;
const MAX_HEADER_LEN: usize = 65_535;
const PAYLOAD_KEY_LEN: usize = 64;

/// What kind of body a bundle carries, so the decoder can reject a
/// mismatched sink before it writes a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSource {
    Direct,
    File,
    MultiDir,
}

/// The sealed header payload. Carries the per-bundle symmetric key, so
/// losing this struct's secrecy is equivalent to losing the body's.
#[derive(Serialize, Deserialize)]
pub struct BundleInfo {
    payload_key: [u8; PAYLOAD_KEY_LEN],
    salt: [u8; 32],
    input_source: InputSource,
    create_date: String,
    original_file_name: Option<String>,
    original_file_date: Option<String>,
    to_name: String,
    from_name: String,
    sender_sig: [u8; signing::SENDER_SIG_LEN],
    hdr_ver: u16,
    data_ver: u16,
}

impl BundleInfo {
    pub fn input_source(&self) -> InputSource {
        self.input_source
    }

    pub fn to_name(&self) -> &str {
        &self.to_name
    }

    pub fn from_name(&self) -> &str {
        &self.from_name
    }

    pub fn create_date(&self) -> &str {
        &self.create_date
    }

    pub fn original_file_name(&self) -> Option<&str> {
        self.original_file_name.as_deref()
    }

    pub fn original_file_date(&self) -> Option<&str> {
        self.original_file_date.as_deref()
    }
}

impl Drop for BundleInfo {
    fn drop(&mut self) {
        crate::primitives::wipe::wipe(&mut self.payload_key);
        crate::primitives::wipe::wipe(&mut self.salt);
        crate::primitives::wipe::wipe(&mut self.sender_sig);
    }
}

/// Everything needed to compose a `BundleInfo` plus the body cipher it
/// describes, besides the actual plaintext bytes.
pub struct EncodeRequest<'a> {
    pub sender: &'a KeyPairInfo,
    pub receiver: &'a KeyInfo,
    pub input_source: InputSource,
    pub original_file_name: Option<String>,
    pub original_file_date: Option<String>,
    pub chunk_size: usize,
}

fn build_header(req: &EncodeRequest<'_>) -> Result<(BundleInfo, ChunkedCipher)> {
    let mut payload_key = [0u8; PAYLOAD_KEY_LEN];
    fill_random(&mut payload_key);

    let cipher = ChunkedCipher::for_encrypt(&payload_key, None)?;
    let salt = cipher.salt();

    let info = BundleInfo {
        payload_key,
        salt,
        input_source: req.input_source,
        create_date: Utc::now().to_rfc3339(),
        original_file_name: req.original_file_name.clone(),
        original_file_date: req.original_file_date.clone(),
        to_name: req.receiver.name().to_string(),
        from_name: req.sender.name().to_string(),
        sender_sig: req.sender.sign_random(),
        hdr_ver: HDR_VER,
        data_ver: DATA_VER,
    };
    Ok((info, cipher))
}

fn seal_header(info: &BundleInfo, sender: &KeyPairInfo, receiver: &KeyInfo) -> Result<Vec<u8>> {
    let plain = postcard::to_allocvec(info)
        .map_err(|e| Error::BadFrame(format!("bundle header serialisation: {e}")))?;
    let sealed = crate::primitives::sealed::seal(sender.cipher_seed(), receiver.cipher_pub(), &plain);
    if sealed.len() > MAX_HEADER_LEN {
        return Err(Error::BadFrame(format!(
            "sealed header is {} bytes, exceeds the {} byte limit",
            sealed.len(),
            MAX_HEADER_LEN
        )));
    }
    Ok(sealed)
}

/// Encode a bundle with header and body in one stream.
pub fn encode_combined<R: Read, W: Write>(
    req: &EncodeRequest<'_>,
    reader: R,
    mut writer: W,
) -> Result<()> {
    let (info, cipher) = build_header(req)?;
    let sealed = seal_header(&info, req.sender, req.receiver)?;

    writer.write_all(&(sealed.len() as u16).to_be_bytes())?;
    writer.write_all(&sealed)?;
    cipher.encrypt(reader, writer, req.chunk_size)?;
    Ok(())
}

/// Encode a bundle with header and body routed to separate sinks.
pub fn encode_split<R: Read, WH: Write, WD: Write>(
    req: &EncodeRequest<'_>,
    reader: R,
    mut header_writer: WH,
    body_writer: WD,
) -> Result<()> {
    let (info, cipher) = build_header(req)?;
    let sealed = seal_header(&info, req.sender, req.receiver)?;

    header_writer.write_all(&(sealed.len() as u16).to_be_bytes())?;
    header_writer.write_all(&sealed)?;
    cipher.encrypt(reader, body_writer, req.chunk_size)?;
    Ok(())
}

fn read_exact_or_short<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            return Err(Error::ShortRead {
                expected: buf.len(),
                got: filled,
            });
        }
        filled += n;
    }
    Ok(())
}

fn open_and_verify(
    sealed: &[u8],
    receiver: &KeyPairInfo,
    sender: &KeyInfo,
    expected_source: Option<InputSource>,
) -> Result<(BundleInfo, ChunkedCipher)> {
    let plain = crate::primitives::sealed::open(receiver.cipher_seed(), sender.cipher_pub(), sealed)?;
    let info: BundleInfo = postcard::from_bytes(&plain)
        .map_err(|e| Error::BadFrame(format!("bundle header deserialisation: {e}")))?;

    if info.hdr_ver != HDR_VER || info.data_ver != DATA_VER {
        return Err(Error::UnsupportedVersion(info.hdr_ver));
    }

    if !sender.verify_random_signature(&info.sender_sig)? {
        return Err(Error::IdentityMismatch);
    }

    if let Some(expected) = expected_source {
        if info.input_source != expected {
            return Err(Error::WrongPayloadType);
        }
    }

    let cipher = ChunkedCipher::for_decrypt(&info.payload_key, info.salt)?;
    Ok((info, cipher))
}

/// Decode a combined bundle. Verifies the sealed header and the embedded
/// sender signature before a single byte of the body is decrypted; on
/// verification failure the body sink is never touched.
pub fn decode_combined<R: Read, W: Write>(
    receiver: &KeyPairInfo,
    sender: &KeyInfo,
    mut reader: R,
    writer: W,
    chunk_size: usize,
    expected_source: Option<InputSource>,
) -> Result<BundleInfo> {
    let mut len_bytes = [0u8; 2];
    read_exact_or_short(&mut reader, &mut len_bytes)?;
    let len = u16::from_be_bytes(len_bytes) as usize;

    let mut sealed = vec![0u8; len];
    read_exact_or_short(&mut reader, &mut sealed)?;

    let (info, cipher) = open_and_verify(&sealed, receiver, sender, expected_source)?;
    cipher.decrypt(reader, writer, chunk_size)?;
    Ok(info)
}

/// Decode a split bundle: header and body arrive from separate sources.
pub fn decode_split<RH: Read, RD: Read, W: Write>(
    receiver: &KeyPairInfo,
    sender: &KeyInfo,
    mut header_reader: RH,
    body_reader: RD,
    writer: W,
    chunk_size: usize,
    expected_source: Option<InputSource>,
) -> Result<BundleInfo> {
    let mut len_bytes = [0u8; 2];
    read_exact_or_short(&mut header_reader, &mut len_bytes)?;
    let len = u16::from_be_bytes(len_bytes) as usize;

    let mut sealed = vec![0u8; len];
    read_exact_or_short(&mut header_reader, &mut sealed)?;

    let (info, cipher) = open_and_verify(&sealed, receiver, sender, expected_source)?;
    cipher.decrypt(body_reader, writer, chunk_size)?;
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parties() -> (KeyPairInfo, KeyPairInfo) {
        (
            KeyPairInfo::new_keypair_with_seeds("alice"),
            KeyPairInfo::new_keypair_with_seeds("bob"),
        )
    }

    #[test]
    fn round_trip_combined() {
        let (alice, bob) = parties();
        let bob_info = bob.to_key_info();
        let alice_info = alice.to_key_info();

        let req = EncodeRequest {
            sender: &alice,
            receiver: &bob_info,
            input_source: InputSource::Direct,
            original_file_name: None,
            original_file_date: None,
            chunk_size: 64_000,
        };

        let plaintext = b"My voice is my passport. Verify me.";
        let mut combined = Vec::new();
        encode_combined(&req, &plaintext[..], &mut combined).unwrap();

        let mut out = Vec::new();
        let info = decode_combined(&bob, &alice_info, &combined[..], &mut out, 64_000, None).unwrap();
        assert_eq!(out, plaintext);
        assert_eq!(info.from_name(), "alice");
        assert_eq!(info.to_name(), "bob");
    }

    #[test]
    fn wrong_sender_identity_fails_closed() {
        let (alice, bob) = parties();
        let evil = KeyPairInfo::new_keypair_with_seeds("evil");
        let bob_info = bob.to_key_info();
        let alice_info = alice.to_key_info();

        let req = EncodeRequest {
            sender: &evil,
            receiver: &bob_info,
            input_source: InputSource::Direct,
            original_file_name: None,
            original_file_date: None,
            chunk_size: 64_000,
        };

        let mut combined = Vec::new();
        encode_combined(&req, &b"data"[..], &mut combined).unwrap();

        let mut out = Vec::new();
        let err = decode_combined(&bob, &alice_info, &combined[..], &mut out, 64_000, None).unwrap_err();
        assert!(matches!(err, Error::IdentityMismatch));
        assert!(out.is_empty());
    }

    #[test]
    fn tampered_body_fails_auth_at_chunk_one() {
        let (alice, bob) = parties();
        let bob_info = bob.to_key_info();
        let alice_info = alice.to_key_info();

        let req = EncodeRequest {
            sender: &alice,
            receiver: &bob_info,
            input_source: InputSource::Direct,
            original_file_name: None,
            original_file_date: None,
            chunk_size: 64_000,
        };

        let mut combined = Vec::new();
        encode_combined(&req, &b"data"[..], &mut combined).unwrap();
        let last = combined.len() - 1;
        combined[last] ^= 0x01;

        let mut out = Vec::new();
        let err = decode_combined(&bob, &alice_info, &combined[..], &mut out, 64_000, None).unwrap_err();
        assert!(matches!(err, Error::AuthFail { chunk: Some(1) }));
    }

    #[test]
    fn mismatched_payload_type_is_rejected() {
        let (alice, bob) = parties();
        let bob_info = bob.to_key_info();
        let alice_info = alice.to_key_info();

        let req = EncodeRequest {
            sender: &alice,
            receiver: &bob_info,
            input_source: InputSource::File,
            original_file_name: None,
            original_file_date: None,
            chunk_size: 64_000,
        };

        let mut combined = Vec::new();
        encode_combined(&req, &b"data"[..], &mut combined).unwrap();

        let mut out = Vec::new();
        let err = decode_combined(
            &bob,
            &alice_info,
            &combined[..],
            &mut out,
            64_000,
            Some(InputSource::MultiDir),
        )
        .unwrap_err();
        assert!(matches!(err, Error::WrongPayloadType));
    }

    #[test]
    fn split_header_swap_fails_sealed_open() {
        let (alice, bob) = parties();
        let carol = KeyPairInfo::new_keypair_with_seeds("carol");
        let bob_info = bob.to_key_info();
        let carol_info = carol.to_key_info();
        let alice_info = alice.to_key_info();

        let req_to_bob = EncodeRequest {
            sender: &alice,
            receiver: &bob_info,
            input_source: InputSource::Direct,
            original_file_name: None,
            original_file_date: None,
            chunk_size: 64_000,
        };
        let req_to_carol = EncodeRequest {
            sender: &alice,
            receiver: &carol_info,
            input_source: InputSource::Direct,
            original_file_name: None,
            original_file_date: None,
            chunk_size: 64_000,
        };

        let mut header_to_bob = Vec::new();
        let mut body_to_bob = Vec::new();
        encode_split(&req_to_bob, &b"data"[..], &mut header_to_bob, &mut body_to_bob).unwrap();

        let mut header_to_carol = Vec::new();
        let mut body_to_carol = Vec::new();
        encode_split(&req_to_carol, &b"data"[..], &mut header_to_carol, &mut body_to_carol).unwrap();

        // Swap in the header addressed to carol; bob's secret key cannot open it.
        let mut out = Vec::new();
        let err = decode_split(
            &bob,
            &alice_info,
            &header_to_carol[..],
            &body_to_bob[..],
            &mut out,
            64_000,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::AuthFail { .. }));
    }
}
