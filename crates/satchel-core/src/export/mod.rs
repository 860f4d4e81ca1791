//! Portable export/import of counterparty records and local key-pairs.
//!
//! Both shapes serialise through the same neutral [`ExportRecord`] and
//! share the identity store's `0 / [salt_len][salt]` framing: a
//! [`KeyInfo`] export carries only public material and an optional
//! password, a [`KeyPairInfo`] export carries secret seeds and always
//! requires one.

use std::io::Cursor;

use satchel_stream::{ChunkedCipher, DEFAULT_CHUNK_SIZE, SALT_LEN};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::{KeyInfo, KeyPairInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum DataType {
    KeyInfoRecord,
    KeyPairRecord,
}

#[derive(Serialize, Deserialize)]
struct ExportRecord {
    data_type: DataType,
    name: String,
    cipher_pub: Option<[u8; 32]>,
    signing_pub: Option<[u8; 32]>,
    cipher_seed: Option<[u8; 32]>,
    signing_seed: Option<[u8; 32]>,
}

fn frame(plain: Vec<u8>, password: Option<&[u8]>) -> Result<Vec<u8>> {
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

fn unframe(bytes: &[u8], password: Option<&[u8]>) -> Result<Vec<u8>> {
    if bytes.is_empty() {
        return Err(Error::BadFrame("empty export record".into()));
    }
    let salt_len = bytes[0] as usize;
    let rest = &bytes[1..];

    if salt_len == 0 {
        return Ok(rest.to_vec());
    }

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
    Ok(plain)
}

/// Export a counterparty record. Password is optional.
pub fn export_key_info(info: &KeyInfo, password: Option<&[u8]>) -> Result<Vec<u8>> {
    let record = ExportRecord {
        data_type: DataType::KeyInfoRecord,
        name: info.name().to_string(),
        cipher_pub: Some(*info.cipher_pub()),
        signing_pub: Some(*info.signing_pub()),
        cipher_seed: None,
        signing_seed: None,
    };
    let plain = postcard::to_allocvec(&record)
        .map_err(|e| Error::BadFrame(format!("export record serialisation: {e}")))?;
    frame(plain, password)
}

/// Import a counterparty record produced by [`export_key_info`].
pub fn import_key_info(bytes: &[u8], password: Option<&[u8]>) -> Result<KeyInfo> {
    let plain = unframe(bytes, password)?;
    let record: ExportRecord = postcard::from_bytes(&plain)
        .map_err(|e| Error::BadFrame(format!("export record deserialisation: {e}")))?;
    if record.data_type != DataType::KeyInfoRecord {
        return Err(Error::WrongPayloadType);
    }
    let cipher_pub = record.cipher_pub.ok_or_else(|| Error::BadFrame("missing cipher_pub".into()))?;
    let signing_pub = record.signing_pub.ok_or_else(|| Error::BadFrame("missing signing_pub".into()))?;
    Ok(KeyInfo::new(record.name, cipher_pub, signing_pub))
}

/// Export a local key-pair, including secret seeds. A password is
/// mandatory: there is no cleartext shape for secret export.
pub fn export_keypair_info(kp: &KeyPairInfo, password: &[u8]) -> Result<Vec<u8>> {
    let record = ExportRecord {
        data_type: DataType::KeyPairRecord,
        name: kp.name().to_string(),
        cipher_pub: None,
        signing_pub: None,
        cipher_seed: Some(*kp.cipher_seed()),
        signing_seed: Some(*kp.signing_seed()),
    };
    let plain = postcard::to_allocvec(&record)
        .map_err(|e| Error::BadFrame(format!("export record serialisation: {e}")))?;
    frame(plain, Some(password))
}

/// Import a key-pair produced by [`export_keypair_info`].
pub fn import_keypair_info(bytes: &[u8], password: &[u8]) -> Result<KeyPairInfo> {
    let plain = unframe(bytes, Some(password))?;
    let record: ExportRecord = postcard::from_bytes(&plain)
        .map_err(|e| Error::BadFrame(format!("export record deserialisation: {e}")))?;
    if record.data_type != DataType::KeyPairRecord {
        return Err(Error::WrongPayloadType);
    }
    let cipher_seed = record.cipher_seed.ok_or_else(|| Error::BadFrame("missing cipher_seed".into()))?;
    let signing_seed = record.signing_seed.ok_or_else(|| Error::BadFrame("missing signing_seed".into()))?;
    Ok(KeyPairInfo::from_seeds(record.name, cipher_seed, signing_seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_info_round_trip_without_password() {
        let info = KeyInfo::new("bob", [1u8; 32], [2u8; 32]);
        let bytes = export_key_info(&info, None).unwrap();
        let reloaded = import_key_info(&bytes, None).unwrap();
        assert_eq!(reloaded, info);
    }

    #[test]
    fn keypair_export_requires_correct_password() {
        let kp = KeyPairInfo::new_keypair_with_seeds("alice");
        let bytes = export_keypair_info(&kp, b"hunter2").unwrap();

        let reloaded = import_keypair_info(&bytes, b"hunter2").unwrap();
        assert_eq!(reloaded.name(), "alice");
        assert_eq!(reloaded.cipher_seed(), kp.cipher_seed());

        assert!(import_keypair_info(&bytes, b"wrong").is_err());
    }

    #[test]
    fn importing_wrong_shape_is_rejected() {
        let kp = KeyPairInfo::new_keypair_with_seeds("alice");
        let bytes = export_keypair_info(&kp, b"hunter2").unwrap();
        assert!(matches!(
            import_key_info(&bytes, Some(b"hunter2")),
            Err(Error::WrongPayloadType)
        ));
    }
}
