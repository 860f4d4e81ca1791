//! Fixed-length base32 tokens used to carry public keys in [`super::KeyInfo`]
//! and in text-armored export records.

use data_encoding::BASE32_NOPAD;

use crate::error::{Error, Result};

/// Encode a 32-byte public key as an unpadded base32 token.
pub fn encode(bytes: &[u8; 32]) -> String {
    BASE32_NOPAD.encode(bytes)
}

/// Decode a base32 token back into a 32-byte public key.
pub fn decode(token: &str) -> Result<[u8; 32]> {
    let decoded = BASE32_NOPAD
        .decode(token.as_bytes())
        .map_err(|e| Error::BadFrame(format!("invalid base32 token: {e}")))?;
    decoded
        .try_into()
        .map_err(|v: Vec<u8>| Error::BadFrame(format!("token decodes to {} bytes, want 32", v.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let key = [7u8; 32];
        let token = encode(&key);
        assert_eq!(decode(&token).unwrap(), key);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode("not valid base32!!").is_err());
    }

    #[test]
    fn rejects_wrong_length() {
        let token = BASE32_NOPAD.encode(&[1u8; 16]);
        assert!(decode(&token).is_err());
    }
}
