//! Error taxonomy shared by every codec in this crate.
//!
//! These are kinds, not layered wrapper types: callers match on the variant
//! to decide policy (retry, surface to the user, wipe and abort), the way
//! the spec's error-handling section enumerates them.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("short write: expected {expected} bytes, wrote {wrote}")]
    ShortWrite { expected: usize, wrote: usize },

    #[error("malformed frame: {0}")]
    BadFrame(String),

    #[error("authentication failed{}", .chunk.map(|c| format!(" at chunk {c}")).unwrap_or_default())]
    AuthFail { chunk: Option<u64> },

    #[error("chunk {0} is shorter than the nonce size")]
    ShortChunk(u64),

    #[error("sender signature does not match the expected identity")]
    IdentityMismatch,

    #[error("payload type does not match the requested sink")]
    WrongPayloadType,

    #[error("a password is required for this operation")]
    PasswordRequired,

    #[error("password did not decrypt the data")]
    PasswordMismatch,

    #[error("name '{0}' already exists")]
    NameConflict(String),

    #[error("'{0}' was not found")]
    NotFound(String),

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<satchel_stream::Error> for Error {
    fn from(e: satchel_stream::Error) -> Self {
        match e {
            satchel_stream::Error::Io(e) => Error::Io(e),
            satchel_stream::Error::ShortChunk(c) => Error::ShortChunk(c),
            satchel_stream::Error::AuthFail(c) => Error::AuthFail { chunk: Some(c) },
            satchel_stream::Error::Kdf(msg) => Error::BadFrame(format!("key derivation: {msg}")),
            satchel_stream::Error::InvalidChunkSize(n) => Error::BadFrame(format!("invalid chunk size: {n}")),
            satchel_stream::Error::TooManyChunks(n) => Error::BadFrame(format!("too many chunks: {n}")),
        }
    }
}
