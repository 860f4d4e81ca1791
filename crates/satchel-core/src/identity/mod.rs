//! Identity model: local key-pairs and counterparty public-key records.

mod counterparty;
mod keypair;
mod token;

pub use counterparty::KeyInfo;
pub use keypair::KeyPairInfo;

/// The canonical store key for a name: upper-cased, so lookups are
/// case-insensitive in both the identity store and the counterparty store.
pub fn canonical_name(name: &str) -> String {
    name.to_uppercase()
}

/// The two system identities used to encrypt the counterparty store at
/// rest (see `crate::stores`). Never surfaced as ordinary counterparties.
pub const SYSTEM_READ_NAME: &str = "_read";
pub const SYSTEM_WRITE_NAME: &str = "_write";
