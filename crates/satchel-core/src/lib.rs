//! Hybrid-encrypted bundle and symmetric-archive codec.
//!
//! This crate is the cryptographic data plane: sealed headers, the
//! chunked AEAD body (re-exported from [`satchel_stream`]), sender
//! signatures, the symfile container, multi-directory packing, and the
//! encrypted identity/counterparty stores that sit on top of them. It
//! never touches a terminal, a config file format, or an argument
//! parser — those are the CLI crate's job.

pub mod adapters;
pub mod bundle;
pub mod env;
pub mod error;
pub mod export;
pub mod identity;
pub mod multidir;
pub mod primitives;
pub mod stores;
pub mod symfile;

pub use error::{Error, Result};
pub use identity::{KeyInfo, KeyPairInfo};
