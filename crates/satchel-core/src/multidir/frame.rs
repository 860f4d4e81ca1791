//! Wire representation of a single multi-directory stream record:
//! `u32_be(len) || postcard(Frame)`. The enum discriminant doubles as the
//! type tag the spec calls for; `len` bounds how many bytes the consumer
//! must buffer before a frame can be decoded.

use std::io;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Frame {
    Metadata(Vec<(String, Vec<u8>)>),
    DirEntry { path: String },
    FileHeader { path: String, size: u64, mtime: String, perms: u32 },
    FileChunk { bytes: Vec<u8> },
    FileEnd,
    StreamEnd,
}

pub fn encode(frame: &Frame) -> Result<Vec<u8>> {
    let body = postcard::to_allocvec(frame)
        .map_err(|e| Error::BadFrame(format!("multidir frame serialisation: {e}")))?;
    if body.len() as u64 > MAX_FRAME_LEN as u64 {
        return Err(Error::BadFrame(format!(
            "multidir frame is {} bytes, exceeds the {} byte limit",
            body.len(),
            MAX_FRAME_LEN
        )));
    }
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

pub fn decode(body: &[u8]) -> io::Result<Frame> {
    postcard::from_bytes(body)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("multidir frame: {e}")))
}

/// Normalise a local relative path to forward-slash form for the wire.
pub fn to_wire_path(rel: &std::path::Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Rebuild a local relative path from a wire path, rejecting anything
/// that would escape the output root.
pub fn from_wire_path(wire: &str) -> Result<std::path::PathBuf> {
    let mut out = std::path::PathBuf::new();
    for part in wire.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(Error::BadFrame(format!("path escapes output root: {wire}"))),
            other => out.push(other),
        }
    }
    Ok(out)
}
