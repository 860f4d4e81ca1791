//! Symfile codec: a password-keyed symmetric container for local at-rest
//! encryption of either a single file stream or a packed directory tree.
//!
//! Wire layout: `salt(32) || chunked_aead_stream(u16_be(header_len) ||
//! header_bytes || payload_bytes)`. The salt is written in the clear
//! ahead of the encrypted region because the receiver needs it to derive
//! the key before it can decrypt anything else.

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use satchel_stream::{ChunkedCipher, SALT_LEN};

use crate::adapters::{HeaderParsingWriter, PrefixedReader};
use crate::error::{Error, Result};

const VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadKind {
    Stream,
    MultiDir,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFileInfo {
    pub filename: String,
    pub mtime: String,
    pub perms: u32,
}

impl SourceFileInfo {
    pub fn new(filename: impl Into<String>, mtime: impl Into<String>, perms: u32) -> Self {
        SourceFileInfo {
            filename: filename.into(),
            mtime: mtime.into(),
            perms: perms & 0x1FF,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymFileHeader {
    version: u16,
    payload_type: PayloadKind,
    source_file_info: Option<SourceFileInfo>,
}

impl SymFileHeader {
    pub fn payload_type(&self) -> PayloadKind {
        self.payload_type
    }

    pub fn source_file_info(&self) -> Option<&SourceFileInfo> {
        self.source_file_info.as_ref()
    }
}

/// Write a symfile: `password` keys the stream, `payload_type` describes
/// what `payload_reader` carries, `source_file_info` is attached metadata
/// for the `Stream` case.
pub fn encode<R: Read, W: Write>(
    password: &[u8],
    payload_type: PayloadKind,
    source_file_info: Option<SourceFileInfo>,
    payload_reader: R,
    mut writer: W,
    chunk_size: usize,
) -> Result<()> {
    let cipher = ChunkedCipher::for_encrypt(password, None)?;
    let salt = cipher.salt();
    writer.write_all(&salt)?;

    let header = SymFileHeader {
        version: VERSION,
        payload_type,
        source_file_info,
    };
    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| Error::BadFrame(format!("symfile header serialisation: {e}")))?;
    if header_bytes.len() > u16::MAX as usize {
        return Err(Error::BadFrame("symfile header exceeds 65535 bytes".into()));
    }

    let mut prefix = Vec::with_capacity(2 + header_bytes.len());
    prefix.extend_from_slice(&(header_bytes.len() as u16).to_be_bytes());
    prefix.extend_from_slice(&header_bytes);

    let prefixed = PrefixedReader::new(prefix, payload_reader);
    cipher.encrypt(prefixed, writer, chunk_size)?;
    Ok(())
}

fn read_salt<R: Read>(reader: &mut R) -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    let mut filled = 0;
    while filled < salt.len() {
        let n = reader.read(&mut salt[filled..])?;
        if n == 0 {
            return Err(Error::ShortRead {
                expected: SALT_LEN,
                got: filled,
            });
        }
        filled += n;
    }
    Ok(salt)
}

/// Read a symfile. `make_writer` receives the parsed header once it has
/// been decoded and must return the sink the payload bytes should be
/// streamed into (a plain file for [`PayloadKind::Stream`], a directory
/// materialiser for [`PayloadKind::MultiDir`]).
pub fn decode<R: Read>(
    password: &[u8],
    mut reader: R,
    chunk_size: usize,
    make_writer: impl FnOnce(&SymFileHeader) -> Result<Box<dyn Write>>,
) -> Result<SymFileHeader> {
    let salt = read_salt(&mut reader)?;
    let cipher = ChunkedCipher::for_decrypt(password, salt)?;

    let header_cell: Rc<RefCell<Option<SymFileHeader>>> = Rc::new(RefCell::new(None));
    let header_cell_inner = header_cell.clone();

    let mut parser = HeaderParsingWriter::new(move |header_bytes: Vec<u8>| {
        let header: SymFileHeader = postcard::from_bytes(&header_bytes).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("symfile header: {e}"))
        })?;
        let target = make_writer(&header)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        *header_cell_inner.borrow_mut() = Some(header);
        Ok(target)
    });

    cipher.decrypt(reader, &mut parser, chunk_size)?;
    parser.into_inner()?.flush()?;

    header_cell
        .borrow_mut()
        .take()
        .ok_or_else(|| Error::BadFrame("symfile body ended before header was parsed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_stream_payload() {
        let payload = b"the quick brown fox";
        let mut file = Vec::new();
        encode(
            b"hunter2",
            PayloadKind::Stream,
            Some(SourceFileInfo::new("fox.txt", "2024-01-01T00:00:00Z", 0o644)),
            &payload[..],
            &mut file,
            4096,
        )
        .unwrap();

        let out: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let out_inner = out.clone();
        let header = decode(b"hunter2", Cursor::new(file), 4096, move |h| {
            assert_eq!(h.payload_type(), PayloadKind::Stream);
            struct VecSink(Rc<RefCell<Vec<u8>>>);
            impl Write for VecSink {
                fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                    self.0.borrow_mut().extend_from_slice(buf);
                    Ok(buf.len())
                }
                fn flush(&mut self) -> io::Result<()> {
                    Ok(())
                }
            }
            Ok(Box::new(VecSink(out_inner.clone())))
        })
        .unwrap();

        assert_eq!(header.source_file_info().unwrap().filename, "fox.txt");
        assert_eq!(out.borrow().as_slice(), payload);
    }

    #[test]
    fn wrong_password_fails() {
        let mut file = Vec::new();
        encode(b"right", PayloadKind::Stream, None, &b"data"[..], &mut file, 4096).unwrap();

        let result = decode(b"wrong", Cursor::new(file), 4096, |_| {
            Ok(Box::new(Vec::<u8>::new()) as Box<dyn Write>)
        });
        assert!(result.is_err());
    }
}
