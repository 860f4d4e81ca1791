//! Producer: traverses one or more directory roots and streams them out
//! as a sequence of [`Frame`] records through a `Read` implementation, so
//! the caller can feed the bytes straight into the chunked AEAD cipher
//! without materialising the whole tree in memory.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::error::{Error, Result};

use super::frame::{self, to_wire_path, Frame};

const FILE_CHUNK_LEN: usize = 64 * 1024;

enum PlanItem {
    Dir(String),
    File {
        wire_path: String,
        abs_path: PathBuf,
        size: u64,
        mtime: String,
        perms: u32,
    },
}

struct InProgressFile {
    file: File,
    remaining: u64,
}

pub struct Producer {
    plan: VecDeque<PlanItem>,
    current: Option<InProgressFile>,
    metadata_frame: Option<Vec<u8>>,
    out: Vec<u8>,
    out_pos: usize,
    stream_end_emitted: bool,
}

impl Producer {
    /// Build a producer over `roots`, optionally prefixing the stream
    /// with a `Metadata` record of `(name, bytes)` annotations.
    pub fn new(roots: &[PathBuf], metadata: Vec<(String, Vec<u8>)>) -> Result<Self> {
        let mut plan = VecDeque::new();

        for root in roots {
            let root_name = root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| root.to_string_lossy().into_owned());

            for entry in WalkDir::new(root).follow_links(false) {
                let entry = entry.map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))?;
                let file_type = entry.file_type();

                if file_type.is_symlink() {
                    continue;
                }

                let rel = entry
                    .path()
                    .strip_prefix(root)
                    .unwrap_or_else(|_| Path::new(""));
                let wire_rel = if rel.as_os_str().is_empty() {
                    root_name.clone()
                } else {
                    format!("{root_name}/{}", to_wire_path(rel))
                };

                if file_type.is_dir() {
                    let is_empty = std::fs::read_dir(entry.path())?.next().is_none();
                    if is_empty {
                        plan.push_back(PlanItem::Dir(wire_rel));
                    }
                } else if file_type.is_file() {
                    let meta = entry.metadata().map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))?;
                    let mtime: DateTime<Utc> = meta.modified()?.into();
                    let perms = unix_mode(&meta) & 0o777;
                    plan.push_back(PlanItem::File {
                        wire_path: wire_rel,
                        abs_path: entry.path().to_path_buf(),
                        size: meta.len(),
                        mtime: mtime.to_rfc3339(),
                        perms,
                    });
                }
            }
        }

        let metadata_frame = if metadata.is_empty() {
            None
        } else {
            Some(frame::encode(&Frame::Metadata(metadata))?)
        };

        Ok(Producer {
            plan,
            current: None,
            metadata_frame,
            out: Vec::new(),
            out_pos: 0,
            stream_end_emitted: false,
        })
    }

    fn refill(&mut self) -> Result<bool> {
        if let Some(bytes) = self.metadata_frame.take() {
            self.out = bytes;
            self.out_pos = 0;
            return Ok(true);
        }

        if let Some(cur) = &mut self.current {
            let take = FILE_CHUNK_LEN.min(cur.remaining as usize);
            let mut buf = vec![0u8; take];
            let n = if take == 0 { 0 } else { cur.file.read(&mut buf)? };
            if n == 0 {
                self.current = None;
                self.out = frame::encode(&Frame::FileEnd)?;
            } else {
                buf.truncate(n);
                cur.remaining -= n as u64;
                self.out = frame::encode(&Frame::FileChunk { bytes: buf })?;
            }
            self.out_pos = 0;
            return Ok(true);
        }

        if let Some(item) = self.plan.pop_front() {
            match item {
                PlanItem::Dir(path) => {
                    self.out = frame::encode(&Frame::DirEntry { path })?;
                }
                PlanItem::File {
                    wire_path,
                    abs_path,
                    size,
                    mtime,
                    perms,
                } => {
                    let file = File::open(&abs_path)?;
                    self.current = Some(InProgressFile { file, remaining: size });
                    self.out = frame::encode(&Frame::FileHeader {
                        path: wire_path,
                        size,
                        mtime,
                        perms,
                    })?;
                }
            }
            self.out_pos = 0;
            return Ok(true);
        }

        if !self.stream_end_emitted {
            self.stream_end_emitted = true;
            self.out = frame::encode(&Frame::StreamEnd)?;
            self.out_pos = 0;
            return Ok(true);
        }

        Ok(false)
    }
}

impl Read for Producer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.out_pos < self.out.len() {
                let remaining = &self.out[self.out_pos..];
                let n = remaining.len().min(buf.len());
                buf[..n].copy_from_slice(&remaining[..n]);
                self.out_pos += n;
                return Ok(n);
            }
            let more = self
                .refill()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            if !more {
                return Ok(0);
            }
        }
    }
}

#[cfg(unix)]
fn unix_mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn unix_mode(_meta: &std::fs::Metadata) -> u32 {
    0o644
}
