//! Consumer: a `Write` sink that materialises a multi-directory stream
//! onto disk. Buffers incoming bytes so that frames may arrive split
//! across arbitrary write-call boundaries, and drives the `{Idle, InFile,
//! Done}` state machine the spec calls for, rejecting any frame that
//! does not fit the current state.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::{Error, Result};

use super::frame::{self, from_wire_path, Frame};

enum State {
    Idle,
    InFile {
        file: File,
        path: PathBuf,
        mtime: String,
        perms: u32,
    },
    Done,
}

pub struct Consumer {
    output_root: PathBuf,
    state: State,
    scratch: Vec<u8>,
    metadata: Vec<(String, Vec<u8>)>,
}

impl Consumer {
    pub fn new(output_root: PathBuf) -> Self {
        Consumer {
            output_root,
            state: State::Idle,
            scratch: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn metadata(&self) -> &[(String, Vec<u8>)] {
        &self.metadata
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    fn resolve(&self, wire_path: &str) -> Result<PathBuf> {
        Ok(self.output_root.join(from_wire_path(wire_path)?))
    }

    fn apply(&mut self, frame: Frame) -> Result<()> {
        match (&mut self.state, frame) {
            (State::Idle, Frame::Metadata(items)) => {
                self.metadata.extend(items);
                Ok(())
            }
            (State::Idle, Frame::DirEntry { path }) => {
                let dir = self.resolve(&path)?;
                fs::create_dir_all(&dir)?;
                set_dir_perms(&dir)?;
                Ok(())
            }
            (State::Idle, Frame::FileHeader { path, size: _, mtime, perms }) => {
                let target = self.resolve(&path)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let file = File::create(&target)?;
                self.state = State::InFile { file, path: target, mtime, perms };
                Ok(())
            }
            (State::InFile { file, .. }, Frame::FileChunk { bytes }) => {
                file.write_all(&bytes)?;
                Ok(())
            }
            (State::InFile { path, mtime, perms, .. }, Frame::FileEnd) => {
                let path = path.clone();
                let mtime = mtime.clone();
                let perms = *perms;
                self.state = State::Idle;
                set_mtime(&path, &mtime)?;
                set_file_perms(&path, perms)?;
                Ok(())
            }
            (State::Idle, Frame::StreamEnd) => {
                self.state = State::Done;
                Ok(())
            }
            (state, frame) => Err(Error::BadFrame(format!(
                "unexpected multidir frame {frame:?} in state {}",
                state_name(state)
            ))),
        }
    }
}

fn state_name(state: &State) -> &'static str {
    match state {
        State::Idle => "Idle",
        State::InFile { .. } => "InFile",
        State::Done => "Done",
    }
}

impl Write for Consumer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.scratch.extend_from_slice(buf);
        loop {
            if self.scratch.len() < 4 {
                break;
            }
            let len = u32::from_be_bytes(self.scratch[..4].try_into().unwrap()) as usize;
            if self.scratch.len() < 4 + len {
                break;
            }
            let body: Vec<u8> = self.scratch.drain(..4 + len).skip(4).collect();
            let frame = frame::decode(&body)?;
            self.apply(frame)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let State::InFile { file, .. } = &mut self.state {
            file.flush()?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn set_dir_perms(path: &std::path::Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o777))
}

#[cfg(not(unix))]
fn set_dir_perms(_path: &std::path::Path) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_file_perms(path: &std::path::Path, perms: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(perms & 0o777))
}

#[cfg(not(unix))]
fn set_file_perms(_path: &std::path::Path, _perms: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_mtime(path: &std::path::Path, rfc3339: &str) -> io::Result<()> {
    use std::os::unix::ffi::OsStrExt;

    let dt = chrono::DateTime::parse_from_rfc3339(rfc3339)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let secs = dt.timestamp();

    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let times = libc::utimbuf {
        actime: secs as libc::time_t,
        modtime: secs as libc::time_t,
    };
    let ret = unsafe { libc::utime(c_path.as_ptr(), &times) };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn set_mtime(_path: &std::path::Path, _rfc3339: &str) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_file_chunk_before_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut consumer = Consumer::new(dir.path().to_path_buf());
        let bad = frame::encode(&Frame::FileChunk { bytes: vec![1, 2, 3] }).unwrap();
        assert!(consumer.write_all(&bad).is_err());
    }

    #[test]
    fn accepts_split_writes_across_frame_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let mut consumer = Consumer::new(dir.path().to_path_buf());

        let header = frame::encode(&Frame::FileHeader {
            path: "a.txt".into(),
            size: 3,
            mtime: chrono::Utc::now().to_rfc3339(),
            perms: 0o644,
        })
        .unwrap();
        let chunk = frame::encode(&Frame::FileChunk { bytes: vec![b'a', b'b', b'c'] }).unwrap();
        let end = frame::encode(&Frame::FileEnd).unwrap();
        let stream_end = frame::encode(&Frame::StreamEnd).unwrap();

        let mut all = Vec::new();
        all.extend_from_slice(&header);
        all.extend_from_slice(&chunk);
        all.extend_from_slice(&end);
        all.extend_from_slice(&stream_end);

        for byte in &all {
            consumer.write_all(std::slice::from_ref(byte)).unwrap();
        }

        assert!(consumer.is_done());
        let content = std::fs::read(dir.path().join("a.txt")).unwrap();
        assert_eq!(content, b"abc");
    }
}
