//! Atomic decrypt-to-path writes: stage bytes in a `NamedTempFile` next to
//! the destination and rename it into place only once the caller has
//! written every byte successfully, so a decrypt that fails partway
//! through (bad password, truncated input, tamper detected) never leaves
//! a partially-written destination file.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tempfile::NamedTempFile;

struct Pending {
    tmp: NamedTempFile,
    dest: PathBuf,
}

/// Handle paired with an [`AtomicFileWriter`]; pass it to [`commit`] once
/// the writer has received every byte to rename the temp file into place.
#[derive(Clone)]
pub struct PendingCommit(Rc<RefCell<Option<Pending>>>);

/// A `Write` sink that stages bytes into a temp file in `dest`'s
/// directory rather than writing `dest` directly.
pub struct AtomicFileWriter(Rc<RefCell<Option<Pending>>>);

/// Begin staging a write to `dest`. Returns the writer and a handle to
/// commit it with once writing succeeds.
pub fn create(dest: PathBuf) -> io::Result<(AtomicFileWriter, PendingCommit)> {
    let dir = dest.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir)?;
    let state = Rc::new(RefCell::new(Some(Pending { tmp, dest })));
    Ok((AtomicFileWriter(state.clone()), PendingCommit(state)))
}

/// Rename the staged temp file into place. A no-op if nothing was ever
/// staged (the writer was never used) or `commit` already ran.
pub fn commit(pending: PendingCommit) -> io::Result<()> {
    if let Some(p) = pending.0.borrow_mut().take() {
        p.tmp.persist(&p.dest).map_err(|e| e.error)?;
    }
    Ok(())
}

impl Write for AtomicFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut slot = self.0.borrow_mut();
        let pending = slot.as_mut().expect("AtomicFileWriter used after commit");
        pending.tmp.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut slot = self.0.borrow_mut();
        let pending = slot.as_mut().expect("AtomicFileWriter used after commit");
        pending.tmp.flush()
    }
}
