//! Small stateful `Read`/`Write` adapters that replace the ad-hoc
//! "prefix a header then delegate" and "buffer partial header bytes"
//! patterns used throughout the bundle and symfile codecs.

use std::io::{self, Read, Write};

/// Emits `prefix` before delegating subsequent reads to `inner`. Used on
/// the symfile write path to present `header_len || header_bytes ||
/// payload` as a single stream to the chunked cipher without materialising
/// it in memory.
pub struct PrefixedReader<R> {
    prefix: Vec<u8>,
    prefix_pos: usize,
    inner: R,
}

impl<R: Read> PrefixedReader<R> {
    pub fn new(prefix: Vec<u8>, inner: R) -> Self {
        PrefixedReader {
            prefix,
            prefix_pos: 0,
            inner,
        }
    }
}

impl<R: Read> Read for PrefixedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.prefix_pos < self.prefix.len() {
            let remaining = &self.prefix[self.prefix_pos..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.prefix_pos += n;
            if n > 0 {
                return Ok(n);
            }
        }
        self.inner.read(buf)
    }
}

/// Parses a `u16_be(len) || len bytes` header out of an arbitrarily
/// chunked write stream, then delegates every subsequent byte to the
/// writer that `on_header` returns. Tolerates the length prefix or the
/// header body being split across any number of `write` calls.
pub struct HeaderParsingWriter<W, F> {
    state: ParseState,
    scratch: Vec<u8>,
    on_header: Option<F>,
    target: Option<W>,
}

enum ParseState {
    ReadingLen,
    ReadingHeader(u16),
    Delegating,
}

impl<W: Write, F: FnOnce(Vec<u8>) -> io::Result<W>> HeaderParsingWriter<W, F> {
    pub fn new(on_header: F) -> Self {
        HeaderParsingWriter {
            state: ParseState::ReadingLen,
            scratch: Vec::new(),
            on_header: Some(on_header),
            target: None,
        }
    }

    /// Consumes the adapter once the stream is fully written, returning the
    /// inner writer. Errors if the header was never completed.
    pub fn into_inner(self) -> io::Result<W> {
        self.target
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "header never completed"))
    }
}

impl<W: Write, F: FnOnce(Vec<u8>) -> io::Result<W>> Write for HeaderParsingWriter<W, F> {
    fn write(&mut self, mut buf: &[u8]) -> io::Result<usize> {
        let total = buf.len();
        loop {
            match self.state {
                ParseState::ReadingLen => {
                    let need = 2 - self.scratch.len();
                    let take = need.min(buf.len());
                    self.scratch.extend_from_slice(&buf[..take]);
                    buf = &buf[take..];
                    if self.scratch.len() < 2 {
                        return Ok(total - buf.len());
                    }
                    let len = u16::from_be_bytes([self.scratch[0], self.scratch[1]]);
                    self.scratch.clear();
                    self.state = ParseState::ReadingHeader(len);
                }
                ParseState::ReadingHeader(len) => {
                    let need = len as usize - self.scratch.len();
                    let take = need.min(buf.len());
                    self.scratch.extend_from_slice(&buf[..take]);
                    buf = &buf[take..];
                    if self.scratch.len() < len as usize {
                        return Ok(total - buf.len());
                    }
                    let header_bytes = std::mem::take(&mut self.scratch);
                    let on_header = self
                        .on_header
                        .take()
                        .expect("header callback invoked exactly once");
                    self.target = Some(on_header(header_bytes)?);
                    self.state = ParseState::Delegating;
                }
                ParseState::Delegating => {
                    let target = self
                        .target
                        .as_mut()
                        .expect("delegating state implies target is set");
                    if buf.is_empty() {
                        return Ok(total);
                    }
                    target.write_all(buf)?;
                    return Ok(total);
                }
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.target {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_reader_emits_prefix_then_inner() {
        let mut r = PrefixedReader::new(b"hdr".to_vec(), &b"body"[..]);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hdrbody");
    }

    #[test]
    fn header_parsing_writer_handles_whole_writes() {
        let header = b"HEADER".to_vec();
        let mut frame = Vec::new();
        frame.extend_from_slice(&(header.len() as u16).to_be_bytes());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(b"payload");

        let captured = std::cell::RefCell::new(None);
        let mut w = HeaderParsingWriter::new(|h: Vec<u8>| {
            *captured.borrow_mut() = Some(h);
            Ok(Vec::new())
        });
        w.write_all(&frame).unwrap();
        assert_eq!(captured.into_inner().unwrap(), header);
        assert_eq!(w.into_inner().unwrap(), b"payload");
    }

    #[test]
    fn header_parsing_writer_handles_byte_at_a_time_writes() {
        let header = b"H".to_vec();
        let mut frame = Vec::new();
        frame.extend_from_slice(&(header.len() as u16).to_be_bytes());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(b"xyz");

        let seen_header: std::rc::Rc<std::cell::RefCell<Option<Vec<u8>>>> = Default::default();
        let seen_header_inner = seen_header.clone();
        let mut w = HeaderParsingWriter::new(move |h: Vec<u8>| {
            *seen_header_inner.borrow_mut() = Some(h);
            Ok(Vec::new())
        });
        for byte in &frame {
            w.write_all(std::slice::from_ref(byte)).unwrap();
        }
        assert_eq!(seen_header.borrow().as_deref(), Some(header.as_slice()));
        assert_eq!(w.into_inner().unwrap(), b"xyz");
    }
}
