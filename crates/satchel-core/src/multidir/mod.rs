//! Binary framing of a directory tree into a single stream: a [`Producer`]
//! walks one or more roots and emits a flat sequence of typed records: a
//! [`Consumer`] drives the inverse state machine and materialises them
//! back onto disk. Optionally wrapped in streaming zstd compression
//! before the outer AEAD layer seals the whole thing.

mod consumer;
mod frame;
mod producer;

pub use consumer::Consumer;
pub use frame::Frame;
pub use producer::Producer;

use std::io::{Read, Write};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Wrap a producer's raw frame stream in a zstd encoder when `compress`
/// is set; otherwise pass it through untouched.
pub fn compressing_reader(roots: &[PathBuf], metadata: Vec<(String, Vec<u8>)>, compress: bool) -> Result<Box<dyn Read>> {
    let producer = Producer::new(roots, metadata)?;
    if compress {
        let encoder = zstd::stream::read::Encoder::new(producer, 0)
            .map_err(Error::Io)?;
        Ok(Box::new(encoder))
    } else {
        Ok(Box::new(producer))
    }
}

/// A consumer sink that optionally decompresses incoming bytes before
/// they reach the frame parser. Returned as a concrete enum (rather than
/// a trait object) so callers can still reach the underlying [`Consumer`]
/// once the stream is fully written.
pub enum MaterialisingWriter {
    Plain(Consumer),
    Compressed(Box<zstd::stream::write::Decoder<'static, Consumer>>),
}

impl MaterialisingWriter {
    pub fn new(output_root: PathBuf, compress: bool) -> Result<Self> {
        let consumer = Consumer::new(output_root);
        if compress {
            let decoder = zstd::stream::write::Decoder::new(consumer).map_err(Error::Io)?;
            Ok(MaterialisingWriter::Compressed(Box::new(decoder)))
        } else {
            Ok(MaterialisingWriter::Plain(consumer))
        }
    }

    pub fn into_consumer(self) -> Result<Consumer> {
        match self {
            MaterialisingWriter::Plain(c) => Ok(c),
            MaterialisingWriter::Compressed(mut d) => {
                d.flush().map_err(Error::Io)?;
                Ok(d.into_inner())
            }
        }
    }
}

impl Write for MaterialisingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            MaterialisingWriter::Plain(c) => c.write(buf),
            MaterialisingWriter::Compressed(d) => d.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            MaterialisingWriter::Plain(c) => c.flush(),
            MaterialisingWriter::Compressed(d) => d.flush(),
        }
    }
}
