//! Byte-oriented line reader over plain or gzip logs

use crate::error::Result;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads a log line by line as raw bytes, leaving UTF-8 decoding to the caller.
pub struct LogReader<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    line_number: u64,
}

impl LogReader<Box<dyn BufRead>> {
    /// Open a log file; `.gz` files are decompressed on the fly.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let is_gzip = path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("gz"));
        let reader: Box<dyn BufRead> = if is_gzip {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(reader))
    }
}

impl<R: BufRead> LogReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: Vec::with_capacity(1024), line_number: 0 }
    }

    /// Next line without its terminator, with its 1-based number.
    pub fn read_line(&mut self) -> Result<Option<(u64, &[u8])>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        let mut end = self.buf.len();
        while end > 0 && matches!(self.buf[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        Ok(Some((self.line_number, &self.buf[..end])))
    }

    pub fn lines_read(&self) -> u64 {
        self.line_number
    }
}
