//! Seekable byte source.
//!
//! Wraps any `Read + Seek` value supplied by the caller. The document never
//! opens files itself; it reads windows of bytes from this source on demand.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// Object-safe combination of `Read` and `Seek`.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Random-access reader over the bytes of a PDF file.
pub struct ByteSource {
    inner: Box<dyn ReadSeek>,
    len: u64,
    pos: u64,
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSource")
            .field("len", &self.len)
            .field("pos", &self.pos)
            .finish()
    }
}

impl ByteSource {
    /// Wrap a reader. The length is determined by seeking to the end.
    pub fn new<R: Read + Seek + Send + 'static>(mut reader: R) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner: Box::new(reader),
            len,
            pos: 0,
        })
    }

    /// Source over an in-memory buffer.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let len = data.len() as u64;
        Self {
            inner: Box::new(std::io::Cursor::new(data)),
            len,
            pos: 0,
        }
    }

    /// Total length in bytes.
    pub fn length(&self) -> u64 {
        self.len
    }

    /// Current position.
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// Move the read position.
    pub fn seek(&mut self, from: SeekFrom) -> Result<u64> {
        let target = match from {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::End(n) => self.len as i128 + n as i128,
            SeekFrom::Current(n) => self.pos as i128 + n as i128,
        };
        if target < 0 || target > self.len as i128 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("seek to {} outside source of {} bytes", target, self.len),
            )));
        }
        self.pos = self.inner.seek(SeekFrom::Start(target as u64))?;
        Ok(self.pos)
    }

    /// Read exactly `n` bytes; fails with an IO error if fewer remain.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.pos + n as u64 > self.len {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("read of {} bytes at {} passes end of source ({})", n, self.pos, self.len),
            )));
        }
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        self.pos += n as u64;
        Ok(buf)
    }

    /// Read up to `n` bytes starting at `offset`, clamped to the end of the source.
    pub fn read_window(&mut self, offset: u64, n: usize) -> Result<Vec<u8>> {
        let offset = offset.min(self.len);
        let available = (self.len - offset).min(n as u64) as usize;
        self.seek(SeekFrom::Start(offset))?;
        self.read(available)
    }

    /// Read the whole source.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        self.read_window(0, self.len as usize)
    }

    /// Read one line starting at the current position. The terminator (LF,
    /// CR or CRLF) is consumed but not returned. Returns `None` at EOF.
    pub fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        if self.pos >= self.len {
            return Ok(None);
        }
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        while self.pos < self.len {
            self.inner.read_exact(&mut byte)?;
            self.pos += 1;
            match byte[0] {
                b'\n' => break,
                b'\r' => {
                    if self.pos < self.len {
                        self.inner.read_exact(&mut byte)?;
                        if byte[0] == b'\n' {
                            self.pos += 1;
                        } else {
                            self.inner.seek(SeekFrom::Start(self.pos))?;
                        }
                    }
                    break;
                },
                b => line.push(b),
            }
        }
        Ok(Some(line))
    }

    /// Read the line that ends just before `offset`, scanning backward.
    ///
    /// Returns the line content and the offset where it starts. Trailing
    /// end-of-line bytes immediately before `offset` are skipped first, so
    /// repeated calls with the returned start offset walk the file upward.
    pub fn read_line_backward_from(&mut self, offset: u64) -> Result<Option<(Vec<u8>, u64)>> {
        let mut end = offset.min(self.len);
        const CHUNK: u64 = 256;

        // Skip the terminator of the previous line.
        while end > 0 {
            let b = self.byte_at(end - 1)?;
            if b == b'\n' || b == b'\r' {
                end -= 1;
            } else {
                break;
            }
        }
        if end == 0 {
            return Ok(None);
        }

        let mut start = end;
        'scan: while start > 0 {
            let chunk_start = start.saturating_sub(CHUNK);
            let chunk = self.read_window(chunk_start, (start - chunk_start) as usize)?;
            for (i, &b) in chunk.iter().enumerate().rev() {
                if b == b'\n' || b == b'\r' {
                    start = chunk_start + i as u64 + 1;
                    break 'scan;
                }
            }
            start = chunk_start;
        }

        let line = self.read_window(start, (end - start) as usize)?;
        Ok(Some((line, start)))
    }

    fn byte_at(&mut self, offset: u64) -> Result<u8> {
        let b = self.read_window(offset, 1)?;
        b.first().copied().ok_or(Error::UnexpectedEof {
            offset: offset as usize,
        })
    }
}
