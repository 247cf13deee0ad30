//! Newline-aligned partitioning of a source into per-worker parts.

use std::{fs::File, io};

use memchr::memchr;
use snafu::ResultExt;

use crate::error::{Result, SplitSnafu};

/// Bytes read per probe while looking for the newline after a split target.
const WINDOW: usize = 64;

/// Positioned reads with no shared cursor, so several workers can read one
/// handle concurrently.
pub trait ReadAt {
    /// Reads into `buf` starting at `offset`. Returns `Ok(0)` at end of data.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

#[cfg(unix)]
impl ReadAt for File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }
}

#[cfg(windows)]
impl ReadAt for File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.len());
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

/// A contiguous byte range of the source assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePart {
    pub offset: u64,
    pub length: u64,
}

impl FilePart {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Splits `len` bytes of `source` into at most `parts` non-empty ranges.
///
/// Each range except the last ends immediately after a `\n`; the last one
/// runs to `len`. Together they cover `0..len` exactly once. Fewer ranges
/// come back when the source has fewer lines than `parts`, and none for an
/// empty source.
pub fn split_parts<S: ReadAt + ?Sized>(source: &S, len: u64, parts: usize) -> Result<Vec<FilePart>> {
    // No more parts than bytes, so every target is at least one byte apart.
    let parts = (parts.max(1) as u64).min(len.max(1));
    let target = len / parts;
    let mut result = Vec::new();
    let mut offset = 0u64;

    for i in 1..parts {
        if offset >= len {
            break;
        }
        // A long line already carried the previous part past this target.
        if i * target <= offset {
            continue;
        }
        // Start one byte early so a target that already sits on a line start
        // is kept as-is.
        let from = i * target - 1;
        let end = next_line_start(source, from, len)?;
        if end > offset {
            result.push(FilePart {
                offset,
                length: end - offset,
            });
            offset = end;
        }
    }

    if offset < len {
        result.push(FilePart {
            offset,
            length: len - offset,
        });
    }

    log::debug!("split {len} bytes into {} parts: {result:?}", result.len());
    Ok(result)
}

/// Position just past the first `\n` at or after `from`, or `len` if there is
/// none. A source that runs dry before `len` is an error.
fn next_line_start<S: ReadAt + ?Sized>(source: &S, mut from: u64, len: u64) -> Result<u64> {
    let mut window = [0u8; WINDOW];
    while from < len {
        let want = WINDOW.min((len - from) as usize);
        let n = source
            .read_at(&mut window[..want], from)
            .context(SplitSnafu { offset: from })?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "source ended before its stated length",
            ))
            .context(SplitSnafu { offset: from });
        }
        if let Some(pos) = memchr(b'\n', &window[..n]) {
            return Ok(from + pos as u64 + 1);
        }
        from += n as u64;
    }
    Ok(len)
}
