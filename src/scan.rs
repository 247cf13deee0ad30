//! Single-pass scanning of one part of the input into a [`StationTable`].

use std::{
    io::{self, Read},
    sync::atomic::{AtomicBool, Ordering},
};

use memchr::{memchr, memrchr};
use snafu::ResultExt;

use crate::{
    error::{
        excerpt, CancelledSnafu, LineTooLongSnafu, MalformedRecordSnafu, MissingSeparatorSnafu,
        ReadSnafu, Result, TableOverflowSnafu,
    },
    fixed::{parse_prefix, ParseMode},
    fnv,
    split::{FilePart, ReadAt},
    table::StationTable,
};

pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// [`Read`] over one [`FilePart`] of a positioned source. Keeps its own
/// cursor, so many readers can share one handle. Running out of data before
/// the end of the part is `UnexpectedEof`, never a clean end of stream.
pub struct PartReader<'a, S: ?Sized> {
    source: &'a S,
    pos: u64,
    end: u64,
}

impl<'a, S: ReadAt + ?Sized> PartReader<'a, S> {
    pub fn new(source: &'a S, part: FilePart) -> Self {
        Self {
            source,
            pos: part.offset,
            end: part.end(),
        }
    }
}

impl<S: ReadAt + ?Sized> Read for PartReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.end {
            return Ok(0);
        }
        let want = buf.len().min((self.end - self.pos) as usize);
        let n = self.source.read_at(&mut buf[..want], self.pos)?;
        if n == 0 && want > 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("source ended at {} inside a part ending at {}", self.pos, self.end),
            ));
        }
        self.pos += n as u64;
        Ok(n)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub lines: u64,
    pub bytes: u64,
}

/// Folds `<name>;<value>` lines into a table through a fixed-size buffer.
///
/// Each refill tops the buffer up behind the partial line left over from
/// the previous round, folds everything up to the last `\n`, and moves the
/// remainder to the front. A line (terminator included) therefore may not be
/// longer than the buffer. A final line without `\n` is still folded.
pub struct ChunkScanner {
    buf: Vec<u8>,
    mode: ParseMode,
}

impl ChunkScanner {
    pub fn new(buffer_size: usize, mode: ParseMode) -> Self {
        Self {
            buf: vec![0; buffer_size.max(1)],
            mode,
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buf.len()
    }

    /// Scans `reader` to the end. `base` is the absolute offset of the
    /// reader's first byte and is only used to locate errors.
    pub fn scan<R: Read>(&mut self, reader: R, base: u64, table: &mut StationTable) -> Result<ScanSummary> {
        self.scan_until(reader, base, table, &AtomicBool::new(false))
    }

    /// Like [`scan`](Self::scan), giving up with [`Error::Cancelled`] once
    /// `cancel` is set. The flag is checked before every refill.
    ///
    /// [`Error::Cancelled`]: crate::Error::Cancelled
    pub fn scan_until<R: Read>(
        &mut self,
        mut reader: R,
        base: u64,
        table: &mut StationTable,
        cancel: &AtomicBool,
    ) -> Result<ScanSummary> {
        let mode = self.mode;
        let buf = &mut self.buf[..];
        let cap = buf.len();
        let mut summary = ScanSummary::default();
        let mut carry = 0;

        loop {
            if cancel.load(Ordering::Relaxed) {
                return CancelledSnafu.fail();
            }

            let n = read_some(&mut reader, &mut buf[carry..]).context(ReadSnafu {
                offset: base + summary.bytes + carry as u64,
            })?;
            let filled = carry + n;

            if n == 0 {
                if filled > 0 {
                    let at = base + summary.bytes;
                    summary.lines += fold_lines(&buf[..filled], at, table, mode)?;
                    summary.bytes += filled as u64;
                }
                return Ok(summary);
            }

            match memrchr(b'\n', &buf[..filled]) {
                Some(last) => {
                    let block = last + 1;
                    let at = base + summary.bytes;
                    summary.lines += fold_lines(&buf[..block], at, table, mode)?;
                    summary.bytes += block as u64;
                    buf.copy_within(block..filled, 0);
                    carry = filled - block;
                }
                None if filled == cap => {
                    return LineTooLongSnafu {
                        offset: base + summary.bytes,
                        limit: cap,
                    }
                    .fail();
                }
                None => carry = filled,
            }
        }
    }
}

fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

fn line_at(block: &[u8], start: usize) -> &[u8] {
    let rest = &block[start..];
    &rest[..memchr(b'\n', rest).unwrap_or(rest.len())]
}

/// Folds every line of `block` into `table`. The block holds whole lines,
/// the last of which may lack its `\n`. Returns the number of lines.
#[inline]
fn fold_lines(block: &[u8], base: u64, table: &mut StationTable, mode: ParseMode) -> Result<u64> {
    let mut lines = 0;
    let mut i = 0;

    while i < block.len() {
        let start = i;

        // Hash the name while looking for the separator.
        let mut hash = fnv::OFFSET_BASIS;
        loop {
            match block.get(i) {
                Some(b';') => break,
                Some(b'\n') | None => {
                    return MissingSeparatorSnafu {
                        offset: base + start as u64,
                        line: excerpt(line_at(block, start)),
                    }
                    .fail();
                }
                Some(&b) => {
                    hash = fnv::step(hash, b);
                    i += 1;
                }
            }
        }
        let name = &block[start..i];
        i += 1;

        let (value, used) = parse_prefix(&block[i..], mode).with_context(|_| MalformedRecordSnafu {
            offset: base + start as u64,
            line: excerpt(line_at(block, start)),
        })?;
        // Past the value and its `\n` (or past the end of an unterminated line).
        i += used + 1;

        table
            .upsert_hashed(hash, name, value)
            .context(TableOverflowSnafu)?;
        lines += 1;
    }

    Ok(lines)
}
