use std::{io, path::PathBuf};

use snafu::Snafu;

use crate::{fixed::ValueError, table::TableFull};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every way an aggregation can fail.
///
/// There is no partial-success mode: any of these aborts the whole run and
/// no statistics are returned. Offsets are absolute positions in the source,
/// pointing at the first byte of the offending line.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("cannot open {}: {source}", path.display()))]
    Open { path: PathBuf, source: io::Error },

    #[snafu(display("cannot stat {}: {source}", path.display()))]
    Metadata { path: PathBuf, source: io::Error },

    #[snafu(display("failed to read split window at offset {offset}: {source}"))]
    Split { offset: u64, source: io::Error },

    #[snafu(display("failed to read at offset {offset}: {source}"))]
    Read { offset: u64, source: io::Error },

    #[snafu(display("malformed record at offset {offset} ({line:?}): {source}"))]
    MalformedRecord {
        offset: u64,
        line: String,
        source: ValueError,
    },

    #[snafu(display("missing ';' separator in record at offset {offset} ({line:?})"))]
    MissingSeparator { offset: u64, line: String },

    #[snafu(display("line at offset {offset} is longer than the {limit} byte read buffer"))]
    LineTooLong { offset: u64, limit: usize },

    #[snafu(display("{source}"))]
    TableOverflow { source: TableFull },

    #[snafu(display("invalid configuration: {reason}"))]
    InvalidConfig { reason: String },

    #[snafu(display("a worker thread panicked"))]
    WorkerPanicked,

    #[snafu(display("scan cancelled after another worker failed"))]
    Cancelled,

    #[snafu(display("cannot write report to {}: {source}", path.display()))]
    WriteReport { path: PathBuf, source: io::Error },
}

/// Lossy rendering of a record for error messages, capped so a runaway line
/// does not end up in a log verbatim.
pub(crate) fn excerpt(line: &[u8]) -> String {
    const MAX: usize = 128;
    let cut = &line[..line.len().min(MAX)];
    let mut text = String::from_utf8_lossy(cut).into_owned();
    if line.len() > MAX {
        text.push_str("...");
    }
    text
}
