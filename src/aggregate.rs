//! Fan-out over file parts, fan-in through a result channel, sequential merge.

use std::{
    fs::File,
    sync::atomic::{AtomicBool, Ordering},
};

use crossbeam::{channel, thread};
use fxhash::FxHashMap;
use snafu::ResultExt;

use crate::{
    config::Config,
    error::{Error, MetadataSnafu, OpenSnafu, Result},
    report::{Report, StationStats},
    scan::{ChunkScanner, PartReader, ScanSummary},
    split::{split_parts, FilePart, ReadAt},
    table::{Aggregate, StationTable},
};

/// Aggregates the file named by `config.path`.
pub fn aggregate(config: &Config) -> Result<Report> {
    config.validate()?;
    let file = File::open(&config.path).context(OpenSnafu { path: &config.path })?;
    let len = file
        .metadata()
        .context(MetadataSnafu { path: &config.path })?
        .len();
    aggregate_source(&file, len, config)
}

/// Aggregates the first `len` bytes of `source`; `config.path` is ignored.
///
/// One scoped thread scans each part into its own table, so nothing is
/// shared while scanning. Finished tables come back over a channel with room
/// for every worker and are merged as they arrive. The first error raises a
/// cancel flag that the other workers check between reads; the channel is
/// still drained so every worker is joined before the error is returned.
pub fn aggregate_source<S>(source: &S, len: u64, config: &Config) -> Result<Report>
where
    S: ReadAt + Sync + ?Sized,
{
    config.validate()?;
    let parts = split_parts(source, len, config.workers)?;
    let mut merger = Merger::new();
    if parts.is_empty() {
        return Ok(merger.finish());
    }

    let cancel = AtomicBool::new(false);
    let (tx, rx) = channel::bounded(parts.len());
    let mut failure: Option<Error> = None;

    thread::scope(|s| {
        for (index, part) in parts.iter().copied().enumerate() {
            let tx = tx.clone();
            let cancel = &cancel;
            s.spawn(move |_| {
                let result = scan_part(source, part, config, cancel);
                let _ = tx.send((index, part, result));
            });
        }
        drop(tx);

        for (index, part, result) in rx.iter() {
            match result {
                Ok((table, summary)) => {
                    log::debug!(
                        "part {index} at {}..{}: {} lines, {} stations",
                        part.offset,
                        part.end(),
                        summary.lines,
                        table.len()
                    );
                    if failure.is_none() {
                        merger.absorb(table);
                    }
                }
                Err(err) => {
                    cancel.store(true, Ordering::Relaxed);
                    let replace = match &failure {
                        None => true,
                        Some(Error::Cancelled) => !matches!(err, Error::Cancelled),
                        Some(_) => false,
                    };
                    if replace {
                        failure = Some(err);
                    }
                }
            }
        }
    })
    .map_err(|_| Error::WorkerPanicked)?;

    if let Some(err) = failure {
        log::warn!("aggregation aborted: {err}");
        return Err(err);
    }
    Ok(merger.finish())
}

fn scan_part<S: ReadAt + ?Sized>(
    source: &S,
    part: FilePart,
    config: &Config,
    cancel: &AtomicBool,
) -> Result<(StationTable, ScanSummary)> {
    let mut table = StationTable::with_capacity(config.table_capacity);
    let mut scanner = ChunkScanner::new(config.buffer_size, config.mode);
    let summary =
        scanner.scan_until(PartReader::new(source, part), part.offset, &mut table, cancel)?;
    Ok((table, summary))
}

/// Combines per-worker tables into final statistics.
///
/// Only min, max, sum and count are combined here, all commutative and
/// associative, so the order tables are absorbed in does not change the
/// result. The mean is computed once, in [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct Merger {
    stations: FxHashMap<Box<[u8]>, Aggregate>,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, table: StationTable) {
        for (name, agg) in table.into_entries() {
            self.stations
                .entry(name)
                .and_modify(|total| total.merge(&agg))
                .or_insert(agg);
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn finish(self) -> Report {
        Report::from_map(
            self.stations
                .into_iter()
                .map(|(name, agg)| (name, StationStats::finalize(agg)))
                .collect(),
        )
    }
}
