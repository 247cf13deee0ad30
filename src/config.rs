use std::path::PathBuf;

use snafu::ensure;

use crate::{
    error::{InvalidConfigSnafu, Result},
    fixed::ParseMode,
    scan::DEFAULT_BUFFER_SIZE,
    table::DEFAULT_CAPACITY,
};

/// Smallest read buffer accepted; one record must fit with room to spare.
pub const MIN_BUFFER_SIZE: usize = 64;

/// Everything an aggregation run needs. Nothing is read from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub path: PathBuf,
    /// Number of parts the input is split into, one worker thread each.
    pub workers: usize,
    /// Slots per worker table. Must be a power of two; half of it is the
    /// ceiling on distinct station names.
    pub table_capacity: usize,
    /// Per-worker read buffer, and so the longest accepted line.
    pub buffer_size: usize,
    pub mode: ParseMode,
}

impl Config {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            workers: num_cpus::get().max(1),
            table_capacity: DEFAULT_CAPACITY,
            buffer_size: DEFAULT_BUFFER_SIZE,
            mode: ParseMode::Strict,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_table_capacity(mut self, table_capacity: usize) -> Self {
        self.table_capacity = table_capacity;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.workers >= 1,
            InvalidConfigSnafu {
                reason: "worker count must be at least 1"
            }
        );
        ensure!(
            self.table_capacity >= 2 && self.table_capacity.is_power_of_two(),
            InvalidConfigSnafu {
                reason: format!(
                    "table capacity {} is not a power of two >= 2",
                    self.table_capacity
                )
            }
        );
        ensure!(
            self.buffer_size >= MIN_BUFFER_SIZE,
            InvalidConfigSnafu {
                reason: format!(
                    "buffer size {} is below the minimum of {MIN_BUFFER_SIZE}",
                    self.buffer_size
                )
            }
        );
        Ok(())
    }
}
