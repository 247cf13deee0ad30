//! Per-station min/mean/max over large `<station>;<temperature>` files.
//!
//! The input is cut into newline-aligned parts ([`split_parts`]), each part
//! is scanned on its own thread into a private fixed-capacity
//! [`StationTable`] ([`ChunkScanner`]), and the tables are merged into a
//! [`Report`]. Temperatures are kept as integers in tenths of a degree
//! throughout, so the result does not depend on how the file was split.
//!
//! ```no_run
//! use station_stats::{aggregate, Config};
//!
//! let report = aggregate(&Config::new("measurements.txt").with_workers(8))?;
//! println!("{report}");
//! # Ok::<(), station_stats::Error>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod fixed;
pub mod fnv;
pub mod report;
pub mod scan;
pub mod split;
pub mod table;

pub use aggregate::{aggregate, aggregate_source, Merger};
pub use config::Config;
pub use error::{Error, Result};
pub use fixed::{parse_scaled, ParseMode, ValueError};
pub use report::{Report, StationStats};
pub use scan::{ChunkScanner, PartReader, ScanSummary};
pub use split::{split_parts, FilePart, ReadAt};
pub use table::{Aggregate, StationTable, TableFull};
