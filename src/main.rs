use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
    time::Instant,
};

use anyhow::Context;
use clap::Parser;
use station_stats::{aggregate, Config, ParseMode};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Computes min/mean/max temperature per station.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Measurements file, one `<station>;<temperature>` record per line.
    #[arg(default_value = "measurements.txt")]
    file: PathBuf,

    /// Worker threads [default: number of CPUs]
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Read buffer per worker in bytes; also the longest accepted line.
    #[arg(long, default_value_t = station_stats::scan::DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Hash table slots per worker (power of two).
    #[arg(long, default_value_t = station_stats::table::DEFAULT_CAPACITY)]
    table_capacity: usize,

    /// Skip temperature validation.
    #[arg(long)]
    trusted: bool,

    /// Write the result here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::new(&self.file)
            .with_buffer_size(self.buffer_size)
            .with_table_capacity(self.table_capacity)
            .with_mode(if self.trusted {
                ParseMode::Trusted
            } else {
                ParseMode::Strict
            });
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = cli.config();

    let start = Instant::now();
    let report = aggregate(&config)
        .with_context(|| format!("aggregating {}", config.path.display()))?;
    log::info!(
        "{} stations from {} with {} workers in {:?}",
        report.len(),
        config.path.display(),
        config.workers,
        start.elapsed()
    );

    match &cli.output {
        Some(path) => report.write_to_path(path)?,
        None => {
            let mut out = BufWriter::new(io::stdout().lock());
            writeln!(out, "{report}")?;
            out.flush()?;
        }
    }

    Ok(())
}
