use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    time::Instant,
};

use anyhow::{anyhow, ensure, Context};
use clap::Parser;
use crossbeam::{channel, thread};
use rayon::prelude::*;

/// Station names with their yearly mean temperature in °C.
const STATIONS: &[(&str, f64)] = &[
    ("Abha", 18.0),
    ("Abidjan", 26.0),
    ("Abéché", 29.4),
    ("Accra", 26.4),
    ("Addis Ababa", 16.0),
    ("Adelaide", 17.3),
    ("Alexandria", 20.0),
    ("Almaty", 10.0),
    ("Amsterdam", 10.2),
    ("Anchorage", 2.8),
    ("Ankara", 12.0),
    ("Arkhangelsk", 1.3),
    ("Athens", 19.2),
    ("Auckland", 15.2),
    ("Baghdad", 22.77),
    ("Bangkok", 28.6),
    ("Barcelona", 18.2),
    ("Beijing", 12.9),
    ("Berlin", 10.3),
    ("Bogotá", 13.3),
    ("Buenos Aires", 17.9),
    ("Cairo", 21.4),
    ("Cape Town", 16.2),
    ("Chicago", 9.8),
    ("Dakar", 24.0),
    ("Dikson", -11.1),
    ("Dubai", 26.9),
    ("Dublin", 9.8),
    ("Hamburg", 9.7),
    ("Hanoi", 23.6),
    ("Helsinki", 5.9),
    ("Hong Kong", 23.3),
    ("Istanbul", 13.9),
    ("İzmir", 17.9),
    ("Jakarta", 26.7),
    ("Kraków", 8.3),
    ("Lagos", 26.8),
    ("Lima", 19.2),
    ("London", 11.3),
    ("Mexico City", 17.5),
    ("Moscow", 5.8),
    ("Mumbai", 27.1),
    ("Nairobi", 17.8),
    ("New York City", 12.9),
    ("Oslo", 5.7),
    ("Paris", 12.3),
    ("Reykjavík", 4.3),
    ("São Paulo", 19.7),
    ("Seoul", 12.5),
    ("Singapore", 27.0),
    ("Stockholm", 6.6),
    ("Sydney", 17.7),
    ("Tokyo", 15.4),
    ("Toronto", 9.4),
    ("Ürümqi", 7.4),
    ("Vancouver", 10.4),
    ("Yakutsk", -8.8),
    ("Zürich", 9.3),
];

/// Writes a synthetic `<station>;<temperature>` measurements file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Output file.
    #[arg(default_value = "measurements.txt")]
    output: PathBuf,

    /// Number of lines to write.
    #[arg(short, long, default_value_t = 1_000_000)]
    rows: u64,

    /// Number of distinct station names. Beyond the built-in list, numbered
    /// variants of the built-in names are used.
    #[arg(short, long, default_value_t = STATIONS.len())]
    stations: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Lines generated per parallel task.
    #[arg(long, default_value_t = 100_000)]
    block_rows: u64,
}

#[derive(Debug, Clone)]
struct Station {
    name: String,
    mean: f64,
}

impl Station {
    /// Roughly normal around the mean with a 10 °C spread, in tenths,
    /// clamped to what fits `-?\d{1,2}\.\d`.
    fn sample(&self, rng: &mut fastrand::Rng) -> i32 {
        let noise: f64 = (0..12).map(|_| rng.f64()).sum::<f64>() - 6.0;
        ((self.mean + noise * 10.0) * 10.0).round().clamp(-999.0, 999.0) as i32
    }
}

fn station_list(count: usize) -> Vec<Station> {
    (0..count)
        .map(|i| {
            let (name, mean) = STATIONS[i % STATIONS.len()];
            let round = i / STATIONS.len();
            Station {
                name: if round == 0 {
                    name.to_string()
                } else {
                    format!("{name} {round}")
                },
                mean,
            }
        })
        .collect()
}

fn push_tenths(out: &mut Vec<u8>, tenths: i32) {
    if tenths < 0 {
        out.push(b'-');
    }
    let abs = tenths.unsigned_abs();
    if abs >= 100 {
        out.push(b'0' + (abs / 100) as u8);
    }
    out.push(b'0' + (abs / 10 % 10) as u8);
    out.push(b'.');
    out.push(b'0' + (abs % 10) as u8);
}

fn render_block(stations: &[Station], rows: u64, rng: &mut fastrand::Rng) -> Vec<u8> {
    let mut out = Vec::with_capacity(rows as usize * 16);
    for _ in 0..rows {
        let station = &stations[rng.usize(..stations.len())];
        out.extend_from_slice(station.name.as_bytes());
        out.push(b';');
        push_tenths(&mut out, station.sample(rng));
        out.push(b'\n');
    }
    out
}

fn block_seed(seed: u64, block: u64) -> u64 {
    seed ^ block.wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    ensure!(cli.stations > 0, "--stations must be at least 1");
    ensure!(cli.block_rows > 0, "--block-rows must be at least 1");

    let start = Instant::now();
    let stations = station_list(cli.stations);
    let blocks = cli.rows.div_ceil(cli.block_rows);
    let file = File::create(&cli.output)
        .with_context(|| format!("cannot create {}", cli.output.display()))?;
    let (tx, rx) = channel::bounded::<Vec<u8>>(rayon::current_num_threads() * 2);

    let written = thread::scope(|s| -> anyhow::Result<u64> {
        let writer = s.spawn(move |_| -> io::Result<u64> {
            let mut out = BufWriter::with_capacity(1 << 20, file);
            let mut written = 0;
            for block in rx {
                out.write_all(&block)?;
                written += block.len() as u64;
            }
            out.flush()?;
            Ok(written)
        });

        // Block order in the output is irrelevant; only the set of lines is.
        let sent = (0..blocks).into_par_iter().try_for_each_with(tx, |tx, block| {
            let rows = cli.block_rows.min(cli.rows - block * cli.block_rows);
            let mut rng = fastrand::Rng::with_seed(block_seed(cli.seed, block));
            tx.send(render_block(&stations, rows, &mut rng))
        });

        let written = writer
            .join()
            .map_err(|_| anyhow!("writer thread panicked"))?
            .with_context(|| format!("cannot write {}", cli.output.display()))?;
        sent.map_err(|_| anyhow!("writer stopped before all blocks were sent"))?;
        Ok(written)
    })
    .map_err(|_| anyhow!("generator thread panicked"))??;

    eprintln!(
        "wrote {} rows ({written} bytes, {} stations) to {} in {:?}",
        cli.rows,
        stations.len(),
        cli.output.display(),
        start.elapsed()
    );
    Ok(())
}
