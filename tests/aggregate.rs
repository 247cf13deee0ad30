use std::{collections::BTreeMap, fs::File, io::Write, path::Path};

use station_stats::{aggregate, split_parts, Config, Error, ParseMode, Report};
use tempfile::NamedTempFile;

const STATIONS: &[&str] = &[
    "Abha", "Abidjan", "Abéché", "Accra", "Addis Ababa", "Adelaide", "Aden", "Ahvaz",
    "Albuquerque", "Alexandra", "Alexandria", "Algiers", "Alice Springs", "Almaty", "Amsterdam",
    "Anadyr", "Anchorage", "Andorra la Vella", "Ankara", "Antananarivo", "Antsiranana",
    "Arkhangelsk", "Ashgabat", "Asmara", "Assab", "Astana", "Athens", "Atlanta", "Auckland",
    "Austin", "Baghdad", "Baguio", "Baku", "Baltimore", "Bamako", "Bangkok", "Bangui", "Banjul",
    "Barcelona", "Bata", "Batumi", "Beijing", "Beirut", "Belgrade", "Belize City", "Benghazi",
    "Bergen", "Berlin", "Bilbao", "Birao", "İzmir", "Kraków", "Ürümqi", "Zürich",
];

fn write_temp(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

fn format_tenths(tenths: i32) -> String {
    let sign = if tenths < 0 { "-" } else { "" };
    format!("{sign}{}.{}", tenths.abs() / 10, tenths.abs() % 10)
}

/// Random measurements plus the expected (min, max, sum, count) per station.
fn random_measurements(seed: u64, rows: usize) -> (Vec<u8>, BTreeMap<String, (i32, i32, i64, u64)>) {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut data = Vec::new();
    let mut expected = BTreeMap::new();
    for _ in 0..rows {
        let name = STATIONS[rng.usize(..STATIONS.len())];
        let value = rng.i32(-999..=999);
        data.extend_from_slice(format!("{name};{}\n", format_tenths(value)).as_bytes());
        let entry = expected
            .entry(name.to_string())
            .or_insert((i32::MAX, i32::MIN, 0i64, 0u64));
        entry.0 = entry.0.min(value);
        entry.1 = entry.1.max(value);
        entry.2 += value as i64;
        entry.3 += 1;
    }
    (data, expected)
}

fn run(path: &Path, workers: usize, buffer_size: usize) -> Report {
    aggregate(
        &Config::new(path)
            .with_workers(workers)
            .with_buffer_size(buffer_size)
            .with_table_capacity(1 << 15),
    )
    .unwrap()
}

#[test]
fn matches_reference_for_every_worker_count() {
    let (data, expected) = random_measurements(0x1b7c, 20_000);
    let file = write_temp(&data);

    let baseline = run(file.path(), 1, 1 << 20);
    assert_eq!(baseline.len(), expected.len());
    for (name, &(min, max, sum, count)) in &expected {
        let stats = baseline.get(name.as_bytes()).unwrap();
        let agg = stats.aggregate();
        assert_eq!(
            (agg.min_scaled(), agg.max_scaled(), agg.sum_scaled(), agg.count()),
            (min, max, sum, count),
            "{name}"
        );
        assert!(stats.min() <= stats.mean() && stats.mean() <= stats.max());
    }

    let rendered = baseline.to_string();
    for workers in [2, 3, 4, 7, 16, 64] {
        for buffer_size in [64, 4096] {
            let report = run(file.path(), workers, buffer_size);
            assert_eq!(report.to_string(), rendered, "{workers} workers, {buffer_size} buffer");
        }
    }
}

#[test]
fn scenario_from_file() {
    let file = write_temp(b"Tokyo;12.3\nParis;-4.5\nTokyo;15.0\n");
    for workers in [1, 2] {
        let report = run(file.path(), workers, 1024);
        assert_eq!(report.to_string(), "{Paris=-4.5/-4.5/-4.5, Tokyo=12.3/13.7/15.0}");
        let tokyo = report.get(b"Tokyo").unwrap();
        assert!((tokyo.mean() - 13.65).abs() < 1e-9);
    }
}

#[test]
fn splits_real_files_on_line_boundaries() {
    let (data, _) = random_measurements(7, 3_000);
    let file = write_temp(&data);
    let handle = File::open(file.path()).unwrap();

    for workers in 1..=33 {
        let parts = split_parts(&handle, data.len() as u64, workers).unwrap();
        let mut next = 0;
        for part in &parts {
            assert_eq!(part.offset, next);
            if part.offset > 0 {
                assert_eq!(data[part.offset as usize - 1], b'\n');
            }
            next = part.end();
        }
        assert_eq!(next, data.len() as u64);
    }
}

#[test]
fn final_line_without_newline_is_counted() {
    let file = write_temp(b"A;1.0\nB;2.0\nA;3.0");
    for workers in [1, 2, 3] {
        let report = run(file.path(), workers, 64);
        assert_eq!(report.get(b"A").unwrap().count(), 2);
        assert_eq!(report.get(b"A").unwrap().max(), 3.0);
    }
}

#[test]
fn empty_file() {
    let file = write_temp(b"");
    assert!(run(file.path(), 4, 1024).is_empty());
}

#[test]
fn ten_thousand_distinct_stations_fit_default_table() {
    let mut data = Vec::new();
    for i in 0..10_000 {
        data.extend_from_slice(format!("station-{i:05};{}.{}\n", i % 90, i % 10).as_bytes());
    }
    let file = write_temp(&data);
    let report = aggregate(&Config::new(file.path()).with_workers(4)).unwrap();
    assert_eq!(report.len(), 10_000);
    assert_eq!(report.sorted()[0].0, b"station-00000");
}

#[test]
fn too_many_stations_is_fatal() {
    let mut data = Vec::new();
    for i in 0..100 {
        data.extend_from_slice(format!("s{i};1.0\n").as_bytes());
    }
    let file = write_temp(&data);
    let config = Config::new(file.path()).with_workers(1).with_table_capacity(128);
    let err = aggregate(&config).unwrap_err();
    assert!(matches!(err, Error::TableOverflow { .. }), "{err:?}");
}

#[test]
fn malformed_value_aborts_every_worker_layout() {
    let (mut data, _) = random_measurements(3, 5_000);
    let bad_offset = data.len() as u64;
    data.extend_from_slice(b"Oslo;12\n");
    let (tail, _) = random_measurements(4, 5_000);
    data.extend_from_slice(&tail);
    let file = write_temp(&data);

    for workers in [1, 4, 13] {
        let config = Config::new(file.path())
            .with_workers(workers)
            .with_table_capacity(4096);
        let err = aggregate(&config).unwrap_err();
        match err {
            Error::MalformedRecord { offset, line, .. } => {
                assert_eq!(offset, bad_offset);
                assert_eq!(line, "Oslo;12");
            }
            other => panic!("{workers} workers: unexpected {other:?}"),
        }
    }

    // The same file is accepted when validation is switched off.
    let config = Config::new(file.path())
        .with_workers(2)
        .with_mode(ParseMode::Trusted);
    assert!(aggregate(&config).is_ok());
}

#[test]
fn report_round_trips_through_file() {
    let file = write_temp(b"b;1.0\na;-2.5\n");
    let report = run(file.path(), 2, 1024);
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("result.txt");
    report.write_to_path(&path).unwrap();
    assert_eq!(
        std::fs::read_to_string(path).unwrap(),
        "{a=-2.5/-2.5/-2.5, b=1.0/1.0/1.0}\n"
    );
}
