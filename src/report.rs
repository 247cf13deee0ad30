//! Final per-station statistics and their textual form.

use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use fxhash::FxHashMap;
use snafu::ResultExt;

use crate::{
    error::{Result, WriteReportSnafu},
    table::Aggregate,
};

/// Finalized statistics for one station. The mean is derived once, after
/// every partial aggregate has been merged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationStats {
    agg: Aggregate,
    mean: f64,
}

impl StationStats {
    pub(crate) fn finalize(agg: Aggregate) -> Self {
        let mean = agg.sum_scaled() as f64 / agg.count() as f64 / 10.0;
        Self { agg, mean }
    }

    pub fn min(&self) -> f64 {
        self.agg.min_scaled() as f64 / 10.0
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn max(&self) -> f64 {
        self.agg.max_scaled() as f64 / 10.0
    }

    pub fn count(&self) -> u64 {
        self.agg.count()
    }

    pub fn aggregate(&self) -> &Aggregate {
        &self.agg
    }

    /// Mean in tenths, rounded half up.
    fn mean_tenths(&self) -> i64 {
        let sum = self.agg.sum_scaled() as i128;
        let count = self.agg.count() as i128;
        (2 * sum + count).div_euclid(2 * count) as i64
    }
}

struct Tenths(i64);

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", abs / 10, abs % 10)
    }
}

/// `min/mean/max`, one decimal each. The mean rounds half up, so -13.65
/// renders `-13.6` where C-style `%.1f` would give `-13.7`.
impl fmt::Display for StationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            Tenths(self.agg.min_scaled() as i64),
            Tenths(self.mean_tenths()),
            Tenths(self.agg.max_scaled() as i64)
        )
    }
}

/// Complete result of an aggregation: station name bytes to statistics.
#[derive(Debug, Clone, Default)]
pub struct Report {
    stations: FxHashMap<Box<[u8]>, StationStats>,
}

impl Report {
    pub(crate) fn from_map(stations: FxHashMap<Box<[u8]>, StationStats>) -> Self {
        Self { stations }
    }

    pub fn get(&self, name: &[u8]) -> Option<&StationStats> {
        self.stations.get(name)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Unordered.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &StationStats)> + '_ {
        self.stations.iter().map(|(name, stats)| (&**name, stats))
    }

    /// Ordered by name bytes, which for UTF-8 names is code point order.
    pub fn sorted(&self) -> Vec<(&[u8], &StationStats)> {
        let mut rows: Vec<_> = self.iter().collect();
        rows.sort_unstable_by(|a, b| a.0.cmp(b.0));
        rows
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let context = || WriteReportSnafu { path };
        let file = File::create(path).with_context(|_| context())?;
        let mut out = BufWriter::new(file);
        writeln!(out, "{self}").with_context(|_| context())?;
        out.flush().with_context(|_| context())
    }
}

/// `{name=min/mean/max, ...}` sorted by name.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, stats)) in self.sorted().into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={stats}", String::from_utf8_lossy(name))?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(values: &[i32]) -> StationStats {
        let mut agg = Aggregate::new(values[0]);
        for &v in &values[1..] {
            agg.update(v);
        }
        StationStats::finalize(agg)
    }

    #[test]
    fn mean_is_derived_from_scaled_sum() {
        let s = stats(&[123, 150]);
        assert_eq!(s.min(), 12.3);
        assert_eq!(s.max(), 15.0);
        assert!((s.mean() - 13.65).abs() < 1e-9);
        assert_eq!(s.count(), 2);
        assert!(s.min() <= s.mean() && s.mean() <= s.max());
    }

    #[test]
    fn renders_one_decimal_rounding_half_up() {
        assert_eq!(stats(&[123, 150]).to_string(), "12.3/13.7/15.0");
        assert_eq!(stats(&[-45]).to_string(), "-4.5/-4.5/-4.5");
        assert_eq!(stats(&[-123, -150]).to_string(), "-15.0/-13.6/-12.3");
        assert_eq!(stats(&[-1, 0]).to_string(), "-0.1/0.0/0.0");
        assert_eq!(stats(&[0, 0, 1]).to_string(), "0.0/0.0/0.1");
        assert_eq!(stats(&[-999, 999]).to_string(), "-99.9/0.0/99.9");
    }

    #[test]
    fn report_renders_sorted() {
        let mut map = FxHashMap::default();
        map.insert(Box::from(&b"Tokyo"[..]), stats(&[123, 150]));
        map.insert(Box::from(&b"Paris"[..]), stats(&[-45]));
        map.insert(Box::from("Ürümqi".as_bytes()), stats(&[7]));
        let report = Report::from_map(map);

        assert_eq!(
            report.to_string(),
            "{Paris=-4.5/-4.5/-4.5, Tokyo=12.3/13.7/15.0, Ürümqi=0.7/0.7/0.7}"
        );
        assert_eq!(report.sorted()[0].0, b"Paris");
        assert_eq!(Report::default().to_string(), "{}");
    }

    #[test]
    fn writes_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.txt");
        let mut map = FxHashMap::default();
        map.insert(Box::from(&b"A"[..]), stats(&[10, 20]));
        Report::from_map(map).write_to_path(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{A=1.0/1.5/2.0}\n");
    }
}
