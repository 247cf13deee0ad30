//! Fixed-capacity open-addressing table of per-station aggregates.

use snafu::Snafu;

use crate::fnv::fnv1a;

pub const DEFAULT_CAPACITY: usize = 1 << 17;

/// Running statistics for one station, in tenths of a degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregate {
    min: i32,
    max: i32,
    sum: i64,
    count: u64,
}

impl Aggregate {
    pub fn new(value: i32) -> Self {
        Self {
            min: value,
            max: value,
            sum: value as i64,
            count: 1,
        }
    }

    #[inline]
    pub fn update(&mut self, value: i32) {
        self.count += 1;
        self.sum += value as i64;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Folds another partial aggregate into this one. Commutative and
    /// associative, so partials may arrive in any order.
    pub fn merge(&mut self, other: &Aggregate) {
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn min_scaled(&self) -> i32 {
        self.min
    }

    pub fn max_scaled(&self) -> i32 {
        self.max
    }

    pub fn sum_scaled(&self) -> i64 {
        self.sum
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display(
    "station table full: more than {limit} distinct names for capacity {capacity}"
))]
pub struct TableFull {
    pub capacity: usize,
    pub limit: usize,
}

#[derive(Debug)]
struct Entry {
    hash: u64,
    name: Box<[u8]>,
    agg: Aggregate,
}

/// Single-writer map from station name bytes to an [`Aggregate`].
///
/// Slots are indexed by `hash & (capacity - 1)` and collisions probe
/// linearly, wrapping at the end. The table never grows: it accepts at most
/// `capacity / 2` distinct names and reports [`TableFull`] beyond that, which
/// also guarantees every probe sequence reaches an empty slot.
///
/// Keys compare byte-for-byte, with no normalisation.
pub struct StationTable {
    slots: Box<[Option<Entry>]>,
    mask: usize,
    len: usize,
    limit: usize,
}

impl StationTable {
    /// `capacity` is rounded up to a power of two, and to at least 2.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            mask: capacity - 1,
            len: 0,
            limit: capacity / 2,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Maximum number of distinct names this table accepts.
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn upsert(&mut self, name: &[u8], value: i32) -> Result<(), TableFull> {
        self.upsert_hashed(fnv1a(name), name, value)
    }

    /// Like [`upsert`](Self::upsert), with `hash` already computed as
    /// `fnv1a(name)` by the caller.
    #[inline]
    pub fn upsert_hashed(&mut self, hash: u64, name: &[u8], value: i32) -> Result<(), TableFull> {
        let mut idx = hash as usize & self.mask;
        loop {
            let slot = &mut self.slots[idx];
            match slot {
                Some(entry) => {
                    if entry.hash == hash && *entry.name == *name {
                        entry.agg.update(value);
                        return Ok(());
                    }
                    idx = (idx + 1) & self.mask;
                }
                None => {
                    if self.len == self.limit {
                        return Err(TableFull {
                            capacity: self.mask + 1,
                            limit: self.limit,
                        });
                    }
                    // The scan buffer is reused, so the name is copied out.
                    *slot = Some(Entry {
                        hash,
                        name: name.into(),
                        agg: Aggregate::new(value),
                    });
                    self.len += 1;
                    return Ok(());
                }
            }
        }
    }

    pub fn get(&self, name: &[u8]) -> Option<&Aggregate> {
        let hash = fnv1a(name);
        let mut idx = hash as usize & self.mask;
        while let Some(entry) = &self.slots[idx] {
            if entry.hash == hash && *entry.name == *name {
                return Some(&entry.agg);
            }
            idx = (idx + 1) & self.mask;
        }
        None
    }

    /// Every occupied slot exactly once, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Aggregate)> + '_ {
        self.slots
            .iter()
            .flatten()
            .map(|entry| (&*entry.name, &entry.agg))
    }

    /// Consumes the table, handing out the owned names.
    pub fn into_entries(self) -> impl Iterator<Item = (Box<[u8]>, Aggregate)> {
        self.slots
            .into_vec()
            .into_iter()
            .flatten()
            .map(|entry| (entry.name, entry.agg))
    }
}

impl std::fmt::Debug for StationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationTable")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .finish()
    }
}
