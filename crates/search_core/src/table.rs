//! A cache of game state values keyed by 64-bit fingerprints.
//!
//! The same position is often reached by different move orders
//! (a "transposition"); caching values by fingerprint means each position is
//! evaluated once no matter how it was reached. The table has grown into a
//! general state-value cache, but the traditional name persists.
//!
//! Buckets are addressed by `fingerprint % size` and hold at most one entry
//! each. A colliding store only succeeds when the incoming value's quality is
//! at least that of the stored value, so better-searched entries survive.
//! Entries that go unreferenced for more than `max_age` calls to [`age`]
//! fade out, keeping the table relevant as the game moves on.
//!
//! [`age`]: TranspositionTable::age

use std::cell::Cell;

use serde::{Deserialize, Serialize};

/// One bucket of the table.
///
/// `age` counts epochs since the entry was last read or written; it is
/// refreshed even by the logically read-only [`TranspositionTable::check`],
/// hence the interior mutability confined to that field.
#[derive(Clone)]
struct Entry {
    fingerprint: u64,
    value: f32,
    quality: i16,
    age: Cell<i16>,
}

const _: () = assert!(std::mem::size_of::<Entry>() == 16);

impl Entry {
    fn unused() -> Entry {
        Entry {
            fingerprint: TranspositionTable::UNUSED,
            value: 0.0,
            quality: 0,
            age: Cell::new(0),
        }
    }

    #[inline(always)]
    fn is_unused(&self) -> bool {
        self.fingerprint == TranspositionTable::UNUSED
    }

    #[inline(always)]
    fn clear(&mut self) {
        self.fingerprint = TranspositionTable::UNUSED;
    }
}

/// Counters describing the table's behaviour.
///
/// All counters except `usage` are cleared by
/// [`TranspositionTable::reset_analysis`]; `usage` tracks the number of
/// occupied buckets and survives resets.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableAnalysis {
    /// Lookups performed.
    pub check_count: Cell<u64>,
    /// Stores attempted (quality-gated and unconditional).
    pub update_count: Cell<u64>,
    /// Lookups that found the requested fingerprint.
    pub hit_count: Cell<u64>,
    /// Lookups that found a different fingerprint in the bucket.
    pub collision_count: Cell<u64>,
    /// Stores rejected because the stored quality was higher.
    pub rejected: Cell<u64>,
    /// Stores that replaced a different fingerprint.
    pub overwritten: Cell<u64>,
    /// Stores that replaced the same fingerprint with a newer value.
    pub refreshed: Cell<u64>,
    /// Occupied buckets.
    pub usage: Cell<u64>,
}

impl TableAnalysis {
    /// Clears every counter except `usage`.
    pub fn reset(&self) {
        self.check_count.set(0);
        self.update_count.set(0);
        self.hit_count.set(0);
        self.collision_count.set(0);
        self.rejected.set(0);
        self.overwritten.set(0);
        self.refreshed.set(0);
        // usage is never reset
    }

    /// Serialises the counters as a JSON record.
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize: {}", e))
    }
}

#[inline(always)]
fn bump(counter: &Cell<u64>) {
    counter.set(counter.get() + 1);
}

/// A fixed-capacity cache mapping state fingerprints to values.
///
/// Not thread-safe; only one search may use a table at a time.
pub struct TranspositionTable {
    entries: Box<[Entry]>,
    max_age: i16,
    analysis: TableAnalysis,
}

impl TranspositionTable {
    /// Reserved fingerprint marking an empty bucket. Collaborators must never
    /// produce this fingerprint for a real state.
    pub const UNUSED: u64 = u64::MAX;

    /// Creates an empty table with `size` buckets.
    ///
    /// Entries unreferenced for more than `max_age` calls to [`age`] are
    /// evicted.
    ///
    /// [`age`]: TranspositionTable::age
    pub fn new(size: usize, max_age: i16) -> TranspositionTable {
        assert!(size > 0, "transposition table must have at least one bucket");
        log::debug!("allocated transposition table with {} buckets", size);

        TranspositionTable {
            entries: vec![Entry::unused(); size].into_boxed_slice(),
            max_age,
            analysis: TableAnalysis::default(),
        }
    }

    /// Number of buckets.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    fn find(&self, fingerprint: u64) -> &Entry {
        &self.entries[(fingerprint % self.entries.len() as u64) as usize]
    }

    /// Returns the stored `(value, quality)` for the given fingerprint.
    ///
    /// A hit refreshes the entry's age. A bucket occupied by a different
    /// fingerprint is a collision: it is counted and left undisturbed.
    pub fn check(&self, fingerprint: u64) -> Option<(f32, i16)> {
        debug_assert!(fingerprint != Self::UNUSED);
        bump(&self.analysis.check_count);

        let entry = self.find(fingerprint);
        if entry.fingerprint == fingerprint {
            bump(&self.analysis.hit_count);
            entry.age.set(0);
            Some((entry.value, entry.quality))
        } else {
            if !entry.is_unused() {
                bump(&self.analysis.collision_count);
            }
            None
        }
    }

    /// As [`check`], but the result is returned only if its quality is at
    /// least `min_quality`.
    ///
    /// A stored value of lower quality would not be worth using anyway, so it
    /// is reported as absent; the entry's age is still refreshed on the
    /// fingerprint match.
    ///
    /// [`check`]: TranspositionTable::check
    pub fn check_min(&self, fingerprint: u64, min_quality: i16) -> Option<(f32, i16)> {
        debug_assert!(fingerprint != Self::UNUSED);
        bump(&self.analysis.check_count);

        let entry = self.find(fingerprint);
        if entry.fingerprint == fingerprint {
            bump(&self.analysis.hit_count);
            entry.age.set(0);
            if entry.quality >= min_quality {
                Some((entry.value, entry.quality))
            } else {
                None
            }
        } else {
            if !entry.is_unused() {
                bump(&self.analysis.collision_count);
            }
            None
        }
    }

    /// Stores a value if its quality is at least that of the value it would
    /// replace.
    ///
    /// Equal quality replaces deliberately, so stale entries of the same
    /// strength drift out over time. A strictly higher-quality entry is never
    /// evicted, whatever its fingerprint; the rejected store is counted.
    pub fn update(&mut self, fingerprint: u64, value: f32, quality: i16) {
        debug_assert!(fingerprint != Self::UNUSED);
        debug_assert!(value.is_finite());
        debug_assert!(quality >= 0);
        bump(&self.analysis.update_count);

        let bucket = (fingerprint % self.entries.len() as u64) as usize;
        let entry = &mut self.entries[bucket];
        let was_unused = entry.is_unused();

        if was_unused || quality >= entry.quality {
            if was_unused {
                bump(&self.analysis.usage);
            } else if entry.fingerprint == fingerprint {
                bump(&self.analysis.refreshed);
            } else {
                bump(&self.analysis.overwritten);
            }

            entry.fingerprint = fingerprint;
            entry.value = value;
            entry.quality = quality;
            entry.age.set(0);
        } else {
            bump(&self.analysis.rejected);
        }
    }

    /// Stores a value unconditionally, ignoring the quality gate.
    ///
    /// For callers seeding values they know to be ground truth, such as
    /// externally determined terminal states. Unused by the search itself.
    pub fn set(&mut self, fingerprint: u64, value: f32, quality: i16) {
        debug_assert!(fingerprint != Self::UNUSED);
        debug_assert!(value.is_finite());
        debug_assert!(quality >= 0);
        bump(&self.analysis.update_count);

        let bucket = (fingerprint % self.entries.len() as u64) as usize;
        let entry = &mut self.entries[bucket];

        if entry.is_unused() {
            bump(&self.analysis.usage);
        } else if entry.fingerprint == fingerprint {
            bump(&self.analysis.refreshed);
        } else {
            bump(&self.analysis.overwritten);
        }

        entry.fingerprint = fingerprint;
        entry.value = value;
        entry.quality = quality;
        entry.age.set(0);
    }

    /// Ages every occupied bucket, evicting entries older than `max_age`.
    ///
    /// Intended to be called once per real-world move so entries from game
    /// phases long past make room for new ones.
    pub fn age(&mut self) {
        for entry in self.entries.iter_mut() {
            if entry.is_unused() {
                continue;
            }
            let age = entry.age.get() + 1;
            if age > self.max_age {
                entry.clear();
                self.analysis.usage.set(self.analysis.usage.get() - 1);
            } else {
                entry.age.set(age);
            }
        }
    }

    /// The table's behaviour counters.
    pub fn analysis_data(&self) -> &TableAnalysis {
        &self.analysis
    }

    /// Clears the behaviour counters; `usage` is preserved.
    pub fn reset_analysis(&self) {
        self.analysis.reset();
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod table_tests;
