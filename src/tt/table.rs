//! Primary transposition table (TT1).
//!
//! Single-probe, unconditional-overwrite records keyed by the full hash.
//! Entries are advisory: the parallel workers write without locks, so a
//! collision or torn slot is treated as an ordinary miss, never an error.
//! That is also why there is no replacement policy — a read-modify-write
//! policy cannot be maintained by racing writers.

use crate::position::moves::{Move, MOVE_NONE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy)]
pub struct TtEntry {
    pub key: u64,
    pub best_move: Move,
    pub score: i32,
    pub depth: u8,
    pub bound: Bound,
}

impl TtEntry {
    const fn vacant() -> Self {
        Self {
            key: 0,
            best_move: MOVE_NONE,
            score: 0,
            depth: 0,
            bound: Bound::Upper,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TtStats {
    pub probes: u64,
    pub hits: u64,
    pub stores: u64,
}

#[derive(Debug, Clone)]
pub struct TranspositionTable {
    entries: Vec<TtEntry>,
    mask: usize,
    stats: TtStats,
}

impl TranspositionTable {
    /// Size the table from a byte budget (see `sizing::table_capacity`).
    pub fn new_with_budget(budget_bytes: u64) -> Self {
        let capacity = crate::tt::sizing::table_capacity(budget_bytes, Self::entry_bytes());
        Self {
            entries: vec![TtEntry::vacant(); capacity],
            mask: capacity - 1,
            stats: TtStats::default(),
        }
    }

    #[inline]
    pub fn entry_bytes() -> usize {
        std::mem::size_of::<TtEntry>()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn stats(&self) -> TtStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.entries.fill(TtEntry::vacant());
        self.stats = TtStats::default();
    }

    /// A hit requires the full key to match; a vacant or colliding slot is a
    /// miss. A zero-key position is indistinguishable from a vacant slot and
    /// misses, which is harmless by the advisory-table contract.
    pub fn probe(&mut self, key: u64) -> Option<TtEntry> {
        self.stats.probes += 1;
        let slot = self.entries[(key as usize) & self.mask];
        if slot.key == key && key != 0 {
            self.stats.hits += 1;
            Some(slot)
        } else {
            None
        }
    }

    /// Unconditional overwrite, collisions included.
    pub fn store(&mut self, entry: TtEntry) {
        self.stats.stores += 1;
        let index = (entry.key as usize) & self.mask;
        self.entries[index] = entry;
    }
}
