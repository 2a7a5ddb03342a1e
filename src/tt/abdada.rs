//! Second hash table (TT2): ABDADA busy markers.
//!
//! Records are keyed by `(hash, depth)` and carry the number of workers
//! currently expanding that node. Peers consult the marker to *defer* (never
//! forbid) a revisit, which trims duplicated work in the shared-memory
//! parallel search. Like TT1 the slots race without locks: a mismatched
//! depth means the slot is simply reclaimed, and a torn counter self-heals
//! on overwrite.

#[derive(Debug, Clone, Copy)]
struct AbdadaEntry {
    key: u64,
    depth: u8,
    visits: u8,
}

impl AbdadaEntry {
    const fn vacant() -> Self {
        Self {
            key: 0,
            depth: 0,
            visits: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AbdadaTable {
    entries: Vec<AbdadaEntry>,
    mask: usize,
}

impl AbdadaTable {
    pub fn new_with_budget(budget_bytes: u64) -> Self {
        let capacity = crate::tt::sizing::table_capacity(budget_bytes, Self::entry_bytes());
        Self {
            entries: vec![AbdadaEntry::vacant(); capacity],
            mask: capacity - 1,
        }
    }

    #[inline]
    pub fn entry_bytes() -> usize {
        std::mem::size_of::<AbdadaEntry>()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.fill(AbdadaEntry::vacant());
    }

    /// Mark a node as being searched by one more worker. A slot holding a
    /// different `(key, depth)` pair is reclaimed rather than aged out.
    pub fn enter(&mut self, key: u64, depth: u8) {
        let slot = &mut self.entries[(key as usize) & self.mask];
        if slot.key == key && slot.depth == depth {
            slot.visits = slot.visits.saturating_add(1);
        } else {
            *slot = AbdadaEntry {
                key,
                depth,
                visits: 1,
            };
        }
    }

    /// Undo one `enter`. A slot that was reclaimed in between is left alone.
    pub fn leave(&mut self, key: u64, depth: u8) {
        let slot = &mut self.entries[(key as usize) & self.mask];
        if slot.key == key && slot.depth == depth {
            slot.visits = slot.visits.saturating_sub(1);
        }
    }

    /// Is another worker currently expanding `(key, depth)`?
    pub fn busy(&self, key: u64, depth: u8) -> bool {
        let slot = self.entries[(key as usize) & self.mask];
        slot.key == key && slot.depth == depth && slot.visits > 0
    }
}

#[cfg(test)]
mod tests {
    use super::AbdadaTable;

    #[test]
    fn enter_leave_toggles_busy() {
        let mut tt2 = AbdadaTable::new_with_budget(1 << 12);
        assert!(!tt2.busy(99, 4));
        tt2.enter(99, 4);
        assert!(tt2.busy(99, 4));
        tt2.leave(99, 4);
        assert!(!tt2.busy(99, 4));
    }

    #[test]
    fn markers_are_depth_specific() {
        let mut tt2 = AbdadaTable::new_with_budget(1 << 12);
        tt2.enter(99, 4);
        assert!(!tt2.busy(99, 5));
        // A deeper entry for the same hash reclaims the slot.
        tt2.enter(99, 5);
        assert!(tt2.busy(99, 5));
        assert!(!tt2.busy(99, 4));
    }

    #[test]
    fn nested_visitors_count_down_one_by_one() {
        let mut tt2 = AbdadaTable::new_with_budget(1 << 12);
        tt2.enter(7, 2);
        tt2.enter(7, 2);
        tt2.leave(7, 2);
        assert!(tt2.busy(7, 2));
        tt2.leave(7, 2);
        assert!(!tt2.busy(7, 2));
    }

    #[test]
    fn leave_after_reclaim_is_harmless() {
        let mut tt2 = AbdadaTable::new_with_budget(0);
        assert_eq!(tt2.capacity(), 1);
        tt2.enter(1, 3);
        tt2.enter(2, 3); // reclaims the only slot
        tt2.leave(1, 3); // stale leave must not disturb the new marker
        assert!(tt2.busy(2, 3));
    }
}
