//! Ply-indexed game history backing make/unmake and repetition checks.
//!
//! Four parallel sequences (move, hash, rights snapshot, half-move clock)
//! are kept in the flat layout the compute session uploads as the
//! per-worker hash-history block.

use crate::position::moves::Move;

/// Upper bound on recorded plies; pushes beyond this are refused.
pub const MAX_GAME_PLY: usize = 1024;

/// One popped snapshot, enough to reverse a move exactly.
#[derive(Debug, Clone, Copy)]
pub struct HistorySnapshot {
    pub mv: Move,
    pub hash: u64,
    pub rights: u64,
    pub halfmove_clock: u64,
}

#[derive(Debug, Clone, Default)]
pub struct GameHistory {
    moves: Vec<Move>,
    hashes: Vec<u64>,
    rights: Vec<u64>,
    clocks: Vec<u64>,
}

impl GameHistory {
    pub fn new() -> Self {
        Self {
            moves: Vec::with_capacity(64),
            hashes: Vec::with_capacity(64),
            rights: Vec::with_capacity(64),
            clocks: Vec::with_capacity(64),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn clear(&mut self) {
        self.moves.clear();
        self.hashes.clear();
        self.rights.clear();
        self.clocks.clear();
    }

    /// Append a pre-move snapshot. Returns `false` (and records nothing)
    /// once `MAX_GAME_PLY` is reached.
    pub fn push(&mut self, mv: Move, hash: u64, rights: u64, halfmove_clock: u64) -> bool {
        if self.moves.len() >= MAX_GAME_PLY {
            return false;
        }
        self.moves.push(mv);
        self.hashes.push(hash);
        self.rights.push(rights);
        self.clocks.push(halfmove_clock);
        true
    }

    /// Remove and return the most recent snapshot.
    pub fn pop(&mut self) -> Option<HistorySnapshot> {
        let mv = self.moves.pop()?;
        let hash = self.hashes.pop()?;
        let rights = self.rights.pop()?;
        let halfmove_clock = self.clocks.pop()?;
        Some(HistorySnapshot {
            mv,
            hash,
            rights,
            halfmove_clock,
        })
    }

    /// Hash sequence in ply order, the block uploaded to each worker.
    #[inline]
    pub fn hashes(&self) -> &[u64] {
        &self.hashes
    }

    /// How often `hash` already occurred in the recorded line.
    pub fn count_hash(&self, hash: u64) -> usize {
        self.hashes.iter().filter(|&&h| h == hash).count()
    }
}

#[cfg(test)]
mod tests {
    use super::{GameHistory, MAX_GAME_PLY};

    #[test]
    fn push_pop_round_trip_keeps_sequences_parallel() {
        let mut history = GameHistory::new();
        assert!(history.push(11, 22, 33, 44));
        assert!(history.push(55, 66, 77, 88));
        assert_eq!(history.len(), 2);
        assert_eq!(history.hashes(), &[22, 66]);

        let snap = history.pop().expect("second snapshot should pop");
        assert_eq!(snap.mv, 55);
        assert_eq!(snap.hash, 66);
        assert_eq!(snap.rights, 77);
        assert_eq!(snap.halfmove_clock, 88);

        let snap = history.pop().expect("first snapshot should pop");
        assert_eq!(snap.mv, 11);
        assert!(history.is_empty());
        assert!(history.pop().is_none());
    }

    #[test]
    fn push_refuses_beyond_max_game_ply() {
        let mut history = GameHistory::new();
        for ply in 0..MAX_GAME_PLY {
            assert!(history.push(ply as u64, 0, 0, 0));
        }
        assert!(!history.push(0, 0, 0, 0));
        assert_eq!(history.len(), MAX_GAME_PLY);
    }

    #[test]
    fn count_hash_sees_repetitions() {
        let mut history = GameHistory::new();
        history.push(1, 42, 0, 0);
        history.push(2, 7, 0, 0);
        history.push(3, 42, 0, 0);
        assert_eq!(history.count_hash(42), 2);
        assert_eq!(history.count_hash(9), 0);
    }
}
