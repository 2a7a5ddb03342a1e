//! Score sentinels and mate normalization.
//!
//! Mate scores are encoded relative to the infinity sentinel: a side mating
//! in `p` plies scores `SCORE_INF - p`. The driver converts anything at or
//! beyond the mate threshold into a "mate in N moves" report.

/// Infinity sentinel; no heuristic evaluation may reach it.
pub const SCORE_INF: i32 = 32_000;

/// Deepest ply the kernels will ever report a mate from.
pub const MAX_SEARCH_PLY: i32 = 128;

/// Scores at or beyond this magnitude are forced mates.
pub const MATE_THRESHOLD: i32 = SCORE_INF - MAX_SEARCH_PLY;

pub const SCORE_DRAW: i32 = 0;

#[inline]
pub fn is_mate_score(score: i32) -> bool {
    score.abs() >= MATE_THRESHOLD
}

/// Full moves until mate, signed: positive when the side to move mates,
/// negative when it is being mated. `None` for non-mate scores.
pub fn mate_in(score: i32) -> Option<i32> {
    if !is_mate_score(score) {
        return None;
    }
    let plies = SCORE_INF - score.abs();
    let moves = (plies + 1) / 2;
    Some(if score > 0 { moves } else { -moves })
}

/// Plies-to-mate distance for a mate score.
pub fn mate_distance_plies(score: i32) -> Option<i32> {
    if is_mate_score(score) {
        Some(SCORE_INF - score.abs())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{is_mate_score, mate_distance_plies, mate_in, MATE_THRESHOLD, SCORE_INF};

    #[test]
    fn mate_in_counts_full_moves() {
        // Mate delivered at ply 1: mate in one move.
        assert_eq!(mate_in(SCORE_INF - 1), Some(1));
        // Mate at ply 3 is still two of our moves away.
        assert_eq!(mate_in(SCORE_INF - 3), Some(2));
        assert_eq!(mate_in(-(SCORE_INF - 2)), Some(-1));
        assert_eq!(mate_in(150), None);
        assert_eq!(mate_in(-MATE_THRESHOLD + 1), None);
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(is_mate_score(MATE_THRESHOLD));
        assert!(is_mate_score(-MATE_THRESHOLD));
        assert!(!is_mate_score(MATE_THRESHOLD - 1));
    }

    #[test]
    fn distance_is_in_plies() {
        assert_eq!(mate_distance_plies(SCORE_INF - 5), Some(5));
        assert_eq!(mate_distance_plies(-(SCORE_INF - 4)), Some(4));
        assert_eq!(mate_distance_plies(0), None);
    }
}
