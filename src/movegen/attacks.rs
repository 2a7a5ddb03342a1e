//! Attack masks and the square-attacked test.
//!
//! Knight and king step tables are built at compile time; slider attacks are
//! ray scans over the occupancy word. The overlay board decodes piece sets on
//! demand, so there is no cached attack state to keep coherent.

use crate::position::board::Board;
use crate::position::piece::{Color, PieceType, Square};

const KNIGHT_DELTAS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

const KING_DELTAS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const fn build_step_table(deltas: [(i8, i8); 8]) -> [u64; 64] {
    let mut table = [0u64; 64];
    let mut sq = 0usize;
    while sq < 64 {
        let rank = (sq / 8) as i8;
        let file = (sq % 8) as i8;
        let mut i = 0usize;
        while i < 8 {
            let r = rank + deltas[i].0;
            let f = file + deltas[i].1;
            if r >= 0 && r < 8 && f >= 0 && f < 8 {
                table[sq] |= 1u64 << (r * 8 + f) as u32;
            }
            i += 1;
        }
        sq += 1;
    }
    table
}

pub static KNIGHT_ATTACKS: [u64; 64] = build_step_table(KNIGHT_DELTAS);
pub static KING_ATTACKS: [u64; 64] = build_step_table(KING_DELTAS);

pub const ORTHOGONAL_DIRS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
pub const DIAGONAL_DIRS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Squares a slider on `square` attacks along `dirs`, stopping at the first
/// blocker (which is included, capture or not).
pub fn slider_attacks(square: Square, occupied: u64, dirs: &[(i8, i8); 4]) -> u64 {
    let mut attacks = 0u64;
    let rank = (square / 8) as i8;
    let file = (square % 8) as i8;

    for &(dr, df) in dirs {
        let mut r = rank + dr;
        let mut f = file + df;
        while (0..8).contains(&r) && (0..8).contains(&f) {
            let bit = 1u64 << (r * 8 + f) as u32;
            attacks |= bit;
            if occupied & bit != 0 {
                break;
            }
            r += dr;
            f += df;
        }
    }

    attacks
}

/// Squares a pawn of `color` standing on `square` attacks.
pub fn pawn_attacks(square: Square, color: Color) -> u64 {
    let rank = (square / 8) as i8;
    let file = (square % 8) as i8;
    let dr = match color {
        Color::Light => 1,
        Color::Dark => -1,
    };

    let mut attacks = 0u64;
    for df in [-1i8, 1] {
        let r = rank + dr;
        let f = file + df;
        if (0..8).contains(&r) && (0..8).contains(&f) {
            attacks |= 1u64 << (r * 8 + f) as u32;
        }
    }
    attacks
}

/// Is `square` attacked by any piece of `by`?
pub fn is_square_attacked(board: &Board, square: Square, by: Color) -> bool {
    let occupied = board.occupied();

    if KNIGHT_ATTACKS[square as usize] & board.pieces(PieceType::Knight, by) != 0 {
        return true;
    }
    if KING_ATTACKS[square as usize] & board.pieces(PieceType::King, by) != 0 {
        return true;
    }
    // A pawn of `by` attacks `square` exactly when a pawn of the other color
    // on `square` would attack the pawn's square.
    if pawn_attacks(square, by.opposite()) & board.pieces(PieceType::Pawn, by) != 0 {
        return true;
    }

    let queens = board.pieces(PieceType::Queen, by);
    let orthogonal = slider_attacks(square, occupied, &ORTHOGONAL_DIRS);
    if orthogonal & (board.pieces(PieceType::Rook, by) | queens) != 0 {
        return true;
    }
    let diagonal = slider_attacks(square, occupied, &DIAGONAL_DIRS);
    diagonal & (board.pieces(PieceType::Bishop, by) | queens) != 0
}

/// Is `side`'s king attacked? A kingless board reports not-in-check so the
/// attack scan stays total.
pub fn in_check(board: &Board, side: Color) -> bool {
    match board.king_square(side) {
        Some(king) => is_square_attacked(board, king, side.opposite()),
        None => false,
    }
}
