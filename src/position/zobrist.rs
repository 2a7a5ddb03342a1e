//! Zobrist hashing for position identity and repetition detection.
//!
//! Keys are generated from a fixed seed so hashes are deterministic across
//! runs, which keeps transposition-table tests and persisted benchmarks
//! reproducible.

use std::sync::OnceLock;

use crate::position::board::Board;
use crate::position::piece::{piece_color_of, piece_type_of, Color, PieceCode, Square};

#[derive(Debug)]
struct ZobristTables {
    piece_square: [[[u64; 64]; 6]; 2],
    side_to_move: u64,
    castling: [u64; 16],
    en_passant_file: [u64; 8],
}

static TABLES: OnceLock<ZobristTables> = OnceLock::new();

#[inline]
fn tables() -> &'static ZobristTables {
    TABLES.get_or_init(build_tables)
}

fn build_tables() -> ZobristTables {
    let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;

    let mut piece_square = [[[0u64; 64]; 6]; 2];
    for color in &mut piece_square {
        for piece in color {
            for sq in piece {
                *sq = next_random_u64(&mut seed);
            }
        }
    }

    let side_to_move = next_random_u64(&mut seed);

    let mut castling = [0u64; 16];
    for key in &mut castling {
        *key = next_random_u64(&mut seed);
    }

    let mut en_passant_file = [0u64; 8];
    for key in &mut en_passant_file {
        *key = next_random_u64(&mut seed);
    }

    ZobristTables {
        piece_square,
        side_to_move,
        castling,
        en_passant_file,
    }
}

#[inline]
fn next_random_u64(state: &mut u64) -> u64 {
    // splitmix64
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Zobrist key for a packed piece code on a square. `PIECE_NONE` maps to 0
/// so callers can xor unconditionally.
#[inline]
pub fn piece_square_key(code: PieceCode, square: Square) -> u64 {
    let piece_type = piece_type_of(code);
    if piece_type.bits() == 0 {
        return 0;
    }
    let color = piece_color_of(code);
    tables().piece_square[color.index()][(piece_type.bits() - 1) as usize][square as usize]
}

/// Key contribution of a 4-bit castling-availability mask.
#[inline]
pub fn castling_key(availability: u8) -> u64 {
    tables().castling[(availability & 0x0F) as usize]
}

/// Key contribution of a valid en-passant file.
#[inline]
pub fn en_passant_file_key(file: u8) -> u64 {
    tables().en_passant_file[(file & 0x07) as usize]
}

/// Side-to-move toggle key (xor in when dark is to move).
#[inline]
pub fn side_to_move_key() -> u64 {
    tables().side_to_move
}

/// Recompute the full hash of a board from scratch.
///
/// `Board::hash` must always equal this value for the current side to move;
/// make/unmake maintain it incrementally and tests compare against this.
pub fn compute_hash(board: &Board, side_to_move: Color) -> u64 {
    let mut key = 0u64;

    let mut occupied = board.occupied();
    while occupied != 0 {
        let sq = occupied.trailing_zeros() as Square;
        key ^= piece_square_key(board.piece_at(sq), sq);
        occupied &= occupied - 1;
    }

    if side_to_move == Color::Dark {
        key ^= side_to_move_key();
    }

    key ^= castling_key(board.castling_availability());

    if let Some(ep_square) = board.en_passant_square() {
        key ^= en_passant_file_key(ep_square % 8);
    }

    key
}
