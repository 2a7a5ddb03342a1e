//! Overlay-word board representation with in-place make/unmake.
//!
//! A position is seven 64-bit words: one occupancy-by-color word, three
//! piece-type overlay words, a moved/rights word, the incremental Zobrist
//! hash, and the half-move clock. Castling rights live in the rights word as
//! *cleared* bits on the six king/rook home squares; the en-passant file is
//! marked by a set bit on the en-passant target square (ranks 3 and 6, which
//! never collide with the home squares).

use crate::position::history::GameHistory;
use crate::position::moves::{
    move_capture_square, move_from, move_piece_captured, move_piece_from, move_piece_to, move_to,
    Move,
};
use crate::position::piece::{
    pack_piece, piece_color_of, piece_type_of, Color, PieceCode, PieceType, Square, PIECE_NONE,
};
use crate::position::zobrist::{castling_key, en_passant_file_key, piece_square_key, side_to_move_key};

pub const SQ_A1: Square = 0;
pub const SQ_E1: Square = 4;
pub const SQ_H1: Square = 7;
pub const SQ_A8: Square = 56;
pub const SQ_E8: Square = 60;
pub const SQ_H8: Square = 63;

/// Squares on which an en-passant marker may appear (ranks 3 and 6).
pub const EP_RANKS: u64 = 0x0000_FF00_00FF_0000;

/// Castling-availability mask bits derived from the rights word.
pub const CASTLE_LIGHT_KINGSIDE: u8 = 1 << 0;
pub const CASTLE_LIGHT_QUEENSIDE: u8 = 1 << 1;
pub const CASTLE_DARK_KINGSIDE: u8 = 1 << 2;
pub const CASTLE_DARK_QUEENSIDE: u8 = 1 << 3;

/// Rights-word bit for a home square, zero elsewhere. Any move touching a
/// home square permanently marks it moved.
#[inline]
const fn moved_mask(square: Square) -> u64 {
    match square {
        SQ_A1 | SQ_E1 | SQ_H1 | SQ_A8 | SQ_E8 | SQ_H8 => 1u64 << square,
        _ => 0,
    }
}

/// Packed seven-word position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    /// Occupancy-by-color word: a set bit holds a dark piece.
    pub dark: u64,
    /// Piece-type overlay words; bit `i` of a square's type code lives in
    /// `types[i]`.
    pub types: [u64; 3],
    /// Moved/rights word plus en-passant marker (see module docs).
    pub rights: u64,
    /// Incremental Zobrist hash of the other words plus side to move.
    pub hash: u64,
    /// Half-move clock for the fifty-move rule.
    pub halfmove_clock: u64,
}

impl Board {
    pub fn new_empty() -> Self {
        Self {
            dark: 0,
            types: [0; 3],
            rights: 0,
            hash: 0,
            halfmove_clock: 0,
        }
    }

    #[inline]
    pub fn occupied(&self) -> u64 {
        self.types[0] | self.types[1] | self.types[2]
    }

    #[inline]
    pub fn occupancy(&self, color: Color) -> u64 {
        match color {
            Color::Light => self.occupied() & !self.dark,
            Color::Dark => self.dark,
        }
    }

    /// Reconstruct the 4-bit piece code on a square from the overlay words.
    #[inline]
    pub fn piece_at(&self, square: Square) -> PieceCode {
        let bit = 1u64 << square;
        let mut code = 0u8;
        if self.types[0] & bit != 0 {
            code |= 1;
        }
        if self.types[1] & bit != 0 {
            code |= 2;
        }
        if self.types[2] & bit != 0 {
            code |= 4;
        }
        if code != 0 && self.dark & bit != 0 {
            code |= 8;
        }
        code
    }

    #[inline]
    pub fn clear_square(&mut self, square: Square) {
        let mask = !(1u64 << square);
        self.dark &= mask;
        self.types[0] &= mask;
        self.types[1] &= mask;
        self.types[2] &= mask;
    }

    /// Place a packed code on a square, overwriting whatever was there.
    #[inline]
    pub fn put_piece(&mut self, square: Square, code: PieceCode) {
        self.clear_square(square);
        if code == PIECE_NONE {
            return;
        }
        let bit = 1u64 << square;
        if code & 1 != 0 {
            self.types[0] |= bit;
        }
        if code & 2 != 0 {
            self.types[1] |= bit;
        }
        if code & 4 != 0 {
            self.types[2] |= bit;
        }
        if code & 8 != 0 {
            self.dark |= bit;
        }
    }

    /// Bitboard of all squares holding `piece_type`, both colors.
    #[inline]
    pub fn type_mask(&self, piece_type: PieceType) -> u64 {
        let [t0, t1, t2] = self.types;
        match piece_type {
            PieceType::Empty => !self.occupied(),
            PieceType::Pawn => t0 & !t1 & !t2,
            PieceType::Knight => t1 & !t0 & !t2,
            PieceType::King => t0 & t1 & !t2,
            PieceType::Bishop => t2 & !t0 & !t1,
            PieceType::Rook => t0 & t2 & !t1,
            PieceType::Queen => t1 & t2 & !t0,
        }
    }

    #[inline]
    pub fn pieces(&self, piece_type: PieceType, color: Color) -> u64 {
        self.type_mask(piece_type) & self.occupancy(color)
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        let kings = self.pieces(PieceType::King, color);
        if kings == 0 {
            None
        } else {
            Some(kings.trailing_zeros() as Square)
        }
    }

    /// 4-bit castling availability decoded from the cleared rights bits.
    pub fn castling_availability(&self) -> u8 {
        let mut availability = 0u8;
        if self.rights & (1u64 << SQ_E1 | 1u64 << SQ_H1) == 0 {
            availability |= CASTLE_LIGHT_KINGSIDE;
        }
        if self.rights & (1u64 << SQ_E1 | 1u64 << SQ_A1) == 0 {
            availability |= CASTLE_LIGHT_QUEENSIDE;
        }
        if self.rights & (1u64 << SQ_E8 | 1u64 << SQ_H8) == 0 {
            availability |= CASTLE_DARK_KINGSIDE;
        }
        if self.rights & (1u64 << SQ_E8 | 1u64 << SQ_A8) == 0 {
            availability |= CASTLE_DARK_QUEENSIDE;
        }
        availability
    }

    #[inline]
    pub fn en_passant_square(&self) -> Option<Square> {
        let marker = self.rights & EP_RANKS;
        if marker == 0 {
            None
        } else {
            Some(marker.trailing_zeros() as Square)
        }
    }

    /// Apply `mv` in place, recording the pre-move snapshot in `history`.
    ///
    /// The hash is maintained incrementally, including the side-to-move
    /// toggle, so it stays equal to `zobrist::compute_hash` for the side
    /// whose turn it becomes.
    pub fn make_move(&mut self, mv: Move, history: &mut GameHistory) {
        let recorded = history.push(mv, self.hash, self.rights, self.halfmove_clock);
        // Mutating without a snapshot would make the matching unmake restore
        // a stale state.
        debug_assert!(recorded, "game history is full, move not recorded");

        let from = move_from(mv);
        let to = move_to(mv);
        let capture_square = move_capture_square(mv);
        let piece_from = move_piece_from(mv);
        let piece_to = move_piece_to(mv);
        let piece_captured = move_piece_captured(mv);

        let old_availability = self.castling_availability();
        let old_ep = self.en_passant_square();

        self.hash ^= piece_square_key(piece_from, from);
        if piece_captured != PIECE_NONE {
            self.hash ^= piece_square_key(piece_captured, capture_square);
            self.clear_square(capture_square);
        }
        self.clear_square(from);
        self.put_piece(to, piece_to);
        self.hash ^= piece_square_key(piece_to, to);

        self.rights &= !EP_RANKS;
        self.rights |= moved_mask(from) | moved_mask(to);

        let mover_type = piece_type_of(piece_from);
        if mover_type == PieceType::King && from.abs_diff(to) == 2 {
            let (rook_from, rook_to) = if to > from {
                (from + 3, from + 1)
            } else {
                (from - 4, from - 1)
            };
            let rook = pack_piece(PieceType::Rook, piece_color_of(piece_from));
            self.clear_square(rook_from);
            self.put_piece(rook_to, rook);
            self.hash ^= piece_square_key(rook, rook_from) ^ piece_square_key(rook, rook_to);
            self.rights |= moved_mask(rook_from);
        }

        if mover_type == PieceType::Pawn && from.abs_diff(to) == 16 {
            let ep_square = (from + to) / 2;
            self.rights |= 1u64 << ep_square;
        }

        if mover_type == PieceType::Pawn || piece_captured != PIECE_NONE {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        self.hash ^= castling_key(old_availability) ^ castling_key(self.castling_availability());
        if let Some(ep) = old_ep {
            self.hash ^= en_passant_file_key(ep % 8);
        }
        if let Some(ep) = self.en_passant_square() {
            self.hash ^= en_passant_file_key(ep % 8);
        }
        self.hash ^= side_to_move_key();
    }

    /// Reverse the most recent `make_move`, restoring rights, hash, and the
    /// half-move clock from the popped snapshot. Returns `false` if the
    /// history is empty.
    pub fn unmake_move(&mut self, history: &mut GameHistory) -> bool {
        let Some(snapshot) = history.pop() else {
            return false;
        };
        let mv = snapshot.mv;

        let from = move_from(mv);
        let to = move_to(mv);
        let capture_square = move_capture_square(mv);
        let piece_from = move_piece_from(mv);
        let piece_captured = move_piece_captured(mv);

        self.clear_square(to);
        self.put_piece(from, piece_from);
        if piece_captured != PIECE_NONE {
            self.put_piece(capture_square, piece_captured);
        }

        if piece_type_of(piece_from) == PieceType::King && from.abs_diff(to) == 2 {
            let (rook_from, rook_to) = if to > from {
                (from + 3, from + 1)
            } else {
                (from - 4, from - 1)
            };
            let rook = pack_piece(PieceType::Rook, piece_color_of(piece_from));
            self.clear_square(rook_to);
            self.put_piece(rook_from, rook);
        }

        self.rights = snapshot.rights;
        self.hash = snapshot.hash;
        self.halfmove_clock = snapshot.halfmove_clock;
        true
    }

    /// Structural sanity check: exactly one king per side, no pawns on the
    /// back ranks, and the color word only marks occupied squares.
    pub fn validate(&self) -> Result<(), String> {
        if self.dark & !self.occupied() != 0 {
            return Err("color word marks an empty square".to_owned());
        }
        for color in [Color::Light, Color::Dark] {
            let kings = self.pieces(PieceType::King, color).count_ones();
            if kings != 1 {
                return Err(format!("side has {kings} kings, expected exactly 1"));
            }
        }
        const BACK_RANKS: u64 = 0xFF00_0000_0000_00FF;
        if self.type_mask(PieceType::Pawn) & BACK_RANKS != 0 {
            return Err("pawn on a back rank".to_owned());
        }
        if (self.rights & EP_RANKS).count_ones() > 1 {
            return Err("more than one en-passant marker".to_owned());
        }
        Ok(())
    }
}
