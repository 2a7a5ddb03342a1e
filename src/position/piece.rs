//! Piece codes and colors for the overlay-word board encoding.
//!
//! A square holds a 4-bit piece code: three type bits spread across the
//! board's type words plus one color bit from the occupancy-by-color word.
//! The pack/unpack pair here is the only place that layout is spelled out.

/// Side to move / piece color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Light,
    Dark,
}

impl Color {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Color::Light => 0,
            Color::Dark => 1,
        }
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Color::Light => Color::Dark,
            Color::Dark => Color::Light,
        }
    }
}

/// Piece type. The discriminants are the three type bits of the packed code,
/// so `King = 3` sits in the first two type words and `Queen = 6` in the
/// last two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PieceType {
    Empty = 0,
    Pawn = 1,
    Knight = 2,
    King = 3,
    Bishop = 4,
    Rook = 5,
    Queen = 6,
}

impl PieceType {
    #[inline]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(PieceType::Empty),
            1 => Some(PieceType::Pawn),
            2 => Some(PieceType::Knight),
            3 => Some(PieceType::King),
            4 => Some(PieceType::Bishop),
            5 => Some(PieceType::Rook),
            6 => Some(PieceType::Queen),
            _ => None,
        }
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Lowercase letter used by FEN and promotion suffixes.
    #[inline]
    pub const fn letter(self) -> Option<char> {
        match self {
            PieceType::Empty => None,
            PieceType::Pawn => Some('p'),
            PieceType::Knight => Some('n'),
            PieceType::King => Some('k'),
            PieceType::Bishop => Some('b'),
            PieceType::Rook => Some('r'),
            PieceType::Queen => Some('q'),
        }
    }

    #[inline]
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'p' => Some(PieceType::Pawn),
            'n' => Some(PieceType::Knight),
            'k' => Some(PieceType::King),
            'b' => Some(PieceType::Bishop),
            'r' => Some(PieceType::Rook),
            'q' => Some(PieceType::Queen),
            _ => None,
        }
    }
}

/// Packed 4-bit piece code: type bits 0..=2, color bit 3. `0` is empty.
pub type PieceCode = u8;

pub const PIECE_NONE: PieceCode = 0;
const COLOR_BIT: PieceCode = 0b1000;
const TYPE_MASK: PieceCode = 0b0111;

/// Pack a `(type, color)` pair into the 4-bit code.
#[inline]
pub const fn pack_piece(piece_type: PieceType, color: Color) -> PieceCode {
    if matches!(piece_type, PieceType::Empty) {
        return PIECE_NONE;
    }
    let color_bit = match color {
        Color::Light => 0,
        Color::Dark => COLOR_BIT,
    };
    piece_type.bits() | color_bit
}

/// Recover the type bits of a packed code.
#[inline]
pub const fn piece_type_of(code: PieceCode) -> PieceType {
    match PieceType::from_bits(code & TYPE_MASK) {
        Some(piece_type) => piece_type,
        None => PieceType::Empty,
    }
}

/// Recover the color of a packed code. Meaningless for `PIECE_NONE`.
#[inline]
pub const fn piece_color_of(code: PieceCode) -> Color {
    if code & COLOR_BIT != 0 {
        Color::Dark
    } else {
        Color::Light
    }
}

/// Board square index (`0..=63`, a1 = 0, h8 = 63).
pub type Square = u8;

#[inline]
pub const fn square_file(square: Square) -> u8 {
    square % 8
}

#[inline]
pub const fn square_rank(square: Square) -> u8 {
    square / 8
}

#[cfg(test)]
mod tests {
    use super::{pack_piece, piece_color_of, piece_type_of, Color, PieceType, PIECE_NONE};

    #[test]
    fn pack_unpack_recovers_every_piece() {
        for color in [Color::Light, Color::Dark] {
            for piece_type in [
                PieceType::Pawn,
                PieceType::Knight,
                PieceType::King,
                PieceType::Bishop,
                PieceType::Rook,
                PieceType::Queen,
            ] {
                let code = pack_piece(piece_type, color);
                assert_ne!(code, PIECE_NONE);
                assert_eq!(piece_type_of(code), piece_type);
                assert_eq!(piece_color_of(code), color);
            }
        }
    }

    #[test]
    fn empty_packs_to_none_for_both_colors() {
        assert_eq!(pack_piece(PieceType::Empty, Color::Light), PIECE_NONE);
        assert_eq!(pack_piece(PieceType::Empty, Color::Dark), PIECE_NONE);
    }

    #[test]
    fn letters_round_trip() {
        for piece_type in [
            PieceType::Pawn,
            PieceType::Knight,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Rook,
            PieceType::Queen,
        ] {
            let letter = piece_type.letter().expect("non-empty piece has a letter");
            assert_eq!(PieceType::from_letter(letter), Some(piece_type));
        }
    }
}
