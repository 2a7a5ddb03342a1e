//! Packed move word and the coordinate-notation codec.
//!
//! A move packs six fields into one u64: from, to, capture square (distinct
//! from the target square for en passant), the piece before the move, the
//! piece after it (distinct for promotions), and the captured piece.
//! `MOVE_NONE` is zero; no legal move encodes to zero because the moving
//! piece field is always non-empty.

use thiserror::Error;

use crate::position::board::Board;
use crate::position::piece::{
    pack_piece, piece_color_of, piece_type_of, Color, PieceCode, PieceType, Square, PIECE_NONE,
};

/// Packed move word.
pub type Move = u64;

/// Reserved "no move" sentinel.
pub const MOVE_NONE: Move = 0;

const SQUARE_MASK: u64 = 0x3F;
const PIECE_MASK: u64 = 0x0F;

const SHIFT_TO: u32 = 6;
const SHIFT_CPT: u32 = 12;
const SHIFT_PIECE_FROM: u32 = 18;
const SHIFT_PIECE_TO: u32 = 22;
const SHIFT_PIECE_CPT: u32 = 26;

/// Pack all six move fields.
#[inline]
pub const fn pack_move(
    from: Square,
    to: Square,
    capture_square: Square,
    piece_from: PieceCode,
    piece_to: PieceCode,
    piece_captured: PieceCode,
) -> Move {
    (from as u64)
        | ((to as u64) << SHIFT_TO)
        | ((capture_square as u64) << SHIFT_CPT)
        | ((piece_from as u64) << SHIFT_PIECE_FROM)
        | ((piece_to as u64) << SHIFT_PIECE_TO)
        | ((piece_captured as u64) << SHIFT_PIECE_CPT)
}

#[inline]
pub const fn move_from(mv: Move) -> Square {
    (mv & SQUARE_MASK) as Square
}

#[inline]
pub const fn move_to(mv: Move) -> Square {
    ((mv >> SHIFT_TO) & SQUARE_MASK) as Square
}

#[inline]
pub const fn move_capture_square(mv: Move) -> Square {
    ((mv >> SHIFT_CPT) & SQUARE_MASK) as Square
}

#[inline]
pub const fn move_piece_from(mv: Move) -> PieceCode {
    ((mv >> SHIFT_PIECE_FROM) & PIECE_MASK) as PieceCode
}

#[inline]
pub const fn move_piece_to(mv: Move) -> PieceCode {
    ((mv >> SHIFT_PIECE_TO) & PIECE_MASK) as PieceCode
}

#[inline]
pub const fn move_piece_captured(mv: Move) -> PieceCode {
    ((mv >> SHIFT_PIECE_CPT) & PIECE_MASK) as PieceCode
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveParseError {
    #[error("move text must be 4 or 5 characters, got {0:?}")]
    BadLength(String),
    #[error("invalid square {0:?}")]
    BadSquare(String),
    #[error("no piece of the side to move on {0}")]
    NoPieceAtOrigin(String),
    #[error("invalid promotion letter {0:?}")]
    BadPromotionLetter(char),
}

/// Convert coordinate text (for example `e4`) to a square index.
#[inline]
pub fn parse_square(text: &str) -> Result<Square, MoveParseError> {
    let bytes = text.as_bytes();
    if bytes.len() != 2
        || !(b'a'..=b'h').contains(&bytes[0])
        || !(b'1'..=b'8').contains(&bytes[1])
    {
        return Err(MoveParseError::BadSquare(text.to_owned()));
    }
    Ok((bytes[1] - b'1') * 8 + (bytes[0] - b'a'))
}

/// Convert a square index to coordinate text.
#[inline]
pub fn format_square(square: Square) -> String {
    let file = char::from(b'a' + square % 8);
    let rank = char::from(b'1' + square / 8);
    format!("{file}{rank}")
}

/// Interpret 4-5 character coordinate notation against a position.
///
/// Resolves the en-passant capture square when a pawn steps diagonally onto
/// the marked target, and tolerates a missing promotion letter by assuming a
/// queen. Legality beyond "a piece of `side` stands on the origin" is the
/// move generator's business.
pub fn parse_move(text: &str, board: &Board, side: Color) -> Result<Move, MoveParseError> {
    if !text.is_ascii() || (text.len() != 4 && text.len() != 5) {
        return Err(MoveParseError::BadLength(text.to_owned()));
    }

    let from = parse_square(&text[0..2])?;
    let to = parse_square(&text[2..4])?;

    let piece_from = board.piece_at(from);
    if piece_from == PIECE_NONE || piece_color_of(piece_from) != side {
        return Err(MoveParseError::NoPieceAtOrigin(format_square(from)));
    }

    let mover_type = piece_type_of(piece_from);
    let mut capture_square = to;
    let mut piece_captured = board.piece_at(to);

    if mover_type == PieceType::Pawn
        && from % 8 != to % 8
        && piece_captured == PIECE_NONE
        && board.en_passant_square() == Some(to)
    {
        capture_square = match side {
            Color::Light => to - 8,
            Color::Dark => to + 8,
        };
        piece_captured = board.piece_at(capture_square);
    }

    let last_rank = match side {
        Color::Light => 7,
        Color::Dark => 0,
    };
    let piece_to = if let Some(letter) = text.chars().nth(4) {
        let promotion = match PieceType::from_letter(letter.to_ascii_lowercase()) {
            Some(
                t @ (PieceType::Knight | PieceType::Bishop | PieceType::Rook | PieceType::Queen),
            ) => t,
            _ => return Err(MoveParseError::BadPromotionLetter(letter)),
        };
        pack_piece(promotion, side)
    } else if mover_type == PieceType::Pawn && to / 8 == last_rank {
        // Promotion with the letter omitted: assume a queen.
        pack_piece(PieceType::Queen, side)
    } else {
        piece_from
    };

    Ok(pack_move(from, to, capture_square, piece_from, piece_to, piece_captured))
}

/// Emit 4-character coordinate notation, 5 when a pawn promotes.
pub fn format_move(mv: Move) -> String {
    let mut text = format!("{}{}", format_square(move_from(mv)), format_square(move_to(mv)));
    let before = piece_type_of(move_piece_from(mv));
    let after = piece_type_of(move_piece_to(mv));
    if before == PieceType::Pawn && after != PieceType::Pawn {
        if let Some(letter) = after.letter() {
            text.push(letter);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::{
        format_move, format_square, move_capture_square, move_from, move_piece_captured,
        move_piece_from, move_piece_to, move_to, pack_move, parse_move, parse_square,
        MoveParseError, MOVE_NONE,
    };
    use crate::position::fen::{parse_fen, STARTING_POSITION_FEN};
    use crate::position::piece::{pack_piece, Color, PieceType};

    #[test]
    fn square_text_round_trips() {
        assert_eq!(parse_square("a1").expect("a1 should parse"), 0);
        assert_eq!(parse_square("h8").expect("h8 should parse"), 63);
        assert_eq!(format_square(28), "e4");
        assert!(parse_square("i9").is_err());
    }

    #[test]
    fn packed_fields_all_recoverable() {
        let pawn = pack_piece(PieceType::Pawn, Color::Light);
        let queen = pack_piece(PieceType::Queen, Color::Light);
        let rook = pack_piece(PieceType::Rook, Color::Dark);
        let mv = pack_move(48, 57, 57, pawn, queen, rook);
        assert_eq!(move_from(mv), 48);
        assert_eq!(move_to(mv), 57);
        assert_eq!(move_capture_square(mv), 57);
        assert_eq!(move_piece_from(mv), pawn);
        assert_eq!(move_piece_to(mv), queen);
        assert_eq!(move_piece_captured(mv), rook);
        assert_ne!(mv, MOVE_NONE);
    }

    #[test]
    fn parse_format_round_trip_on_start_position() {
        let parsed = parse_fen(STARTING_POSITION_FEN).expect("start FEN should parse");
        for text in ["e2e4", "g1f3", "b1c3"] {
            let mv = parse_move(text, &parsed.board, Color::Light).expect("move should parse");
            assert_eq!(format_move(mv), text);
            let again =
                parse_move(&format_move(mv), &parsed.board, Color::Light).expect("round trip");
            assert_eq!(again, mv);
        }
    }

    #[test]
    fn promotion_letter_optional_defaults_to_queen() {
        let parsed = parse_fen("8/P3k3/8/8/8/8/8/4K3 w - - 0 1").expect("FEN should parse");
        let explicit =
            parse_move("a7a8q", &parsed.board, Color::Light).expect("explicit promotion");
        let implicit =
            parse_move("a7a8", &parsed.board, Color::Light).expect("implicit promotion");
        assert_eq!(explicit, implicit);
        assert_eq!(format_move(explicit), "a7a8q");

        let knight = parse_move("a7a8n", &parsed.board, Color::Light).expect("underpromotion");
        assert_eq!(format_move(knight), "a7a8n");
    }

    #[test]
    fn en_passant_capture_square_differs_from_target() {
        let parsed = parse_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").expect("FEN should parse");
        let mv = parse_move("e5d6", &parsed.board, Color::Light).expect("ep should parse");
        assert_eq!(move_to(mv), 43);
        assert_eq!(move_capture_square(mv), 35);
        assert_eq!(
            move_piece_captured(mv),
            pack_piece(PieceType::Pawn, Color::Dark)
        );
    }

    #[test]
    fn wrong_side_origin_is_rejected() {
        let parsed = parse_fen(STARTING_POSITION_FEN).expect("start FEN should parse");
        let err = parse_move("e7e5", &parsed.board, Color::Light).expect_err("dark pawn origin");
        assert_eq!(err, MoveParseError::NoPieceAtOrigin("e7".to_owned()));
    }
}
