//! FEN codec for the overlay-word board.
//!
//! `parse_fen` builds a fully populated board (including the incremental
//! hash) from Forsyth-Edwards Notation; `format_fen` is its left inverse for
//! any parsed value. The clock fields are optional on input because test and
//! protocol positions frequently omit them.

use thiserror::Error;

use crate::position::board::{Board, SQ_A1, SQ_A8, SQ_E1, SQ_E8, SQ_H1, SQ_H8};
use crate::position::moves::{format_square, parse_square};
use crate::position::piece::{
    pack_piece, piece_color_of, piece_type_of, Color, PieceType, Square,
};
use crate::position::zobrist::compute_hash;

pub const STARTING_POSITION_FEN: &str =
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("missing {0} field in FEN")]
    MissingField(&'static str),
    #[error("FEN has extra trailing fields")]
    ExtraFields,
    #[error("board layout must contain 8 ranks")]
    BadRankCount,
    #[error("invalid piece character {0:?} in board layout")]
    BadPieceChar(char),
    #[error("board rank does not sum to 8 files")]
    BadRankWidth,
    #[error("invalid side-to-move field {0:?}")]
    BadSideToMove(String),
    #[error("invalid castling rights character {0:?}")]
    BadCastlingChar(char),
    #[error("invalid en-passant field {0:?}")]
    BadEnPassant(String),
    #[error("invalid halfmove clock {0:?}")]
    BadHalfmoveClock(String),
    #[error("invalid fullmove number {0:?}")]
    BadFullmoveNumber(String),
    #[error("illegal position: {0}")]
    IllegalPosition(String),
}

/// Parse result: the board words plus the two fields that live outside them.
#[derive(Debug, Clone, Copy)]
pub struct ParsedFen {
    pub board: Board,
    pub side_to_move: Color,
    pub fullmove_number: u16,
}

pub fn parse_fen(fen: &str) -> Result<ParsedFen, FenError> {
    let mut parts = fen.split_whitespace();

    let board_part = parts.next().ok_or(FenError::MissingField("board layout"))?;
    let side_part = parts.next().ok_or(FenError::MissingField("side-to-move"))?;
    let castling_part = parts.next().ok_or(FenError::MissingField("castling rights"))?;
    let en_passant_part = parts.next().ok_or(FenError::MissingField("en-passant square"))?;
    let halfmove_part = parts.next();
    let fullmove_part = parts.next();

    if parts.next().is_some() {
        return Err(FenError::ExtraFields);
    }

    let mut board = Board::new_empty();
    parse_board_layout(board_part, &mut board)?;

    let side_to_move = match side_part {
        "w" => Color::Light,
        "b" => Color::Dark,
        other => return Err(FenError::BadSideToMove(other.to_owned())),
    };

    board.rights = parse_castling_rights(castling_part)?;

    if en_passant_part != "-" {
        let ep_square = parse_square(en_passant_part)
            .map_err(|_| FenError::BadEnPassant(en_passant_part.to_owned()))?;
        let rank = ep_square / 8;
        if rank != 2 && rank != 5 {
            return Err(FenError::BadEnPassant(en_passant_part.to_owned()));
        }
        board.rights |= 1u64 << ep_square;
    }

    board.halfmove_clock = match halfmove_part {
        Some(text) => text
            .parse::<u64>()
            .map_err(|_| FenError::BadHalfmoveClock(text.to_owned()))?,
        None => 0,
    };
    let fullmove_number = match fullmove_part {
        Some(text) => text
            .parse::<u16>()
            .map_err(|_| FenError::BadFullmoveNumber(text.to_owned()))?,
        None => 1,
    };

    board.hash = compute_hash(&board, side_to_move);

    Ok(ParsedFen {
        board,
        side_to_move,
        fullmove_number,
    })
}

/// Parse and additionally reject structurally illegal boards (king counts,
/// pawns on back ranks). Callers that accept analysis fragments use plain
/// `parse_fen`.
pub fn parse_fen_validated(fen: &str) -> Result<ParsedFen, FenError> {
    let parsed = parse_fen(fen)?;
    parsed.board.validate().map_err(FenError::IllegalPosition)?;
    Ok(parsed)
}

fn parse_board_layout(board_part: &str, board: &mut Board) -> Result<(), FenError> {
    let ranks: Vec<&str> = board_part.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::BadRankCount);
    }

    for (fen_rank_idx, rank_str) in ranks.iter().enumerate() {
        let board_rank = 7 - fen_rank_idx as u8;
        let mut file = 0u8;

        for ch in rank_str.chars() {
            if let Some(step) = ch.to_digit(10) {
                if !(1..=8).contains(&step) {
                    return Err(FenError::BadPieceChar(ch));
                }
                file += step as u8;
                continue;
            }

            let piece_type = PieceType::from_letter(ch.to_ascii_lowercase())
                .ok_or(FenError::BadPieceChar(ch))?;
            let color = if ch.is_ascii_uppercase() {
                Color::Light
            } else {
                Color::Dark
            };

            if file >= 8 {
                return Err(FenError::BadRankWidth);
            }
            board.put_piece(board_rank * 8 + file, pack_piece(piece_type, color));
            file += 1;
        }

        if file != 8 {
            return Err(FenError::BadRankWidth);
        }
    }

    Ok(())
}

/// Build the rights word: every home-square bit starts marked moved, and
/// each granted right clears its king+rook pair.
fn parse_castling_rights(castling_part: &str) -> Result<u64, FenError> {
    let all_home = 1u64 << SQ_A1
        | 1u64 << SQ_E1
        | 1u64 << SQ_H1
        | 1u64 << SQ_A8
        | 1u64 << SQ_E8
        | 1u64 << SQ_H8;
    let mut rights = all_home;

    if castling_part == "-" {
        return Ok(rights);
    }

    for ch in castling_part.chars() {
        match ch {
            'K' => rights &= !(1u64 << SQ_E1 | 1u64 << SQ_H1),
            'Q' => rights &= !(1u64 << SQ_E1 | 1u64 << SQ_A1),
            'k' => rights &= !(1u64 << SQ_E8 | 1u64 << SQ_H8),
            'q' => rights &= !(1u64 << SQ_E8 | 1u64 << SQ_A8),
            _ => return Err(FenError::BadCastlingChar(ch)),
        }
    }

    Ok(rights)
}

/// Render the six-field FEN for a board. Left inverse of `parse_fen`.
pub fn format_fen(board: &Board, side_to_move: Color, fullmove_number: u16) -> String {
    let mut text = String::with_capacity(80);

    for rank in (0..8u8).rev() {
        let mut empty_run = 0u8;
        for file in 0..8u8 {
            let square: Square = rank * 8 + file;
            let code = board.piece_at(square);
            if code == 0 {
                empty_run += 1;
                continue;
            }
            if empty_run > 0 {
                text.push(char::from(b'0' + empty_run));
                empty_run = 0;
            }
            let letter = piece_type_of(code)
                .letter()
                .expect("occupied square has a letter");
            match piece_color_of(code) {
                Color::Light => text.push(letter.to_ascii_uppercase()),
                Color::Dark => text.push(letter),
            }
        }
        if empty_run > 0 {
            text.push(char::from(b'0' + empty_run));
        }
        if rank > 0 {
            text.push('/');
        }
    }

    text.push(' ');
    text.push(match side_to_move {
        Color::Light => 'w',
        Color::Dark => 'b',
    });

    text.push(' ');
    let availability = board.castling_availability();
    if availability == 0 {
        text.push('-');
    } else {
        if availability & crate::position::board::CASTLE_LIGHT_KINGSIDE != 0 {
            text.push('K');
        }
        if availability & crate::position::board::CASTLE_LIGHT_QUEENSIDE != 0 {
            text.push('Q');
        }
        if availability & crate::position::board::CASTLE_DARK_KINGSIDE != 0 {
            text.push('k');
        }
        if availability & crate::position::board::CASTLE_DARK_QUEENSIDE != 0 {
            text.push('q');
        }
    }

    text.push(' ');
    match board.en_passant_square() {
        Some(square) => text.push_str(&format_square(square)),
        None => text.push('-'),
    }

    text.push_str(&format!(" {} {}", board.halfmove_clock, fullmove_number));
    text
}

#[cfg(test)]
mod tests {
    use super::{format_fen, parse_fen, parse_fen_validated, FenError, STARTING_POSITION_FEN};
    use crate::position::piece::Color;

    #[test]
    fn start_position_round_trips() {
        let parsed = parse_fen(STARTING_POSITION_FEN).expect("start FEN should parse");
        assert_eq!(parsed.side_to_move, Color::Light);
        assert_eq!(parsed.fullmove_number, 1);
        let rendered = format_fen(&parsed.board, parsed.side_to_move, parsed.fullmove_number);
        assert_eq!(rendered, STARTING_POSITION_FEN);
    }

    #[test]
    fn reachable_positions_round_trip_word_for_word() {
        for fen in [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "4k3/8/8/3pP3/8/8/8/4K3 w - d6 3 41",
            "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1",
        ] {
            let parsed = parse_fen(fen).expect("FEN should parse");
            let rendered = format_fen(&parsed.board, parsed.side_to_move, parsed.fullmove_number);
            let reparsed = parse_fen(&rendered).expect("rendered FEN should parse");
            assert_eq!(reparsed.board, parsed.board, "round trip failed for {fen}");
            assert_eq!(reparsed.side_to_move, parsed.side_to_move);
            assert_eq!(reparsed.fullmove_number, parsed.fullmove_number);
        }
    }

    #[test]
    fn clock_fields_are_optional() {
        let parsed = parse_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -")
            .expect("clock-less FEN should parse");
        assert_eq!(parsed.board.halfmove_clock, 0);
        assert_eq!(parsed.fullmove_number, 1);
    }

    #[test]
    fn malformed_inputs_report_typed_errors() {
        assert_eq!(
            parse_fen("8/8/8/8/8/8/8 w - - 0 1").expect_err("short board"),
            FenError::BadRankCount
        );
        assert_eq!(
            parse_fen("9/8/8/8/8/8/8/8 w - - 0 1").expect_err("bad digit"),
            FenError::BadPieceChar('9')
        );
        assert_eq!(
            parse_fen("8/8/8/8/8/8/8/8 x - - 0 1").expect_err("bad side"),
            FenError::BadSideToMove("x".to_owned())
        );
        assert_eq!(
            parse_fen("8/8/8/8/8/8/8/8 w - - zz 1").expect_err("bad clock"),
            FenError::BadHalfmoveClock("zz".to_owned())
        );
        assert!(matches!(
            parse_fen("8/8/8/8/8/8/8/8 w - e9 0 1").expect_err("bad ep"),
            FenError::BadEnPassant(_)
        ));
    }

    #[test]
    fn validated_parse_rejects_kingless_board() {
        assert!(matches!(
            parse_fen_validated("8/8/8/8/8/8/8/8 w - - 0 1").expect_err("no kings"),
            FenError::IllegalPosition(_)
        ));
        assert!(parse_fen_validated(STARTING_POSITION_FEN).is_ok());
    }
}
