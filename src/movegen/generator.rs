//! Legal move generation for the reference kernel.
//!
//! Pseudo-legal moves come from step tables and ray scans over the decoded
//! board; legality (pins, en-passant discoveries, moving into check) is
//! settled by make-probe-unmake against a scratch history, which keeps every
//! edge case inside the one make/unmake implementation.

use crate::movegen::attacks::{
    in_check, is_square_attacked, pawn_attacks, slider_attacks, DIAGONAL_DIRS, KING_ATTACKS,
    KNIGHT_ATTACKS, ORTHOGONAL_DIRS,
};
use crate::position::board::{
    Board, CASTLE_DARK_KINGSIDE, CASTLE_DARK_QUEENSIDE, CASTLE_LIGHT_KINGSIDE,
    CASTLE_LIGHT_QUEENSIDE,
};
use crate::position::history::GameHistory;
use crate::position::moves::{pack_move, Move};
use crate::position::piece::{pack_piece, Color, PieceType, Square, PIECE_NONE};

const PROMOTION_TYPES: [PieceType; 4] = [
    PieceType::Queen,
    PieceType::Rook,
    PieceType::Bishop,
    PieceType::Knight,
];

/// Generate all strictly legal moves for `side`.
pub fn generate_legal_moves(board: &Board, side: Color) -> Vec<Move> {
    let mut moves = Vec::with_capacity(48);
    generate_pseudo_legal(board, side, &mut moves);

    let mut probe = *board;
    let mut scratch = GameHistory::new();
    moves.retain(|&mv| {
        probe.make_move(mv, &mut scratch);
        let legal = !in_check(&probe, side);
        probe.unmake_move(&mut scratch);
        legal
    });
    moves
}

fn generate_pseudo_legal(board: &Board, side: Color, moves: &mut Vec<Move>) {
    let own = board.occupancy(side);
    let enemy = board.occupancy(side.opposite());
    let occupied = board.occupied();

    generate_pawn_moves(board, side, enemy, occupied, moves);

    let mut knights = board.pieces(PieceType::Knight, side);
    while knights != 0 {
        let from = knights.trailing_zeros() as Square;
        push_targets(board, side, PieceType::Knight, from, KNIGHT_ATTACKS[from as usize] & !own, moves);
        knights &= knights - 1;
    }

    for (piece_type, dirs) in [
        (PieceType::Bishop, &DIAGONAL_DIRS),
        (PieceType::Rook, &ORTHOGONAL_DIRS),
    ] {
        let mut sliders = board.pieces(piece_type, side);
        while sliders != 0 {
            let from = sliders.trailing_zeros() as Square;
            push_targets(board, side, piece_type, from, slider_attacks(from, occupied, dirs) & !own, moves);
            sliders &= sliders - 1;
        }
    }

    let mut queens = board.pieces(PieceType::Queen, side);
    while queens != 0 {
        let from = queens.trailing_zeros() as Square;
        let targets = (slider_attacks(from, occupied, &ORTHOGONAL_DIRS)
            | slider_attacks(from, occupied, &DIAGONAL_DIRS))
            & !own;
        push_targets(board, side, PieceType::Queen, from, targets, moves);
        queens &= queens - 1;
    }

    if let Some(king) = board.king_square(side) {
        push_targets(board, side, PieceType::King, king, KING_ATTACKS[king as usize] & !own, moves);
        generate_castling(board, side, king, occupied, moves);
    }
}

fn push_targets(
    board: &Board,
    side: Color,
    piece_type: PieceType,
    from: Square,
    mut targets: u64,
    moves: &mut Vec<Move>,
) {
    let piece = pack_piece(piece_type, side);
    while targets != 0 {
        let to = targets.trailing_zeros() as Square;
        moves.push(pack_move(from, to, to, piece, piece, board.piece_at(to)));
        targets &= targets - 1;
    }
}

fn generate_pawn_moves(
    board: &Board,
    side: Color,
    enemy: u64,
    occupied: u64,
    moves: &mut Vec<Move>,
) {
    let pawn = pack_piece(PieceType::Pawn, side);
    let (forward, start_rank, promo_rank): (i8, u8, u8) = match side {
        Color::Light => (8, 1, 7),
        Color::Dark => (-8, 6, 0),
    };

    // A pawn standing on its own promotion rank cannot occur in a legal
    // game and would step off the board; drop it before walking the set.
    let promotion_rank_mask = 0xFFu64 << (u64::from(promo_rank) * 8);
    let mut pawns = board.pieces(PieceType::Pawn, side) & !promotion_rank_mask;
    while pawns != 0 {
        let from = pawns.trailing_zeros() as Square;
        pawns &= pawns - 1;

        let one_up = (from as i8 + forward) as Square;
        if occupied & (1u64 << one_up) == 0 {
            push_pawn_move(side, from, one_up, one_up, pawn, PIECE_NONE, promo_rank, moves);
            if from / 8 == start_rank {
                let two_up = (from as i8 + 2 * forward) as Square;
                if occupied & (1u64 << two_up) == 0 {
                    moves.push(pack_move(from, two_up, two_up, pawn, pawn, PIECE_NONE));
                }
            }
        }

        let mut captures = pawn_attacks(from, side) & enemy;
        while captures != 0 {
            let to = captures.trailing_zeros() as Square;
            push_pawn_move(side, from, to, to, pawn, board.piece_at(to), promo_rank, moves);
            captures &= captures - 1;
        }

        if let Some(ep) = board.en_passant_square() {
            if pawn_attacks(from, side) & (1u64 << ep) != 0 {
                let capture_square = match side {
                    Color::Light => ep - 8,
                    Color::Dark => ep + 8,
                };
                moves.push(pack_move(
                    from,
                    ep,
                    capture_square,
                    pawn,
                    pawn,
                    board.piece_at(capture_square),
                ));
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn push_pawn_move(
    side: Color,
    from: Square,
    to: Square,
    capture_square: Square,
    pawn: u8,
    captured: u8,
    promo_rank: u8,
    moves: &mut Vec<Move>,
) {
    if to / 8 == promo_rank {
        for promotion in PROMOTION_TYPES {
            moves.push(pack_move(
                from,
                to,
                capture_square,
                pawn,
                pack_piece(promotion, side),
                captured,
            ));
        }
    } else {
        moves.push(pack_move(from, to, capture_square, pawn, pawn, captured));
    }
}

fn generate_castling(board: &Board, side: Color, king: Square, occupied: u64, moves: &mut Vec<Move>) {
    let availability = board.castling_availability();
    let (kingside, queenside, home) = match side {
        Color::Light => (CASTLE_LIGHT_KINGSIDE, CASTLE_LIGHT_QUEENSIDE, 4u8),
        Color::Dark => (CASTLE_DARK_KINGSIDE, CASTLE_DARK_QUEENSIDE, 60u8),
    };
    if king != home || in_check(board, side) {
        return;
    }
    let enemy = side.opposite();
    let piece = pack_piece(PieceType::King, side);

    if availability & kingside != 0 {
        let between = (1u64 << (home + 1)) | (1u64 << (home + 2));
        if occupied & between == 0 && !is_square_attacked(board, home + 1, enemy) {
            // Landing-square safety is covered by the legality filter.
            moves.push(pack_move(home, home + 2, home + 2, piece, piece, PIECE_NONE));
        }
    }
    if availability & queenside != 0 {
        let between = (1u64 << (home - 1)) | (1u64 << (home - 2)) | (1u64 << (home - 3));
        if occupied & between == 0 && !is_square_attacked(board, home - 1, enemy) {
            moves.push(pack_move(home, home - 2, home - 2, piece, piece, PIECE_NONE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generate_legal_moves;
    use crate::position::fen::{parse_fen, STARTING_POSITION_FEN};
    use crate::position::moves::{format_move, parse_move};
    use crate::position::piece::Color;

    fn move_texts(fen: &str, side: Color) -> Vec<String> {
        let parsed = parse_fen(fen).expect("FEN should parse");
        let mut texts: Vec<String> = generate_legal_moves(&parsed.board, side)
            .into_iter()
            .map(format_move)
            .collect();
        texts.sort();
        texts
    }

    #[test]
    fn start_position_has_twenty_moves() {
        assert_eq!(move_texts(STARTING_POSITION_FEN, Color::Light).len(), 20);
    }

    #[test]
    fn pinned_piece_may_not_expose_king() {
        // Knight on e4 is pinned against the king by the rook on e8.
        let texts = move_texts("4r1k1/8/8/8/4N3/8/8/4K3 w - - 0 1", Color::Light);
        assert!(texts.iter().all(|t| !t.starts_with("e4")), "pinned knight moved: {texts:?}");
    }

    #[test]
    fn castling_blocked_through_attacked_square() {
        // Dark rook on f8 covers f1, so kingside castling is illegal but
        // queenside remains available.
        let texts = move_texts("5r2/8/8/8/8/k7/8/R3K2R w KQ - 0 1", Color::Light);
        assert!(!texts.contains(&"e1g1".to_owned()), "castled through check: {texts:?}");
        assert!(texts.contains(&"e1c1".to_owned()));
    }

    #[test]
    fn en_passant_discovered_check_is_illegal() {
        // After c7c5, b5xc6 en passant would expose the light king on a5 to
        // the rook on h5.
        let parsed = parse_fen("8/8/3p4/KPp4r/1R3p1k/8/4P1P1/8 w - c6 0 1")
            .expect("FEN should parse");
        let moves = generate_legal_moves(&parsed.board, Color::Light);
        assert!(moves
            .iter()
            .all(|&mv| format_move(mv) != "b5c6"));
    }

    #[test]
    fn back_rank_pawn_generates_no_moves() {
        // Unreachable in a real game, but a raw FEN can place one; the pawn
        // must be skipped instead of stepping past h8 or below a1.
        for (fen, side) in [
            ("P6k/8/8/8/8/8/8/7K w - - 0 1", Color::Light),
            ("7k/8/8/8/8/8/8/p5QK b - - 0 1", Color::Dark),
        ] {
            let texts = move_texts(fen, side);
            assert!(
                texts.iter().all(|t| !t.starts_with("a8") && !t.starts_with("a1")),
                "back-rank pawn moved: {texts:?}"
            );
        }
    }

    #[test]
    fn generated_moves_round_trip_through_the_codec() {
        let parsed = parse_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
            .expect("FEN should parse");
        for mv in generate_legal_moves(&parsed.board, Color::Light) {
            let text = format_move(mv);
            let reparsed =
                parse_move(&text, &parsed.board, Color::Light).expect("text should parse back");
            assert_eq!(reparsed, mv, "codec mismatch for {text}");
        }
    }
}
