//! Leaf-count perft over the legal generator.
//!
//! No pruning, no hashing: this is the move-generator correctness oracle the
//! kernel's perft mode and the protocol `perft` command both reduce to.

use crate::movegen::generator::generate_legal_moves;
use crate::position::board::Board;
use crate::position::history::GameHistory;
use crate::position::piece::Color;

/// Count leaf nodes at exactly `depth` plies below `board`.
pub fn perft(board: &mut Board, side: Color, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut history = GameHistory::new();
    perft_recurse(board, side, depth, &mut history)
}

fn perft_recurse(board: &mut Board, side: Color, depth: u8, history: &mut GameHistory) -> u64 {
    let moves = generate_legal_moves(board, side);
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0u64;
    for mv in moves {
        board.make_move(mv, history);
        nodes += perft_recurse(board, side.opposite(), depth - 1, history);
        board.unmake_move(history);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::perft;
    use crate::position::fen::{parse_fen, STARTING_POSITION_FEN};

    fn assert_perft_series(fen: &str, expected: &[u64]) {
        let parsed = parse_fen(fen).expect("FEN should parse");
        for (i, &want) in expected.iter().enumerate() {
            let mut board = parsed.board;
            let got = perft(&mut board, parsed.side_to_move, (i + 1) as u8);
            assert_eq!(got, want, "perft({}) mismatch for {fen}", i + 1);
            // The board must come back untouched after every series.
            assert_eq!(board, parsed.board);
        }
    }

    #[test]
    fn start_position_depths_1_to_4() {
        assert_perft_series(STARTING_POSITION_FEN, &[20, 400, 8902, 197_281]);
    }

    #[test]
    fn rook_pin_endgame_depths_1_to_4() {
        assert_perft_series("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -", &[14, 191, 2812, 43_238]);
    }

    #[test]
    fn kiwipete_depths_1_to_3() {
        assert_perft_series(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -",
            &[48, 2039, 97_862],
        );
    }

    #[test]
    fn promotion_heavy_position() {
        assert_perft_series(
            "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1",
            &[6, 264, 9467],
        );
    }
}
