//! Iterative-deepening root driver.
//!
//! Owns the position, game history, and clock, and drives the compute
//! session one depth at a time. Each round is bounded by a per-worker node
//! ceiling derived from the remaining node budget; a round whose worker-0
//! node count hit the ceiling was interrupted mid-search, so its move is
//! only kept as a fallback, never as an accepted result. After the loop the
//! learned nodes-per-second estimate is refreshed from this search's
//! measured throughput.

use std::time::Instant;

use log::debug;

use crate::compute::backend::{KernelMode, SearchBackend};
use crate::compute::session::ComputeSession;
use crate::position::board::Board;
use crate::position::fen::{
    parse_fen, parse_fen_validated, FenError, ParsedFen, STARTING_POSITION_FEN,
};
use crate::position::history::GameHistory;
use crate::position::moves::{Move, MOVE_NONE};
use crate::position::piece::Color;
use crate::search::score::{is_mate_score, mate_distance_plies, mate_in};
use crate::search::time_control::{smooth_nps, ClockState};

pub use crate::compute::backend::ComputeError;

/// Branching-factor guess used before two rounds have completed.
const DEFAULT_BRANCHING_FACTOR: f64 = 3.0;

/// Result of one `root_search` call.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub best_move: Move,
    pub score: i32,
    /// Signed full moves to mate when the score is a forced mate.
    pub mate_in: Option<i32>,
    /// Deepest fully accepted iteration; 0 when every round was interrupted.
    pub depth: u8,
    pub pv: Vec<Move>,
    pub nodes: u64,
    pub elapsed_ms: u64,
    /// True when the final round hit its node ceiling.
    pub interrupted: bool,
}

/// The engine's whole mutable state: position, history, clock, and the
/// compute session it searches with.
pub struct EngineSession<B: SearchBackend> {
    session: ComputeSession<B>,
    board: Board,
    side: Color,
    history: GameHistory,
    fullmove_number: u16,
    clock: ClockState,
    nodes_per_second: f64,
}

impl<B: SearchBackend> EngineSession<B> {
    /// Wrap a bound compute session, starting from the standard position.
    pub fn new(session: ComputeSession<B>) -> Self {
        let parsed =
            parse_fen(STARTING_POSITION_FEN).unwrap_or_else(|_| unreachable!("start FEN is fixed"));
        Self {
            session,
            board: parsed.board,
            side: parsed.side_to_move,
            history: GameHistory::new(),
            fullmove_number: parsed.fullmove_number,
            clock: ClockState::default(),
            nodes_per_second: 1_000_000.0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.side
    }

    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    pub fn clock(&self) -> &ClockState {
        &self.clock
    }

    pub fn set_clock(&mut self, clock: ClockState) {
        self.clock = clock;
    }

    pub fn nodes_per_second(&self) -> f64 {
        self.nodes_per_second
    }

    pub fn set_nodes_per_second(&mut self, nps: f64) {
        self.nodes_per_second = nps.max(0.0);
    }

    /// Reset to the standard start position and forget all history and
    /// table contents.
    pub fn new_game(&mut self) {
        let parsed =
            parse_fen(STARTING_POSITION_FEN).unwrap_or_else(|_| unreachable!("start FEN is fixed"));
        self.board = parsed.board;
        self.side = parsed.side_to_move;
        self.fullmove_number = parsed.fullmove_number;
        self.history.clear();
        self.session.clear_tables();
    }

    /// Replace the position from FEN text; history restarts at this point.
    /// Structurally illegal boards (wrong king counts, back-rank pawns) are
    /// rejected before they can reach the kernels.
    pub fn set_position_fen(&mut self, fen: &str) -> Result<(), FenError> {
        let ParsedFen {
            board,
            side_to_move,
            fullmove_number,
        } = parse_fen_validated(fen)?;
        self.board = board;
        self.side = side_to_move;
        self.fullmove_number = fullmove_number;
        self.history.clear();
        Ok(())
    }

    /// Apply a move to the game (not search) state.
    pub fn play_move(&mut self, mv: Move) {
        self.board.make_move(mv, &mut self.history);
        if self.side == Color::Dark {
            self.fullmove_number += 1;
        }
        self.side = self.side.opposite();
    }

    /// Undo the most recent played move. Returns false on an empty history.
    pub fn undo_move(&mut self) -> bool {
        if !self.board.unmake_move(&mut self.history) {
            return false;
        }
        self.side = self.side.opposite();
        if self.side == Color::Dark {
            self.fullmove_number -= 1;
        }
        true
    }

    /// Search the current position by iterative deepening up to `max_depth`.
    pub fn root_search(&mut self, max_depth: u8) -> Result<SearchReport, ComputeError> {
        let allocated_ms = self.clock.allocate_ms();
        let node_budget = self.clock.node_budget(self.nodes_per_second);
        let worker_count = u64::from(self.session.geometry().worker_count()).max(1);
        let start = Instant::now();

        let mut report = SearchReport {
            best_move: MOVE_NONE,
            score: 0,
            mate_in: None,
            depth: 0,
            pv: Vec::new(),
            nodes: 0,
            elapsed_ms: 0,
            interrupted: false,
        };
        let mut total_nodes = 0u64;
        let mut previous_round_nodes = 0u64;
        let mut branching = DEFAULT_BRANCHING_FACTOR;

        for depth in 1..=max_depth.max(1) {
            let remaining = node_budget.saturating_sub(total_nodes).max(1);
            let ceiling = (remaining / worker_count).max(1);

            self.session.load(&self.board, self.history.hashes())?;
            self.session
                .dispatch(self.side, depth, ceiling, KernelMode::AlphaBeta)?;
            let output = self.session.drain()?;

            let round_nodes = output.totals().nodes;
            total_nodes += round_nodes;
            let interrupted = output
                .counters
                .first()
                .map_or(true, |c| c.nodes >= ceiling);

            if interrupted {
                // Unreliable round: its move is only a last-resort fallback.
                report.interrupted = true;
                if report.best_move == MOVE_NONE && output.best_move != MOVE_NONE {
                    report.best_move = output.best_move;
                    report.score = output.best_score;
                    report.pv = output.pv;
                }
                break;
            }

            report.best_move = output.best_move;
            report.score = output.best_score;
            report.mate_in = mate_in(output.best_score);
            report.depth = depth;
            report.pv = output.pv;
            report.interrupted = false;
            debug!(
                "depth {depth}: score {} nodes {round_nodes} best {:#x}",
                output.best_score, output.best_move
            );

            // Device reported no additional work: the tree is exhausted.
            if round_nodes == 0 {
                break;
            }

            if previous_round_nodes > 0 {
                branching = (round_nodes as f64 / previous_round_nodes as f64).max(1.0);
            }
            previous_round_nodes = round_nodes;

            // A mate no deeper than the searched depth cannot improve.
            if is_mate_score(report.score) {
                if let Some(plies) = mate_distance_plies(report.score) {
                    if plies <= i32::from(depth) {
                        break;
                    }
                }
            }

            let elapsed_ms = start.elapsed().as_millis() as u64;
            if (elapsed_ms as f64) * branching > allocated_ms as f64 {
                break;
            }
            if (total_nodes as f64) * branching > node_budget as f64 {
                break;
            }
        }

        report.nodes = total_nodes;
        report.elapsed_ms = start.elapsed().as_millis() as u64;
        self.clock.apply_elapsed(report.elapsed_ms);

        let elapsed_secs = (report.elapsed_ms as f64 / 1000.0).max(0.001);
        let sample = total_nodes as f64 / elapsed_secs;
        self.nodes_per_second = smooth_nps(self.nodes_per_second, sample);

        Ok(report)
    }

    /// Leaf-count the current position at `depth` on the device. Runs with
    /// cleared tables and no time control.
    pub fn perft(&mut self, depth: u8) -> Result<u64, ComputeError> {
        self.session.clear_tables();
        self.session.load(&self.board, self.history.hashes())?;
        self.session
            .dispatch(self.side, depth, u64::MAX, KernelMode::Perft)?;
        let output = self.session.drain()?;
        Ok(output.totals().nodes)
    }

    /// Release device resources. The session is unusable afterwards.
    pub fn shutdown(&mut self) {
        self.session.release();
    }
}
