//! In-process reference backend.
//!
//! Implements the opaque kernel contract on the host: each worker runs a
//! sequential alpha-beta to the requested depth against the shared hash
//! tables, with its own random move-ordering jitter so workers explore the
//! tree in different orders, exactly the diversity the device kernels get
//! from their seed buffers. Worker 0 is the authoritative PV worker; later
//! workers mostly warm the tables. Evaluation is bare material: kernel
//! strength is out of scope here, kernel legality is not.

use log::trace;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::compute::backend::{
    ComputeError, KernelJob, KernelMode, KernelOutput, SearchBackend, WorkerCounters,
};
use crate::compute::device::DeviceCaps;
use crate::movegen::attacks::in_check;
use crate::movegen::generator::generate_legal_moves;
use crate::movegen::perft::perft;
use crate::position::board::Board;
use crate::position::history::GameHistory;
use crate::position::moves::{move_piece_captured, move_piece_from, Move, MOVE_NONE};
use crate::position::piece::{piece_type_of, Color, PieceType};
use crate::search::score::{MATE_THRESHOLD, SCORE_DRAW, SCORE_INF};
use crate::tt::abdada::AbdadaTable;
use crate::tt::table::{Bound, TranspositionTable, TtEntry};

/// Depth at or above which busy markers are maintained; shallow subtrees
/// churn the marker table for no savings.
const ABDADA_MIN_DEPTH: u8 = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SearchBackend for CpuBackend {
    fn enumerate(&self) -> Vec<DeviceCaps> {
        let compute_units = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);
        vec![DeviceCaps {
            platform_id: 0,
            device_id: 0,
            name: "cpu-reference".to_owned(),
            little_endian: cfg!(target_endian = "little"),
            compute_units,
            max_alloc_bytes: 256 * 1024 * 1024,
            global_mem_bytes: 1024 * 1024 * 1024,
            local_int32_atomics: true,
            global_int64_atomics: true,
            max_workgroup_size: 256,
            work_item_dims: 3,
            available: true,
        }]
    }

    fn dispatch(
        &mut self,
        job: &KernelJob,
        tt1: &mut TranspositionTable,
        tt2: &mut AbdadaTable,
    ) -> Result<KernelOutput, ComputeError> {
        let worker_count = job.geometry.worker_count() as usize;
        let mut counters = vec![WorkerCounters::default(); worker_count];

        match job.mode {
            KernelMode::Perft => {
                let mut board = job.board;
                counters[0].nodes = perft(&mut board, job.side, job.depth);
                Ok(KernelOutput {
                    counters,
                    pv: Vec::new(),
                    best_move: MOVE_NONE,
                    best_score: 0,
                })
            }
            KernelMode::AlphaBeta => {
                let mut best_move = MOVE_NONE;
                let mut best_score = -SCORE_INF;
                let mut pv = Vec::new();

                for worker in 0..worker_count {
                    let seed = job.seeds.get(worker).copied().unwrap_or(worker as u64);
                    let mut kernel = WorkerKernel {
                        tt1: &mut *tt1,
                        tt2: &mut *tt2,
                        rng: SmallRng::seed_from_u64(seed),
                        hash_history: &job.hash_history,
                        node_ceiling: job.node_ceiling.max(1),
                        counters: WorkerCounters::default(),
                        aborted: false,
                    };
                    let (mv, score, line) = kernel.run(job.board, job.side, job.depth.max(1));
                    counters[worker] = kernel.counters;
                    trace!(
                        "worker {worker}: nodes={} score={score} aborted={}",
                        kernel.counters.nodes,
                        kernel.aborted
                    );
                    if worker == 0 {
                        best_move = mv;
                        best_score = score;
                        pv = line;
                    }
                }

                Ok(KernelOutput {
                    counters,
                    pv,
                    best_move,
                    best_score,
                })
            }
        }
    }
}

struct WorkerKernel<'a> {
    tt1: &'a mut TranspositionTable,
    tt2: &'a mut AbdadaTable,
    rng: SmallRng,
    hash_history: &'a [u64],
    node_ceiling: u64,
    counters: WorkerCounters,
    aborted: bool,
}

impl WorkerKernel<'_> {
    /// Root round: search every legal move, return the best with its line.
    fn run(&mut self, mut board: Board, side: Color, depth: u8) -> (Move, i32, Vec<Move>) {
        let mut history = GameHistory::new();
        let mut moves = generate_legal_moves(&board, side);
        if moves.is_empty() {
            let score = if in_check(&board, side) {
                -SCORE_INF
            } else {
                SCORE_DRAW
            };
            return (MOVE_NONE, score, Vec::new());
        }

        let tt_move = self
            .tt1
            .probe(board.hash)
            .map(|e| e.best_move)
            .unwrap_or(MOVE_NONE);
        self.order_moves(&mut moves, tt_move);

        let mut best_move = moves[0];
        let mut best_score = -SCORE_INF;
        let mut pv = Vec::new();
        let mut alpha = -SCORE_INF;

        for mv in moves {
            board.make_move(mv, &mut history);
            let mut child_line = Vec::new();
            let score = -self.negamax(
                &mut board,
                side.opposite(),
                depth - 1,
                1,
                -SCORE_INF,
                -alpha,
                &mut history,
                &mut child_line,
            );
            board.unmake_move(&mut history);

            if score > best_score {
                best_score = score;
                best_move = mv;
                pv.clear();
                pv.push(mv);
                pv.extend(child_line);
            }
            alpha = alpha.max(score);

            if self.aborted {
                break;
            }
        }

        self.tt1.store(TtEntry {
            key: board.hash,
            best_move,
            score: best_score,
            depth,
            bound: Bound::Exact,
        });
        (best_move, best_score, pv)
    }

    #[allow(clippy::too_many_arguments)]
    fn negamax(
        &mut self,
        board: &mut Board,
        side: Color,
        depth: u8,
        ply: i32,
        mut alpha: i32,
        beta: i32,
        history: &mut GameHistory,
        pv: &mut Vec<Move>,
    ) -> i32 {
        self.counters.nodes += 1;
        if self.counters.nodes >= self.node_ceiling {
            self.aborted = true;
            return evaluate(board, side);
        }

        if board.halfmove_clock >= 100 {
            return SCORE_DRAW;
        }
        // Any earlier occurrence of this hash, in the played game or on the
        // current search path, scores as a draw by repetition.
        if self.hash_history.contains(&board.hash) || history.count_hash(board.hash) > 0 {
            return SCORE_DRAW;
        }

        if depth == 0 {
            return evaluate(board, side);
        }

        let hash = board.hash;
        let mut tt_move = MOVE_NONE;
        if let Some(entry) = self.tt1.probe(hash) {
            if entry.best_move != MOVE_NONE {
                tt_move = entry.best_move;
                self.counters.tt_move_hits += 1;
            }
            if entry.depth >= depth {
                let score = score_from_tt(entry.score, ply);
                let usable = match entry.bound {
                    Bound::Exact => true,
                    Bound::Lower => score >= beta,
                    Bound::Upper => score <= alpha,
                };
                if usable {
                    self.counters.tt_score_hits += 1;
                    return score;
                }
            }
        }

        let mut moves = generate_legal_moves(board, side);
        if moves.is_empty() {
            return if in_check(board, side) {
                -(SCORE_INF - ply)
            } else {
                SCORE_DRAW
            };
        }
        self.order_moves(&mut moves, tt_move);

        let alpha_in = alpha;
        let mut best_score = -SCORE_INF;
        let mut best_move = MOVE_NONE;
        let use_markers = depth >= ABDADA_MIN_DEPTH;
        let mut deferred: Vec<Move> = Vec::new();

        'passes: for pass in 0..2u8 {
            let round: Vec<Move> = if pass == 0 {
                std::mem::take(&mut moves)
            } else {
                std::mem::take(&mut deferred)
            };

            for (index, mv) in round.into_iter().enumerate() {
                board.make_move(mv, history);
                let child_hash = board.hash;

                // ABDADA: defer (never skip) children a peer is already
                // expanding; the first child is always searched so the
                // window is established.
                if use_markers && pass == 0 && index > 0 && self.tt2.busy(child_hash, depth - 1) {
                    board.unmake_move(history);
                    deferred.push(mv);
                    continue;
                }

                if use_markers {
                    self.tt2.enter(child_hash, depth - 1);
                }
                let mut child_line = Vec::new();
                let score = -self.negamax(
                    board,
                    side.opposite(),
                    depth - 1,
                    ply + 1,
                    -beta,
                    -alpha,
                    history,
                    &mut child_line,
                );
                if use_markers {
                    self.tt2.leave(child_hash, depth - 1);
                }
                board.unmake_move(history);

                if score > best_score {
                    best_score = score;
                    best_move = mv;
                    pv.clear();
                    pv.push(mv);
                    pv.extend(child_line);
                }
                alpha = alpha.max(score);
                if alpha >= beta || self.aborted {
                    break 'passes;
                }
            }
        }

        // Deferred moves that never got a second pass (cutoff) are simply
        // dropped; the bound below stays sound because best >= beta.
        let bound = if best_score <= alpha_in {
            Bound::Upper
        } else if best_score >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        if !self.aborted {
            self.tt1.store(TtEntry {
                key: hash,
                best_move,
                score: score_to_tt(best_score, ply),
                depth,
                bound,
            });
        }
        best_score
    }

    /// Hash move first, captures by most-valuable-victim, quiet moves in a
    /// per-worker random order.
    fn order_moves(&mut self, moves: &mut [Move], tt_move: Move) {
        let rng = &mut self.rng;
        moves.sort_by_cached_key(|&mv| {
            if mv == tt_move {
                return i64::MIN;
            }
            let victim = piece_type_of(move_piece_captured(mv));
            if victim != PieceType::Empty {
                let attacker = piece_type_of(move_piece_from(mv));
                return -(piece_value(victim) as i64 * 100 - piece_value(attacker) as i64);
            }
            1_000_000 + rng.gen_range(0..65_536) as i64
        });
    }
}

/// Mate scores are stored relative to the node so they stay valid wherever
/// the entry is probed from.
#[inline]
fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

#[inline]
fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

#[inline]
fn piece_value(piece_type: PieceType) -> i32 {
    match piece_type {
        PieceType::Empty | PieceType::King => 0,
        PieceType::Pawn => 100,
        PieceType::Knight => 300,
        PieceType::Bishop => 310,
        PieceType::Rook => 500,
        PieceType::Queen => 900,
    }
}

/// Material balance from `side`'s point of view.
fn evaluate(board: &Board, side: Color) -> i32 {
    let mut score = 0i32;
    for piece_type in [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
    ] {
        let value = piece_value(piece_type);
        score += board.pieces(piece_type, side).count_ones() as i32 * value;
        score -= board.pieces(piece_type, side.opposite()).count_ones() as i32 * value;
    }
    score
}
