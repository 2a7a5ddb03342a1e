//! The opaque-kernel boundary.
//!
//! A `SearchBackend` is the whole compute device as the host sees it:
//! enumerate devices, then run one of two named kernels (alpha-beta or
//! perft) against uploaded inputs and the shared hash tables. Any
//! non-success from the backend surfaces as one `ComputeError::Backend`
//! shape regardless of which operation failed.

use thiserror::Error;

use crate::compute::device::DeviceCaps;
use crate::position::board::Board;
use crate::position::moves::Move;
use crate::position::piece::Color;
use crate::tt::abdada::AbdadaTable;
use crate::tt::table::TranspositionTable;

/// Which kernel entry point a dispatch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelMode {
    AlphaBeta,
    Perft,
}

/// Launch geometry: two independent multipliers whose product is the worker
/// count, plus the fixed lane count each worker cooperates across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelGeometry {
    pub workers_x: u32,
    pub workers_y: u32,
    pub lanes: u32,
}

impl ParallelGeometry {
    pub const fn single_worker() -> Self {
        Self {
            workers_x: 1,
            workers_y: 1,
            lanes: 64,
        }
    }

    #[inline]
    pub const fn worker_count(&self) -> u32 {
        self.workers_x * self.workers_y
    }
}

/// Per-worker counter block read back after every dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerCounters {
    pub nodes: u64,
    pub tt_move_hits: u64,
    pub tt_score_hits: u64,
    pub iid_hits: u64,
}

/// One dispatch worth of uploaded inputs.
#[derive(Debug, Clone)]
pub struct KernelJob {
    pub board: Board,
    pub side: Color,
    pub hash_history: Vec<u64>,
    pub seeds: Vec<u64>,
    pub geometry: ParallelGeometry,
    pub depth: u8,
    /// Per-worker node ceiling; a worker reporting `nodes >= ceiling` was
    /// interrupted mid-round.
    pub node_ceiling: u64,
    pub mode: KernelMode,
}

/// Downloaded results of one dispatch.
#[derive(Debug, Clone)]
pub struct KernelOutput {
    pub counters: Vec<WorkerCounters>,
    pub pv: Vec<Move>,
    pub best_move: Move,
    pub best_score: i32,
}

impl KernelOutput {
    /// Counter totals summed over all workers.
    pub fn totals(&self) -> WorkerCounters {
        let mut total = WorkerCounters::default();
        for c in &self.counters {
            total.nodes += c.nodes;
            total.tt_move_hits += c.tt_move_hits;
            total.tt_score_hits += c.tt_score_hits;
            total.iid_hits += c.iid_hits;
        }
        total
    }
}

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("no compute device matches platform {platform} device {device}")]
    DeviceUnavailable { platform: usize, device: usize },
    #[error("device unsupported: {reason}")]
    UnsupportedDevice { reason: String },
    #[error("hash tables need {requested} bytes, device max allocation is {max}")]
    AllocationTooLarge { requested: u64, max: u64 },
    #[error("{op} is invalid in session state {state}")]
    InvalidState { op: &'static str, state: &'static str },
    #[error("device operation {op} failed with status {status}")]
    Backend { op: &'static str, status: i32 },
}

/// The compute device boundary. The real implementation drives an
/// OpenCL-style API; `CpuBackend` is the in-process reference used by tests
/// and CPU-only hosts.
pub trait SearchBackend {
    /// All devices visible to this backend, across platforms.
    fn enumerate(&self) -> Vec<DeviceCaps>;

    /// Run one kernel round to completion (synchronous) against the shared
    /// tables, returning the downloaded outputs.
    fn dispatch(
        &mut self,
        job: &KernelJob,
        tt1: &mut TranspositionTable,
        tt2: &mut AbdadaTable,
    ) -> Result<KernelOutput, ComputeError>;
}

#[cfg(test)]
mod tests {
    use super::{KernelOutput, ParallelGeometry, WorkerCounters};
    use crate::position::moves::MOVE_NONE;

    #[test]
    fn geometry_worker_count_is_the_product() {
        let geometry = ParallelGeometry {
            workers_x: 4,
            workers_y: 8,
            lanes: 64,
        };
        assert_eq!(geometry.worker_count(), 32);
        assert_eq!(ParallelGeometry::single_worker().worker_count(), 1);
    }

    #[test]
    fn totals_sum_per_worker_blocks() {
        let output = KernelOutput {
            counters: vec![
                WorkerCounters {
                    nodes: 10,
                    tt_move_hits: 1,
                    tt_score_hits: 2,
                    iid_hits: 0,
                },
                WorkerCounters {
                    nodes: 32,
                    tt_move_hits: 4,
                    tt_score_hits: 0,
                    iid_hits: 1,
                },
            ],
            pv: Vec::new(),
            best_move: MOVE_NONE,
            best_score: 0,
        };
        let totals = output.totals();
        assert_eq!(totals.nodes, 42);
        assert_eq!(totals.tt_move_hits, 5);
        assert_eq!(totals.tt_score_hits, 2);
        assert_eq!(totals.iid_hits, 1);
    }
}
