//! Compute session: device binding, buffer lifecycle, dispatch cycle.
//!
//! The session walks `Uninitialized -> DeviceBound -> (Loaded -> Dispatched
//! -> Drained)* -> Released`. Any device failure is fatal to the session; the
//! caller is expected to `release()` (idempotent) and give up rather than
//! retry. A finished-flag buffer is allocated for protocol fidelity, but
//! sub-round cancellation is unsupported: overruns are only detected after a
//! round returns, by comparing reported nodes against the requested ceiling.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::compute::backend::{
    ComputeError, KernelJob, KernelMode, KernelOutput, ParallelGeometry, SearchBackend,
};
use crate::compute::device::DeviceCaps;
use crate::position::board::Board;
use crate::position::piece::Color;
use crate::tt::abdada::AbdadaTable;
use crate::tt::sizing::fits_max_allocation;
use crate::tt::table::TranspositionTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    DeviceBound,
    Loaded,
    Dispatched,
    Drained,
    Released,
}

impl SessionState {
    const fn name(self) -> &'static str {
        match self {
            SessionState::Uninitialized => "Uninitialized",
            SessionState::DeviceBound => "DeviceBound",
            SessionState::Loaded => "Loaded",
            SessionState::Dispatched => "Dispatched",
            SessionState::Drained => "Drained",
            SessionState::Released => "Released",
        }
    }
}

/// Which enumerated device to bind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceSelector {
    pub platform_id: usize,
    pub device_id: usize,
}

#[derive(Debug, Clone)]
struct StagedInputs {
    board: Board,
    hash_history: Vec<u64>,
    seeds: Vec<u64>,
}

pub struct ComputeSession<B: SearchBackend> {
    backend: B,
    state: SessionState,
    device: Option<DeviceCaps>,
    geometry: ParallelGeometry,
    tt1: Option<TranspositionTable>,
    tt2: Option<AbdadaTable>,
    staged: Option<StagedInputs>,
    output: Option<KernelOutput>,
    // Allocated but never signalled; see module docs.
    finished_flag: bool,
}

impl<B: SearchBackend> ComputeSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: SessionState::Uninitialized,
            device: None,
            geometry: ParallelGeometry::single_worker(),
            tt1: None,
            tt2: None,
            staged: None,
            output: None,
            finished_flag: false,
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn device(&self) -> Option<&DeviceCaps> {
        self.device.as_ref()
    }

    #[inline]
    pub fn geometry(&self) -> ParallelGeometry {
        self.geometry
    }

    pub fn tt1_stats(&self) -> Option<crate::tt::table::TtStats> {
        self.tt1.as_ref().map(TranspositionTable::stats)
    }

    /// Bind a device and allocate both hash tables from the given budgets.
    pub fn bind(
        &mut self,
        selector: DeviceSelector,
        geometry: ParallelGeometry,
        tt1_budget_bytes: u64,
        tt2_budget_bytes: u64,
    ) -> Result<(), ComputeError> {
        if self.state != SessionState::Uninitialized {
            return Err(ComputeError::InvalidState {
                op: "bind",
                state: self.state.name(),
            });
        }

        let caps = self
            .backend
            .enumerate()
            .into_iter()
            .find(|c| c.platform_id == selector.platform_id && c.device_id == selector.device_id)
            .ok_or(ComputeError::DeviceUnavailable {
                platform: selector.platform_id,
                device: selector.device_id,
            })?;

        if let Some(reason) = caps.hard_requirement_failure() {
            return Err(ComputeError::UnsupportedDevice { reason });
        }

        let requested = tt1_budget_bytes.saturating_add(tt2_budget_bytes);
        if !fits_max_allocation(tt1_budget_bytes, tt2_budget_bytes, caps.max_alloc_bytes) {
            return Err(ComputeError::AllocationTooLarge {
                requested,
                max: caps.max_alloc_bytes,
            });
        }

        let tt1 = TranspositionTable::new_with_budget(tt1_budget_bytes);
        let tt2 = AbdadaTable::new_with_budget(tt2_budget_bytes);
        debug!(
            "bound {} ({}x{} workers, tt1 {} entries, tt2 {} entries)",
            caps.name,
            geometry.workers_x,
            geometry.workers_y,
            tt1.capacity(),
            tt2.capacity()
        );

        self.device = Some(caps);
        self.geometry = geometry;
        self.tt1 = Some(tt1);
        self.tt2 = Some(tt2);
        self.finished_flag = false;
        self.state = SessionState::DeviceBound;
        Ok(())
    }

    /// Upload the position, a freshly wall-clock-seeded random array, and
    /// the per-worker hash-history snapshot. Each call reseeds so repeated
    /// rounds at increasing depth get fresh randomization.
    pub fn load(&mut self, board: &Board, hash_history: &[u64]) -> Result<(), ComputeError> {
        if self.state != SessionState::DeviceBound && self.state != SessionState::Drained {
            return Err(ComputeError::InvalidState {
                op: "load",
                state: self.state.name(),
            });
        }

        let wall_clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5EED);
        let mut rng = SmallRng::seed_from_u64(wall_clock);
        let seeds = (0..self.geometry.worker_count())
            .map(|_| rng.gen::<u64>())
            .collect();

        self.staged = Some(StagedInputs {
            board: *board,
            hash_history: hash_history.to_vec(),
            seeds,
        });
        self.state = SessionState::Loaded;
        Ok(())
    }

    /// Launch one kernel round and block until it completes.
    pub fn dispatch(
        &mut self,
        side: Color,
        depth: u8,
        node_ceiling: u64,
        mode: KernelMode,
    ) -> Result<(), ComputeError> {
        if self.state != SessionState::Loaded {
            return Err(ComputeError::InvalidState {
                op: "dispatch",
                state: self.state.name(),
            });
        }
        let staged = self.staged.as_ref().ok_or(ComputeError::Backend {
            op: "dispatch",
            status: -1,
        })?;

        let job = KernelJob {
            board: staged.board,
            side,
            hash_history: staged.hash_history.clone(),
            seeds: staged.seeds.clone(),
            geometry: self.geometry,
            depth,
            node_ceiling,
            mode,
        };

        let (tt1, tt2) = match (self.tt1.as_mut(), self.tt2.as_mut()) {
            (Some(tt1), Some(tt2)) => (tt1, tt2),
            _ => {
                return Err(ComputeError::Backend {
                    op: "dispatch",
                    status: -2,
                })
            }
        };

        match self.backend.dispatch(&job, tt1, tt2) {
            Ok(output) => {
                self.output = Some(output);
                self.state = SessionState::Dispatched;
                Ok(())
            }
            Err(err) => {
                // Device failures are non-transient within a run; tear down
                // rather than leave dangling buffers behind.
                warn!("dispatch failed, releasing session: {err}");
                self.release();
                Err(err)
            }
        }
    }

    /// Read back the counter block, PV, and score of the last dispatch.
    pub fn drain(&mut self) -> Result<KernelOutput, ComputeError> {
        if self.state != SessionState::Dispatched {
            return Err(ComputeError::InvalidState {
                op: "drain",
                state: self.state.name(),
            });
        }
        let output = self.output.take().ok_or(ComputeError::Backend {
            op: "drain",
            status: -3,
        })?;
        self.state = SessionState::Drained;
        Ok(output)
    }

    /// Reset both hash tables (new game, or perft rounds which must not see
    /// stale entries).
    pub fn clear_tables(&mut self) {
        if let Some(tt1) = self.tt1.as_mut() {
            tt1.clear();
        }
        if let Some(tt2) = self.tt2.as_mut() {
            tt2.clear();
        }
    }

    /// Tear down buffers in reverse-dependency order. Idempotent.
    pub fn release(&mut self) {
        self.output = None;
        self.staged = None;
        self.finished_flag = false;
        self.tt2 = None;
        self.tt1 = None;
        self.device = None;
        self.state = SessionState::Released;
    }
}
