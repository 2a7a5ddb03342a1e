//! Timed throughput measurement.
//!
//! Runs short searches from the start position at escalating depth until a
//! target wall-clock duration is reached, then reports sustained nodes per
//! second. A measurement that produces no throughput is a `TuneError`; the
//! caller skips the offending device and keeps probing.

use std::time::Instant;

use log::debug;
use thiserror::Error;

use crate::compute::backend::{ComputeError, KernelMode, SearchBackend};
use crate::compute::session::ComputeSession;
use crate::position::fen::{parse_fen, STARTING_POSITION_FEN};

/// Deepest the timed search will escalate to.
const BENCH_MAX_DEPTH: u8 = 32;

#[derive(Debug, Error)]
pub enum TuneError {
    #[error("timed measurement on {device} produced no throughput")]
    NoThroughput { device: String },
    #[error(transparent)]
    Compute(#[from] ComputeError),
}

/// Measure sustained nodes per second on a bound session. Escalates depth
/// one ply at a time until at least `target_ms` of wall time has elapsed.
pub fn measure_nps<B: SearchBackend>(
    session: &mut ComputeSession<B>,
    target_ms: u64,
) -> Result<f64, TuneError> {
    let device_name = session
        .device()
        .map(|caps| caps.name.clone())
        .unwrap_or_else(|| "unbound".to_owned());
    let parsed = parse_fen(STARTING_POSITION_FEN).map_err(|_| TuneError::NoThroughput {
        device: device_name.clone(),
    })?;

    session.clear_tables();
    let start = Instant::now();
    let mut total_nodes = 0u64;

    for depth in 1..=BENCH_MAX_DEPTH {
        session.load(&parsed.board, &[])?;
        session.dispatch(parsed.side_to_move, depth, u64::MAX, KernelMode::AlphaBeta)?;
        let output = session.drain()?;
        total_nodes += output.totals().nodes;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        debug!("bench depth {depth}: {total_nodes} nodes after {elapsed_ms} ms");
        if elapsed_ms >= target_ms {
            break;
        }
    }

    let elapsed_secs = start.elapsed().as_secs_f64();
    if total_nodes == 0 || elapsed_secs <= 0.0 {
        return Err(TuneError::NoThroughput {
            device: device_name,
        });
    }
    Ok(total_nodes as f64 / elapsed_secs)
}
