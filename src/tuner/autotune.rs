//! Per-device auto-tuner.
//!
//! For every usable device: size both hash tables from half the device's
//! maximum single allocation each, measure a single-worker baseline, and in
//! extreme mode keep doubling the worker multiplier while each doubling
//! beats the last accepted throughput by more than the speedup margin. The
//! winning configuration is persisted per platform/device pair so later
//! runs skip the probe entirely.

use std::path::Path;

use log::{info, warn};

use crate::compute::backend::{ParallelGeometry, SearchBackend};
use crate::compute::session::{ComputeSession, DeviceSelector};
use crate::config::{device_config_path, save_config, EngineConfig};
use crate::tuner::bench::{measure_nps, TuneError};
use crate::tuner::probe::{probe_devices, ProbedDevice};

/// A doubling must beat the previous accepted throughput by this ratio;
/// anything less is treated as measurement noise.
pub const SPEEDUP_MARGIN: f64 = 1.15;

/// Wall-clock target for each timed measurement.
pub const DEFAULT_BENCH_MS: u64 = 2_000;

const MAX_WORKER_DOUBLINGS: u32 = 8;

/// Winning configuration for one device.
#[derive(Debug, Clone)]
pub struct TunedDevice {
    pub device_name: String,
    pub config: EngineConfig,
    pub nodes_per_second: f64,
}

fn measure_geometry<B, F>(
    make_backend: &F,
    selector: DeviceSelector,
    geometry: ParallelGeometry,
    tt1_bytes: u64,
    tt2_bytes: u64,
    target_ms: u64,
) -> Result<f64, TuneError>
where
    B: SearchBackend,
    F: Fn() -> B,
{
    let mut session = ComputeSession::new(make_backend());
    session.bind(selector, geometry, tt1_bytes, tt2_bytes)?;
    let nps = measure_nps(&mut session, target_ms);
    session.release();
    nps
}

fn tune_device<B, F>(
    make_backend: &F,
    device: &ProbedDevice,
    extreme: bool,
    target_ms: u64,
) -> Result<TunedDevice, TuneError>
where
    B: SearchBackend,
    F: Fn() -> B,
{
    let selector = DeviceSelector {
        platform_id: device.caps.platform_id,
        device_id: device.caps.device_id,
    };
    let table_bytes = device.caps.max_alloc_bytes / 2;
    let mut geometry = ParallelGeometry::single_worker();
    let mut best_nps = measure_geometry(
        make_backend,
        selector,
        geometry,
        table_bytes,
        table_bytes,
        target_ms,
    )?;
    info!(
        "{}: baseline {:.0} nodes/s single worker",
        device.caps.name, best_nps
    );

    if extreme {
        for _ in 0..MAX_WORKER_DOUBLINGS {
            let candidate = ParallelGeometry {
                workers_x: geometry.workers_x * 2,
                ..geometry
            };
            let nps = match measure_geometry(
                make_backend,
                selector,
                candidate,
                table_bytes,
                table_bytes,
                target_ms,
            ) {
                Ok(nps) => nps,
                Err(err) => {
                    warn!("{}: {} workers failed ({err}), keeping {}",
                        device.caps.name,
                        candidate.worker_count(),
                        geometry.worker_count());
                    break;
                }
            };
            if nps > best_nps * SPEEDUP_MARGIN {
                info!(
                    "{}: accepted {} workers at {:.0} nodes/s",
                    device.caps.name,
                    candidate.worker_count(),
                    nps
                );
                geometry = candidate;
                best_nps = nps;
            } else {
                info!(
                    "{}: {} workers gave {:.0} nodes/s, below the speedup margin",
                    device.caps.name,
                    candidate.worker_count(),
                    nps
                );
                break;
            }
        }
    }

    Ok(TunedDevice {
        device_name: device.caps.name.clone(),
        config: EngineConfig {
            geometry,
            nodes_per_second: best_nps,
            tt1_memory_bytes: table_bytes,
            tt2_memory_bytes: table_bytes,
            device: selector,
            tier: device.tier,
        },
        nodes_per_second: best_nps,
    })
}

/// Tune every usable device. A device whose measurement fails is skipped
/// with a logged reason; the remaining candidates are still tuned.
pub fn auto_tune<B, F>(make_backend: &F, extreme: bool, target_ms: u64) -> Vec<TunedDevice>
where
    B: SearchBackend,
    F: Fn() -> B,
{
    let mut tuned = Vec::new();
    for device in probe_devices(&make_backend()) {
        match tune_device(make_backend, &device, extreme, target_ms) {
            Ok(result) => tuned.push(result),
            Err(err) => warn!("skipping {}: {err}", device.caps.name),
        }
    }
    tuned
}

/// Tune every device and persist each winning configuration under `dir`.
pub fn run_auto_tune<B, F>(
    make_backend: &F,
    dir: &Path,
    extreme: bool,
    target_ms: u64,
) -> Vec<TunedDevice>
where
    B: SearchBackend,
    F: Fn() -> B,
{
    let tuned = auto_tune(make_backend, extreme, target_ms);
    for device in &tuned {
        let path = device_config_path(
            dir,
            device.config.device.platform_id,
            device.config.device.device_id,
        );
        match save_config(&path, &device.config) {
            Ok(()) => info!("wrote {} for {}", path.display(), device.device_name),
            Err(err) => warn!("could not persist config for {}: {err}", device.device_name),
        }
    }
    tuned
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::{auto_tune, run_auto_tune};
    use crate::compute::backend::{
        ComputeError, KernelJob, KernelOutput, ParallelGeometry, SearchBackend, WorkerCounters,
    };
    use crate::compute::cpu::CpuBackend;
    use crate::compute::device::{AtomicsTier, DeviceCaps};
    use crate::config::{device_config_path, load_config};
    use crate::position::moves::MOVE_NONE;
    use crate::tt::abdada::AbdadaTable;
    use crate::tt::table::TranspositionTable;

    /// Backend whose throughput is scripted per worker count: two workers
    /// quadruple the node total, four workers lose ground. Every dispatch
    /// takes the same wall time, so the node totals are the throughputs.
    struct ScriptedBackend;

    impl SearchBackend for ScriptedBackend {
        fn enumerate(&self) -> Vec<DeviceCaps> {
            vec![DeviceCaps {
                platform_id: 0,
                device_id: 0,
                name: "scripted".to_owned(),
                little_endian: true,
                compute_units: 8,
                max_alloc_bytes: 1 << 20,
                global_mem_bytes: 1 << 30,
                local_int32_atomics: true,
                global_int64_atomics: true,
                max_workgroup_size: 64,
                work_item_dims: 3,
                available: true,
            }]
        }

        fn dispatch(
            &mut self,
            job: &KernelJob,
            _tt1: &mut TranspositionTable,
            _tt2: &mut AbdadaTable,
        ) -> Result<KernelOutput, ComputeError> {
            let nodes = match job.geometry.worker_count() {
                1 => 10_000u64,
                2 => 40_000,
                _ => 30_000,
            };
            thread::sleep(Duration::from_millis(40));
            let mut counters =
                vec![WorkerCounters::default(); job.geometry.worker_count() as usize];
            counters[0].nodes = nodes;
            Ok(KernelOutput {
                counters,
                pv: Vec::new(),
                best_move: MOVE_NONE,
                best_score: 0,
            })
        }
    }

    #[test]
    fn baseline_tune_sizes_tables_from_half_the_max_allocation() {
        let tuned = auto_tune(&CpuBackend::new, false, 10);
        assert_eq!(tuned.len(), 1);
        let device = &tuned[0];
        assert!(device.nodes_per_second > 0.0);
        assert_eq!(device.config.geometry, ParallelGeometry::single_worker());
        // cpu-reference reports 256 MB max allocation.
        assert_eq!(device.config.tt1_memory_bytes, 128 * 1024 * 1024);
        assert_eq!(device.config.tt2_memory_bytes, 128 * 1024 * 1024);
        assert_eq!(device.config.tier, AtomicsTier::WideAtomics);
    }

    #[test]
    fn extreme_mode_keeps_the_last_doubling_that_beat_the_margin() {
        let dir =
            std::env::temp_dir().join(format!("photon_tune_extreme_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir should create");
        let tuned = run_auto_tune(&|| ScriptedBackend, &dir, true, 10);
        assert_eq!(tuned.len(), 1);

        // 1 -> 2 workers measured 4x and was accepted; 2 -> 4 measured
        // below the speedup margin, so the doubling stopped at two.
        let geometry = tuned[0].config.geometry;
        assert_eq!(geometry.workers_x, 2);
        assert_eq!(geometry.workers_y, 1);

        // The persisted file carries the accepted geometry, not the
        // rejected candidate.
        let loaded =
            load_config(&device_config_path(&dir, 0, 0)).expect("persisted config should load");
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(loaded.geometry.workers_x, 2);
    }

    #[test]
    fn run_auto_tune_persists_a_loadable_config() {
        let dir = std::env::temp_dir().join(format!("photon_tune_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir should create");
        let tuned = run_auto_tune(&CpuBackend::new, &dir, false, 10);
        assert_eq!(tuned.len(), 1);

        let path = device_config_path(&dir, 0, 0);
        let loaded = load_config(&path).expect("persisted config should load");
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(loaded.geometry, tuned[0].config.geometry);
        assert_eq!(loaded.tier, tuned[0].config.tier);
    }
}
