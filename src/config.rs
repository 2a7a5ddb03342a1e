//! Engine configuration file.
//!
//! A line-oriented `key: value` text format read at startup and written by
//! the auto-tuner. Unrecognized lines are ignored so the file can carry
//! comments and future keys; a missing file is a user-correctable error
//! pointing at the auto-tuner rather than a crash.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::warn;
use thiserror::Error;

use crate::compute::backend::ParallelGeometry;
use crate::compute::device::AtomicsTier;
use crate::compute::session::DeviceSelector;

const MEGABYTE: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no engine configuration at {path}; run the auto-tuner (--auto-config) to generate one")]
    Missing { path: PathBuf },
    #[error("could not read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Unwritable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Everything the engine needs to skip re-probing a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub geometry: ParallelGeometry,
    pub nodes_per_second: f64,
    pub tt1_memory_bytes: u64,
    pub tt2_memory_bytes: u64,
    pub device: DeviceSelector,
    pub tier: AtomicsTier,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            geometry: ParallelGeometry::single_worker(),
            nodes_per_second: 1_000_000.0,
            tt1_memory_bytes: 64 * MEGABYTE,
            tt2_memory_bytes: 64 * MEGABYTE,
            device: DeviceSelector::default(),
            tier: AtomicsTier::Baseline,
        }
    }
}

/// Config file for one platform/device pair.
pub fn device_config_path(dir: &Path, platform_id: usize, device_id: usize) -> PathBuf {
    dir.join(format!("photon_p{platform_id}_d{device_id}.config"))
}

/// Read a configuration file, folding recognized keys over the defaults.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut config = EngineConfig::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        match key {
            "threadsX" => {
                if let Ok(v) = value.parse::<u32>() {
                    config.geometry.workers_x = v.max(1);
                }
            }
            "threadsY" => {
                if let Ok(v) = value.parse::<u32>() {
                    config.geometry.workers_y = v.max(1);
                }
            }
            "nodes_per_second" => {
                if let Ok(v) = value.parse::<f64>() {
                    config.nodes_per_second = v.max(0.0);
                }
            }
            "tt1_memory" => {
                if let Ok(v) = value.parse::<u64>() {
                    config.tt1_memory_bytes = v * MEGABYTE;
                }
            }
            "tt2_memory" => {
                if let Ok(v) = value.parse::<u64>() {
                    config.tt2_memory_bytes = v * MEGABYTE;
                }
            }
            "opencl_platform_id" => {
                if let Ok(v) = value.parse::<usize>() {
                    config.device.platform_id = v;
                }
            }
            "opencl_device_id" => {
                if let Ok(v) = value.parse::<usize>() {
                    config.device.device_id = v;
                }
            }
            "opencl_gpugen" => match value.parse::<u32>().ok().and_then(AtomicsTier::from_gpugen) {
                Some(tier) => config.tier = tier,
                None => warn!("unknown opencl_gpugen value {value:?}, keeping default"),
            },
            _ => {}
        }
    }
    Ok(config)
}

/// Persist a configuration in the same key:value layout `load_config` reads.
pub fn save_config(path: &Path, config: &EngineConfig) -> Result<(), ConfigError> {
    let unwritable = |source| ConfigError::Unwritable {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(path).map_err(unwritable)?;
    writeln!(file, "# photon_chess device configuration").map_err(unwritable)?;
    writeln!(file, "# generated {}", Local::now().format("%Y-%m-%d %H:%M:%S")).map_err(unwritable)?;
    writeln!(file, "threadsX: {}", config.geometry.workers_x).map_err(unwritable)?;
    writeln!(file, "threadsY: {}", config.geometry.workers_y).map_err(unwritable)?;
    writeln!(file, "nodes_per_second: {:.0}", config.nodes_per_second).map_err(unwritable)?;
    writeln!(file, "tt1_memory: {}", config.tt1_memory_bytes / MEGABYTE).map_err(unwritable)?;
    writeln!(file, "tt2_memory: {}", config.tt2_memory_bytes / MEGABYTE).map_err(unwritable)?;
    writeln!(file, "opencl_platform_id: {}", config.device.platform_id).map_err(unwritable)?;
    writeln!(file, "opencl_device_id: {}", config.device.device_id).map_err(unwritable)?;
    writeln!(file, "opencl_gpugen: {}", config.tier.gpugen()).map_err(unwritable)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{device_config_path, load_config, save_config, ConfigError, EngineConfig};
    use crate::compute::backend::ParallelGeometry;
    use crate::compute::device::AtomicsTier;
    use crate::compute::session::DeviceSelector;
    use std::path::Path;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("photon_config_test_{name}_{}", std::process::id()))
    }

    #[test]
    fn missing_file_suggests_the_auto_tuner() {
        let err = load_config(Path::new("/definitely/not/here.config"))
            .expect_err("missing file is an error");
        assert!(matches!(err, ConfigError::Missing { .. }));
        assert!(err.to_string().contains("--auto-config"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = temp_path("round_trip");
        let config = EngineConfig {
            geometry: ParallelGeometry {
                workers_x: 8,
                workers_y: 2,
                lanes: 64,
            },
            nodes_per_second: 2_500_000.0,
            tt1_memory_bytes: 128 * 1024 * 1024,
            tt2_memory_bytes: 32 * 1024 * 1024,
            device: DeviceSelector {
                platform_id: 1,
                device_id: 2,
            },
            tier: AtomicsTier::WideAtomics,
        };
        save_config(&path, &config).expect("save should succeed");
        let loaded = load_config(&path).expect("load should succeed");
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn unrecognized_lines_are_ignored() {
        let path = temp_path("unknown_keys");
        std::fs::write(
            &path,
            "# a comment\nthreadsX: 4\nfuture_key: whatever\nnot even a pair\nthreadsY: 3\n",
        )
        .expect("write should succeed");
        let loaded = load_config(&path).expect("load should succeed");
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.geometry.workers_x, 4);
        assert_eq!(loaded.geometry.workers_y, 3);
        // Untouched keys keep their defaults.
        assert_eq!(loaded.device, DeviceSelector::default());
    }

    #[test]
    fn config_path_is_per_device_pair() {
        let a = device_config_path(Path::new("/tmp"), 0, 0);
        let b = device_config_path(Path::new("/tmp"), 0, 1);
        assert_ne!(a, b);
        assert!(a.to_string_lossy().ends_with(".config"));
    }
}
