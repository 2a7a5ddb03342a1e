use std::path::Path;

use log::warn;

use photon_chess::compute::cpu::CpuBackend;
use photon_chess::config::{device_config_path, load_config, ConfigError, EngineConfig};
use photon_chess::tuner::autotune::{run_auto_tune, DEFAULT_BENCH_MS};
use photon_chess::uci::uci_top::run_stdio_loop;

fn main() -> std::io::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let extreme = args.iter().any(|a| a == "--auto-config-extreme");
    if extreme || args.iter().any(|a| a == "--auto-config") {
        let tuned = run_auto_tune(&CpuBackend::new, Path::new("."), extreme, DEFAULT_BENCH_MS);
        if tuned.is_empty() {
            eprintln!("no usable compute device found");
            return Ok(());
        }
        for device in &tuned {
            println!(
                "{}: {:.0} nodes/s with {} workers",
                device.device_name,
                device.nodes_per_second,
                device.config.geometry.worker_count()
            );
        }
        return Ok(());
    }

    let path = device_config_path(Path::new("."), 0, 0);
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(err @ ConfigError::Missing { .. }) => {
            // A missing config is correctable; start with defaults anyway.
            warn!("{err}; starting with defaults");
            EngineConfig::default()
        }
        Err(err) => {
            eprintln!("{err}");
            return Ok(());
        }
    };

    run_stdio_loop(&config)
}
