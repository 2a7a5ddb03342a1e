//! Device capability probe.
//!
//! Walks every enumerated device, rejecting the ones that fail a hard
//! requirement with a logged reason. A bad device never aborts the probe;
//! the tuner simply moves on to the next candidate.

use log::{info, warn};

use crate::compute::backend::SearchBackend;
use crate::compute::device::{AtomicsTier, DeviceCaps};

/// One usable device with its selected kernel tier.
#[derive(Debug, Clone)]
pub struct ProbedDevice {
    pub caps: DeviceCaps,
    pub tier: AtomicsTier,
}

/// Probe all devices the backend can see, keeping only the usable ones.
pub fn probe_devices<B: SearchBackend>(backend: &B) -> Vec<ProbedDevice> {
    let mut usable = Vec::new();
    for caps in backend.enumerate() {
        if let Some(reason) = caps.hard_requirement_failure() {
            warn!(
                "skipping device {} (platform {}, device {}): {reason}",
                caps.name, caps.platform_id, caps.device_id
            );
            continue;
        }
        let tier = AtomicsTier::select(&caps);
        info!(
            "device {} usable: {} compute units, {} MB max allocation, tier {}",
            caps.name,
            caps.compute_units,
            caps.max_alloc_bytes / (1024 * 1024),
            tier.gpugen()
        );
        usable.push(ProbedDevice { caps, tier });
    }
    usable
}

#[cfg(test)]
mod tests {
    use super::probe_devices;
    use crate::compute::backend::{
        ComputeError, KernelJob, KernelOutput, SearchBackend,
    };
    use crate::compute::device::{AtomicsTier, DeviceCaps};
    use crate::tt::abdada::AbdadaTable;
    use crate::tt::table::TranspositionTable;

    struct EnumOnlyBackend {
        caps: Vec<DeviceCaps>,
    }

    impl SearchBackend for EnumOnlyBackend {
        fn enumerate(&self) -> Vec<DeviceCaps> {
            self.caps.clone()
        }

        fn dispatch(
            &mut self,
            _job: &KernelJob,
            _tt1: &mut TranspositionTable,
            _tt2: &mut AbdadaTable,
        ) -> Result<KernelOutput, ComputeError> {
            unreachable!("probe never dispatches")
        }
    }

    fn caps(device_id: usize) -> DeviceCaps {
        DeviceCaps {
            platform_id: 0,
            device_id,
            name: format!("probe-{device_id}"),
            little_endian: true,
            compute_units: 4,
            max_alloc_bytes: 256 * 1024 * 1024,
            global_mem_bytes: 1 << 30,
            local_int32_atomics: true,
            global_int64_atomics: false,
            max_workgroup_size: 128,
            work_item_dims: 3,
            available: true,
        }
    }

    #[test]
    fn bad_devices_are_skipped_not_fatal() {
        let mut unavailable = caps(1);
        unavailable.available = false;
        let mut tiny_groups = caps(2);
        tiny_groups.max_workgroup_size = 8;

        let backend = EnumOnlyBackend {
            caps: vec![caps(0), unavailable, tiny_groups, caps(3)],
        };
        let usable = probe_devices(&backend);
        let ids: Vec<usize> = usable.iter().map(|d| d.caps.device_id).collect();
        assert_eq!(ids, vec![0, 3]);
    }

    #[test]
    fn tier_follows_the_atomics_extensions() {
        let mut wide = caps(0);
        wide.global_int64_atomics = true;
        let backend = EnumOnlyBackend {
            caps: vec![caps(1), wide],
        };
        let usable = probe_devices(&backend);
        assert_eq!(usable[0].tier, AtomicsTier::LocalInt32);
        assert_eq!(usable[1].tier, AtomicsTier::WideAtomics);
    }
}
