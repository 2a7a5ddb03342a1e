//! Device capability model consumed by the session and the prober.
//!
//! The fields mirror what an OpenCL-style backend reports per device; the
//! hard-requirement check is shared so the session and the auto-tuner reject
//! devices for identical reasons.

/// Minimum work-group size the kernels assume.
pub const MIN_WORKGROUP_SIZE: usize = 64;
/// The kernels index a 3-dimensional launch grid.
pub const MIN_WORK_ITEM_DIMS: u32 = 3;
/// Devices reporting less global memory than this are not worth probing.
pub const MIN_DEVICE_MEMORY_BYTES: u64 = 64 * 1024 * 1024;

/// Capability snapshot of one enumerated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCaps {
    pub platform_id: usize,
    pub device_id: usize,
    pub name: String,
    pub little_endian: bool,
    pub compute_units: u32,
    pub max_alloc_bytes: u64,
    pub global_mem_bytes: u64,
    pub local_int32_atomics: bool,
    pub global_int64_atomics: bool,
    pub max_workgroup_size: usize,
    pub work_item_dims: u32,
    pub available: bool,
}

impl DeviceCaps {
    /// First hard requirement this device fails, if any. `None` means the
    /// device is usable.
    pub fn hard_requirement_failure(&self) -> Option<String> {
        if !self.available {
            return Some("device reports unavailable".to_owned());
        }
        if !self.little_endian {
            return Some("big-endian memory layout".to_owned());
        }
        if self.max_workgroup_size < MIN_WORKGROUP_SIZE {
            return Some(format!(
                "work-group size {} below required {MIN_WORKGROUP_SIZE}",
                self.max_workgroup_size
            ));
        }
        if self.work_item_dims < MIN_WORK_ITEM_DIMS {
            return Some(format!(
                "only {} work dimensions, need {MIN_WORK_ITEM_DIMS}",
                self.work_item_dims
            ));
        }
        if self.global_mem_bytes < MIN_DEVICE_MEMORY_BYTES {
            return Some(format!(
                "global memory {} below floor {MIN_DEVICE_MEMORY_BYTES}",
                self.global_mem_bytes
            ));
        }
        None
    }
}

/// Atomic-extension tier selecting which kernel build a device gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicsTier {
    /// Global 32-bit atomics only.
    Baseline,
    /// Adds local-memory 32-bit atomics.
    LocalInt32,
    /// Adds local and global 64-bit atomics.
    WideAtomics,
}

impl AtomicsTier {
    pub fn select(caps: &DeviceCaps) -> Self {
        if caps.local_int32_atomics && caps.global_int64_atomics {
            AtomicsTier::WideAtomics
        } else if caps.local_int32_atomics {
            AtomicsTier::LocalInt32
        } else {
            AtomicsTier::Baseline
        }
    }

    /// Numeric tier as persisted under the `opencl_gpugen` config key.
    pub const fn gpugen(self) -> u32 {
        match self {
            AtomicsTier::Baseline => 1,
            AtomicsTier::LocalInt32 => 2,
            AtomicsTier::WideAtomics => 3,
        }
    }

    pub const fn from_gpugen(value: u32) -> Option<Self> {
        match value {
            1 => Some(AtomicsTier::Baseline),
            2 => Some(AtomicsTier::LocalInt32),
            3 => Some(AtomicsTier::WideAtomics),
            _ => None,
        }
    }
}
