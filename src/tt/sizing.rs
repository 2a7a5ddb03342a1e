//! Memory-budget sizing shared by both hash tables.
//!
//! Capacities are powers of two so probing is a mask, and a zero budget
//! degrades to a single entry so the tables are always addressable even when
//! a device reports no usable memory.

/// Largest power-of-two entry count whose total size fits `budget_bytes`.
///
/// Guarantees `capacity.is_power_of_two()` and
/// `capacity * entry_bytes <= max(budget_bytes, entry_bytes)`.
pub fn table_capacity(budget_bytes: u64, entry_bytes: usize) -> usize {
    assert!(entry_bytes > 0, "entry size must be non-zero");
    let fitting = budget_bytes / entry_bytes as u64;
    if fitting <= 1 {
        return 1;
    }
    let capped = fitting.min(usize::MAX as u64 / entry_bytes as u64);
    (1u64 << (63 - capped.leading_zeros())) as usize
}

/// Do two table allocations together fit a device's largest single
/// allocation? Checked before a configuration is accepted.
pub fn fits_max_allocation(tt1_bytes: u64, tt2_bytes: u64, max_alloc_bytes: u64) -> bool {
    tt1_bytes.saturating_add(tt2_bytes) <= max_alloc_bytes
}
