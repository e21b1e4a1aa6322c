use std::alloc::{alloc_zeroed, Layout};

use crate::error::{allocation_error, Result};

/// Fallible zero-initialised `f64` buffer.
///
/// Uses the global allocator's zeroed path, so on Linux/Mac a large matrix
/// is backed by lazily committed zero pages instead of an eager memset. The
/// returned `Vec` owns the allocation and frees it through the same allocator.
///
/// # Errors
///
/// Returns [`AllocationError`](crate::error::MatBenchError::AllocationError)
/// if `len` is zero, if `len * 8` overflows the address space, or if the
/// allocator refuses the request. Never aborts through `handle_alloc_error`.
pub fn try_alloc_zeroed_f64(len: usize) -> Result<Vec<f64>> {
    let requested_bytes = len.saturating_mul(std::mem::size_of::<f64>());
    if len == 0 {
        return Err(allocation_error(0, "cannot allocate an empty matrix"));
    }

    let layout = Layout::array::<f64>(len)
        .map_err(|_| allocation_error(requested_bytes, "size exceeds addressable memory"))?;

    let ptr = unsafe { alloc_zeroed(layout) as *mut f64 };
    if ptr.is_null() {
        return Err(allocation_error(requested_bytes, "allocator returned null"));
    }

    // SAFETY:
    // - ptr is non-null and was allocated by the global allocator with
    //   Layout::array::<f64>(len), which is the layout Vec<f64> uses
    // - all bytes are zero and 0x0 is a valid f64 (+0.0)
    Ok(unsafe { Vec::from_raw_parts(ptr, len, len) })
}

/// Fallible `Vec::with_capacity`.
pub fn try_vec_with_capacity<T>(capacity: usize) -> Result<Vec<T>> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(capacity).map_err(|e| {
        allocation_error(capacity.saturating_mul(std::mem::size_of::<T>()), e.to_string())
    })?;
    Ok(vec)
}

/// Resident set size of the current process in megabytes (10^6 bytes).
///
/// Reads `VmRSS` from `/proc/self/status`. Returns `None` on platforms
/// without procfs or when the field cannot be parsed.
pub fn resident_memory_mb() -> Option<f64> {
    proc_status_mb("VmRSS:")
}

/// High-water mark of the resident set (`VmHWM`), in megabytes.
///
/// Unlike [`resident_memory_mb`] this includes pages already freed, so it
/// captures the largest footprint the process has reached so far.
pub fn peak_resident_memory_mb() -> Option<f64> {
    proc_status_mb("VmHWM:")
}

#[cfg(target_os = "linux")]
fn proc_status_mb(key: &str) -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_status_kb(&status, key).map(|kb| kb as f64 * 1024.0 / 1e6)
}

#[cfg(not(target_os = "linux"))]
fn proc_status_mb(_key: &str) -> Option<f64> {
    None
}

/// Value of a `Key:   1234 kB` line in `/proc/<pid>/status`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_status_kb(status: &str, key: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix(key))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}

/// Bytes to megabytes (10^6), the unit used in reports.
pub fn bytes_to_mb(bytes: usize) -> f64 {
    bytes as f64 / 1e6
}
