//! Throughput figures derived from a measured duration.

use crate::timing::NanoTime;

/// Floating-point operations per nanosecond, which is GFLOP/s.
///
/// `None` for the invalid sentinel and for a zero duration.
pub fn gflops(problem_size: u64, op_factor: u64, time: NanoTime) -> Option<f64> {
    if !time.is_valid() || time.as_nanos() == 0 {
        return None;
    }
    Some(problem_size as f64 * op_factor as f64 / time.as_nanos() as f64)
}
