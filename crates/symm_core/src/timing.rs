//! Wall-clock measurements and the invalid-timing sentinel.

use std::{fmt, time::Instant};

use crate::error::HarnessError;

/// Signed duration in nanoseconds. [`NanoTime::INVALID`] marks a failed measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NanoTime(pub i64);

impl NanoTime {
    pub const INVALID: NanoTime = NanoTime(-1);

    pub fn since(start: Instant) -> Self {
        let nanos = start.elapsed().as_nanos();
        NanoTime(i64::try_from(nanos).unwrap_or(i64::MAX))
    }

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    pub fn as_nanos(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NanoTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{} ns", self.0)
        } else {
            f.write_str("invalid")
        }
    }
}

/// Result of timing one execution path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathTiming {
    Measured(NanoTime),
    /// Path deliberately not run (no backend, unsupported layout).
    Unavailable(&'static str),
    Failed(HarnessError),
}

impl PathTiming {
    /// Raw nanoseconds, or the sentinel when nothing valid was measured.
    pub fn nanos(&self) -> NanoTime {
        match self {
            PathTiming::Measured(time) => *time,
            PathTiming::Unavailable(_) | PathTiming::Failed(_) => NanoTime::INVALID,
        }
    }
}
