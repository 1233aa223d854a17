//! Error taxonomy separating skips, infrastructure failures and regressions.

use std::fmt;

use thiserror::Error;

use crate::{
    device::DeviceStatus,
    problem::{DescriptorError, Matrix},
    timing::NanoTime,
    workspace::HostSlot,
};

/// Device-side stage of the accelerated path, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    StageWrite,
    StageWait,
    Launch,
    Flush,
    Completion,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::StageWrite => "matrix C staging write",
            Stage::StageWait => "wait on staging event",
            Stage::Launch => "SYMM launch",
            Stage::Flush => "queue flush",
            Stage::Completion => "wait for completion",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("host allocation failed for {0}")]
    HostAllocation(HostSlot),
    #[error("{matrix} needs up to {required} bytes, single-allocation limit is {limit}")]
    SingleAllocation {
        matrix: Matrix,
        required: u128,
        limit: u64,
    },
    #[error("worst-case footprint {required} exceeds available global memory {available}")]
    GlobalMemory { required: u128, available: u64 },
    #[error("device buffer for {0} could not be created")]
    DeviceBuffer(Matrix),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum HarnessError {
    #[error("insufficient resources: {0}")]
    Resource(#[from] ResourceError),
    #[error("device does not support {feature}")]
    Capability { feature: &'static str },
    #[error("{stage} failed, status = {status}")]
    Transfer { stage: Stage, status: DeviceStatus },
    #[error("accelerated SYMM call failed, status = {status}")]
    Compute { status: DeviceStatus },
    #[error("accelerated path is slower: {accelerated} vs reference {reference}")]
    Regression {
        reference: NanoTime,
        accelerated: NanoTime,
    },
    #[error("invalid problem: {0}")]
    Descriptor(#[from] DescriptorError),
}

impl HarnessError {
    /// Skips never count against pass/fail statistics.
    pub fn is_skip(&self) -> bool {
        matches!(self, HarnessError::Resource(_) | HarnessError::Capability { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::Transfer { .. } | HarnessError::Compute { .. } | HarnessError::Descriptor(_)
        )
    }
}
