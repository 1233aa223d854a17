//! Up-front check that host and device memory can hold a test case.
//!
//! The device bounds use `max(M, N)` for every matrix, so A (only `ka x ka`)
//! is overestimated whenever `ka < max(M, N)`.

use crate::{
    device::DeviceContext,
    element::Element,
    error::ResourceError,
    problem::{Matrix, ProblemDescriptor},
    workspace::{HostSlot, Workspace},
};

/// Device memory figures the gate compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub global_memory: u64,
    pub max_allocation: u64,
}

impl DeviceLimits {
    pub fn query<D: DeviceContext>(ctx: &D) -> Self {
        Self {
            global_memory: ctx.available_global_memory(),
            max_allocation: ctx.max_single_allocation_size(),
        }
    }
}

/// Returns the first reason the case cannot run, checking host buffers first.
pub fn check(
    problem: &ProblemDescriptor,
    element_size: usize,
    missing_host: Option<HostSlot>,
    limits: DeviceLimits,
) -> Result<(), ResourceError> {
    if let Some(slot) = missing_host {
        return Err(ResourceError::HostAllocation(slot));
    }

    let span = problem.m.max(problem.n) as u128;
    for matrix in [Matrix::A, Matrix::B, Matrix::C] {
        let required = span
            .saturating_mul(problem.leading_dimension(matrix) as u128)
            .saturating_mul(element_size as u128);
        if required >= u128::from(limits.max_allocation) {
            return Err(ResourceError::SingleAllocation {
                matrix,
                required,
                limit: limits.max_allocation,
            });
        }
    }

    // Element counts, not bytes, are summed here.
    let footprint =
        span.saturating_mul(problem.lda as u128 + problem.ldb as u128 + problem.ldc as u128);
    if footprint >= u128::from(limits.global_memory) {
        return Err(ResourceError::GlobalMemory {
            required: footprint,
            available: limits.global_memory,
        });
    }

    Ok(())
}

impl<T: Element, B> Workspace<T, B> {
    pub fn check_feasibility(&self, limits: DeviceLimits) -> Result<(), ResourceError> {
        check(
            self.problem(),
            T::KIND.size_of(),
            self.missing_host_buffer(),
            limits,
        )
    }
}
