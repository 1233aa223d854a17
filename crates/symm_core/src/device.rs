//! Seam between the harness and whatever runs the accelerated SYMM.

use std::fmt;

use crate::{
    element::Element,
    problem::{Order, ProblemDescriptor, Side, Uplo},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Non-success status reported by a device operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceStatus(pub i32);

impl DeviceStatus {
    pub const VALIDATION: Self = Self(-1);
    pub const OUT_OF_MEMORY: Self = Self(-2);
    pub const INVALID_VALUE: Self = Self(-3);
    pub const DEVICE_LOST: Self = Self(-4);
    pub const TIMEOUT: Self = Self(-5);
    pub const INTERNAL: Self = Self(-6);
    pub const UNSUPPORTED: Self = Self(-7);

    pub fn name(self) -> &'static str {
        match self {
            Self::VALIDATION => "validation error",
            Self::OUT_OF_MEMORY => "out of memory",
            Self::INVALID_VALUE => "invalid value",
            Self::DEVICE_LOST => "device lost",
            Self::TIMEOUT => "timeout",
            Self::INTERNAL => "internal error",
            Self::UNSUPPORTED => "unsupported",
            _ => "unknown status",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

/// Arguments of one accelerated SYMM call, mirroring the BLAS parameter list.
#[derive(Debug)]
pub struct SymmLaunch<'a, T, B> {
    pub order: Order,
    pub side: Side,
    pub uplo: Uplo,
    pub m: usize,
    pub n: usize,
    pub alpha: T,
    pub a: &'a B,
    pub offa: usize,
    pub lda: usize,
    pub b: &'a B,
    pub offb: usize,
    pub ldb: usize,
    pub beta: T,
    pub c: &'a B,
    pub offc: usize,
    pub ldc: usize,
    pub queue: usize,
}

impl<'a, T: Copy, B> SymmLaunch<'a, T, B> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        problem: &ProblemDescriptor,
        alpha: T,
        beta: T,
        a: &'a B,
        b: &'a B,
        c: &'a B,
        queue: usize,
    ) -> Self {
        Self {
            order: problem.order,
            side: problem.side,
            uplo: problem.uplo,
            m: problem.m,
            n: problem.n,
            alpha,
            a,
            offa: problem.offa,
            lda: problem.lda,
            b,
            offb: problem.offb,
            ldb: problem.ldb,
            beta,
            c,
            offc: problem.offc,
            ldc: problem.ldc,
            queue,
        }
    }
}

/// Device capabilities, buffer lifecycle and the accelerated entry point.
///
/// Buffers are released when dropped. Events are opaque completion tokens
/// handed back by enqueue operations.
pub trait DeviceContext {
    type Buffer;
    type Event;

    /// Total global memory the harness may assume is available, in bytes.
    fn available_global_memory(&self) -> u64;
    /// Largest single buffer the device accepts, in bytes.
    fn max_single_allocation_size(&self) -> u64;
    fn supports_double_precision(&self) -> bool;
    fn queue_count(&self) -> usize;

    /// Creates a buffer initialized from `contents`. `None` signals allocation failure.
    fn create_buffer(&self, label: &str, contents: &[u8], access: AccessMode)
        -> Option<Self::Buffer>;

    fn enqueue_write(
        &self,
        queue: usize,
        buffer: &Self::Buffer,
        contents: &[u8],
    ) -> Result<Self::Event, DeviceStatus>;

    fn wait_for_event(&self, event: &Self::Event) -> Result<(), DeviceStatus>;

    fn enqueue_symm<T: Element>(
        &self,
        launch: &SymmLaunch<'_, T, Self::Buffer>,
    ) -> Result<Self::Event, DeviceStatus>;

    /// Pushes queued commands to the device without waiting.
    fn flush(&self, queue: usize) -> Result<(), DeviceStatus>;

    /// Blocks until every command on `queue` has completed.
    fn finish(&self, queue: usize) -> Result<(), DeviceStatus>;

    /// Blocks until the command behind `event` has completed successfully.
    fn wait_for_completion(&self, queue: usize, event: &Self::Event) -> Result<(), DeviceStatus>;
}
