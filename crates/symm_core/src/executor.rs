//! Dual-path execution: reference SYMM on the host, accelerated SYMM on the device.

use std::time::Instant;

use tracing::{debug, error, warn};

use crate::{
    device::{DeviceContext, DeviceStatus, SymmLaunch},
    element::Element,
    error::{HarnessError, ResourceError, Stage},
    feasibility::DeviceLimits,
    outcome::{evaluate, Verdict},
    populate::Populator,
    problem::{Matrix, Order, ProblemDescriptor},
    reference::{HostSymm, ReferenceBackend},
    timing::{NanoTime, PathTiming},
    workspace::{HostSlot, Workspace},
};

const QUEUE: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    pub iterations: u32,
    pub row_major_reference: bool,
    /// Replaces the device-reported global memory in the feasibility gate.
    pub global_memory_bytes: Option<u64>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            iterations: 1,
            row_major_reference: false,
            global_memory_bytes: None,
        }
    }
}

/// One SYMM performance case for element type `T` on device `D`.
pub struct SymmPerfCase<'a, T: Element, D: DeviceContext> {
    ctx: &'a D,
    reference: Option<&'a dyn ReferenceBackend<T>>,
    settings: ExecutorSettings,
    workspace: Workspace<T, D::Buffer>,
}

impl<'a, T: Element, D: DeviceContext> SymmPerfCase<'a, T, D> {
    pub fn new(
        ctx: &'a D,
        reference: Option<&'a dyn ReferenceBackend<T>>,
        problem: ProblemDescriptor,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            ctx,
            reference,
            settings,
            workspace: Workspace::new(problem),
        }
    }

    pub fn workspace(&self) -> &Workspace<T, D::Buffer> {
        &self.workspace
    }

    pub fn check_feasibility(&self) -> Result<(), ResourceError> {
        let mut limits = DeviceLimits::query(self.ctx);
        if let Some(bytes) = self.settings.global_memory_bytes {
            limits.global_memory = bytes;
        }
        self.workspace.check_feasibility(limits)
    }

    pub fn prepare(&mut self, populator: &mut Populator) -> Result<(), HarnessError> {
        self.workspace.prepare(self.ctx, populator)
    }

    /// Prepares the workspace, times both paths and evaluates them.
    pub fn run(&mut self, populator: &mut Populator) -> Verdict {
        if let Err(err) = self.prepare(populator) {
            warn!(routine = T::KIND.routine(), "prepare failed: {err}");
            return Verdict::from_error(err);
        }
        let reference = self.reference_timing();
        let accelerated = self.accelerated_timing();
        debug!(
            routine = T::KIND.routine(),
            reference = %reference.nanos(),
            accelerated = %accelerated.nanos(),
            "timed both paths"
        );
        evaluate(&reference, &accelerated)
    }

    /// Times one host SYMM call on the live C buffer.
    pub fn reference_timing(&mut self) -> PathTiming {
        let Some(reference) = self.reference else {
            debug!("reference backend not configured, running accelerated path only");
            return PathTiming::Unavailable("reference backend not configured");
        };

        let problem = self.workspace.problem();
        if problem.order == Order::RowMajor && !self.settings.row_major_reference {
            warn!(
                routine = T::KIND.routine(),
                "row major order is not allowed for the reference path"
            );
            return PathTiming::Unavailable("row-major reference disabled");
        }
        let call_problem = if reference.column_major_only() {
            problem.to_column_major()
        } else {
            problem.clone()
        };

        let alpha = self.workspace.alpha();
        let beta = self.workspace.beta();
        let (a, b, c) = match self.workspace.reference_operands() {
            Ok(operands) => operands,
            Err(err) => return PathTiming::Failed(err.into()),
        };

        let start = Instant::now();
        reference.symm(HostSymm {
            problem: &call_problem,
            alpha,
            beta,
            a,
            b,
            c,
        });
        PathTiming::Measured(NanoTime::since(start))
    }

    /// Re-stages C from the backup, then times the device SYMM until completion.
    pub fn accelerated_timing(&self) -> PathTiming {
        let device = |matrix| {
            self.workspace
                .device(matrix)
                .ok_or(ResourceError::DeviceBuffer(matrix))
        };
        let (a, b, c) = match (device(Matrix::A), device(Matrix::B), device(Matrix::C)) {
            (Ok(a), Ok(b), Ok(c)) => (a, b, c),
            (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => {
                return PathTiming::Failed(err.into())
            }
        };
        let Some(backup) = self.workspace.host(HostSlot::BackupC) else {
            return PathTiming::Failed(ResourceError::HostAllocation(HostSlot::BackupC).into());
        };

        let staged = match self.ctx.enqueue_write(QUEUE, c, backup.as_bytes()) {
            Ok(event) => event,
            Err(status) => return self.device_failure(Stage::StageWrite, status),
        };
        if let Err(status) = self.ctx.wait_for_event(&staged) {
            return self.device_failure(Stage::StageWait, status);
        }

        let launch = SymmLaunch::new(
            self.workspace.problem(),
            self.workspace.alpha(),
            self.workspace.beta(),
            a,
            b,
            c,
            QUEUE,
        );
        if self.settings.iterations > 1 {
            return self.amortized_timing(&launch);
        }

        let event = match self.ctx.enqueue_symm(&launch) {
            Ok(event) => event,
            Err(status) => return self.device_failure(Stage::Launch, status),
        };
        let start = Instant::now();
        if let Err(status) = self.ctx.flush(QUEUE) {
            return self.device_failure(Stage::Flush, status);
        }
        match self.ctx.wait_for_completion(QUEUE, &event) {
            Ok(()) => PathTiming::Measured(NanoTime::since(start)),
            Err(status) => self.device_failure(Stage::Completion, status),
        }
    }

    /// Profiling mode: `iterations` back-to-back launches inside one bracket.
    fn amortized_timing(&self, launch: &SymmLaunch<'_, T, D::Buffer>) -> PathTiming {
        let iterations = self.settings.iterations;
        if let Err(status) = self.ctx.finish(launch.queue) {
            return self.device_failure(Stage::Flush, status);
        }
        let start = Instant::now();
        for _ in 0..iterations {
            if let Err(status) = self.ctx.enqueue_symm(launch) {
                return self.device_failure(Stage::Launch, status);
            }
        }
        if let Err(status) = self.ctx.finish(launch.queue) {
            return self.device_failure(Stage::Completion, status);
        }
        let elapsed = NanoTime::since(start);
        PathTiming::Measured(NanoTime(elapsed.as_nanos() / i64::from(iterations)))
    }

    fn device_failure(&self, stage: Stage, status: DeviceStatus) -> PathTiming {
        let err = match stage {
            Stage::Launch => HarnessError::Compute { status },
            _ => HarnessError::Transfer { stage, status },
        };
        error!(routine = T::KIND.routine(), %stage, %status, "{err}");
        PathTiming::Failed(err)
    }
}
