//! Full lifecycle of one case: capability check, gate, prepare, both paths, verdict.

use tracing::{debug, warn};

use crate::{
    config::HarnessSettings,
    device::DeviceContext,
    element::Element,
    error::HarnessError,
    executor::SymmPerfCase,
    outcome::Verdict,
    populate::Populator,
    problem::ProblemDescriptor,
    reference::ReferenceBackend,
};

pub fn run_instance<T, D>(
    ctx: &D,
    reference: Option<&dyn ReferenceBackend<T>>,
    problem: &ProblemDescriptor,
    settings: &HarnessSettings,
) -> Verdict
where
    T: Element,
    D: DeviceContext,
{
    let routine = T::KIND.routine();
    if T::KIND.is_double() && !ctx.supports_double_precision() {
        warn!(
            routine,
            "the target device doesn't support native double precision floating point arithmetic"
        );
        return Verdict::Skip(HarnessError::Capability {
            feature: "double precision",
        });
    }
    if let Err(err) = problem.validate() {
        return Verdict::Fatal(err.into());
    }

    let reference = reference.filter(|_| settings.reference_enabled);
    let mut case = SymmPerfCase::<T, D>::new(ctx, reference, problem.clone(), settings.executor());
    if let Err(err) = case.check_feasibility() {
        warn!(routine, "resource check: skip due to insufficient resources: {err}");
        return Verdict::Skip(err.into());
    }

    debug!(routine, case = %problem.label(), "running");
    let mut populator = Populator::new(settings.seed);
    case.run(&mut populator)
}
