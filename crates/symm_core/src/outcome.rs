//! Turns a pair of path timings into a verdict and tallies verdicts.

use std::fmt;

use tracing::{error, info, warn};

use crate::{
    element::ElementKind,
    error::HarnessError,
    metrics::gflops,
    problem::ProblemDescriptor,
    timing::{NanoTime, PathTiming},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// `reference` is `None` when the reference path was not run.
    Pass {
        reference: Option<NanoTime>,
        accelerated: NanoTime,
    },
    /// Non-fatal expectation failure: the accelerated path was slower.
    Regression {
        reference: NanoTime,
        accelerated: NanoTime,
    },
    Fatal(HarnessError),
    Skip(HarnessError),
}

impl Verdict {
    /// Skip for resource and capability errors, fatal for everything else.
    pub fn from_error(err: HarnessError) -> Self {
        if err.is_skip() {
            Verdict::Skip(err)
        } else {
            Verdict::Fatal(err)
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Regression { .. } | Verdict::Fatal(_))
    }

    pub fn error(&self) -> Option<HarnessError> {
        match self {
            Verdict::Pass { .. } => None,
            Verdict::Regression {
                reference,
                accelerated,
            } => Some(HarnessError::Regression {
                reference: *reference,
                accelerated: *accelerated,
            }),
            Verdict::Fatal(err) | Verdict::Skip(err) => Some(err.clone()),
        }
    }
}

pub fn evaluate(reference: &PathTiming, accelerated: &PathTiming) -> Verdict {
    let accelerated = match accelerated {
        PathTiming::Measured(time) => *time,
        PathTiming::Failed(err) => return Verdict::from_error(err.clone()),
        PathTiming::Unavailable(reason) => {
            return Verdict::Skip(HarnessError::Capability { feature: *reason })
        }
    };
    match reference {
        PathTiming::Measured(reference) if accelerated > *reference => Verdict::Regression {
            reference: *reference,
            accelerated,
        },
        PathTiming::Measured(reference) => Verdict::Pass {
            reference: Some(*reference),
            accelerated,
        },
        PathTiming::Unavailable(_) => Verdict::Pass {
            reference: None,
            accelerated,
        },
        PathTiming::Failed(err) => Verdict::from_error(err.clone()),
    }
}

/// Running tally of verdicts. Skips are kept apart and never count as failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub passed: usize,
    pub regressed: usize,
    pub fatal: usize,
    pub skipped: usize,
}

impl Report {
    pub fn record(&mut self, kind: ElementKind, problem: &ProblemDescriptor, verdict: &Verdict) {
        let routine = kind.routine();
        let case = problem.label();
        match verdict {
            Verdict::Pass {
                reference,
                accelerated,
            } => {
                self.passed += 1;
                let size = problem.problem_size();
                let accel_gflops = gflops(size, kind.op_factor(), *accelerated);
                let ref_gflops = reference.and_then(|time| gflops(size, kind.op_factor(), time));
                info!(
                    routine,
                    %case,
                    reference = %reference.unwrap_or(NanoTime::INVALID),
                    accelerated = %accelerated,
                    ?ref_gflops,
                    ?accel_gflops,
                    "passed"
                );
            }
            Verdict::Regression {
                reference,
                accelerated,
            } => {
                self.regressed += 1;
                warn!(
                    routine,
                    %case,
                    %reference,
                    %accelerated,
                    "the accelerated version is slower in this case"
                );
            }
            Verdict::Fatal(err) => {
                self.fatal += 1;
                error!(
                    routine,
                    %case,
                    "fatal error: can not allocate resources or perform a device request: {err}"
                );
            }
            Verdict::Skip(err) => {
                self.skipped += 1;
                warn!(routine, %case, "test skipped: {err}");
            }
        }
    }

    pub fn executed(&self) -> usize {
        self.passed + self.regressed + self.fatal
    }

    pub fn has_failures(&self) -> bool {
        self.regressed + self.fatal > 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} executed: {} passed, {} slower, {} fatal; {} skipped",
            self.executed(),
            self.passed,
            self.regressed,
            self.fatal,
            self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::DeviceStatus,
        error::{ResourceError, Stage},
        problem::{Order, Side, Uplo},
    };

    fn measured(nanos: i64) -> PathTiming {
        PathTiming::Measured(NanoTime(nanos))
    }

    #[test]
    fn slower_accelerated_path_is_a_regression() {
        assert_eq!(
            evaluate(&measured(100), &measured(150)),
            Verdict::Regression {
                reference: NanoTime(100),
                accelerated: NanoTime(150),
            }
        );
    }

    #[test]
    fn faster_or_equal_accelerated_path_passes() {
        assert_eq!(
            evaluate(&measured(100), &measured(80)),
            Verdict::Pass {
                reference: Some(NanoTime(100)),
                accelerated: NanoTime(80),
            }
        );
        assert!(matches!(
            evaluate(&measured(100), &measured(100)),
            Verdict::Pass { .. }
        ));
    }

    #[test]
    fn disabled_reference_passes() {
        let reference = PathTiming::Unavailable("reference backend not configured");
        assert_eq!(reference.nanos(), NanoTime::INVALID);
        assert_eq!(
            evaluate(&reference, &measured(80)),
            Verdict::Pass {
                reference: None,
                accelerated: NanoTime(80),
            }
        );
    }

    #[test]
    fn compute_failure_is_fatal() {
        let err = HarnessError::Compute {
            status: DeviceStatus::INTERNAL,
        };
        let verdict = evaluate(&measured(100), &PathTiming::Failed(err.clone()));
        assert_eq!(verdict, Verdict::Fatal(err));
        assert!(verdict.is_failure());
    }

    #[test]
    fn resource_failure_is_a_skip() {
        let err = HarnessError::Resource(ResourceError::DeviceBuffer(crate::problem::Matrix::C));
        let verdict = evaluate(&measured(100), &PathTiming::Failed(err.clone()));
        assert_eq!(verdict, Verdict::Skip(err));
        assert!(!verdict.is_failure());
    }

    #[test]
    fn report_keeps_skips_out_of_failures() {
        let problem = ProblemDescriptor::tight(Order::ColumnMajor, Side::Left, Uplo::Upper, 4, 4);
        let mut report = Report::default();
        report.record(
            ElementKind::Double,
            &problem,
            &Verdict::Skip(HarnessError::Capability {
                feature: "double precision",
            }),
        );
        assert!(!report.has_failures());
        report.record(
            ElementKind::Single,
            &problem,
            &Verdict::Fatal(HarnessError::Transfer {
                stage: Stage::StageWrite,
                status: DeviceStatus::OUT_OF_MEMORY,
            }),
        );
        report.record(
            ElementKind::Single,
            &problem,
            &Verdict::Pass {
                reference: None,
                accelerated: NanoTime(5),
            },
        );
        assert!(report.has_failures());
        assert_eq!(report.executed(), 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            report.to_string(),
            "2 executed: 1 passed, 0 slower, 1 fatal; 1 skipped"
        );
    }
}
