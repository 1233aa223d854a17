//! Backend-agnostic SYMM performance harness.
//!
//! Builds deterministic problems, gates them on device resources, times a host
//! reference SYMM against an accelerated one and classifies the outcome. The
//! accelerated path is reached only through [`DeviceContext`].

pub mod case_io;
pub mod config;
pub mod device;
pub mod element;
pub mod error;
pub mod executor;
pub mod feasibility;
pub mod metrics;
pub mod outcome;
pub mod populate;
pub mod problem;
pub mod reference;
pub mod runner;
pub mod timing;
pub mod workspace;

pub use config::HarnessSettings;
pub use device::{AccessMode, DeviceContext, DeviceStatus, SymmLaunch};
pub use element::{Complex32, Complex64, Element, ElementKind};
pub use error::{HarnessError, ResourceError, Stage};
pub use outcome::{Report, Verdict};
pub use problem::{Multiplier, Order, ProblemDescriptor, Side, Uplo};
pub use reference::{CpuReference, ReferenceBackend};
pub use runner::run_instance;
pub use timing::{NanoTime, PathTiming};
