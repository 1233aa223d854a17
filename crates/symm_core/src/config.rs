//! Harness-wide settings, loadable from JSON and overridable from the command line.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{element::ElementKind, executor::ExecutorSettings, populate::Populator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    /// Seed for operand population; every case restarts from it.
    pub seed: u64,
    /// 1 keeps the single-timing contract. Larger values amortize launch overhead
    /// over repeated calls and are meant for manual profiling.
    pub iterations: u32,
    /// Allow the reference path to run row-major problems (via transposition).
    pub row_major_reference: bool,
    pub reference_enabled: bool,
    /// Overrides the device's global memory figure for the feasibility gate.
    pub global_memory_bytes: Option<u64>,
    pub kinds: Vec<ElementKind>,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            seed: Populator::DEFAULT_SEED,
            iterations: 1,
            row_major_reference: false,
            reference_enabled: true,
            global_memory_bytes: None,
            kinds: ElementKind::ALL.to_vec(),
        }
    }
}

impl HarnessSettings {
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings JSON in {}", path.display()))
    }

    pub fn executor(&self) -> ExecutorSettings {
        ExecutorSettings {
            iterations: self.iterations.max(1),
            row_major_reference: self.row_major_reference,
            global_memory_bytes: self.global_memory_bytes,
        }
    }
}
