use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::problem::{Multiplier, Order, ProblemDescriptor, Side, Uplo};

/// A labeled group of SYMM problems run back to back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSet {
    pub label: String,
    pub cases: Vec<ProblemDescriptor>,
}

/// Writes labeled case sets to JSON so runs can be replayed on other devices.
pub fn export_cases_to_json<P: AsRef<Path>>(sets: &[CaseSet], path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(sets).context("failed to serialize case sets")?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write cases JSON to {}", path.as_ref().display()))?;
    Ok(())
}

/// Loads case sets from JSON, rejecting any descriptor with an illegal leading dimension.
pub fn import_cases_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<CaseSet>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read cases JSON {}", path.display()))?;
    let sets: Vec<CaseSet> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse cases JSON {}", path.display()))?;
    for set in &sets {
        for (idx, case) in set.cases.iter().enumerate() {
            case.validate()
                .with_context(|| format!("case {idx} of set '{}' is invalid", set.label))?;
        }
    }
    Ok(sets)
}

/// Built-in sweep: every order, side and triangle for a few shapes.
pub fn default_cases() -> Vec<CaseSet> {
    const SHAPES: [(usize, usize); 3] = [(64, 64), (96, 48), (33, 130)];

    let mut tight = Vec::new();
    let mut padded = Vec::new();
    for order in [Order::ColumnMajor, Order::RowMajor] {
        for side in [Side::Left, Side::Right] {
            for uplo in [Uplo::Upper, Uplo::Lower] {
                for (m, n) in SHAPES {
                    let case = ProblemDescriptor::tight(order, side, uplo, m, n);
                    tight.push(case.clone());
                    padded.push(ProblemDescriptor {
                        lda: case.lda + 3,
                        ldb: case.ldb + 16,
                        ldc: case.ldc + 5,
                        offa: 7,
                        offb: 1,
                        offc: 12,
                        alpha: Multiplier { re: 1.5, im: -0.5 },
                        beta: Multiplier { re: 0.25, im: 0.0 },
                        ..case
                    });
                }
            }
        }
    }

    vec![
        CaseSet {
            label: "tight".into(),
            cases: tight,
        },
        CaseSet {
            label: "padded_offsets".into(),
            cases: padded,
        },
    ]
}
