//! Immutable description of one SYMM test case.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    ColumnMajor,
    RowMajor,
}

impl Order {
    /// Linear position of `(row, col)` for a matrix stored with leading dimension `ld`.
    pub fn index(self, row: usize, col: usize, ld: usize) -> usize {
        match self {
            Order::ColumnMajor => col * ld + row,
            Order::RowMajor => row * ld + col,
        }
    }
}

/// Whether the symmetric operand multiplies from the left (`A*B`) or right (`B*A`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn flipped(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Triangular half of the symmetric operand that is stored and read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Uplo {
    Upper,
    Lower,
}

impl Uplo {
    pub fn flipped(self) -> Self {
        match self {
            Uplo::Upper => Uplo::Lower,
            Uplo::Lower => Uplo::Upper,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Matrix {
    A,
    B,
    C,
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Matrix::A => "A",
            Matrix::B => "B",
            Matrix::C => "C",
        };
        f.write_str(name)
    }
}

/// Scalar multiplier as supplied by the parameter source; converted per element type.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Multiplier {
    pub re: f64,
    #[serde(default)]
    pub im: f64,
}

impl Multiplier {
    pub const fn real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("leading dimension of {matrix} is {ld}, must be at least {required}")]
    LeadingDimension {
        matrix: Matrix,
        ld: usize,
        required: usize,
    },
}

/// Parameter bundle for `C = alpha*A*B + beta*C` (or `B*A` for the right side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDescriptor {
    pub order: Order,
    pub side: Side,
    pub uplo: Uplo,
    pub m: usize,
    pub n: usize,
    pub lda: usize,
    pub ldb: usize,
    pub ldc: usize,
    #[serde(default)]
    pub offa: usize,
    #[serde(default)]
    pub offb: usize,
    #[serde(default)]
    pub offc: usize,
    pub alpha: Multiplier,
    pub beta: Multiplier,
}

impl ProblemDescriptor {
    /// Builds a descriptor with the smallest legal leading dimensions and no offsets.
    pub fn tight(order: Order, side: Side, uplo: Uplo, m: usize, n: usize) -> Self {
        let ka = match side {
            Side::Left => m,
            Side::Right => n,
        };
        let minor = match order {
            Order::ColumnMajor => m,
            Order::RowMajor => n,
        };
        Self {
            order,
            side,
            uplo,
            m,
            n,
            lda: ka.max(1),
            ldb: minor.max(1),
            ldc: minor.max(1),
            offa: 0,
            offb: 0,
            offc: 0,
            alpha: Multiplier::real(1.0),
            beta: Multiplier::real(1.0),
        }
    }

    /// Order of the square symmetric operand.
    pub fn ka(&self) -> usize {
        match self.side {
            Side::Left => self.m,
            Side::Right => self.n,
        }
    }

    /// Number of leading-dimension strides spanned by B and C.
    pub fn kbc(&self) -> usize {
        match self.order {
            Order::ColumnMajor => self.n,
            Order::RowMajor => self.m,
        }
    }

    /// Element count of a host buffer, offset included. `None` when it overflows.
    pub fn extent(&self, matrix: Matrix) -> Option<usize> {
        let (ld, span, offset) = match matrix {
            Matrix::A => (self.lda, self.ka(), self.offa),
            Matrix::B => (self.ldb, self.kbc(), self.offb),
            Matrix::C => (self.ldc, self.kbc(), self.offc),
        };
        ld.checked_mul(span)?.checked_add(offset)
    }

    pub fn leading_dimension(&self, matrix: Matrix) -> usize {
        match matrix {
            Matrix::A => self.lda,
            Matrix::B => self.ldb,
            Matrix::C => self.ldc,
        }
    }

    pub fn offset(&self, matrix: Matrix) -> usize {
        match matrix {
            Matrix::A => self.offa,
            Matrix::B => self.offb,
            Matrix::C => self.offc,
        }
    }

    /// Multiply-accumulate count, `M * N * ka`.
    pub fn problem_size(&self) -> u64 {
        self.m as u64 * self.n as u64 * self.ka() as u64
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        let minor = match self.order {
            Order::ColumnMajor => self.m,
            Order::RowMajor => self.n,
        };
        let requirements = [
            (Matrix::A, self.lda, self.ka()),
            (Matrix::B, self.ldb, minor),
            (Matrix::C, self.ldc, minor),
        ];
        for (matrix, ld, required) in requirements {
            if ld < required.max(1) {
                return Err(DescriptorError::LeadingDimension {
                    matrix,
                    ld,
                    required: required.max(1),
                });
            }
        }
        Ok(())
    }

    /// Equivalent column-major formulation of the same memory.
    ///
    /// A row-major `M x N` matrix is a column-major `N x M` matrix with the same
    /// leading dimension, so dimensions swap while side and triangle flip.
    /// Leading dimensions and offsets are untouched.
    pub fn to_column_major(&self) -> Self {
        match self.order {
            Order::ColumnMajor => self.clone(),
            Order::RowMajor => Self {
                order: Order::ColumnMajor,
                side: self.side.flipped(),
                uplo: self.uplo.flipped(),
                m: self.n,
                n: self.m,
                ..self.clone()
            },
        }
    }

    pub fn label(&self) -> String {
        let order = match self.order {
            Order::ColumnMajor => "col",
            Order::RowMajor => "row",
        };
        let side = match self.side {
            Side::Left => "left",
            Side::Right => "right",
        };
        let uplo = match self.uplo {
            Uplo::Upper => "upper",
            Uplo::Lower => "lower",
        };
        format!(
            "{order}/{side}/{uplo} M={} N={} ld=({},{},{}) off=({},{},{})",
            self.m, self.n, self.lda, self.ldb, self.ldc, self.offa, self.offb, self.offc
        )
    }
}
