//! Host-side reference SYMM used as the timing baseline.

use crate::{
    element::Element,
    problem::{ProblemDescriptor, Side, Uplo},
};

/// Operands of one host SYMM call. Offsets and leading dimensions come from `problem`.
pub struct HostSymm<'a, T> {
    pub problem: &'a ProblemDescriptor,
    pub alpha: T,
    pub beta: T,
    pub a: &'a [T],
    pub b: &'a [T],
    pub c: &'a mut [T],
}

/// Synchronous host implementation; errors are not observable.
pub trait ReferenceBackend<T: Element> {
    /// Whether callers must rewrite row-major problems into column-major form first.
    fn column_major_only(&self) -> bool;

    fn symm(&self, call: HostSymm<'_, T>);
}

/// Plain triple-loop SYMM following the column-major BLAS calling convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuReference;

impl<T: Element> ReferenceBackend<T> for CpuReference {
    fn column_major_only(&self) -> bool {
        true
    }

    fn symm(&self, call: HostSymm<'_, T>) {
        let HostSymm {
            problem,
            alpha,
            beta,
            a,
            b,
            c,
        } = call;
        let order = problem.order;
        let symmetric = |row: usize, col: usize| -> T {
            let stored_upper = row <= col;
            let (r, k) = match (problem.uplo, stored_upper) {
                (Uplo::Upper, true) | (Uplo::Lower, false) => (row, col),
                (Uplo::Upper, false) | (Uplo::Lower, true) => (col, row),
            };
            a[problem.offa + order.index(r, k, problem.lda)]
        };
        let rect = |row: usize, col: usize| b[problem.offb + order.index(row, col, problem.ldb)];

        for col in 0..problem.n {
            for row in 0..problem.m {
                let mut acc = T::zero();
                match problem.side {
                    Side::Left => {
                        for p in 0..problem.m {
                            acc = acc + symmetric(row, p) * rect(p, col);
                        }
                    }
                    Side::Right => {
                        for p in 0..problem.n {
                            acc = acc + rect(row, p) * symmetric(p, col);
                        }
                    }
                }
                let idx = problem.offc + order.index(row, col, problem.ldc);
                // beta == 0 must not read C, which may hold garbage.
                c[idx] = if beta.is_zero() {
                    alpha * acc
                } else {
                    alpha * acc + beta * c[idx]
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Multiplier, Order};

    fn col_major(values: &[&[f64]]) -> Vec<f64> {
        let rows = values.len();
        let cols = values[0].len();
        let mut out = vec![0.0; rows * cols];
        for (r, row) in values.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                out[c * rows + r] = *v;
            }
        }
        out
    }

    #[test]
    fn left_upper_matches_dense_product() {
        let mut problem = ProblemDescriptor::tight(Order::ColumnMajor, Side::Left, Uplo::Upper, 2, 2);
        problem.alpha = Multiplier::real(1.0);
        problem.beta = Multiplier::real(0.0);
        // Symmetric [[1, 2], [2, 3]] with the strict lower half left as garbage.
        let a = col_major(&[&[1.0, 2.0], &[99.0, 3.0]]);
        let b = col_major(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let mut c = vec![f64::NAN; 4];
        CpuReference.symm(HostSymm {
            problem: &problem,
            alpha: 1.0,
            beta: 0.0,
            a: &a,
            b: &b,
            c: &mut c,
        });
        assert_eq!(c, col_major(&[&[1.0, 2.0], &[2.0, 3.0]]));
    }

    #[test]
    fn right_lower_accumulates_with_beta() {
        let problem = ProblemDescriptor::tight(Order::ColumnMajor, Side::Right, Uplo::Lower, 1, 2);
        // A = [[2, 5], [5, 4]] stored lower.
        let a = col_major(&[&[2.0, -1.0], &[5.0, 4.0]]);
        let b = col_major(&[&[1.0, 1.0]]);
        let mut c = col_major(&[&[10.0, 20.0]]);
        CpuReference.symm(HostSymm {
            problem: &problem,
            alpha: 2.0,
            beta: 0.5,
            a: &a,
            b: &b,
            c: &mut c,
        });
        // B*A = [7, 9]; 2*[7, 9] + 0.5*[10, 20] = [19, 28].
        assert_eq!(c, vec![19.0, 28.0]);
    }
}
