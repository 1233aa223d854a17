use proptest::prelude::*;
use symm_core::{
    populate::{CreationFlags, Populator},
    problem::Matrix,
    reference::HostSymm,
    CpuReference, Order, ProblemDescriptor, ReferenceBackend, Side, Uplo,
};

fn layout() -> impl Strategy<Value = (Side, Uplo)> {
    (
        prop_oneof![Just(Side::Left), Just(Side::Right)],
        prop_oneof![Just(Uplo::Upper), Just(Uplo::Lower)],
    )
}

fn row_major_problem() -> impl Strategy<Value = ProblemDescriptor> {
    (layout(), 1usize..9, 1usize..9, 0usize..4, 0usize..4, 0usize..3).prop_map(
        |((side, uplo), m, n, pad, offc, offa)| {
            let mut problem = ProblemDescriptor::tight(Order::RowMajor, side, uplo, m, n);
            problem.lda += pad;
            problem.ldb += pad + 1;
            problem.ldc += pad;
            problem.offa = offa;
            problem.offc = offc;
            problem
        },
    )
}

proptest! {
    #[test]
    fn transposition_is_an_involution_on_shape(problem in row_major_problem()) {
        let col = problem.to_column_major();
        prop_assert_eq!(col.order, Order::ColumnMajor);
        prop_assert_eq!((col.m, col.n), (problem.n, problem.m));
        prop_assert_eq!(col.side, problem.side.flipped());
        prop_assert_eq!(col.uplo, problem.uplo.flipped());
        prop_assert_eq!(col.side.flipped(), problem.side);
        prop_assert!(col.validate().is_ok());
        prop_assert_eq!(col.ka(), problem.ka());
        for matrix in [Matrix::A, Matrix::B, Matrix::C] {
            prop_assert_eq!(col.extent(matrix), problem.extent(matrix));
            prop_assert_eq!(col.leading_dimension(matrix), problem.leading_dimension(matrix));
            prop_assert_eq!(col.offset(matrix), problem.offset(matrix));
        }
        prop_assert_eq!(col.to_column_major(), col.clone());
    }

    #[test]
    fn transposed_reference_call_matches_row_major_result(
        problem in row_major_problem(),
        seed in any::<u64>(),
    ) {
        let extent = |matrix| problem.extent(matrix).unwrap();
        let mut a = vec![0.0f64; extent(Matrix::A)];
        let mut b = vec![0.0f64; extent(Matrix::B)];
        let mut c = vec![0.0f64; extent(Matrix::C)];
        let mut populator = Populator::new(seed);
        let ka = problem.ka();
        populator.populate(
            &mut a[problem.offa..],
            ka,
            ka,
            problem.lda,
            CreationFlags::symmetric(Order::RowMajor, problem.uplo),
        );
        populator.populate(&mut b[problem.offb..], problem.m, problem.n, problem.ldb, CreationFlags::rectangular(Order::RowMajor));
        populator.populate(&mut c[problem.offc..], problem.m, problem.n, problem.ldc, CreationFlags::rectangular(Order::RowMajor));

        let mut direct = c.clone();
        CpuReference.symm(HostSymm { problem: &problem, alpha: 1.5, beta: -0.5, a: &a, b: &b, c: &mut direct });
        let transposed = problem.to_column_major();
        let mut via_column_major = c;
        CpuReference.symm(HostSymm { problem: &transposed, alpha: 1.5, beta: -0.5, a: &a, b: &b, c: &mut via_column_major });

        for (lhs, rhs) in direct.iter().zip(&via_column_major) {
            prop_assert!((lhs - rhs).abs() <= 1e-12 * (1.0 + lhs.abs()));
        }
    }
}
