//! Galerkin product tests for kryst-amg
//!
//! Checks `R·A·P` against dense `faer` products, the identity round trip,
//! coarse dimensions, operand validation and the factory's level interaction.
//!
//! The tests use `faer` dense matrices as reference and `approx` for
//! floating-point comparisons.

use std::rc::Rc;
use std::sync::Arc;

use approx::assert_relative_eq;
use faer::Mat;
use kryst_amg::factory::{CoordinatesTransferFactory, RapFactory};
use kryst_amg::{CsrMatrix, FactoryRef, KeepFlags, Level, MgError, MultiVector, Scope, SerialComm, SetupContext};

/// 1-D Laplacian of size `n`.
fn laplacian(n: usize) -> CsrMatrix<f64> {
    let mut t = Vec::new();
    for i in 0..n {
        t.push((i, i, 2.0));
        if i > 0 {
            t.push((i, i - 1, -1.0));
        }
        if i + 1 < n {
            t.push((i, i + 1, -1.0));
        }
    }
    CsrMatrix::from_triplets(n, n, &t).unwrap()
}

/// Piecewise-constant prolongator grouping consecutive pairs.
fn pairwise(n: usize) -> CsrMatrix<f64> {
    let t: Vec<_> = (0..n).map(|i| (i, i / 2, 1.0)).collect();
    CsrMatrix::from_triplets(n, n.div_ceil(2), &t).unwrap()
}

fn assert_close_to(c: &CsrMatrix<f64>, reference: &Mat<f64>) {
    assert_eq!((c.nrows(), c.ncols()), (reference.nrows(), reference.ncols()));
    let d = c.to_dense();
    for i in 0..d.nrows() {
        for j in 0..d.ncols() {
            assert_relative_eq!(d[(i, j)], reference[(i, j)], epsilon = 1e-12);
        }
    }
}

#[test]
fn identity_transfer_returns_a() {
    let a = laplacian(6);
    let id = CsrMatrix::identity(6);
    assert_eq!(RapFactory::galerkin(&a, &id, Some(&id)).unwrap(), a);
    assert_eq!(RapFactory::galerkin(&a, &id, None).unwrap(), a);
}

#[test]
fn coarse_operator_is_m_by_m() {
    let a = laplacian(7);
    let p = pairwise(7);
    let r = p.transpose();
    let ac = RapFactory::galerkin(&a, &p, Some(&r)).unwrap();
    assert_eq!((ac.nrows(), ac.ncols()), (4, 4));
}

#[test]
fn explicit_product_matches_dense_reference() {
    let a = laplacian(8);
    let p = pairwise(8);
    // a restriction that is not the transpose of P
    let r = CsrMatrix::from_triplets(4, 8, &(0..8).map(|i| (i / 2, i, 0.5 + i as f64)).collect::<Vec<_>>()).unwrap();
    let ac = RapFactory::galerkin(&a, &p, Some(&r)).unwrap();
    let ap = &a.to_dense() * &p.to_dense();
    let reference = &r.to_dense() * &ap;
    assert_close_to(&ac, &reference);
}

#[test]
fn implicit_and_explicit_transpose_agree() {
    let a = laplacian(9);
    let p = pairwise(9);
    let explicit = RapFactory::galerkin(&a, &p, Some(&p.transpose())).unwrap();
    let implicit = RapFactory::galerkin(&a, &p, None).unwrap();
    assert_eq!(explicit, implicit);
}

#[test]
fn prolongator_rows_must_match_operator() {
    let a = laplacian(4);
    let p = pairwise(6);
    assert_eq!(
        RapFactory::galerkin(&a, &p, None).unwrap_err(),
        MgError::DimensionMismatch { op: "RAP: rows of P", expected: 4, found: 6 }
    );
}

#[test]
fn restriction_rows_must_match_coarse_size() {
    let a = laplacian(4);
    let p = pairwise(4);
    let r = CsrMatrix::<f64>::identity(4);
    assert_eq!(
        RapFactory::galerkin(&a, &p, Some(&r)).unwrap_err(),
        MgError::DimensionMismatch { op: "RAP: rows of R", expected: 2, found: 4 }
    );
}

#[test]
fn factory_stores_coarse_operator_and_runs_transfers() {
    let coords: FactoryRef = Rc::new(CoordinatesTransferFactory::new());
    let mut rap = RapFactory::new(false);
    rap.add_transfer_factory(Rc::clone(&coords));
    let rap: FactoryRef = Rc::new(rap);

    let p = pairwise(4);
    let mut fine = Level::new();
    fine.set_user_data("A", laplacian(4));
    let x: MultiVector = vec![vec![0.0, 1.0, 2.0, 3.0]];
    fine.set_user_data("Coordinates", x);
    let mut coarse = fine.build_next();
    coarse.set_user_data("R", p.transpose());
    coarse.set_user_data("P", p);
    let mut levels = vec![fine, coarse];

    let comm = SerialComm;
    {
        let mut ctx = SetupContext::new(&mut levels, 1, &comm).unwrap();
        ctx.request(Scope::Current, "A", Some(&rap)).unwrap();
        ctx.run_schedule().unwrap();
    }
    let ac: Arc<CsrMatrix<f64>> = levels[1].get("A", Some(&rap)).unwrap();
    // pairs {0,1}, {2,3} of the 1-D Laplacian
    assert_close_to(&ac, &Mat::from_fn(2, 2, |i, j| if i == j { 2.0 } else { -1.0 }));
    let xc: Arc<MultiVector> = levels[1].get("Coordinates", Some(&coords)).unwrap();
    assert_eq!(*xc, vec![vec![0.5, 2.5]]);
    assert!(levels[1].is_kept("Coordinates", Some(&coords), KeepFlags::KEEP));
    assert!(levels[1].pending().is_empty());
}
