//! Hierarchy setup tests for kryst-amg
//!
//! End-to-end coarsening of Poisson operators through the default factories:
//! level sizes, Galerkin symmetry, data retention, stalls, transfer factories
//! and error reporting.

use std::rc::Rc;
use std::sync::Arc;

use approx::assert_relative_eq;
use kryst_amg::factory::{CoordinatesTransferFactory, RapFactory};
use kryst_amg::{CsrMatrix, FactoryManager, FactoryRef, Hierarchy, HierarchyOptions, MgError, MultiVector};

/// 5-point Laplacian on an `nx × ny` grid.
fn poisson_2d(nx: usize, ny: usize) -> CsrMatrix<f64> {
    let idx = |i: usize, j: usize| i * ny + j;
    let mut t = Vec::new();
    for i in 0..nx {
        for j in 0..ny {
            let row = idx(i, j);
            t.push((row, row, 4.0));
            if i > 0 {
                t.push((row, idx(i - 1, j), -1.0));
            }
            if i + 1 < nx {
                t.push((row, idx(i + 1, j), -1.0));
            }
            if j > 0 {
                t.push((row, idx(i, j - 1), -1.0));
            }
            if j + 1 < ny {
                t.push((row, idx(i, j + 1), -1.0));
            }
        }
    }
    CsrMatrix::from_triplets(nx * ny, nx * ny, &t).unwrap()
}

#[test]
fn poisson_hierarchy_coarsens_to_target() {
    let options = HierarchyOptions { max_coarse_size: 10, ..Default::default() };
    let mut h = Hierarchy::new(poisson_2d(10, 10), options);
    h.setup().unwrap();

    assert!(h.num_levels() >= 2);
    let mut fine_rows = 100;
    for l in 1..h.num_levels() {
        let a = h.operator(l).unwrap();
        let p = h.prolongator(l).unwrap();
        let r = h.restriction(l).unwrap();
        assert_eq!(a.nrows(), a.ncols());
        assert!(a.nrows() < fine_rows);
        assert_eq!((p.nrows(), p.ncols()), (fine_rows, a.nrows()));
        assert_eq!(*r, p.transpose());
        fine_rows = a.nrows();
    }
    assert!(fine_rows <= 10 || h.num_levels() == h.options().max_levels);
}

#[test]
fn galerkin_operators_stay_symmetric() {
    let mut h = Hierarchy::new(poisson_2d(8, 8), HierarchyOptions { max_coarse_size: 4, ..Default::default() });
    h.setup().unwrap();
    for l in 1..h.num_levels() {
        let a = h.operator(l).unwrap();
        for i in 0..a.nrows() {
            for (j, v) in a.row(i) {
                assert_relative_eq!(v, a.get(j, i).unwrap(), epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn intermediate_data_is_released() {
    let mut h = Hierarchy::new(poisson_2d(6, 6), HierarchyOptions { max_levels: 2, max_coarse_size: 1, ..Default::default() });
    h.setup().unwrap();
    assert_eq!(h.num_levels(), 2);
    let fine = h.level(0).unwrap();
    assert!(!fine.is_available("Graph", None));
    assert!(!fine.is_available("Aggregates", None));
    assert!(fine.is_available("A", None));
    for level in h.levels() {
        assert!(level.pending().is_empty());
    }
    assert!(h.operator_complexity().unwrap() > 1.0);
}

#[test]
fn small_operator_needs_no_coarsening() {
    let mut h = Hierarchy::new(poisson_2d(3, 3), HierarchyOptions::default());
    h.setup().unwrap();
    assert_eq!(h.num_levels(), 1);
    assert_eq!(h.operator_complexity().unwrap(), 1.0);
}

#[test]
fn stalled_coarsening_stops() {
    // no couplings: every vertex is a singleton aggregate
    let a = CsrMatrix::<f64>::identity(60);
    let mut h = Hierarchy::new(a, HierarchyOptions { max_coarse_size: 10, ..Default::default() });
    h.setup().unwrap();
    assert_eq!(h.num_levels(), 1);
}

#[test]
fn implicit_transpose_matches_explicit() {
    let explicit_opts = HierarchyOptions { max_levels: 2, max_coarse_size: 1, ..Default::default() };
    let implicit_opts = HierarchyOptions { implicit_transpose: true, ..explicit_opts.clone() };
    let mut explicit = Hierarchy::new(poisson_2d(7, 5), explicit_opts);
    let mut implicit = Hierarchy::new(poisson_2d(7, 5), implicit_opts);
    explicit.setup().unwrap();
    implicit.setup().unwrap();
    assert_eq!(*explicit.operator(1).unwrap(), *implicit.operator(1).unwrap());
    assert!(matches!(implicit.restriction(1), Err(MgError::MissingKey { .. })));
}

#[test]
fn coordinates_follow_the_aggregates() {
    let coords: FactoryRef = Rc::new(CoordinatesTransferFactory::new());
    let mut rap = RapFactory::new(false);
    rap.add_transfer_factory(Rc::clone(&coords));
    let mut manager = FactoryManager::new();
    manager.set_factory("A", Rc::new(rap));
    manager.set_factory("Coordinates", Rc::clone(&coords));

    let (nx, ny) = (6, 4);
    let options = HierarchyOptions { max_levels: 2, max_coarse_size: 1, ..Default::default() };
    let mut h = Hierarchy::with_manager(poisson_2d(nx, ny), manager, options);
    let x: MultiVector = vec![
        (0..nx * ny).map(|k| (k / ny) as f64).collect(),
        (0..nx * ny).map(|k| (k % ny) as f64).collect(),
    ];
    h.finest_mut().set_user_data("Coordinates", x);
    h.setup().unwrap();

    let coarse = h.level(1).unwrap();
    let xc: Arc<MultiVector> = coarse.get("Coordinates", None).unwrap();
    let n1 = h.operator(1).unwrap().nrows();
    assert_eq!(xc.len(), 2);
    assert!(xc.iter().all(|c| c.len() == n1));
    assert!(xc[0].iter().all(|&v| (0.0..=(nx - 1) as f64).contains(&v)));
    assert!(xc[1].iter().all(|&v| (0.0..=(ny - 1) as f64).contains(&v)));
}

#[test]
fn coordinates_survive_on_every_level() {
    let coords: FactoryRef = Rc::new(CoordinatesTransferFactory::new());
    let mut rap = RapFactory::new(false);
    rap.add_transfer_factory(Rc::clone(&coords));
    let mut manager = FactoryManager::new();
    manager.set_factory("A", Rc::new(rap));
    manager.set_factory("Coordinates", Rc::clone(&coords));

    let n = 20;
    let options = HierarchyOptions { max_levels: 4, max_coarse_size: 1, ..Default::default() };
    let mut h = Hierarchy::with_manager(poisson_2d(n, n), manager, options);
    let x: MultiVector = vec![(0..n * n).map(|k| (k / n) as f64).collect()];
    h.finest_mut().set_user_data("Coordinates", x);
    h.setup().unwrap();

    assert!(h.num_levels() >= 3);
    for (l, level) in h.levels().iter().enumerate() {
        let xl: Arc<MultiVector> = level.get("Coordinates", None).unwrap();
        assert_eq!(xl[0].len(), h.operator(l).unwrap().nrows());
        assert!(level.pending().is_empty());
    }
}

#[test]
fn failing_factory_is_reported_with_its_level() {
    // rectangular operator: two ghost columns on the last row
    let mut t = vec![(9, 10, -1.0), (9, 11, -1.0)];
    for i in 0..10 {
        t.push((i, i, 2.0));
        if i > 0 {
            t.push((i, i - 1, -1.0));
            t.push((i - 1, i, -1.0));
        }
    }
    let a = CsrMatrix::from_triplets(10, 12, &t).unwrap();
    let mut h = Hierarchy::new(a, HierarchyOptions { max_coarse_size: 0, ..Default::default() });
    match h.setup().unwrap_err() {
        MgError::LevelSetup { level, factory, source } => {
            assert_eq!(level, 1);
            assert_eq!(factory, "RapFactory(explicit)");
            assert!(matches!(*source, MgError::DimensionMismatch { op: "RAP: columns of A", .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(h.num_levels(), 1);
    assert!(h.operator(0).is_ok());
}
