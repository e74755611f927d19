//! Level store tests for kryst-amg
//!
//! Request/release counting, eviction, keep flags, typed retrieval and default
//! factory resolution through a shared factory manager.

use std::rc::Rc;
use std::sync::Arc;

use kryst_amg::factory::TransPFactory;
use kryst_amg::{
    CsrMatrix, FactoryId, FactoryManager, FactoryRef, KeepFlags, Level, MgError, Scope, SerialComm,
    SetupContext,
};

#[test]
fn request_then_release_returns_to_zero() {
    let manager = Rc::new(FactoryManager::new());
    let mut level = Level::with_manager(manager);
    let id = level.request("P", None).unwrap();
    assert_ne!(id, FactoryId::USER);
    assert_eq!(level.num_requests("P", None), 1);
    assert!(level.is_requested("P", None));
    assert_eq!(level.pending(), vec![("P".to_string(), id)]);

    level.release("P", None).unwrap();
    assert_eq!(level.num_requests("P", None), 0);
    assert!(matches!(level.release("P", None), Err(MgError::LogicError(_))));
}

#[test]
fn get_never_builds() {
    let manager = Rc::new(FactoryManager::new());
    let mut level = Level::with_manager(manager);
    level.request("R", None).unwrap();
    match level.get::<Arc<CsrMatrix<f64>>>("R", None) {
        Err(MgError::MissingKey { key, .. }) => assert_eq!(key, "R"),
        other => panic!("expected MissingKey, got {other:?}"),
    }
}

#[test]
fn default_resolution_is_cached_per_manager() {
    let manager = Rc::new(FactoryManager::new());
    let fine = Level::with_manager(Rc::clone(&manager));
    let coarse = fine.build_next();
    let a = fine.resolve("A", None).unwrap();
    let b = coarse.resolve("A", None).unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(coarse.level_id(), 1);
}

#[test]
fn user_data_shadows_the_default_factory() {
    let manager = Rc::new(FactoryManager::new());
    let mut level = Level::with_manager(manager);
    level.set_user_data("A", CsrMatrix::<f64>::identity(2));
    assert_eq!(level.resolve("A", None).unwrap().id, FactoryId::USER);
    assert!(level.is_kept("A", None, KeepFlags::USER_DATA));

    // user data survives any number of balanced request/release pairs
    level.request("A", None).unwrap();
    level.release("A", None).unwrap();
    assert!(level.is_available("A", None));
}

#[test]
fn unrequested_value_is_evicted_on_last_release() {
    let producer = FactoryId::next();
    let mut level = Level::new();
    level.request_id("Graph", producer);
    level.request_id("Graph", producer);
    level.set("Graph", 7i64, producer);
    level.release_id("Graph", producer).unwrap();
    assert_eq!(level.get_id::<i64>("Graph", producer).unwrap(), 7);
    level.release_id("Graph", producer).unwrap();
    assert!(matches!(level.get_id::<i64>("Graph", producer), Err(MgError::MissingKey { .. })));
}

#[test]
fn explicit_factory_is_built_through_the_context() {
    let transp: FactoryRef = Rc::new(TransPFactory::new());
    let mut levels = vec![Level::new()];
    let p = CsrMatrix::from_triplets(3, 2, &[(0, 0, 1.0), (1, 0, 1.0), (2, 1, 1.0)]).unwrap();
    levels[0].set_user_data("P", p.clone());
    let comm = SerialComm;
    {
        let mut ctx = SetupContext::new(&mut levels, 0, &comm).unwrap();
        ctx.request(Scope::Current, "R", Some(&transp)).unwrap();
        ctx.run_schedule().unwrap();
    }
    let r: Arc<CsrMatrix<f64>> = levels[0].get("R", Some(&transp)).unwrap();
    assert_eq!(*r, p.transpose());
    levels[0].release("R", Some(&transp)).unwrap();
    assert!(!levels[0].is_available("R", Some(&transp)));
}

#[test]
fn level_table_shows_pending_entries() {
    let manager = Rc::new(FactoryManager::new());
    let mut level = Level::with_manager(manager);
    level.request("Aggregates", None).unwrap();
    let table = level.to_string();
    assert!(table.contains("Aggregates"));
    assert!(table.contains("not available"));
}
