use skinweights::{
    EditorSession, MemoryStore, Rect, SessionError, SessionRegistry, UndoError, WeightStore,
};

fn store() -> MemoryStore {
    MemoryStore::new(
        &["jointA", "jointB"],
        3,
        &[0.7, 0.3, 1.0, 0.0, 0.5, 0.5],
    )
}

fn session() -> EditorSession<MemoryStore> {
    EditorSession::open("skinCluster1", store(), vec![0, 1, 2]).unwrap()
}

fn store_weights(s: &MemoryStore) -> Vec<f64> {
    s.read_weights(
        &[0, 1, 2],
        &[
            "skin.weights[jointA]".to_string(),
            "skin.weights[jointB]".to_string(),
        ],
    )
    .unwrap()
}

#[test]
fn undo_redo_round_trip_is_exact() {
    let mut s = session();
    let before = s.matrix().values().to_vec();

    s.prepare(&[Rect::new(0, 0, 0, 0)]).unwrap();
    s.absolute_set(1.0).unwrap();
    let after = s.matrix().values().to_vec();
    assert_ne!(before, after);
    assert_eq!(store_weights(s.store()), after);

    s.undo().unwrap();
    assert_eq!(s.matrix().values(), &before[..]);
    assert_eq!(store_weights(s.store()), before);

    s.redo().unwrap();
    assert_eq!(s.matrix().values(), &after[..]);
    assert_eq!(store_weights(s.store()), after);
}

#[test]
fn double_undo_and_redo_are_errors_without_state_change() {
    let mut s = session();
    s.prepare(&[Rect::new(0, 0, 0, 0)]).unwrap();
    s.absolute_set(0.9).unwrap();

    s.undo().unwrap();
    let frozen = s.matrix().values().to_vec();
    assert!(matches!(
        s.undo(),
        Err(SessionError::Undo(UndoError::DoubleUndo))
    ));
    assert_eq!(s.matrix().values(), &frozen[..]);

    s.redo().unwrap();
    let frozen = s.matrix().values().to_vec();
    assert!(matches!(
        s.redo(),
        Err(SessionError::Undo(UndoError::DoubleRedo))
    ));
    assert_eq!(s.matrix().values(), &frozen[..]);
}

#[test]
fn undo_excluded_while_an_edit_is_open() {
    let mut s = session();
    s.prepare(&[Rect::new(0, 0, 0, 0)]).unwrap();
    s.absolute_set(0.9).unwrap();

    s.begin_edit().unwrap();
    s.set_cell(1, 0, 0.4).unwrap();
    assert!(matches!(
        s.undo(),
        Err(SessionError::Undo(UndoError::EditInProgress))
    ));

    s.abort_edit();
    // the aborted write is rolled back in memory
    assert_eq!(s.matrix().value(1, 0), 1.0);
    assert!(s.undo().is_ok());
}

#[test]
fn interactive_capture_keeps_first_old_value() {
    let mut s = session();
    s.begin_edit().unwrap();
    s.set_cell(0, 0, 0.9).unwrap();
    s.set_cell(0, 0, 0.2).unwrap();
    s.commit_edit().unwrap();
    assert_eq!(s.matrix().value(0, 0), 0.2);

    s.undo().unwrap();
    // restores the pre-session value, not the intermediate 0.9
    assert_eq!(s.matrix().value(0, 0), 0.7);
}

#[test]
fn store_failure_aborts_with_no_partial_state() {
    let mut s = session();
    let before = s.matrix().values().to_vec();
    s.store_mut().fail_writes = true;

    s.prepare(&[Rect::new(0, 2, 0, 1)]).unwrap();
    let err = s.absolute_set(1.0).unwrap_err();
    assert!(matches!(err, SessionError::Store(_)));

    // in-memory matrix rolled back, nothing logged, chunks balanced
    assert_eq!(s.matrix().values(), &before[..]);
    assert_eq!(s.undo_depth(), 0);
    assert!(s.store().chunk_balanced());
    assert!(matches!(
        s.undo(),
        Err(SessionError::Undo(UndoError::DoubleUndo))
    ));
}

#[test]
fn transient_store_failure_leaves_undo_retryable() {
    let mut s = session();
    s.prepare(&[Rect::new(0, 0, 0, 0)]).unwrap();
    s.absolute_set(1.0).unwrap();
    let after = s.matrix().values().to_vec();

    s.store_mut().fail_writes = true;
    assert!(matches!(s.undo(), Err(SessionError::Store(_))));
    // nothing moved: matrix, store, and cursor all still hold the edit
    assert_eq!(s.matrix().values(), &after[..]);
    assert_eq!(store_weights(s.store()), after);
    assert_eq!(s.undo_depth(), 1);

    s.store_mut().fail_writes = false;
    s.undo().unwrap();
    assert_eq!(s.matrix().value(0, 0), 0.7);

    // same discipline on the redo side
    s.store_mut().fail_writes = true;
    assert!(matches!(s.redo(), Err(SessionError::Store(_))));
    assert_eq!(s.undo_depth(), 0);
    s.store_mut().fail_writes = false;
    s.redo().unwrap();
    assert_eq!(s.matrix().values(), &after[..]);
}

#[test]
fn lock_change_drops_the_prepared_mask() {
    let mut s = session();
    s.prepare(&[Rect::new(0, 0, 0, 1)]).unwrap();
    s.lock_rows(&[0], true).unwrap();

    // the stale mask would have edited the freshly locked row
    assert!(matches!(s.absolute_set(1.0), Err(SessionError::NoSelection)));
    assert_eq!(s.matrix().value(0, 0), 0.7);
    assert_eq!(s.matrix().value(0, 1), 0.3);

    // re-deriving the mask honors the new lock state
    s.prepare(&[Rect::new(0, 2, 0, 1)]).unwrap();
    s.absolute_set(1.0).unwrap();
    assert_eq!(s.matrix().value(0, 0), 0.7);
    assert_eq!(s.matrix().value(0, 1), 0.3);

    s.prepare(&[Rect::new(1, 1, 0, 0)]).unwrap();
    s.lock_columns(&[0], true);
    assert!(matches!(s.absolute_set(0.5), Err(SessionError::NoSelection)));
}

#[test]
fn refresh_drops_the_prepared_mask() {
    let mut s = session();
    s.prepare(&[Rect::new(0, 0, 0, 1)]).unwrap();
    s.refresh().unwrap();
    assert!(matches!(s.absolute_set(1.0), Err(SessionError::NoSelection)));
}

#[test]
fn interactive_writes_skip_locked_cells() {
    let mut s = session();
    s.lock_rows(&[0], true).unwrap();
    s.begin_edit().unwrap();
    s.set_cell(0, 0, 0.1).unwrap();
    s.set_cell(1, 0, 0.4).unwrap();
    s.commit_edit().unwrap();
    assert_eq!(s.matrix().value(0, 0), 0.7);
    assert_eq!(s.matrix().value(1, 0), 0.4);
}

#[test]
fn commit_after_undo_discards_the_redo_branch() {
    let mut s = session();
    s.prepare(&[Rect::new(0, 0, 0, 0)]).unwrap();
    s.absolute_set(0.9).unwrap();
    s.absolute_set(0.8).unwrap();
    s.undo().unwrap();
    s.absolute_set(0.6).unwrap();
    assert!(matches!(
        s.redo(),
        Err(SessionError::Undo(UndoError::DoubleRedo))
    ));
    assert!((s.matrix().value(0, 0) - 0.6).abs() < 1e-12);
}

#[test]
fn influence_set_change_forces_full_reload() {
    let mut s = session();
    s.store_mut().reset_influences(&["jointA", "jointB", "jointC"]);
    s.refresh().unwrap();
    assert_eq!(s.matrix().column_count(), 3);
    assert_eq!(s.matrix().influences()[2].name, "jointC");
    // surviving columns kept their values, the new one reads as zero
    assert_eq!(s.matrix().value(0, 0), 0.7);
    assert_eq!(s.matrix().value(0, 2), 0.0);
}

#[test]
fn refresh_patches_values_when_influences_match() {
    let mut s = session();
    s.store_mut()
        .write_weight("skin.weights[jointA]", 1, 0.25)
        .unwrap();
    s.store_mut()
        .write_weight("skin.weights[jointB]", 1, 0.75)
        .unwrap();
    s.refresh().unwrap();
    assert_eq!(s.matrix().value(1, 0), 0.25);
    assert_eq!(s.matrix().value(1, 1), 0.75);
}

#[test]
fn lock_flags_round_trip_through_the_store() {
    let mut s = session();
    s.lock_rows(&[1], true).unwrap();
    assert!(s.matrix().is_row_locked(1));
    assert_eq!(s.store().read_lock_flags(&[1]).unwrap(), vec![true]);

    s.refresh().unwrap();
    assert!(s.matrix().is_row_locked(1));

    s.lock_rows(&[1], false).unwrap();
    assert!(!s.matrix().is_row_locked(1));
}

#[test]
fn registry_finds_or_creates_sessions() {
    let mut registry: SessionRegistry<MemoryStore> = SessionRegistry::new();
    {
        let s = registry
            .acquire("skinCluster1", || (store(), vec![0, 1, 2]))
            .unwrap();
        s.prepare(&[Rect::new(0, 0, 0, 0)]).unwrap();
        s.absolute_set(0.9).unwrap();
    }
    // second acquire returns the same live session
    let s = registry
        .acquire("skinCluster1", || panic!("must not re-create"))
        .unwrap();
    assert_eq!(s.undo_depth(), 1);

    assert_eq!(registry.next_name("skinSession"), "skinSession1");
    assert!(registry.release("skinCluster1"));
    assert!(!registry.release("skinCluster1"));
}
