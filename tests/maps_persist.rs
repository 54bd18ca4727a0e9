use skinweights::maps::{self, MapError, WeightMap};
use skinweights::{EditorSession, MemoryStore, Rect};

fn session() -> EditorSession<MemoryStore> {
    let store = MemoryStore::new(
        &["jointA", "jointB"],
        3,
        &[0.7, 0.3, 1.0, 0.0, 0.5, 0.5],
    );
    EditorSession::open("skinCluster1", store, vec![0, 1, 2]).unwrap()
}

#[test]
fn export_import_preserves_a_column() {
    let s = session();
    let map = s.export_map(0).unwrap();
    assert_eq!(map.deformer, "skinCluster1");
    assert_eq!(map.attribute, "skin.weights[jointA]");
    assert_eq!(map.weights, vec![0.7, 1.0, 0.5]);

    let text = maps::to_json(&map).unwrap();
    let parsed = maps::from_json(&text).unwrap();
    assert_eq!(parsed, map);

    let mut target = session();
    target.prepare(&[]).unwrap();
    target.import_map(&parsed, 1).unwrap();
    assert_eq!(target.matrix().value(0, 1), 0.7);
    assert_eq!(target.matrix().value(1, 1), 1.0);
}

#[test]
fn import_clamps_out_of_range_weights() {
    let mut s = session();
    let map = WeightMap {
        deformer: "skinCluster1".to_string(),
        attribute: "skin.weights[jointA]".to_string(),
        vertex_count: 3,
        weights: vec![1.5, -0.2, 0.4],
    };
    s.import_map(&map, 0).unwrap();
    assert_eq!(s.matrix().value(0, 0), 1.0);
    assert_eq!(s.matrix().value(1, 0), 0.0);
    assert_eq!(s.matrix().value(2, 0), 0.4);
}

#[test]
fn import_skips_locked_rows() {
    let mut s = session();
    s.lock_rows(&[1], true).unwrap();
    let map = WeightMap {
        deformer: "skinCluster1".to_string(),
        attribute: "skin.weights[jointA]".to_string(),
        vertex_count: 3,
        weights: vec![0.1, 0.1, 0.1],
    };
    s.import_map(&map, 0).unwrap();
    assert_eq!(s.matrix().value(1, 0), 1.0);
    assert_eq!(s.matrix().value(0, 0), 0.1);
}

#[test]
fn import_rejects_mismatched_vertex_count() {
    let s = session();
    let map = WeightMap {
        deformer: "skinCluster1".to_string(),
        attribute: "skin.weights[jointA]".to_string(),
        vertex_count: 2,
        weights: vec![0.5, 0.5],
    };
    let err = maps::import_column(s.matrix(), &map, 0).unwrap_err();
    assert!(matches!(err, MapError::CountMismatch { expected: 3, got: 2 }));
}

#[test]
fn export_rejects_bad_column() {
    let s = session();
    assert!(matches!(
        s.export_map(5),
        Err(skinweights::SessionError::Map(MapError::ColumnOutOfRange { .. }))
    ));
}

#[test]
fn imported_map_is_undoable() {
    let mut s = session();
    let map = WeightMap {
        deformer: "skinCluster1".to_string(),
        attribute: "skin.weights[jointA]".to_string(),
        vertex_count: 3,
        weights: vec![0.2, 0.2, 0.2],
    };
    s.import_map(&map, 0).unwrap();
    assert_eq!(s.matrix().value(0, 0), 0.2);
    s.undo().unwrap();
    assert_eq!(s.matrix().value(0, 0), 0.7);
}
