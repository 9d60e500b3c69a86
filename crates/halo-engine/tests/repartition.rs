use halo_core::{EntityId, GridPoint, Pid, TickId};
use halo_engine::{Node, NodeConfig};
use halo_test_utils::{fixtures, init_tracing, run_cluster, Walker};
use std::sync::Arc;

fn seed(p: GridPoint) -> i32 {
    p.x * 100 + p.y
}

/// Columns become rows: every cell value and every walker ends up with
/// its new owner, and halos are rebuilt for the new layout.
#[test]
fn columns_to_rows_conserves_data() {
    init_tracing();
    let domain = fixtures::bounded(10, 10);
    let before = fixtures::columns(domain, 2);
    let after = fixtures::blocks(domain, 1, 2);
    let out = run_cluster(2, |transport| {
        let mut node = Node::new(NodeConfig::default(), Arc::clone(&before), transport).unwrap();
        let cells = node.add_grid_field("cells", -1i32);
        let walkers = node.add_object_field::<GridPoint, Walker>("walkers", 2).unwrap();
        let pid = node.pid();

        let owned: Vec<GridPoint> = node.field(cells).unwrap().iter_owned().map(|(p, _)| p).collect();
        let field = node.field_mut(cells).unwrap();
        for &p in &owned {
            field.set(p, seed(p)).unwrap();
        }
        let field = node.field_mut(walkers).unwrap();
        for (i, &p) in owned.iter().enumerate().filter(|(i, _)| i % 7 == 0) {
            field.add(Walker::new(EntityId::compose(pid, i as u64), 0.0), p).unwrap();
        }
        node.step().unwrap();

        let report = node.repartition(Arc::clone(&after)).unwrap();
        assert_eq!(report.tick, TickId(1));
        assert_eq!(node.tick(), TickId(1));

        let field = node.field(cells).unwrap();
        let cells_ok = field.iter_owned().all(|(p, v)| v == seed(p));
        let owned_len = field.iter_owned().count();
        // Row boundary halo: the row just across the cut.
        let across = if pid == Pid(0) { GridPoint::new(3, 5) } else { GridPoint::new(3, 4) };
        let halo_ok = field.get(across).unwrap() == seed(across);

        let field = node.field(walkers).unwrap();
        let owned_region = node.layout().owned();
        let walkers_ok = field.owned_entities().all(|(loc, _)| owned_region.contains(loc));
        let count = field.owned_entities().count();

        // Business as usual afterwards.
        node.step().unwrap();
        (cells_ok, owned_len, halo_ok, walkers_ok, count)
    });

    for (cells_ok, owned_len, halo_ok, walkers_ok, _) in &out {
        assert!(cells_ok);
        assert_eq!(*owned_len, 50);
        assert!(halo_ok);
        assert!(walkers_ok);
    }
    // 50 owned cells each, every 7th seeded with a walker: 8 per process.
    assert_eq!(out.iter().map(|o| o.4).sum::<usize>(), 16);
}
