use halo_comm::{LocalCluster, Message, MessageKind, Transport, TransportError};
use halo_core::codec::write_u32_le;
use halo_core::{CodecError, EntityId, GridPoint, Pid, TickId};
use halo_engine::{Node, NodeConfig, SyncError};
use halo_test_utils::{fixtures, init_tracing, run_cluster, Walker};
use std::sync::Arc;
use std::time::Duration;

/// P0 reads a point owned by P2, far outside its halo, while P2 is busy
/// in its own sync round.
#[test]
fn remote_point_query_round_trip() {
    init_tracing();
    let partition = fixtures::columns(fixtures::bounded(30, 10), 3);
    let out = run_cluster(3, |transport| {
        let mut node = Node::new(NodeConfig::default(), Arc::clone(&partition), transport).unwrap();
        let heat = node.add_grid_field("heat", 0.0f64);
        let walkers = node.add_object_field::<GridPoint, Walker>("walkers", 4).unwrap();
        let pid = node.pid();
        let owned = node.layout().owned();
        for (p, _) in node.field(heat).unwrap().iter_owned().collect::<Vec<_>>() {
            node.field_mut(heat).unwrap().set(p, f64::from(pid.0) * 10.0).unwrap();
        }
        node.field_mut(walkers)
            .unwrap()
            .add(Walker::new(EntityId::compose(pid, 0), 1.0), fixtures::centre(owned))
            .unwrap();

        let mut remote = None;
        if pid == Pid(0) {
            let value = node.get_value(heat, GridPoint::new(25, 5)).unwrap();
            let objects = node.objects_at(walkers, GridPoint::new(25, 5)).unwrap();
            remote = Some((value, objects));
        }
        let report = node.step().unwrap();
        (remote, report.metrics.queries_served)
    });

    let (value, objects) = out[0].0.clone().unwrap();
    assert_eq!(value, 20.0);
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].0, GridPoint::new(25, 5));
    assert_eq!(objects[0].1.id, EntityId::compose(Pid(2), 0));
    assert_eq!(out[2].1, 2);
}

#[test]
fn local_reads_never_query() {
    let partition = fixtures::columns(fixtures::bounded(10, 10), 2);
    let out = run_cluster(2, |transport| {
        let mut node = Node::new(NodeConfig::default(), Arc::clone(&partition), transport).unwrap();
        let heat = node.add_grid_field("heat", 1.5f64);
        let v = node.get_value(heat, GridPoint::new(5, 5)).unwrap();
        let report = node.step().unwrap();
        (v, report.metrics.queries_served)
    });
    assert_eq!(out, vec![(1.5, 0), (1.5, 0)]);
}

#[test]
fn out_of_domain_query_fails_locally() {
    let partition = fixtures::columns(fixtures::bounded(10, 10), 2);
    let mut endpoints = LocalCluster::new(2).into_endpoints();
    let _other = endpoints.pop().unwrap();
    let mut node = Node::new(NodeConfig::default(), partition, endpoints.pop().unwrap()).unwrap();
    let heat = node.add_grid_field("heat", 0.0f64);
    assert!(matches!(
        node.get_value(heat, GridPoint::new(-3, 0)),
        Err(SyncError::Access(halo_core::AccessError::OutOfDomain { .. }))
    ));
}

/// A silent neighbour surfaces as a transport failure naming the peer,
/// never as stale data.
#[test]
fn silent_neighbour_times_out() {
    init_tracing();
    let partition = fixtures::columns(fixtures::bounded(10, 10), 2);
    let mut endpoints = LocalCluster::new(2).into_endpoints();
    let _silent = endpoints.pop().unwrap();
    let config = NodeConfig {
        exchange_timeout: Some(Duration::from_millis(50)),
        ..NodeConfig::default()
    };
    let mut node = Node::new(config, partition, endpoints.pop().unwrap()).unwrap();
    node.add_grid_field("heat", 0.0f64);

    match node.step() {
        Err(SyncError::Transport {
            pid,
            tick,
            source: TransportError::Timeout { peer, kind, .. },
        }) => {
            assert_eq!(pid, Pid(0));
            assert_eq!(tick, TickId(0));
            assert_eq!(peer, Pid(1));
            assert_eq!(kind, MessageKind::Migration);
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert_eq!(node.tick(), TickId(0));
}

#[test]
fn departed_neighbour_is_disconnected() {
    let partition = fixtures::columns(fixtures::bounded(10, 10), 2);
    let mut endpoints = LocalCluster::new(2).into_endpoints();
    drop(endpoints.pop());
    let mut node = Node::new(NodeConfig::default(), partition, endpoints.pop().unwrap()).unwrap();
    assert!(matches!(
        node.step(),
        Err(SyncError::Transport {
            source: TransportError::Disconnected { peer: Pid(1) },
            ..
        })
    ));
}

/// A truncated halo payload aborts the tick with the sender named.
#[test]
fn truncated_halo_is_a_codec_error() {
    let partition = fixtures::columns(fixtures::bounded(10, 10), 2);
    let mut endpoints = LocalCluster::new(2).into_endpoints();
    let peer = endpoints.pop().unwrap();
    let mut node = Node::new(NodeConfig::default(), partition, endpoints.pop().unwrap()).unwrap();
    node.add_grid_field("heat", 0.0f64);

    let mut migrations = Vec::new();
    write_u32_le(&mut migrations, 0);
    peer.send_to(Pid(0), Message::new(MessageKind::Migration, TickId(0), migrations).encode())
        .unwrap();
    let mut halo = Vec::new();
    write_u32_le(&mut halo, 10);
    halo.extend_from_slice(&[0; 12]);
    peer.send_to(Pid(0), Message::new(MessageKind::Halo, TickId(0), halo).encode())
        .unwrap();

    assert!(matches!(
        node.step(),
        Err(SyncError::Codec {
            pid: Pid(0),
            peer: Pid(1),
            source: CodecError::Truncated { .. },
            ..
        })
    ));
}

#[test]
fn stale_tick_is_rejected() {
    let partition = fixtures::columns(fixtures::bounded(10, 10), 2);
    let mut endpoints = LocalCluster::new(2).into_endpoints();
    let peer = endpoints.pop().unwrap();
    let mut node = Node::new(NodeConfig::default(), partition, endpoints.pop().unwrap()).unwrap();
    peer.send_to(Pid(0), Message::new(MessageKind::Migration, TickId(5), Vec::new()).encode())
        .unwrap();
    assert!(matches!(
        node.step(),
        Err(SyncError::Transport {
            source: TransportError::OutOfOrder {
                expected: TickId(0),
                got: TickId(5),
                ..
            },
            ..
        })
    ));
}
