use halo_comm::{LocalCluster, Mailbox, Message, MessageKind, Transport};
use halo_core::{Pid, TickId};
use std::thread;
use std::time::Duration;

fn no_queries(_: Pid, _: &[u8]) -> Vec<u8> {
    Vec::new()
}

/// Every process sends to both ring neighbours and receives from both,
/// for several ticks, with a barrier between ticks.
#[test]
fn ring_exchange_over_many_ticks_stays_in_step() {
    let n = 5u32;
    let handles: Vec<_> = LocalCluster::new(n as usize)
        .into_endpoints()
        .into_iter()
        .map(|t| {
            thread::spawn(move || {
                let me = t.pid().0;
                let left = Pid((me + n - 1) % n);
                let right = Pid((me + 1) % n);
                let mut mb = Mailbox::new(t, Some(Duration::from_secs(10)));
                let mut sum = 0u64;
                for tick in 0..20u64 {
                    let t = TickId(tick);
                    let body = (me as u64 * 1000 + tick).to_le_bytes().to_vec();
                    mb.send(left, &Message::new(MessageKind::Halo, t, body.clone()))
                        .unwrap();
                    mb.send(right, &Message::new(MessageKind::Halo, t, body)).unwrap();
                    for peer in [left, right] {
                        let m = mb.receive_from(peer, MessageKind::Halo, t, &no_queries).unwrap();
                        let v = u64::from_le_bytes(m.body.try_into().unwrap());
                        assert_eq!(v, peer.0 as u64 * 1000 + tick);
                        sum += v;
                    }
                    mb.barrier(t, &no_queries).unwrap();
                }
                (sum, mb.stashed())
            })
        })
        .collect();
    for h in handles {
        let (sum, stashed) = h.join().unwrap();
        assert!(sum > 0);
        assert_eq!(stashed, 0);
    }
}
