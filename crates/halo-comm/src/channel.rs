//! In-process transport over crossbeam channels.

use crate::error::TransportError;
use crate::transport::{check_peer, Transport};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use halo_core::Pid;
use std::time::Duration;

type Envelope = (Pid, Vec<u8>);

/// One endpoint of a [`LocalCluster`].
///
/// Each endpoint owns the receiving side of its own unbounded channel and
/// a sender to every peer. A single channel per receiver keeps delivery
/// FIFO for each sender. Dropping an endpoint disconnects it from its
/// peers.
#[derive(Debug)]
pub struct ChannelTransport {
    pid: Pid,
    peers: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
}

impl Transport for ChannelTransport {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn num_partitions(&self) -> usize {
        self.peers.len()
    }

    fn send_to(&self, to: Pid, payload: Vec<u8>) -> Result<(), TransportError> {
        check_peer(self.pid, to, self.peers.len())?;
        let Some(tx) = &self.peers[to.index()] else {
            return Err(TransportError::SelfSend { pid: self.pid });
        };
        tx.send((self.pid, payload))
            .map_err(|_| TransportError::Disconnected { peer: to })
    }

    fn recv(&self, timeout: Option<Duration>) -> Result<Option<Envelope>, TransportError> {
        match timeout {
            None => self
                .inbox
                .recv()
                .map(Some)
                .map_err(|_| TransportError::Closed),
            Some(t) => match self.inbox.recv_timeout(t) {
                Ok(env) => Ok(Some(env)),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
            },
        }
    }

    fn try_recv(&self) -> Result<Option<Envelope>, TransportError> {
        match self.inbox.try_recv() {
            Ok(env) => Ok(Some(env)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

/// A fully connected group of `n` in-process endpoints.
///
/// ```
/// use halo_comm::{LocalCluster, Transport};
/// use halo_core::Pid;
///
/// let mut ends = LocalCluster::new(2).into_endpoints();
/// let b = ends.pop().unwrap();
/// let a = ends.pop().unwrap();
/// a.send_to(Pid(1), vec![42]).unwrap();
/// assert_eq!(b.try_recv().unwrap(), Some((Pid(0), vec![42])));
/// ```
#[derive(Debug)]
pub struct LocalCluster {
    endpoints: Vec<ChannelTransport>,
}

impl LocalCluster {
    /// Build `n` connected endpoints, `Pid(0)..Pid(n - 1)`.
    pub fn new(n: usize) -> Self {
        let (txs, rxs): (Vec<_>, Vec<_>) = (0..n).map(|_| crossbeam_channel::unbounded()).unzip();
        let endpoints = rxs
            .into_iter()
            .enumerate()
            .map(|(i, inbox)| ChannelTransport {
                pid: Pid(i as u32),
                peers: txs
                    .iter()
                    .enumerate()
                    .map(|(j, tx)| (j != i).then(|| tx.clone()))
                    .collect(),
                inbox,
            })
            .collect();
        Self { endpoints }
    }

    /// Number of endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the cluster has no endpoints.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Hand out the endpoints, indexed by pid.
    pub fn into_endpoints(self) -> Vec<ChannelTransport> {
        self.endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_per_sender() {
        let ends = LocalCluster::new(3).into_endpoints();
        for i in 0..5u8 {
            ends[0].send_to(Pid(2), vec![i]).unwrap();
        }
        ends[1].send_to(Pid(2), vec![100]).unwrap();
        let mut from0 = Vec::new();
        while let Some((src, body)) = ends[2].try_recv().unwrap() {
            if src == Pid(0) {
                from0.push(body[0]);
            }
        }
        assert_eq!(from0, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn self_send_rejected() {
        let ends = LocalCluster::new(2).into_endpoints();
        assert_eq!(
            ends[1].send_to(Pid(1), vec![]),
            Err(TransportError::SelfSend { pid: Pid(1) })
        );
        assert_eq!(
            ends[1].send_to(Pid(5), vec![]),
            Err(TransportError::UnknownPeer { pid: Pid(5), count: 2 })
        );
    }

    #[test]
    fn recv_times_out_with_none() {
        let ends = LocalCluster::new(2).into_endpoints();
        assert_eq!(ends[0].recv(Some(Duration::from_millis(10))).unwrap(), None);
    }

    #[test]
    fn dropped_peer_disconnects() {
        let mut ends = LocalCluster::new(2).into_endpoints();
        let b = ends.pop().unwrap();
        drop(b);
        assert_eq!(
            ends[0].send_to(Pid(1), vec![1]),
            Err(TransportError::Disconnected { peer: Pid(1) })
        );
        assert_eq!(ends[0].recv(None), Err(TransportError::Closed));
    }
}
