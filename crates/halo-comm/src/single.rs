//! The group of one.

use crate::error::TransportError;
use crate::transport::{check_peer, Transport};
use halo_core::Pid;
use std::time::Duration;

/// Transport for an unpartitioned run. There are no peers: every halo
/// piece is a local self-wrap and nothing is ever received.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleProcess;

impl Transport for SingleProcess {
    fn pid(&self) -> Pid {
        Pid(0)
    }

    fn num_partitions(&self) -> usize {
        1
    }

    fn send_to(&self, to: Pid, _payload: Vec<u8>) -> Result<(), TransportError> {
        check_peer(Pid(0), to, 1)
    }

    fn recv(&self, _timeout: Option<Duration>) -> Result<Option<(Pid, Vec<u8>)>, TransportError> {
        Err(TransportError::Closed)
    }

    fn try_recv(&self) -> Result<Option<(Pid, Vec<u8>)>, TransportError> {
        Ok(None)
    }
}
