//! The transport contract.

use crate::error::TransportError;
use halo_core::Pid;
use std::time::Duration;

/// Point-to-point byte delivery between the processes of one group.
///
/// Implementations must deliver payloads exactly once and in FIFO order
/// per ordered `(sender, receiver)` pair. No ordering is required across
/// different pairs. Broadcast is not part of the contract; collectives
/// are built from point-to-point sends.
pub trait Transport: Send {
    /// This process's pid.
    fn pid(&self) -> Pid;

    /// Number of processes in the group.
    fn num_partitions(&self) -> usize;

    /// Queue `payload` for delivery to `to`. Never blocks on the receiver.
    fn send_to(&self, to: Pid, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Block for the next payload from any peer.
    ///
    /// `timeout` of `None` waits indefinitely. Expiry returns `Ok(None)`;
    /// the caller knows what it was waiting for and reports
    /// [`TransportError::Timeout`] itself.
    fn recv(&self, timeout: Option<Duration>) -> Result<Option<(Pid, Vec<u8>)>, TransportError>;

    /// Return the next payload if one is already queued.
    fn try_recv(&self) -> Result<Option<(Pid, Vec<u8>)>, TransportError>;
}

/// Validate a destination for a group of `count` seen from `me`.
pub(crate) fn check_peer(me: Pid, to: Pid, count: usize) -> Result<(), TransportError> {
    if to == me {
        return Err(TransportError::SelfSend { pid: me });
    }
    if to.index() >= count {
        return Err(TransportError::UnknownPeer { pid: to, count });
    }
    Ok(())
}
