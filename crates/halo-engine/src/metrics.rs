//! Per-tick synchronisation metrics.
//!
//! [`SyncMetrics`] captures timing and traffic for a single sync round so
//! callers can see where a tick's communication time went.

use halo_core::TickId;

/// Timing and traffic collected during one sync round.
///
/// All durations are in microseconds. Byte counts are encoded message
/// sizes as handed to and taken from the transport, including query
/// traffic served while blocked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncMetrics {
    /// Wall-clock time for the whole round, in microseconds.
    pub total_us: u64,
    /// Time spent exchanging and applying migrations, in microseconds.
    pub migration_us: u64,
    /// Time spent packing, exchanging and merging halos, in microseconds.
    pub exchange_us: u64,
    /// Time spent in the closing barrier, in microseconds.
    pub barrier_us: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Entities shipped to neighbours.
    pub entities_sent: u64,
    /// Entities adopted from neighbours.
    pub entities_received: u64,
    /// Halo entries (cells or replicas) written by merges and self-wraps.
    pub halo_entries: u64,
    /// Remote point queries answered during the round.
    pub queries_served: u64,
}

/// Outcome of one [`Node::step`](crate::Node::step).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    /// The tick that was completed.
    pub tick: TickId,
    /// Neighbours exchanged with.
    pub neighbors: usize,
    /// Round metrics.
    pub metrics: SyncMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = SyncMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.bytes_sent, 0);
        assert_eq!(m.entities_received, 0);
        assert_eq!(m.queries_served, 0);
    }
}
