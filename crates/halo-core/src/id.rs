//! Strongly-typed identifiers.

use std::fmt;

/// Identifies one partition, and therefore one process, in a run.
///
/// Pids are dense: a run with `N` partitions uses `Pid(0)..Pid(N-1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl Pid {
    /// The pid as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a field registered on a node.
///
/// Fields are registered in the same order on every process, so the same
/// `FieldId` names the same field cluster-wide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FieldId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing tick counter.
///
/// Supplied by the scheduler; incremented once per completed sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl TickId {
    /// The following tick.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Globally unique identity of a migratable entity.
///
/// The identity survives moves between partitions: when an entity crosses
/// a boundary the receiving process recognises it by this id rather than
/// treating it as a new object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Bits reserved for the per-process sequence number.
    pub const SEQ_BITS: u32 = 40;

    /// Build an id from the allocating pid and a per-process sequence.
    ///
    /// Ids composed on different pids never collide, so no coordination
    /// is needed to allocate them.
    pub fn compose(pid: Pid, seq: u64) -> Self {
        debug_assert!(seq < (1u64 << Self::SEQ_BITS));
        Self(((pid.0 as u64) << Self::SEQ_BITS) | seq)
    }

    /// The pid that allocated this id (not necessarily the current owner).
    pub fn origin(self) -> Pid {
        Pid((self.0 >> Self::SEQ_BITS) as u32)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Hands out [`EntityId`]s for a single pid.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    pid: Pid,
    next: u64,
}

impl IdAllocator {
    /// Allocator for `pid`, starting at sequence 0.
    pub fn new(pid: Pid) -> Self {
        Self { pid, next: 0 }
    }

    /// Allocate a fresh id.
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId::compose(self.pid, self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_ids_remember_origin() {
        let id = EntityId::compose(Pid(7), 12345);
        assert_eq!(id.origin(), Pid(7));
        assert_eq!(id.0 & ((1 << EntityId::SEQ_BITS) - 1), 12345);
    }

    #[test]
    fn allocators_on_different_pids_never_collide() {
        let mut a = IdAllocator::new(Pid(0));
        let mut b = IdAllocator::new(Pid(1));
        let ids_a: Vec<_> = (0..100).map(|_| a.next_id()).collect();
        let ids_b: Vec<_> = (0..100).map(|_| b.next_id()).collect();
        for id in &ids_a {
            assert!(!ids_b.contains(id));
        }
    }

    #[test]
    fn tick_next_increments() {
        assert_eq!(TickId(4).next(), TickId(5));
    }
}
