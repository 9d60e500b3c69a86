//! The core `Partition` trait.

use halo_core::{GlobalDomain, GridPoint, IntRect, PartitionError, Pid, Position};
use std::any::Any;

/// Assignment of disjoint owned rectangles to processes.
///
/// The union of all owned regions covers the domain exactly and regions
/// never overlap. Every method is a pure function of the scheme, so two
/// processes asking about the same pid agree bit-for-bit without
/// communicating.
///
/// # Thread Safety
///
/// Partitions are shared read-only configuration (`Arc<dyn Partition>`)
/// and must be `Send + Sync`.
pub trait Partition: Any + Send + Sync + 'static {
    /// The partitioned domain.
    fn domain(&self) -> &GlobalDomain;

    /// Number of partitions (equals the process count).
    fn num_partitions(&self) -> usize;

    /// Owned rectangle of `pid`.
    fn owned_region(&self, pid: Pid) -> Result<IntRect, PartitionError>;

    /// The pid owning `point`.
    ///
    /// Total over the domain. Toroidal domains wrap the point first;
    /// bounded domains return `OutOfDomain` for points outside.
    fn to_partition_id(&self, point: GridPoint) -> Result<Pid, PartitionError>;

    /// The pid owning the cell that contains a continuous position.
    fn to_partition_id_at(&self, position: Position) -> Result<Pid, PartitionError> {
        let wrapped =
            self.domain()
                .wrap_position(position)
                .map_err(|_| PartitionError::OutOfDomain {
                    point: format!("{position}"),
                })?;
        self.to_partition_id(wrapped.floor())
    }

    /// All owned regions, indexed by pid.
    fn regions(&self) -> Vec<IntRect> {
        (0..self.num_partitions() as u32)
            .filter_map(|p| self.owned_region(Pid(p)).ok())
            .collect()
    }
}

impl dyn Partition {
    /// Attempt to downcast a trait object to a concrete scheme.
    pub fn downcast_ref<T: Partition>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}

/// Wrap `point` into `domain`, mapping the access error to a partition error.
pub(crate) fn wrap_into(domain: &GlobalDomain, point: GridPoint) -> Result<GridPoint, PartitionError> {
    domain
        .wrap_point(point)
        .map_err(|_| PartitionError::OutOfDomain {
            point: format!("{point}"),
        })
}

/// Check `pid` is in `0..count`.
pub(crate) fn check_pid(pid: Pid, count: usize) -> Result<usize, PartitionError> {
    let i = pid.index();
    if i < count {
        Ok(i)
    } else {
        Err(PartitionError::UnknownPid { pid, count })
    }
}
