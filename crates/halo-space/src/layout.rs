//! Per-process halo geometry and exchange schedule.

use crate::partition::{check_pid, Partition};
use halo_core::{Aoi, ConfigError, GlobalDomain, GridPoint, IntRect, PartitionError, Pid, Position};
use smallvec::SmallVec;

/// One rectangular piece of a halo exchange.
///
/// `target = source` translated by `shift`. In an incoming link `pid`
/// supplies the piece: `source` lies in its owned region and `target` in
/// this process's halo. In an outgoing link `pid` receives it: `source`
/// lies in this process's owned region and `target` in `pid`'s halo.
///
/// Halo coordinates are *extended*: on a toroidal domain they are not
/// wrapped, so a halo may extend below zero or past the far edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HaloLink {
    /// The peer on the other end of the piece.
    pub pid: Pid,
    /// Wrap translation applied from source to target.
    pub shift: (i32, i32),
    /// Cells read on the supplying side.
    pub source: IntRect,
    /// Cells written on the receiving side.
    pub target: IntRect,
}

/// Halo region of `pid`: its owned region grown by `aoi`.
///
/// Clipped to the domain when bounded, left in extended coordinates when
/// toroidal. Includes the owned region itself.
pub fn halo_region(partition: &dyn Partition, pid: Pid, aoi: Aoi) -> Result<IntRect, PartitionError> {
    let owned = partition.owned_region(pid)?;
    Ok(grow(partition.domain(), owned, aoi))
}

/// Pids whose owned regions intersect `pid`'s halo, sorted, excluding `pid`.
///
/// The relation is symmetric.
pub fn neighbors(partition: &dyn Partition, pid: Pid, aoi: Aoi) -> Result<SmallVec<[Pid; 8]>, ConfigError> {
    Ok(HaloLayout::new(partition, pid, aoi)?.neighbors)
}

/// Reject an AOI larger than half the shortest owned side on either axis.
pub fn validate_aoi(partition: &dyn Partition, aoi: Aoi) -> Result<(), ConfigError> {
    let regions = partition.regions();
    let min_w = regions.iter().map(|r| r.width()).min().unwrap_or(0);
    let min_h = regions.iter().map(|r| r.height()).min().unwrap_or(0);
    if aoi.x.saturating_mul(2) > min_w {
        return Err(ConfigError::AoiTooLarge {
            axis: "x",
            aoi: aoi.x,
            min_side: min_w,
        });
    }
    if aoi.y.saturating_mul(2) > min_h {
        return Err(ConfigError::AoiTooLarge {
            axis: "y",
            aoi: aoi.y,
            min_side: min_h,
        });
    }
    Ok(())
}

fn grow(domain: &GlobalDomain, owned: IntRect, aoi: Aoi) -> IntRect {
    let grown = owned.expand(aoi);
    if domain.is_toroidal() {
        grown
    } else {
        grown.clip(&domain.rect())
    }
}

/// The halo geometry of one process.
///
/// Built deterministically from `(partition, pid, aoi)`, so every process
/// computes its peers' layouts consistently. Incoming links are ordered by
/// supplier pid, then by wrap shift; outgoing links are the exact dual, so
/// the pieces `A` sends to `B` line up one-to-one with the pieces `B`
/// expects from `A`.
#[derive(Clone, Debug)]
pub struct HaloLayout {
    pid: Pid,
    aoi: Aoi,
    domain: GlobalDomain,
    owned: IntRect,
    halo: IntRect,
    incoming: Vec<HaloLink>,
    outgoing: Vec<HaloLink>,
    neighbors: SmallVec<[Pid; 8]>,
    shifts: SmallVec<[(i32, i32); 9]>,
}

impl HaloLayout {
    /// Compute the layout of `pid`.
    pub fn new(partition: &dyn Partition, pid: Pid, aoi: Aoi) -> Result<Self, ConfigError> {
        let n = partition.num_partitions();
        check_pid(pid, n)?;
        validate_aoi(partition, aoi)?;

        let domain = *partition.domain();
        let regions = partition.regions();
        let shifts: SmallVec<[(i32, i32); 9]> = domain.wrap_shifts().into_iter().collect();
        let owned = regions[pid.index()];
        let halo = grow(&domain, owned, aoi);

        let mut incoming = Vec::new();
        let mut outgoing = Vec::new();
        for (b, &other) in regions.iter().enumerate() {
            let peer = Pid(b as u32);
            let peer_halo = grow(&domain, other, aoi);
            for &(sx, sy) in &shifts {
                if peer == pid && (sx, sy) == (0, 0) {
                    continue;
                }
                if let Some(target) = halo.intersect(&other.shift(sx, sy)) {
                    incoming.push(HaloLink {
                        pid: peer,
                        shift: (sx, sy),
                        source: target.shift(-sx, -sy),
                        target,
                    });
                }
                if let Some(target) = peer_halo.intersect(&owned.shift(sx, sy)) {
                    outgoing.push(HaloLink {
                        pid: peer,
                        shift: (sx, sy),
                        source: target.shift(-sx, -sy),
                        target,
                    });
                }
            }
        }

        let mut neighbors: SmallVec<[Pid; 8]> =
            incoming.iter().map(|l| l.pid).filter(|&p| p != pid).collect();
        neighbors.dedup();

        Ok(Self {
            pid,
            aoi,
            domain,
            owned,
            halo,
            incoming,
            outgoing,
            neighbors,
            shifts,
        })
    }

    /// The process this layout belongs to.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The configured area of interest.
    pub fn aoi(&self) -> Aoi {
        self.aoi
    }

    /// The partitioned domain.
    pub fn domain(&self) -> &GlobalDomain {
        &self.domain
    }

    /// Owned region in domain coordinates.
    pub fn owned(&self) -> IntRect {
        self.owned
    }

    /// Halo region in extended coordinates, owned region included.
    pub fn halo(&self) -> IntRect {
        self.halo
    }

    /// Pieces of the halo supplied by peers, self-wraps included.
    pub fn incoming(&self) -> &[HaloLink] {
        &self.incoming
    }

    /// Pieces of the owned region other halos need, self-wraps included.
    pub fn outgoing(&self) -> &[HaloLink] {
        &self.outgoing
    }

    /// Incoming pieces supplied by `peer`, in exchange order.
    pub fn links_from(&self, peer: Pid) -> impl Iterator<Item = &HaloLink> + '_ {
        self.incoming.iter().filter(move |l| l.pid == peer)
    }

    /// Outgoing pieces destined for `peer`, in exchange order.
    pub fn links_to(&self, peer: Pid) -> impl Iterator<Item = &HaloLink> + '_ {
        self.outgoing.iter().filter(move |l| l.pid == peer)
    }

    /// Pieces of the halo that wrap around onto this process's own region.
    pub fn self_links(&self) -> impl Iterator<Item = &HaloLink> + '_ {
        self.links_from(self.pid)
    }

    /// Sorted peers exchanged with each tick, excluding self.
    pub fn neighbors(&self) -> &[Pid] {
        &self.neighbors
    }

    /// Whether `peer` is a neighbour.
    pub fn is_neighbor(&self, peer: Pid) -> bool {
        self.neighbors.binary_search(&peer).is_ok()
    }

    /// Map a domain point to its extended coordinate in this process's
    /// view, preferring the owned representative.
    ///
    /// `None` when the point is in neither the owned region nor the halo.
    pub fn localize(&self, point: GridPoint) -> Option<GridPoint> {
        let p = self.domain.wrap_point(point).ok()?;
        if self.owned.contains(p) {
            return Some(p);
        }
        self.shifts
            .iter()
            .map(|&(sx, sy)| p.shift(sx, sy))
            .find(|q| self.halo.contains(*q))
    }

    /// Continuous counterpart of [`localize`](Self::localize).
    pub fn localize_position(&self, position: Position) -> Option<Position> {
        let p = self.domain.wrap_position(position).ok()?;
        if self.owned.contains_position(p) {
            return Some(p);
        }
        self.shifts
            .iter()
            .map(|&(sx, sy)| p.shift(sx as f64, sy as f64))
            .find(|q| self.halo.contains_position(*q))
    }

    /// Map an extended coordinate back into the domain.
    pub fn globalize(&self, point: GridPoint) -> GridPoint {
        // Extended points always come from this layout, which wraps
        // exactly on toroidal domains and is the identity when bounded.
        self.domain.wrap_point(point).unwrap_or(point)
    }

    /// Continuous counterpart of [`globalize`](Self::globalize).
    pub fn globalize_position(&self, position: Position) -> Position {
        self.domain.wrap_position(position).unwrap_or(position)
    }

    /// Whether an extended coordinate lies in the owned region.
    pub fn is_owned(&self, point: GridPoint) -> bool {
        self.owned.contains(point)
    }

    /// Whether an extended coordinate lies in the halo but not the owned region.
    pub fn is_replica(&self, point: GridPoint) -> bool {
        self.halo.contains(point) && !self.owned.contains(point)
    }

    /// Number of cells received from peers (or self-wraps) each tick.
    pub fn halo_cells(&self) -> usize {
        self.incoming.iter().map(|l| l.target.area()).sum()
    }
}
