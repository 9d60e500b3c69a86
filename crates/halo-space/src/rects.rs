//! Explicit, possibly non-uniform rectangle decomposition.

use crate::partition::{check_pid, wrap_into, Partition};
use halo_core::{GlobalDomain, GridPoint, IntRect, PartitionError, Pid};

/// A partition given as one rectangle per pid.
///
/// Construction validates that the rectangles tile the domain exactly:
/// every rectangle is non-empty and inside the domain, no two overlap,
/// and no cell is left uncovered.
///
/// Lookup goes through a compressed table built from the distinct
/// rectangle edges, so it costs two binary searches regardless of how
/// irregular the layout is.
#[derive(Clone, Debug, PartialEq)]
pub struct RectPartition {
    domain: GlobalDomain,
    rects: Vec<IntRect>,
    xs: Vec<i32>,
    ys: Vec<i32>,
    /// Owner of compressed cell `(i, j)` at `j * (xs.len() - 1) + i`.
    table: Vec<u32>,
}

impl RectPartition {
    /// Validate `rects` against `domain` and build the lookup table.
    pub fn new(domain: GlobalDomain, rects: Vec<IntRect>) -> Result<Self, PartitionError> {
        if rects.is_empty() {
            return Err(PartitionError::InvalidCoverage {
                reason: "no rectangles given".into(),
            });
        }
        let bounds = domain.rect();
        for (i, r) in rects.iter().enumerate() {
            if r.is_empty() {
                return Err(PartitionError::EmptyRegion { pid: Pid(i as u32) });
            }
            if !bounds.contains_rect(r) {
                return Err(PartitionError::InvalidCoverage {
                    reason: format!("region {r} of P{i} leaves the domain {bounds}"),
                });
            }
        }

        let mut xs: Vec<i32> = rects.iter().flat_map(|r| [r.min.x, r.max.x]).collect();
        let mut ys: Vec<i32> = rects.iter().flat_map(|r| [r.min.y, r.max.y]).collect();
        xs.extend([bounds.min.x, bounds.max.x]);
        ys.extend([bounds.min.y, bounds.max.y]);
        xs.sort_unstable();
        xs.dedup();
        ys.sort_unstable();
        ys.dedup();

        let cols = xs.len() - 1;
        let rows = ys.len() - 1;
        let mut table = vec![u32::MAX; cols * rows];
        for (pid, r) in rects.iter().enumerate() {
            let (i0, i1) = (index_of(&xs, r.min.x), index_of(&xs, r.max.x));
            let (j0, j1) = (index_of(&ys, r.min.y), index_of(&ys, r.max.y));
            for j in j0..j1 {
                for i in i0..i1 {
                    let slot = &mut table[j * cols + i];
                    if *slot != u32::MAX {
                        return Err(PartitionError::InvalidCoverage {
                            reason: format!("P{pid} overlaps P{}", *slot),
                        });
                    }
                    *slot = pid as u32;
                }
            }
        }
        if let Some(k) = table.iter().position(|&o| o == u32::MAX) {
            let (i, j) = (k % cols, k / cols);
            return Err(PartitionError::InvalidCoverage {
                reason: format!("cell ({}, {}) is not covered", xs[i], ys[j]),
            });
        }

        Ok(Self {
            domain,
            rects,
            xs,
            ys,
            table,
        })
    }

    /// Start from the whole domain owned by `P0` and carve out regions.
    pub fn builder(domain: GlobalDomain) -> RectPartitionBuilder {
        RectPartitionBuilder {
            rects: vec![domain.rect()],
            domain,
        }
    }

    /// The rectangles, indexed by pid.
    pub fn rects(&self) -> &[IntRect] {
        &self.rects
    }
}

/// Position of an edge coordinate in a sorted, deduplicated edge list.
fn index_of(edges: &[i32], v: i32) -> usize {
    edges.partition_point(|&e| e < v)
}

/// Incrementally splits the domain into a non-uniform partition.
///
/// Each [`split_x`](Self::split_x) or [`split_y`](Self::split_y) cuts an
/// existing region in two and hands the upper part to a new pid.
#[derive(Clone, Debug)]
pub struct RectPartitionBuilder {
    domain: GlobalDomain,
    rects: Vec<IntRect>,
}

impl RectPartitionBuilder {
    /// Split `pid`'s region at column `x`; the new pid gets `[x, max.x)`.
    pub fn split_x(mut self, pid: Pid, x: i32) -> Result<Self, PartitionError> {
        let i = check_pid(pid, self.rects.len())?;
        let r = self.rects[i];
        if x <= r.min.x || x >= r.max.x {
            return Err(PartitionError::InvalidCoverage {
                reason: format!("column {x} does not split {r}"),
            });
        }
        self.rects[i] = IntRect::from_bounds(r.min.x, r.min.y, x, r.max.y);
        self.rects.push(IntRect::from_bounds(x, r.min.y, r.max.x, r.max.y));
        Ok(self)
    }

    /// Split `pid`'s region at row `y`; the new pid gets `[y, max.y)`.
    pub fn split_y(mut self, pid: Pid, y: i32) -> Result<Self, PartitionError> {
        let i = check_pid(pid, self.rects.len())?;
        let r = self.rects[i];
        if y <= r.min.y || y >= r.max.y {
            return Err(PartitionError::InvalidCoverage {
                reason: format!("row {y} does not split {r}"),
            });
        }
        self.rects[i] = IntRect::from_bounds(r.min.x, r.min.y, r.max.x, y);
        self.rects.push(IntRect::from_bounds(r.min.x, y, r.max.x, r.max.y));
        Ok(self)
    }

    /// Finish and validate.
    pub fn build(self) -> Result<RectPartition, PartitionError> {
        RectPartition::new(self.domain, self.rects)
    }
}

impl Partition for RectPartition {
    fn domain(&self) -> &GlobalDomain {
        &self.domain
    }

    fn num_partitions(&self) -> usize {
        self.rects.len()
    }

    fn owned_region(&self, pid: Pid) -> Result<IntRect, PartitionError> {
        let i = check_pid(pid, self.rects.len())?;
        Ok(self.rects[i])
    }

    fn to_partition_id(&self, point: GridPoint) -> Result<Pid, PartitionError> {
        let p = wrap_into(&self.domain, point)?;
        // Compressed cell i spans [xs[i], xs[i + 1]).
        let i = self.xs.partition_point(|&e| e <= p.x) - 1;
        let j = self.ys.partition_point(|&e| e <= p.y) - 1;
        let cols = self.xs.len() - 1;
        Ok(Pid(self.table[j * cols + i]))
    }
}
