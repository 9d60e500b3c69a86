//! Uniform block decomposition of the domain.

use crate::partition::{check_pid, wrap_into, Partition};
use halo_core::{ConfigError, GlobalDomain, GridPoint, IntRect, PartitionError, Pid};

/// Split `extent` into `parts` contiguous blocks whose sizes differ by at
/// most one; the remainder goes to the leading blocks.
///
/// Returns the `parts + 1` cut positions.
fn cuts(extent: u32, parts: u32) -> Vec<i32> {
    let base = extent / parts;
    let rem = extent % parts;
    (0..=parts)
        .map(|i| (i * base + i.min(rem)) as i32)
        .collect()
}

/// Block index containing coordinate `c` along one axis.
///
/// `c` must already lie in `[0, extent)`.
fn block_of(c: i32, extent: u32, parts: u32) -> u32 {
    let base = (extent / parts) as i32;
    let rem = (extent % parts) as i32;
    let wide = rem * (base + 1);
    if c < wide {
        (c / (base + 1)) as u32
    } else {
        (rem + (c - wide) / base) as u32
    }
}

/// A `px × py` grid of blocks over the domain.
///
/// Pids are assigned row-major: block `(bx, by)` belongs to
/// `Pid(by * px + bx)`. Lookup is O(1).
///
/// # Examples
///
/// ```
/// use halo_core::{Boundary, GlobalDomain, GridPoint, Pid};
/// use halo_space::{GridPartition, Partition};
///
/// let domain = GlobalDomain::new(100, 100, Boundary::Bounded).unwrap();
/// let part = GridPartition::new(domain, 2, 2).unwrap();
/// assert_eq!(part.to_partition_id(GridPoint::new(75, 25)).unwrap(), Pid(1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridPartition {
    domain: GlobalDomain,
    px: u32,
    py: u32,
    x_cuts: Vec<i32>,
    y_cuts: Vec<i32>,
}

impl GridPartition {
    /// Decompose `domain` into `px` columns and `py` rows of blocks.
    ///
    /// Fails if either count is zero or exceeds the extent on its axis.
    pub fn new(domain: GlobalDomain, px: u32, py: u32) -> Result<Self, ConfigError> {
        if px == 0 || py == 0 {
            return Err(ConfigError::ZeroPartitions);
        }
        if px > domain.width() || py > domain.height() {
            return Err(ConfigError::InvalidDecomposition {
                reason: format!(
                    "{px}x{py} blocks do not fit a {}x{} domain",
                    domain.width(),
                    domain.height()
                ),
            });
        }
        Ok(Self {
            x_cuts: cuts(domain.width(), px),
            y_cuts: cuts(domain.height(), py),
            domain,
            px,
            py,
        })
    }

    /// Decompose into `n` blocks, choosing the factorisation `px × py = n`
    /// whose blocks are closest to square.
    ///
    /// Ties go to the smaller `px`, so every process derives the same grid.
    pub fn balanced(domain: GlobalDomain, n: u32) -> Result<Self, ConfigError> {
        if n == 0 {
            return Err(ConfigError::ZeroPartitions);
        }
        let (w, h) = (domain.width() as f64, domain.height() as f64);
        let mut best: Option<(f64, u32)> = None;
        for px in (1..=n).filter(|px| n % px == 0) {
            let py = n / px;
            if px > domain.width() || py > domain.height() {
                continue;
            }
            let (bw, bh) = (w / px as f64, h / py as f64);
            let skew = bw.max(bh) / bw.min(bh);
            if best.is_none_or(|(s, _)| skew < s) {
                best = Some((skew, px));
            }
        }
        match best {
            Some((_, px)) => Self::new(domain, px, n / px),
            None => Err(ConfigError::InvalidDecomposition {
                reason: format!(
                    "{n} partitions cannot tile a {}x{} domain",
                    domain.width(),
                    domain.height()
                ),
            }),
        }
    }

    /// Blocks per row.
    pub fn px(&self) -> u32 {
        self.px
    }

    /// Blocks per column.
    pub fn py(&self) -> u32 {
        self.py
    }
}

impl Partition for GridPartition {
    fn domain(&self) -> &GlobalDomain {
        &self.domain
    }

    fn num_partitions(&self) -> usize {
        (self.px * self.py) as usize
    }

    fn owned_region(&self, pid: Pid) -> Result<IntRect, PartitionError> {
        let i = check_pid(pid, self.num_partitions())?;
        let bx = i % self.px as usize;
        let by = i / self.px as usize;
        Ok(IntRect::from_bounds(
            self.x_cuts[bx],
            self.y_cuts[by],
            self.x_cuts[bx + 1],
            self.y_cuts[by + 1],
        ))
    }

    fn to_partition_id(&self, point: GridPoint) -> Result<Pid, PartitionError> {
        let p = wrap_into(&self.domain, point)?;
        let bx = block_of(p.x, self.domain.width(), self.px);
        let by = block_of(p.y, self.domain.height(), self.py);
        Ok(Pid(by * self.px + bx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance;
    use halo_core::Boundary;
    use proptest::prelude::*;

    fn domain(w: u32, h: u32, boundary: Boundary) -> GlobalDomain {
        GlobalDomain::new(w, h, boundary).unwrap()
    }

    // ── Construction ────────────────────────────────────────────

    #[test]
    fn two_by_two_regions() {
        let p = GridPartition::new(domain(100, 100, Boundary::Bounded), 2, 2).unwrap();
        assert_eq!(p.num_partitions(), 4);
        assert_eq!(p.owned_region(Pid(0)).unwrap(), IntRect::from_bounds(0, 0, 50, 50));
        assert_eq!(p.owned_region(Pid(1)).unwrap(), IntRect::from_bounds(50, 0, 100, 50));
        assert_eq!(p.owned_region(Pid(2)).unwrap(), IntRect::from_bounds(0, 50, 50, 100));
        assert_eq!(p.owned_region(Pid(3)).unwrap(), IntRect::from_bounds(50, 50, 100, 100));
    }

    #[test]
    fn remainder_goes_to_leading_blocks() {
        let p = GridPartition::new(domain(10, 1, Boundary::Bounded), 3, 1).unwrap();
        let widths: Vec<u32> = p.regions().iter().map(|r| r.width()).collect();
        assert_eq!(widths, vec![4, 3, 3]);
    }

    #[test]
    fn zero_blocks_rejected() {
        let d = domain(10, 10, Boundary::Bounded);
        assert_eq!(GridPartition::new(d, 0, 2), Err(ConfigError::ZeroPartitions));
    }

    #[test]
    fn more_blocks_than_cells_rejected() {
        let d = domain(4, 4, Boundary::Bounded);
        assert!(matches!(
            GridPartition::new(d, 5, 1),
            Err(ConfigError::InvalidDecomposition { .. })
        ));
    }

    #[test]
    fn unknown_pid_rejected() {
        let p = GridPartition::new(domain(10, 10, Boundary::Bounded), 2, 1).unwrap();
        assert_eq!(
            p.owned_region(Pid(2)),
            Err(PartitionError::UnknownPid { pid: Pid(2), count: 2 })
        );
    }

    // ── Balanced ────────────────────────────────────────────────

    #[test]
    fn balanced_square_domain_four() {
        let p = GridPartition::balanced(domain(100, 100, Boundary::Bounded), 4).unwrap();
        assert_eq!((p.px(), p.py()), (2, 2));
    }

    #[test]
    fn balanced_wide_domain_prefers_columns() {
        let p = GridPartition::balanced(domain(400, 100, Boundary::Bounded), 4).unwrap();
        assert_eq!((p.px(), p.py()), (4, 1));
    }

    #[test]
    fn balanced_prime_count_on_square() {
        let p = GridPartition::balanced(domain(60, 60, Boundary::Bounded), 3).unwrap();
        assert_eq!((p.px(), p.py()), (1, 3));
    }

    #[test]
    fn balanced_impossible_rejected() {
        let d = domain(2, 2, Boundary::Bounded);
        assert!(GridPartition::balanced(d, 7).is_err());
    }

    // ── Lookup ──────────────────────────────────────────────────

    #[test]
    fn lookup_matches_regions() {
        let p = GridPartition::new(domain(10, 7, Boundary::Bounded), 3, 2).unwrap();
        compliance::assert_lookup_consistent(&p);
    }

    #[test]
    fn bounded_lookup_outside_fails() {
        let p = GridPartition::new(domain(10, 10, Boundary::Bounded), 2, 2).unwrap();
        assert!(matches!(
            p.to_partition_id(GridPoint::new(-1, 3)),
            Err(PartitionError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn toroidal_lookup_wraps() {
        let p = GridPartition::new(domain(10, 10, Boundary::Toroidal), 2, 2).unwrap();
        assert_eq!(p.to_partition_id(GridPoint::new(-1, -1)).unwrap(), Pid(3));
        assert_eq!(p.to_partition_id(GridPoint::new(10, 3)).unwrap(), Pid(0));
    }

    #[test]
    fn lookup_by_position() {
        use halo_core::Position;
        let p = GridPartition::new(domain(10, 10, Boundary::Bounded), 2, 1).unwrap();
        assert_eq!(p.to_partition_id_at(Position::new(4.99, 9.5)).unwrap(), Pid(0));
        assert_eq!(p.to_partition_id_at(Position::new(5.0, 0.0)).unwrap(), Pid(1));
    }

    #[test]
    fn downcast_through_trait_object() {
        let p: Box<dyn Partition> =
            Box::new(GridPartition::new(domain(8, 8, Boundary::Bounded), 2, 2).unwrap());
        assert_eq!(p.downcast_ref::<GridPartition>().map(|g| g.px()), Some(2));
    }

    // ── Compliance ──────────────────────────────────────────────

    #[test]
    fn compliance_bounded() {
        let p = GridPartition::new(domain(13, 9, Boundary::Bounded), 3, 2).unwrap();
        compliance::run_full_compliance(&p);
    }

    #[test]
    fn compliance_toroidal() {
        let p = GridPartition::new(domain(12, 12, Boundary::Toroidal), 3, 3).unwrap();
        compliance::run_full_compliance(&p);
    }

    proptest! {
        #[test]
        fn coverage_is_exact(w in 1u32..40, h in 1u32..40, px in 1u32..6, py in 1u32..6) {
            prop_assume!(px <= w && py <= h);
            let p = GridPartition::new(domain(w, h, Boundary::Bounded), px, py).unwrap();
            compliance::assert_exact_cover(&p);
        }

        #[test]
        fn block_sizes_differ_by_at_most_one(w in 1u32..64, px in 1u32..9) {
            prop_assume!(px <= w);
            let p = GridPartition::new(domain(w, 1, Boundary::Bounded), px, 1).unwrap();
            let widths: Vec<u32> = p.regions().iter().map(|r| r.width()).collect();
            let lo = widths.iter().min().copied().unwrap();
            let hi = widths.iter().max().copied().unwrap();
            prop_assert!(hi - lo <= 1);
        }
    }
}
