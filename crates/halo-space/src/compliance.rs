//! Reusable invariant checks for `Partition` implementations.
//!
//! Every scheme runs `run_full_compliance` in its own tests; the
//! individual assertions are also used directly by layout proptests.

use crate::layout::{validate_aoi, HaloLayout};
use crate::partition::Partition;
use halo_core::{Aoi, Pid};

fn pids(p: &dyn Partition) -> impl Iterator<Item = Pid> {
    (0..p.num_partitions() as u32).map(Pid)
}

/// Regions stay inside the domain and every cell has exactly one owner.
pub(crate) fn assert_exact_cover(p: &dyn Partition) {
    let bounds = p.domain().rect();
    let regions = p.regions();
    assert_eq!(regions.len(), p.num_partitions());
    for r in &regions {
        assert!(bounds.contains_rect(r), "{r} leaves {bounds}");
        assert!(!r.is_empty(), "empty region {r}");
    }
    let total: usize = regions.iter().map(|r| r.area()).sum();
    assert_eq!(total, bounds.area(), "areas do not sum to the domain");
    for cell in bounds.iter() {
        let owners = regions.iter().filter(|r| r.contains(cell)).count();
        assert_eq!(owners, 1, "cell {cell} has {owners} owners");
    }
}

/// `to_partition_id` agrees with `owned_region` on every cell.
pub(crate) fn assert_lookup_consistent(p: &dyn Partition) {
    for pid in pids(p) {
        let r = p.owned_region(pid).unwrap();
        for cell in r.iter() {
            assert_eq!(p.to_partition_id(cell).unwrap(), pid, "cell {cell}");
        }
    }
}

/// `B ∈ neighbors(A)` iff `A ∈ neighbors(B)`.
pub(crate) fn assert_neighbors_symmetric(p: &dyn Partition, aoi: Aoi) {
    let layouts: Vec<HaloLayout> = pids(p)
        .map(|pid| HaloLayout::new(p, pid, aoi).unwrap())
        .collect();
    for a in &layouts {
        assert!(!a.neighbors().contains(&a.pid()), "{} neighbours itself", a.pid());
        for &b in a.neighbors() {
            assert!(
                layouts[b.index()].is_neighbor(a.pid()),
                "{b} is a neighbour of {} but not the reverse",
                a.pid()
            );
        }
    }
}

/// Every halo cell outside the owned region is covered by exactly one
/// incoming link, and each link reads from its supplier's owned region.
pub(crate) fn assert_halo_tiled(p: &dyn Partition, aoi: Aoi) {
    for pid in pids(p) {
        let layout = HaloLayout::new(p, pid, aoi).unwrap();
        for link in layout.incoming() {
            let supplier = p.owned_region(link.pid).unwrap();
            assert!(supplier.contains_rect(&link.source), "{link:?} reads outside {supplier}");
            assert_eq!(link.source.shift(link.shift.0, link.shift.1), link.target);
        }
        for cell in layout.halo().iter() {
            let cover = layout
                .incoming()
                .iter()
                .filter(|l| l.target.contains(cell))
                .count();
            let expected = usize::from(!layout.owned().contains(cell));
            assert_eq!(cover, expected, "{pid}: cell {cell} covered {cover} times");
        }
    }
}

/// What `A` sends to `B` matches what `B` expects from `A`, piece by piece.
pub(crate) fn assert_links_dual(p: &dyn Partition, aoi: Aoi) {
    let layouts: Vec<HaloLayout> = pids(p)
        .map(|pid| HaloLayout::new(p, pid, aoi).unwrap())
        .collect();
    for a in &layouts {
        for b in &layouts {
            let expects: Vec<_> = a
                .links_from(b.pid())
                .map(|l| (l.shift, l.source, l.target))
                .collect();
            let sends: Vec<_> = b
                .links_to(a.pid())
                .map(|l| (l.shift, l.source, l.target))
                .collect();
            assert_eq!(expects, sends, "{} -> {}", b.pid(), a.pid());
        }
    }
}

/// Run every check, with AOI 0 and the largest AOI of 1 the layout allows.
pub(crate) fn run_full_compliance(p: &dyn Partition) {
    assert_exact_cover(p);
    assert_lookup_consistent(p);
    for aoi in [Aoi::uniform(0), Aoi::uniform(1)] {
        if validate_aoi(p, aoi).is_err() {
            continue;
        }
        assert_neighbors_symmetric(p, aoi);
        assert_halo_tiled(p, aoi);
        assert_links_dual(p, aoi);
    }
}
