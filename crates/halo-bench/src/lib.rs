//! Benchmark profiles and model kernels for Halo.
//!
//! - [`heat_cluster`]: a square toroidal domain split into balanced blocks
//! - [`diffuse`]: one explicit five-point diffusion step over a node's
//!   owned cells, reading across partition cuts through the halo
//! - [`seed_walkers`]: deterministic walker placement inside a region

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use halo_core::{AccessError, Aoi, Boundary, ConfigError, Entity, EntityId, GlobalDomain, GridPoint, IntRect, Pid};
use halo_engine::{ClusterConfig, HaloField, NodeConfig, PartitionScheme};
use halo_storage::{GridStorage, Location, ObjectStorage};

/// A `side × side` torus cut into `partitions` balanced blocks, AOI 1.
pub fn heat_cluster(side: u32, partitions: u32) -> Result<ClusterConfig, ConfigError> {
    let cluster = ClusterConfig {
        domain: GlobalDomain::new(side, side, Boundary::Toroidal)?,
        partitions,
        scheme: PartitionScheme::Balanced,
        node: NodeConfig {
            aoi: Aoi::uniform(1),
            ..NodeConfig::default()
        },
    };
    cluster.validate()?;
    Ok(cluster)
}

/// One explicit diffusion step with coefficient `rate` (stable for
/// `rate <= 0.25`).
///
/// Reads the four neighbours of every owned cell, so the halo must be
/// current. Returns the total heat of the owned region afterwards.
pub fn diffuse(field: &mut HaloField<GridStorage<f64>>, rate: f64) -> Result<f64, AccessError> {
    let owned: Vec<(GridPoint, f64)> = field.iter_owned().collect();
    let mut next = Vec::with_capacity(owned.len());
    for &(p, v) in &owned {
        let mut lap = -4.0 * v;
        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
            lap += field.get(p.shift(dx, dy))?;
        }
        next.push((p, v + rate * lap));
    }
    let mut total = 0.0;
    for (p, v) in next {
        field.set(p, v)?;
        total += v;
    }
    Ok(total)
}

/// Place `count` entities on a diagonal lattice inside `region`, built by
/// `make` from ids allocated for `pid`.
pub fn seed_walkers<L, E>(
    field: &mut HaloField<ObjectStorage<L, E>>,
    region: IntRect,
    pid: Pid,
    count: usize,
    make: impl Fn(EntityId) -> E,
    place: impl Fn(GridPoint) -> L,
) -> Result<(), AccessError>
where
    L: Location,
    E: Entity,
{
    let area = region.area().max(1);
    for i in 0..count {
        let k = (i * 7919) % area;
        let p = GridPoint::new(
            region.min.x + (k % region.width() as usize) as i32,
            region.min.y + (k / region.width() as usize) as i32,
        );
        field.add(make(EntityId::compose(pid, i as u64)), place(p))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_cluster_is_valid() {
        let c = heat_cluster(64, 4).unwrap();
        assert_eq!(c.build_partition().unwrap().num_partitions(), 4);
    }

    #[test]
    fn tiny_blocks_rejected() {
        assert!(heat_cluster(4, 16).is_err());
    }
}
