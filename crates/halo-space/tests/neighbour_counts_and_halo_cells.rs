use halo_core::{Aoi, Boundary, GlobalDomain, GridPoint, IntRect, Pid};
use halo_space::{neighbors, GridPartition, HaloLayout, Partition, RectPartition};

fn domain(w: u32, h: u32, boundary: Boundary) -> GlobalDomain {
    GlobalDomain::new(w, h, boundary).unwrap()
}

#[test]
fn grid_neighbour_counts_cover_corner_edge_and_interior_blocks() {
    let p = GridPartition::new(domain(40, 40, Boundary::Bounded), 4, 4).unwrap();
    let count = |pid| neighbors(&p, Pid(pid), Aoi::uniform(1)).unwrap().len();
    assert_eq!(count(0), 3);
    assert_eq!(count(1), 5);
    assert_eq!(count(5), 8);
    assert_eq!(count(15), 3);

    let torus = GridPartition::new(domain(40, 40, Boundary::Toroidal), 4, 4).unwrap();
    for pid in 0..16 {
        assert_eq!(neighbors(&torus, Pid(pid), Aoi::uniform(1)).unwrap().len(), 8);
    }
}

#[test]
fn nonuniform_neighbours_follow_contact_not_pid_order() {
    // Tall P1 on the right touches both stacked blocks on the left.
    let d = domain(30, 20, Boundary::Bounded);
    let p = RectPartition::builder(d)
        .split_x(Pid(0), 20)
        .unwrap()
        .split_y(Pid(0), 10)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(neighbors(&p, Pid(1), Aoi::uniform(2)).unwrap().as_slice(), &[Pid(0), Pid(2)]);
    assert_eq!(neighbors(&p, Pid(0), Aoi::uniform(2)).unwrap().as_slice(), &[Pid(1), Pid(2)]);
}

#[test]
fn halo_cell_count_matches_ring_area() {
    let p = GridPartition::new(domain(60, 60, Boundary::Toroidal), 3, 3).unwrap();
    let layout = HaloLayout::new(&p, Pid(4), Aoi { x: 2, y: 3 }).unwrap();
    assert_eq!(layout.owned(), IntRect::from_bounds(20, 20, 40, 40));
    assert_eq!(layout.halo_cells(), 24 * 26 - 20 * 20);
    assert_eq!(layout.incoming().len(), 8);
}

#[test]
fn every_domain_cell_has_a_single_owner_through_the_trait_object() {
    let p: Box<dyn Partition> =
        Box::new(GridPartition::balanced(domain(17, 11, Boundary::Toroidal), 6).unwrap());
    let mut owned = vec![0usize; p.num_partitions()];
    for y in 0..11 {
        for x in 0..17 {
            owned[p.to_partition_id(GridPoint::new(x, y)).unwrap().index()] += 1;
        }
    }
    let areas: Vec<usize> = p.regions().iter().map(|r| r.area()).collect();
    assert_eq!(owned, areas);
}
