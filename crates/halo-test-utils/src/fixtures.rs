//! Common domains and partitions.
//!
//! Every builder panics on invalid input; they are for tests only.

use halo_core::{Boundary, GlobalDomain, GridPoint, IntRect, Position};
use halo_space::{GridPartition, Partition};
use std::sync::Arc;

/// A `w × h` clamped domain.
pub fn bounded(w: u32, h: u32) -> GlobalDomain {
    GlobalDomain::new(w, h, Boundary::Bounded).expect("valid bounded domain")
}

/// A `w × h` wrapped domain.
pub fn toroidal(w: u32, h: u32) -> GlobalDomain {
    GlobalDomain::new(w, h, Boundary::Toroidal).expect("valid toroidal domain")
}

/// `n` vertical strips, pid 0 on the left.
pub fn columns(domain: GlobalDomain, n: u32) -> Arc<dyn Partition> {
    Arc::new(GridPartition::new(domain, n, 1).expect("valid column split"))
}

/// `px × py` blocks.
pub fn blocks(domain: GlobalDomain, px: u32, py: u32) -> Arc<dyn Partition> {
    Arc::new(GridPartition::new(domain, px, py).expect("valid block split"))
}

/// The most square split into `n` blocks.
pub fn balanced(domain: GlobalDomain, n: u32) -> Arc<dyn Partition> {
    Arc::new(GridPartition::balanced(domain, n).expect("valid balanced split"))
}

/// Centre cell of a rectangle (rounded down).
pub fn centre(rect: IntRect) -> GridPoint {
    GridPoint::new(
        rect.min.x + (rect.width() / 2) as i32,
        rect.min.y + (rect.height() / 2) as i32,
    )
}

/// Middle of a cell as a continuous position.
pub fn cell_centre(p: GridPoint) -> Position {
    Position::new(f64::from(p.x) + 0.5, f64::from(p.y) + 0.5)
}
