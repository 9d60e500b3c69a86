//! Where an entity sits: a grid cell or a continuous position.

use halo_core::{AccessError, GlobalDomain, GridPoint, Position, Wire};
use std::fmt;

/// A point type an [`ObjectStorage`](crate::ObjectStorage) can index.
///
/// Every location falls in exactly one unit grid cell, which decides its
/// owner and its bucket.
pub trait Location: Copy + PartialEq + fmt::Debug + fmt::Display + Send + Sync + Wire + 'static {
    /// The unit cell containing this location.
    fn cell(self) -> GridPoint;

    /// Translate by whole cells.
    fn shift(self, dx: i32, dy: i32) -> Self;

    /// Euclidean distance.
    fn distance(self, other: Self) -> f64;

    /// Map into `domain`, wrapping on a torus.
    fn wrap(self, domain: &GlobalDomain) -> Result<Self, AccessError>;
}

impl Location for GridPoint {
    fn cell(self) -> GridPoint {
        self
    }

    fn shift(self, dx: i32, dy: i32) -> Self {
        GridPoint::shift(self, dx, dy)
    }

    fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }

    fn wrap(self, domain: &GlobalDomain) -> Result<Self, AccessError> {
        domain.wrap_point(self)
    }
}

impl Location for Position {
    fn cell(self) -> GridPoint {
        self.floor()
    }

    fn shift(self, dx: i32, dy: i32) -> Self {
        Position::shift(self, f64::from(dx), f64::from(dy))
    }

    fn distance(self, other: Self) -> f64 {
        Position::distance(self, other)
    }

    fn wrap(self, domain: &GlobalDomain) -> Result<Self, AccessError> {
        domain.wrap_position(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo_core::Boundary;

    #[test]
    fn position_cell_floors_negative() {
        assert_eq!(Position::new(-0.25, 3.75).cell(), GridPoint::new(-1, 3));
    }

    #[test]
    fn grid_distance_is_euclidean() {
        assert_eq!(GridPoint::new(0, 0).distance(GridPoint::new(3, 4)), 5.0);
    }

    #[test]
    fn shift_keeps_fraction() {
        let p = Location::shift(Position::new(1.5, 2.25), -10, 10);
        assert_eq!(p, Position::new(-8.5, 12.25));
    }

    #[test]
    fn wrap_follows_domain() {
        let d = GlobalDomain::new(10, 10, Boundary::Toroidal).unwrap();
        assert_eq!(GridPoint::new(-1, 12).wrap(&d).unwrap(), GridPoint::new(9, 2));
        let b = GlobalDomain::new(10, 10, Boundary::Bounded).unwrap();
        assert!(Position::new(10.0, 0.0).wrap(&b).is_err());
    }
}
