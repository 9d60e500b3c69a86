//! The global simulation domain shared by every process.

use crate::error::{AccessError, ConfigError};
use crate::geom::{GridPoint, IntRect, Position};

/// How the domain treats points beyond its edges.
///
/// Analogous to a lattice's edge behaviour, but applied to the whole
/// partitioned domain: it decides whether halos wrap around to the opposite
/// side or stop at the edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Boundary {
    /// Edges are hard: points outside the domain do not exist and halos are
    /// clipped.
    Bounded,
    /// Periodic boundary (torus): points wrap and halos cross the edge.
    Toroidal,
}

/// Axis-aligned 2D domain `[0, width) x [0, height)`.
///
/// Immutable once the simulation starts; every process computes the same
/// geometry from it instead of broadcasting boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlobalDomain {
    width: u32,
    height: u32,
    boundary: Boundary,
}

impl GlobalDomain {
    /// Largest extent per axis: coordinates use `i32` and toroidal halos
    /// need room for one extra domain length on either side.
    pub const MAX_EXTENT: u32 = (i32::MAX / 4) as u32;

    /// Create a domain.
    ///
    /// Returns `Err(ConfigError::EmptyDomain)` if either extent is 0, or
    /// `Err(ConfigError::DomainTooLarge)` if an extent exceeds
    /// [`MAX_EXTENT`](Self::MAX_EXTENT).
    pub fn new(width: u32, height: u32, boundary: Boundary) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyDomain);
        }
        for (name, value) in [("width", width), ("height", height)] {
            if value > Self::MAX_EXTENT {
                return Err(ConfigError::DomainTooLarge {
                    name,
                    value,
                    max: Self::MAX_EXTENT,
                });
            }
        }
        Ok(Self {
            width,
            height,
            boundary,
        })
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Boundary mode.
    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// True for a periodic domain.
    pub fn is_toroidal(&self) -> bool {
        self.boundary == Boundary::Toroidal
    }

    /// The whole domain as a rectangle.
    pub fn rect(&self) -> IntRect {
        IntRect::from_bounds(0, 0, self.width as i32, self.height as i32)
    }

    /// Map `p` into the domain.
    ///
    /// Toroidal domains wrap any point with modular arithmetic. Bounded
    /// domains return `AccessError::OutOfDomain` for points outside.
    pub fn wrap_point(&self, p: GridPoint) -> Result<GridPoint, AccessError> {
        match self.boundary {
            Boundary::Toroidal => Ok(GridPoint::new(
                p.x.rem_euclid(self.width as i32),
                p.y.rem_euclid(self.height as i32),
            )),
            Boundary::Bounded if self.rect().contains(p) => Ok(p),
            Boundary::Bounded => Err(AccessError::OutOfDomain {
                point: format!("{p}"),
                domain: format!("{}", self.rect()),
            }),
        }
    }

    /// Map a continuous position into the domain (see [`wrap_point`](Self::wrap_point)).
    ///
    /// Non-finite coordinates are outside every domain, toroidal or not.
    pub fn wrap_position(&self, p: Position) -> Result<Position, AccessError> {
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(AccessError::OutOfDomain {
                point: format!("{p}"),
                domain: format!("{}", self.rect()),
            });
        }
        match self.boundary {
            Boundary::Toroidal => {
                let x = p.x.rem_euclid(self.width as f64);
                let y = p.y.rem_euclid(self.height as f64);
                // rem_euclid can round up to the modulus for tiny negatives.
                let x = if x >= self.width as f64 { 0.0 } else { x };
                let y = if y >= self.height as f64 { 0.0 } else { y };
                Ok(Position::new(x, y))
            }
            Boundary::Bounded if self.rect().contains_position(p) => Ok(p),
            Boundary::Bounded => Err(AccessError::OutOfDomain {
                point: format!("{p}"),
                domain: format!("{}", self.rect()),
            }),
        }
    }

    /// Translations under which the domain tiles the plane, in a fixed order.
    ///
    /// `[(0, 0)]` for bounded domains; the nine multiples of the extents
    /// (row-major, `(0, 0)` in the middle) for toroidal ones.
    pub fn wrap_shifts(&self) -> Vec<(i32, i32)> {
        match self.boundary {
            Boundary::Bounded => vec![(0, 0)],
            Boundary::Toroidal => {
                let (w, h) = (self.width as i32, self.height as i32);
                let mut out = Vec::with_capacity(9);
                for sy in [-h, 0, h] {
                    for sx in [-w, 0, w] {
                        out.push((sx, sy));
                    }
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_extent_is_rejected() {
        assert_eq!(
            GlobalDomain::new(0, 5, Boundary::Bounded),
            Err(ConfigError::EmptyDomain)
        );
    }

    #[test]
    fn toroidal_wraps_negative_points() {
        let d = GlobalDomain::new(10, 8, Boundary::Toroidal).unwrap();
        assert_eq!(
            d.wrap_point(GridPoint::new(-1, 9)).unwrap(),
            GridPoint::new(9, 1)
        );
    }

    #[test]
    fn bounded_rejects_outside_points() {
        let d = GlobalDomain::new(10, 8, Boundary::Bounded).unwrap();
        assert!(matches!(
            d.wrap_point(GridPoint::new(10, 0)),
            Err(AccessError::OutOfDomain { .. })
        ));
        assert_eq!(
            d.wrap_point(GridPoint::new(9, 7)).unwrap(),
            GridPoint::new(9, 7)
        );
    }

    #[test]
    fn toroidal_wraps_positions() {
        let d = GlobalDomain::new(10, 10, Boundary::Toroidal).unwrap();
        let p = d.wrap_position(Position::new(-0.5, 10.25)).unwrap();
        assert_eq!(p, Position::new(9.5, 0.25));
    }

    #[test]
    fn non_finite_positions_are_outside_every_domain() {
        for boundary in [Boundary::Toroidal, Boundary::Bounded] {
            let d = GlobalDomain::new(10, 8, boundary).unwrap();
            for p in [
                Position::new(f64::NAN, 1.0),
                Position::new(1.0, f64::NAN),
                Position::new(f64::INFINITY, 1.0),
                Position::new(1.0, f64::NEG_INFINITY),
            ] {
                assert!(
                    matches!(d.wrap_position(p), Err(AccessError::OutOfDomain { .. })),
                    "{boundary:?} accepted {p}"
                );
            }
            assert!(d.wrap_position(Position::new(9.5, 7.5)).is_ok());
        }
    }

    #[test]
    fn wrap_shifts_put_identity_in_the_middle() {
        let d = GlobalDomain::new(4, 6, Boundary::Toroidal).unwrap();
        let shifts = d.wrap_shifts();
        assert_eq!(shifts.len(), 9);
        assert_eq!(shifts[4], (0, 0));
        assert_eq!(shifts[0], (-4, -6));
        let b = GlobalDomain::new(4, 6, Boundary::Bounded).unwrap();
        assert_eq!(b.wrap_shifts(), vec![(0, 0)]);
    }
}
