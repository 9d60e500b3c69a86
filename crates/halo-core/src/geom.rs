//! Two-dimensional geometry: points, positions, and half-open rectangles.

use std::fmt;

/// A discrete cell coordinate.
///
/// Coordinates may be negative or lie past the domain's far edge when they
/// are expressed in a partition's *extended* halo coordinates on a toroidal
/// domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPoint {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridPoint {
    /// Construct a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate by `(dx, dy)`.
    pub fn shift(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for GridPoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// A continuous location in the domain.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Construct a position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by `(dx, dy)`.
    pub fn shift(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// The cell containing this position.
    pub fn floor(self) -> GridPoint {
        GridPoint::new(self.x.floor() as i32, self.y.floor() as i32)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Area of interest: how far beyond its owned region a partition must see.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Aoi {
    /// Radius along x.
    pub x: u32,
    /// Radius along y.
    pub y: u32,
}

impl Aoi {
    /// Same radius on both axes.
    pub const fn uniform(r: u32) -> Self {
        Self { x: r, y: r }
    }
}

/// Axis-aligned half-open rectangle `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntRect {
    /// Inclusive lower corner.
    pub min: GridPoint,
    /// Exclusive upper corner.
    pub max: GridPoint,
}

impl IntRect {
    /// Rectangle spanning `[min, max)`.
    pub const fn new(min: GridPoint, max: GridPoint) -> Self {
        Self { min, max }
    }

    /// Rectangle from raw bounds `x0..x1`, `y0..y1`.
    pub const fn from_bounds(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self::new(GridPoint::new(x0, y0), GridPoint::new(x1, y1))
    }

    /// Number of columns (0 if empty).
    pub fn width(&self) -> u32 {
        (self.max.x - self.min.x).max(0) as u32
    }

    /// Number of rows (0 if empty).
    pub fn height(&self) -> u32 {
        (self.max.y - self.min.y).max(0) as u32
    }

    /// Number of cells.
    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// True if the rectangle holds no cells.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True if `p` lies inside.
    pub fn contains(&self, p: GridPoint) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    /// True if the continuous position lies inside.
    pub fn contains_position(&self, p: Position) -> bool {
        p.x >= self.min.x as f64
            && p.x < self.max.x as f64
            && p.y >= self.min.y as f64
            && p.y < self.max.y as f64
    }

    /// True if `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &IntRect) -> bool {
        other.is_empty()
            || (other.min.x >= self.min.x
                && other.min.y >= self.min.y
                && other.max.x <= self.max.x
                && other.max.y <= self.max.y)
    }

    /// Intersection, or `None` when the rectangles do not overlap.
    pub fn intersect(&self, other: &IntRect) -> Option<IntRect> {
        let r = IntRect::from_bounds(
            self.min.x.max(other.min.x),
            self.min.y.max(other.min.y),
            self.max.x.min(other.max.x),
            self.max.y.min(other.max.y),
        );
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }

    /// Grow by `aoi` on every side.
    pub fn expand(&self, aoi: Aoi) -> IntRect {
        let (ax, ay) = (aoi.x as i32, aoi.y as i32);
        IntRect::from_bounds(
            self.min.x - ax,
            self.min.y - ay,
            self.max.x + ax,
            self.max.y + ay,
        )
    }

    /// Translate by `(dx, dy)`.
    pub fn shift(&self, dx: i32, dy: i32) -> IntRect {
        IntRect::new(self.min.shift(dx, dy), self.max.shift(dx, dy))
    }

    /// Clip to `bounds`; may produce an empty rectangle.
    pub fn clip(&self, bounds: &IntRect) -> IntRect {
        self.intersect(bounds).unwrap_or(IntRect::new(self.min, self.min))
    }

    /// Row-major offset of `p` within the rectangle. `p` must be inside.
    pub fn offset_of(&self, p: GridPoint) -> usize {
        (p.y - self.min.y) as usize * self.width() as usize + (p.x - self.min.x) as usize
    }

    /// Iterate every point in row-major order (`y` outer, `x` inner).
    pub fn iter(&self) -> impl Iterator<Item = GridPoint> {
        let (x0, x1) = (self.min.x, self.max.x);
        (self.min.y..self.max.y).flat_map(move |y| (x0..x1).map(move |x| GridPoint::new(x, y)))
    }
}

impl fmt::Display for IntRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}..{}) x [{}..{})",
            self.min.x, self.max.x, self.min.y, self.max.y
        )
    }
}
