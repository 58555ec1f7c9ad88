//! Geometric primitives for diagram layout and edge routing.
//!
//! Entity boxes are [`Bounds`] built from a top-left [`Point`] and a
//! [`Size`]. Relationship endpoints come from [`rectangle_boundary_point`],
//! and [`distance_to_polyline`] backs hit testing of relationship paths.
//! [`Insets`] pad content bounds when fitting a diagram to its viewport.
//!
//! The y axis points down, as in SVG.

use serde::{Deserialize, Serialize};

/// A 2D point in diagram coordinate space.
///
/// ```
/// # use schemascope_core::geometry::Point;
/// let top_left = Point::new(40.0, 60.0);
/// let grab = Point::new(55.0, 70.0);
///
/// let offset = grab.sub_point(top_left);
/// assert_eq!(offset, Point::new(15.0, 10.0));
/// assert_eq!(top_left.midpoint(grab), Point::new(47.5, 65.0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn x(self) -> f32 {
        self.x
    }

    pub fn y(self) -> f32 {
        self.y
    }

    /// Checks if both x and y coordinates are zero
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Adds another point to this point, returning a new point.
    pub fn add_point(self, other: Point) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Subtracts another point from this point, returning a new point
    pub fn sub_point(self, other: Point) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Point halfway to `other`.
    pub fn midpoint(self, other: Point) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    /// Calculates the Euclidean length of this point seen as a vector
    pub fn hypot(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f32 {
        self.sub_point(other).hypot()
    }

    /// Multiplies both coordinates by the given factor.
    pub fn scale(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    /// Returns true when both coordinates are finite
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Width and height of an entity box or the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn width(self) -> f32 {
        self.width
    }

    pub fn height(self) -> f32 {
        self.height
    }

    /// Component-wise maximum.
    pub fn max(self, other: Size) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }

    /// Returns true if the size covers no area
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Returns half of this size as a point offset
    pub fn half(self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Axis-aligned rectangle in diagram space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    pub fn new_from_center(center: Point, size: Size) -> Self {
        Self::new_from_top_left(center.sub_point(size.half()), size)
    }

    /// Bounds of a box whose top-left corner is `top_left`.
    pub fn new_from_top_left(top_left: Point, size: Size) -> Self {
        Self {
            min_x: top_left.x,
            min_y: top_left.y,
            max_x: top_left.x + size.width,
            max_y: top_left.y + size.height,
        }
    }

    pub fn min_x(self) -> f32 {
        self.min_x
    }

    pub fn min_y(self) -> f32 {
        self.min_y
    }

    pub fn max_x(self) -> f32 {
        self.max_x
    }

    pub fn max_y(self) -> f32 {
        self.max_y
    }

    pub fn center(self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn width(self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(self) -> f32 {
        self.max_y - self.min_y
    }

    /// Top-left corner.
    pub fn min_point(self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    pub fn to_size(self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Returns true if the point lies inside or on the edge of the bounds
    pub fn contains(self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Smallest bounds containing both.
    ///
    /// # Examples
    ///
    /// ```
    /// # use schemascope_core::geometry::{Bounds, Point, Size};
    /// let users = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(100.0, 30.0));
    /// let orders = Bounds::new_from_top_left(Point::new(10.0, 40.0), Size::new(120.0, 80.0));
    ///
    /// let combined = users.merge(&orders);
    /// assert_eq!(combined.min_x(), 0.0);
    /// assert_eq!(combined.width(), 130.0);
    /// assert_eq!(combined.height(), 120.0);
    /// ```
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grows the bounds outward by the given insets
    pub fn add_padding(&self, insets: Insets) -> Self {
        Self {
            min_x: self.min_x - insets.left,
            min_y: self.min_y - insets.top,
            max_x: self.max_x + insets.right,
            max_y: self.max_y + insets.bottom,
        }
    }
}

/// Padding/margin values for the four sides of a rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Insets {
    top: f32,
    right: f32,
    bottom: f32,
    left: f32,
}

impl Insets {
    /// Creates insets with individual values, clockwise from the top
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Creates insets with the same value on every side
    pub fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn top(self) -> f32 {
        self.top
    }

    pub fn left(self) -> f32 {
        self.left
    }

    /// Sum of left and right insets
    pub fn horizontal_sum(self) -> f32 {
        self.left + self.right
    }

    /// Sum of top and bottom insets
    pub fn vertical_sum(self) -> f32 {
        self.top + self.bottom
    }
}

/// Finds where a ray from the center of a rectangle toward `toward` crosses
/// the rectangle's boundary.
///
/// The ray's angle decides which pair of edges it leaves through: when
/// `|tan(angle)|` is smaller than `height / width` the ray exits through the
/// left or right edge, otherwise through the top or bottom edge. The
/// comparison is done on the direction vector so vertical rays never divide
/// by zero.
///
/// When `toward` coincides with `center` there is no direction and the
/// center itself is returned.
///
/// # Examples
///
/// ```
/// # use schemascope_core::geometry::{rectangle_boundary_point, Point, Size};
/// let center = Point::new(100.0, 100.0);
/// let size = Size::new(80.0, 40.0);
///
/// let right = rectangle_boundary_point(center, size, Point::new(300.0, 100.0));
/// assert_eq!(right, Point::new(140.0, 100.0));
///
/// let below = rectangle_boundary_point(center, size, Point::new(100.0, 300.0));
/// assert_eq!(below, Point::new(100.0, 120.0));
/// ```
pub fn rectangle_boundary_point(center: Point, size: Size, toward: Point) -> Point {
    let delta = toward.sub_point(center);
    if delta.is_zero() {
        return center;
    }

    let half = size.half();
    // |dy/dx| < h/w, rearranged to avoid the division
    let crosses_side = delta.y.abs() * size.width < size.height * delta.x.abs();

    let t = if crosses_side || delta.y == 0.0 {
        half.x / delta.x.abs()
    } else {
        half.y / delta.y.abs()
    };

    center.add_point(delta.scale(t))
}

/// Shortest distance from `point` to the segment `a`-`b`
pub fn distance_to_segment(point: Point, a: Point, b: Point) -> f32 {
    let ab = b.sub_point(a);
    let length_sq = ab.x * ab.x + ab.y * ab.y;
    if length_sq == 0.0 {
        return point.distance(a);
    }

    let ap = point.sub_point(a);
    let t = ((ap.x * ab.x + ap.y * ab.y) / length_sq).clamp(0.0, 1.0);
    point.distance(a.add_point(ab.scale(t)))
}

/// Shortest distance from `point` to any segment of `path`.
///
/// Returns `f32::INFINITY` for an empty path.
pub fn distance_to_polyline(point: Point, path: &[Point]) -> f32 {
    match path {
        [] => f32::INFINITY,
        [only] => point.distance(*only),
        _ => path
            .windows(2)
            .map(|segment| distance_to_segment(point, segment[0], segment[1]))
            .fold(f32::INFINITY, f32::min),
    }
}
