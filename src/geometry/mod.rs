//! Geometric primitives: points, rectangles and affine matrices.
//!
//! Coordinates are PDF user-space units (1/72 inch) with the origin at the
//! lower-left corner and y growing upward.

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_ferrite::geometry::Point;
    ///
    /// let point = Point::new(10.0, 20.0);
    /// assert_eq!(point.x, 10.0);
    /// assert_eq!(point.y, 20.0);
    /// ```
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True if both coordinates are within `eps` of `other`'s.
    pub fn approx_eq(&self, other: &Point, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

/// An axis-aligned rectangle given by its lower-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X coordinate of the lower-left corner
    pub x: f64,
    /// Y coordinate of the lower-left corner
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two opposite corners, in any order.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_ferrite::geometry::Rect;
    ///
    /// let rect = Rect::from_points(110.0, 70.0, 10.0, 20.0);
    /// assert_eq!(rect.x, 10.0);
    /// assert_eq!(rect.y, 20.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn from_points(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let (left, right) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (bottom, top) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self {
            x: left,
            y: bottom,
            width: right - left,
            height: top - bottom,
        }
    }

    /// Parse a PDF rectangle array `[llx lly urx ury]`.
    pub fn from_array(values: &[crate::object::Object]) -> Option<Self> {
        if values.len() != 4 {
            return None;
        }
        let mut n = [0.0; 4];
        for (slot, v) in n.iter_mut().zip(values) {
            *slot = v.as_number()?;
        }
        Some(Self::from_points(n[0], n[1], n[2], n[3]))
    }

    /// The rectangle as a PDF array `[llx lly urx ury]`.
    pub fn to_array(&self) -> Vec<crate::object::Object> {
        vec![
            self.left().into(),
            self.bottom().into(),
            self.right().into(),
            self.top().into(),
        ]
    }

    /// Left edge.
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y
    }

    /// Top edge.
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Check if this rectangle contains a point (edges included).
    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.bottom() && p.y <= self.top()
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_points(
            self.left().min(other.left()),
            self.bottom().min(other.bottom()),
            self.right().max(other.right()),
            self.top().max(other.top()),
        )
    }

    /// Bounding box of a set of points, or `None` for an empty set.
    pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in iter {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Some(Rect::from_points(x0, y0, x1, y1))
    }
}

/// Affine transformation `[a b c d e f]`, acting on row vectors:
///
/// ```text
/// [x' y' 1] = [x y 1] × | a b 0 |
///                       | c d 0 |
///                       | e f 1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Horizontal scaling component
    pub a: f64,
    /// Rotation/skew component
    pub b: f64,
    /// Rotation/skew component
    pub c: f64,
    /// Vertical scaling component
    pub d: f64,
    /// Horizontal translation
    pub e: f64,
    /// Vertical translation
    pub f: f64,
}

impl Matrix {
    /// The identity matrix.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// Matrix from its six components.
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Matrix from a PDF array of six numbers.
    pub fn from_array(values: &[crate::object::Object]) -> Option<Self> {
        if values.len() != 6 {
            return None;
        }
        let mut n = [0.0; 6];
        for (slot, v) in n.iter_mut().zip(values) {
            *slot = v.as_number()?;
        }
        Some(Self::new(n[0], n[1], n[2], n[3], n[4], n[5]))
    }

    /// Translation by `(tx, ty)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_ferrite::geometry::Matrix;
    ///
    /// let m = Matrix::translation(10.0, 20.0);
    /// let p = m.transform_point(5.0, 10.0);
    /// assert_eq!((p.x, p.y), (15.0, 30.0));
    /// ```
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Scaling by `(sx, sy)`.
    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Counter-clockwise rotation by `degrees`.
    pub fn rotation(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// `self × other`: apply `self` first, then `other`.
    ///
    /// `cm` concatenates as `new_ctm = operand × ctm`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Transform a point.
    pub fn transform_point(&self, x: f64, y: f64) -> Point {
        Point {
            x: self.a * x + self.c * y + self.e,
            y: self.b * x + self.d * y + self.f,
        }
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse, if the matrix is invertible.
    pub fn inverse(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Matrix {
            a,
            b,
            c,
            d,
            e: -(self.e * a + self.f * c),
            f: -(self.e * b + self.f * d),
        })
    }

    /// Components as a PDF array.
    pub fn to_array(&self) -> Vec<crate::object::Object> {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .iter()
            .map(|v| (*v).into())
            .collect()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    #[test]
    fn test_rect_from_points_normalizes() {
        let r = Rect::from_points(110.0, 70.0, 10.0, 20.0);
        assert_eq!((r.left(), r.bottom(), r.right(), r.top()), (10.0, 20.0, 110.0, 70.0));
    }

    #[test]
    fn test_rect_from_array() {
        let arr = vec![Object::Integer(0), Object::Integer(0), Object::Real(612.0), Object::Integer(792)];
        let r = Rect::from_array(&arr).unwrap();
        assert_eq!((r.width, r.height), (612.0, 792.0));
        assert!(Rect::from_array(&arr[..3]).is_none());
    }

    #[test]
    fn test_rect_union_and_bounding() {
        let r1 = Rect::new(0.0, 0.0, 50.0, 50.0);
        let r2 = Rect::new(25.0, 25.0, 50.0, 50.0);
        assert_eq!(r1.union(&r2), Rect::new(0.0, 0.0, 75.0, 75.0));
        let b = Rect::bounding([Point::new(3.0, 1.0), Point::new(-1.0, 4.0)]).unwrap();
        assert_eq!(b, Rect::new(-1.0, 1.0, 4.0, 3.0));
        assert!(Rect::bounding(Vec::new()).is_none());
    }

    #[test]
    fn test_matrix_multiply_order() {
        // Scale then translate
        let m = Matrix::scaling(2.0, 2.0).multiply(&Matrix::translation(10.0, 0.0));
        let p = m.transform_point(1.0, 1.0);
        assert_eq!((p.x, p.y), (12.0, 2.0));
    }

    #[test]
    fn test_rotation_90_transforms_baseline() {
        let m = Matrix::rotation(90.0);
        let start = m.transform_point(0.0, 0.0);
        let end = m.transform_point(100.0, 0.0);
        assert!(start.approx_eq(&Point::new(0.0, 0.0), 1e-9));
        assert!(end.approx_eq(&Point::new(0.0, 100.0), 1e-9));
    }

    #[test]
    fn test_inverse() {
        let m = Matrix::new(2.0, 0.0, 0.0, 4.0, 10.0, 20.0);
        let inv = m.inverse().unwrap();
        let p = inv.transform_point(12.0, 24.0);
        assert!(p.approx_eq(&Point::new(1.0, 1.0), 1e-12));
        assert!(Matrix::scaling(0.0, 1.0).inverse().is_none());
    }
}
