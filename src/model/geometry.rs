//! Planar geometry primitives shared by the annotation model, the
//! perspective helper and the matching engine.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Tolerance below which a cross product is treated as zero (parallel lines,
/// degenerate polygons).
const PARALLEL_EPSILON: f64 = 1e-12;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Manhattan distance to another point.
    pub fn manhattan_distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Cross product of this point and another, both taken as vectors.
    pub fn cross(&self, other: &Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Dot product of this point and another, both taken as vectors.
    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Midpoint between this point and another.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// A directed line segment. Also used to represent the infinite line through
/// its two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub p1: Point,
    pub p2: Point,
}

impl Segment {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    /// The vector from `p1` to `p2`.
    pub fn delta(&self) -> Point {
        self.p2 - self.p1
    }

    pub fn length(&self) -> f64 {
        self.p1.distance_to(&self.p2)
    }

    /// Unit direction vector, or the zero vector for a degenerate segment.
    pub fn unit(&self) -> Point {
        let len = self.length();
        if len <= PARALLEL_EPSILON {
            Point::default()
        } else {
            self.delta() * (1.0 / len)
        }
    }

    /// Intersection of the infinite lines through the two segments.
    /// Returns `None` when the lines are parallel (or degenerate).
    pub fn line_intersection(&self, other: &Segment) -> Option<Point> {
        let d1 = self.delta();
        let d2 = other.delta();
        let denom = d1.cross(&d2);
        if denom.abs() <= PARALLEL_EPSILON {
            return None;
        }
        let t = (other.p1 - self.p1).cross(&d2) / denom;
        Some(self.p1 + d1 * t)
    }

    /// Whether the two bounded segments cross each other.
    pub fn crosses(&self, other: &Segment) -> bool {
        let d1 = self.delta();
        let d2 = other.delta();
        let denom = d1.cross(&d2);
        if denom.abs() <= PARALLEL_EPSILON {
            return false;
        }
        let t = (other.p1 - self.p1).cross(&d2) / denom;
        let u = (other.p1 - self.p1).cross(&d1) / denom;
        (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// An ordered, implicitly closed sequence of points. Used both for the
/// 4-point perspective frames and for general character boxes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Signed area (shoelace). Positive for counter-clockwise winding in a
    /// y-up coordinate system.
    pub fn signed_area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let o = self.points[0];
        let mut sum = 0.0;
        for i in 2..self.points.len() {
            let oa = self.points[i - 1] - o;
            let ob = self.points[i] - o;
            sum += oa.cross(&ob);
        }
        sum / 2.0
    }

    /// Absolute area. A degenerate polygon (fewer than 3 points) has area 0.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let mut min_x = first.x;
        let mut min_y = first.y;
        let mut max_x = first.x;
        let mut max_y = first.y;
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(BoundingBox::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Center of the bounding box, or the origin for an empty polygon.
    pub fn center(&self) -> Point {
        self.bounding_box().map(|b| b.center()).unwrap_or_default()
    }

    /// Clip this polygon against a convex `clip` polygon
    /// (Sutherland-Hodgman). Either winding is accepted for both operands.
    pub fn intersection(&self, clip: &Polygon) -> Polygon {
        if self.points.len() < 3 || clip.points.len() < 3 {
            return Polygon::new();
        }
        let mut clip_points = clip.points.clone();
        if clip.signed_area() < 0.0 {
            clip_points.reverse();
        }
        let mut output = self.points.clone();
        let n = clip_points.len();
        for i in 0..n {
            if output.is_empty() {
                break;
            }
            let a = clip_points[i];
            let b = clip_points[(i + 1) % n];
            let edge = b - a;
            let input = std::mem::take(&mut output);
            let m = input.len();
            for k in 0..m {
                let prev = input[(k + m - 1) % m];
                let cur = input[k];
                let prev_inside = edge.cross(&(prev - a)) >= 0.0;
                let cur_inside = edge.cross(&(cur - a)) >= 0.0;
                let crossing = if prev_inside != cur_inside {
                    Segment::new(prev, cur).line_intersection(&Segment::new(a, b))
                } else {
                    None
                };
                if let Some(p) = crossing {
                    output.push(p);
                }
                if cur_inside {
                    output.push(cur);
                }
            }
        }
        Polygon { points: output }
    }

    /// Intersection-over-union with another polygon. Degenerate polygons
    /// yield 0.
    pub fn iou(&self, other: &Polygon) -> f64 {
        let intersected = self.intersection(other).area();
        let union = self.area() + other.area() - intersected;
        if union <= 0.0 {
            0.0
        } else {
            intersected / union
        }
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self { points }
    }
}
