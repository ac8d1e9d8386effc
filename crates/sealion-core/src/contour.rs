//! Iso-contours of binary masks.
//!
//! Marching squares at level 0.5 over the pixel lattice (pixel centers are the
//! lattice nodes), so every vertex is the midpoint between a foreground and a
//! background pixel. Foreground is face-connected only: diagonal neighbours
//! produce separate contours. The raster is treated as surrounded by
//! background, so every contour is closed.

use std::collections::HashMap;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::BinaryMask;

/// A closed polygon; the last vertex connects back to the first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    /// Vertices in image coordinates (x = column, y = row).
    pub points: Vec<Point2<f64>>,
}

/// Axis-aligned bounds of a contour.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

impl Contour {
    /// Signed shoelace sum (twice the signed area).
    fn cross_sum(&self) -> f64 {
        let n = self.points.len();
        (0..n)
            .map(|i| {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                p.x * q.y - q.x * p.y
            })
            .sum()
    }

    /// Enclosed area, independent of orientation.
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        self.cross_sum().abs() * 0.5
    }

    /// Area centroid of the enclosed polygon; vertex mean for degenerate rings.
    pub fn centroid(&self) -> Option<Point2<f64>> {
        let n = self.points.len();
        if n == 0 {
            return None;
        }
        let a2 = self.cross_sum();
        if n < 3 || a2.abs() < f64::EPSILON {
            let sx: f64 = self.points.iter().map(|p| p.x).sum();
            let sy: f64 = self.points.iter().map(|p| p.y).sum();
            return Some(Point2::new(sx / n as f64, sy / n as f64));
        }
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            let cross = p.x * q.y - q.x * p.y;
            cx += (p.x + q.x) * cross;
            cy += (p.y + q.y) * cross;
        }
        let k = 1.0 / (3.0 * a2);
        Some(Point2::new(cx * k, cy * k))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.points.first()?;
        let mut b = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in &self.points[1..] {
            b.min_x = b.min_x.min(p.x);
            b.min_y = b.min_y.min(p.y);
            b.max_x = b.max_x.max(p.x);
            b.max_y = b.max_y.max(p.y);
        }
        Some(b)
    }
}

// Vertices live on cell edge midpoints; doubling the coordinates keeps them
// integral so they can be used as hash keys while linking segments.
type Node = (i64, i64);

/// Segments of one lattice cell, oriented with the foreground on the left
/// (y pointing down). `case` bits: 1 = top-left, 2 = top-right,
/// 4 = bottom-right, 8 = bottom-left.
fn cell_segments(case: u8, x: i64, y: i64) -> [Option<(Node, Node)>; 2] {
    let top = (2 * x + 1, 2 * y);
    let right = (2 * x + 2, 2 * y + 1);
    let bottom = (2 * x + 1, 2 * y + 2);
    let left = (2 * x, 2 * y + 1);
    match case {
        1 => [Some((left, top)), None],
        2 => [Some((top, right)), None],
        3 => [Some((left, right)), None],
        4 => [Some((right, bottom)), None],
        // saddle: the two foreground corners stay separated
        5 => [Some((left, top)), Some((right, bottom))],
        6 => [Some((top, bottom)), None],
        7 => [Some((left, bottom)), None],
        8 => [Some((bottom, left)), None],
        9 => [Some((bottom, top)), None],
        10 => [Some((top, right)), Some((bottom, left))],
        11 => [Some((bottom, right)), None],
        12 => [Some((right, left)), None],
        13 => [Some((right, top)), None],
        14 => [Some((top, left)), None],
        _ => [None, None],
    }
}

/// Trace every closed 0.5 iso-contour of `mask`.
///
/// Outer boundaries and hole boundaries are both returned. Ordering follows
/// the row-major position of each contour's first segment.
pub fn find_contours(mask: &BinaryMask) -> Vec<Contour> {
    let w = mask.width as i64;
    let h = mask.height as i64;

    let mut next: HashMap<Node, Node> = HashMap::new();
    let mut starts: Vec<Node> = Vec::new();

    for y in -1..h {
        for x in -1..w {
            let mut case = 0u8;
            if mask.get(x, y) {
                case |= 1;
            }
            if mask.get(x + 1, y) {
                case |= 2;
            }
            if mask.get(x + 1, y + 1) {
                case |= 4;
            }
            if mask.get(x, y + 1) {
                case |= 8;
            }
            for (from, to) in cell_segments(case, x, y).into_iter().flatten() {
                next.insert(from, to);
                starts.push(from);
            }
        }
    }

    let mut contours = Vec::new();
    for start in starts {
        let Some(mut to) = next.remove(&start) else {
            continue;
        };
        let mut points = vec![to_point(start)];
        while to != start {
            points.push(to_point(to));
            match next.remove(&to) {
                Some(n) => to = n,
                // Every edge crossing is entered and left exactly once, so a
                // broken chain cannot happen on a well-formed lattice.
                None => break,
            }
        }
        contours.push(Contour { points });
    }
    contours
}

#[inline]
fn to_point(n: Node) -> Point2<f64> {
    Point2::new(n.0 as f64 * 0.5, n.1 as f64 * 0.5)
}
