// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for 2D fills, plus the contour helpers used by
//! hatch loop classification and clip regions. Rings may repeat their first
//! vertex at the end, as CAD boundaries usually do.

use crate::{Error, Point2, Result};

const COLLINEAR_EPSILON: f64 = 1e-10;

/// Indexed triangles over the concatenated vertices of all rings
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Triangulation {
    pub points: Vec<Point2<f64>>,
    pub indices: Vec<u32>,
}

impl Triangulation {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn area(&self) -> f64 {
        triangles_area(&self.points, &self.indices)
    }
}

/// Ring without the repeated closing vertex
fn open_ring(ring: &[Point2<f64>]) -> &[Point2<f64>] {
    match ring {
        [first, .., last] if ring.len() > 3 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

/// Check if all turns of a ring go the same way
pub fn is_convex(ring: &[Point2<f64>]) -> bool {
    let ring = open_ring(ring);
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut winding = 0.0f64;
    for i in 0..n {
        let (a, b, c) = (ring[i], ring[(i + 1) % n], ring[(i + 2) % n]);
        let turn = (b - a).perp(&(c - b));
        if turn.abs() <= COLLINEAR_EPSILON {
            continue;
        }
        if winding == 0.0 {
            winding = turn.signum();
        } else if turn.signum() != winding {
            return false;
        }
    }
    true
}

/// Triangulate one outline without holes
pub fn triangulate_polygon(outline: &[Point2<f64>]) -> Result<Triangulation> {
    let ring = open_ring(outline);
    match ring.len() {
        0..=2 => Err(Error::TriangulationError(format!(
            "outline has {} vertices",
            ring.len()
        ))),
        3 => Ok(Triangulation {
            points: ring.to_vec(),
            indices: vec![0, 1, 2],
        }),
        // Small convex outlines (solids, clip rectangles) skip earcut
        n if n <= 8 && is_convex(ring) => Ok(Triangulation {
            points: ring.to_vec(),
            indices: (1..n as u32 - 1).flat_map(|i| [0, i, i + 1]).collect(),
        }),
        _ => earcut(ring, &[]),
    }
}

/// Triangulate an outline minus its holes
///
/// Holes with fewer than three vertices are ignored.
pub fn triangulate_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Triangulation> {
    let holes: Vec<&[Point2<f64>]> = holes
        .iter()
        .map(|h| open_ring(h))
        .filter(|h| h.len() >= 3)
        .collect();
    if holes.is_empty() {
        return triangulate_polygon(outer);
    }

    let outer = open_ring(outer);
    if outer.len() < 3 {
        return Err(Error::TriangulationError(format!(
            "outer ring has {} vertices",
            outer.len()
        )));
    }
    earcut(outer, &holes)
}

fn earcut(outer: &[Point2<f64>], holes: &[&[Point2<f64>]]) -> Result<Triangulation> {
    let mut points = outer.to_vec();
    let mut hole_starts = Vec::with_capacity(holes.len());
    for hole in holes {
        hole_starts.push(points.len());
        points.extend_from_slice(hole);
    }

    let flat: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    let indices = earcutr::earcut(&flat, &hole_starts, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    Ok(Triangulation {
        points,
        indices: indices.into_iter().map(|i| i as u32).collect(),
    })
}

/// Signed area; positive for counter-clockwise rings
pub fn signed_area(ring: &[Point2<f64>]) -> f64 {
    let ring = open_ring(ring);
    if ring.len() < 3 {
        return 0.0;
    }
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

/// Total area covered by an indexed triangle list
pub fn triangles_area(points: &[Point2<f64>], indices: &[u32]) -> f64 {
    indices
        .chunks_exact(3)
        .map(|t| {
            let [a, b, c] = [t[0], t[1], t[2]].map(|i| points[i as usize]);
            ((b - a).perp(&(c - a)) * 0.5).abs()
        })
        .sum()
}

/// Even-odd containment test
pub fn point_in_contour(point: &Point2<f64>, ring: &[Point2<f64>]) -> bool {
    let ring = open_ring(ring);
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut prev = ring[ring.len() - 1];
    for &curr in ring {
        let crosses = (curr.y > point.y) != (prev.y > point.y);
        if crosses {
            let x_at = curr.x + (prev.x - curr.x) * (point.y - curr.y) / (prev.y - curr.y);
            if point.x < x_at {
                inside = !inside;
            }
        }
        prev = curr;
    }
    inside
}

/// Axis-aligned bounds (min, max)
pub fn contour_bounds(ring: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    let first = *ring.first()?;
    Some(ring.iter().skip(1).fold((first, first), |(min, max), p| {
        (
            Point2::new(min.x.min(p.x), min.y.min(p.y)),
            Point2::new(max.x.max(p.x), max.y.max(p.y)),
        )
    }))
}
