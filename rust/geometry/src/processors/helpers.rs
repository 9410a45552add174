// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared helper functions for geometry processors.

use crate::tessellation::CurveTessellator;
use crate::transform::Ocs;
use dxf_lite_core::{Entity, PolylineVertex};
use nalgebra::{Point2, Point3, Vector2};

/// OCS of a planar entity
#[inline]
pub(super) fn entity_ocs(entity: &Entity) -> Ocs {
    Ocs::from_extrusion(&entity.extrusion)
}

/// Map OCS points to WCS, skipping the work for the default extrusion
pub(super) fn to_wcs(ocs: &Ocs, points: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
    if ocs.is_identity() {
        return points;
    }
    points.iter().map(|p| ocs.to_wcs(p)).collect()
}

#[inline]
pub(super) fn xy(point: &Point3<f64>) -> Point2<f64> {
    Point2::new(point.x, point.y)
}

/// Flatten a bulged vertex chain into points
///
/// A closed chain includes the segment back to the first vertex but does
/// not repeat the first point.
pub(super) fn flatten_bulges(
    tessellator: &CurveTessellator,
    vertices: &[PolylineVertex],
    closed: bool,
) -> Vec<Point2<f64>> {
    let n = vertices.len();
    if n < 2 {
        return vertices.iter().map(|v| v.position).collect();
    }
    let size = extent(vertices.iter().map(|v| v.position));
    let segments = if closed { n } else { n - 1 };

    let mut points = Vec::with_capacity(n * 2);
    points.push(vertices[0].position);
    for i in 0..segments {
        let start = &vertices[i];
        let end = &vertices[(i + 1) % n];
        let arc = tessellator.tessellate_bulge(start.position, end.position, start.bulge, Some(size));
        points.extend(arc.into_iter().skip(1));
    }
    if closed && points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Diagonal of the bounding box of `points`
pub(super) fn extent(points: impl Iterator<Item = Point2<f64>>) -> f64 {
    let mut bounds: Option<(Point2<f64>, Point2<f64>)> = None;
    for p in points {
        bounds = Some(match bounds {
            None => (p, p),
            Some((min, max)) => (min.inf(&p), max.sup(&p)),
        });
    }
    bounds.map_or(0.0, |(min, max)| (max - min).norm())
}

/// Filled triangular arrowhead with its tip at `tip`, pointing along `direction`
pub(super) fn arrowhead(tip: Point2<f64>, direction: Vector2<f64>, size: f64) -> Vec<Point2<f64>> {
    let Some(dir) = direction.try_normalize(1e-12) else {
        return Vec::new();
    };
    let normal = Vector2::new(-dir.y, dir.x);
    let back = tip - dir * size;
    vec![tip, back + normal * (size / 6.0), back - normal * (size / 6.0)]
}
