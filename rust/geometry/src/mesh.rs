// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry buffers
//!
//! Processors describe what they draw as [`Shape`]s in f64 document
//! coordinates. The generator stabilizes each shape and stores it as a
//! [`Geometry`]: flat f32 vertex buffers relative to a [`CoordinateShift`].

use crate::hatch::PatternFill;
use crate::text::TextLayout;
use nalgebra::{Matrix3, Point2};

/// Coordinate shift for RTC (Relative-to-Center) rendering
/// Stores the offset subtracted from coordinates to improve Float32 precision
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoordinateShift {
    /// X offset (subtracted from all X coordinates)
    pub x: f64,
    /// Y offset (subtracted from all Y coordinates)
    pub y: f64,
}

impl CoordinateShift {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn from_point(point: Point2<f64>) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }

    /// Check if shift is zero (no shifting needed)
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    #[inline]
    pub fn as_point(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Subtract the shift in f64, then narrow to f32
    #[inline]
    pub fn shifted(&self, point: &Point2<f64>) -> [f32; 2] {
        [(point.x - self.x) as f32, (point.y - self.y) as f32]
    }

    /// Recover the original f64 coordinate of a shifted vertex
    #[inline]
    pub fn restore(&self, x: f32, y: f32) -> Point2<f64> {
        Point2::new(x as f64 + self.x, y as f64 + self.y)
    }
}

/// Drawable shape produced by an entity processor, in f64 coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Points(Vec<Point2<f64>>),
    Polyline {
        points: Vec<Point2<f64>>,
        closed: bool,
    },
    /// Independent segments, two points each
    Segments(Vec<Point2<f64>>),
    Triangles {
        points: Vec<Point2<f64>>,
        indices: Vec<u32>,
    },
    Text(TextLayout),
    Pattern(PatternFill),
}

impl Shape {
    /// Vertex coordinates that take part in precision rebasing
    pub fn points(&self) -> &[Point2<f64>] {
        match self {
            Shape::Points(points)
            | Shape::Polyline { points, .. }
            | Shape::Segments(points)
            | Shape::Triangles { points, .. } => points,
            Shape::Text(_) | Shape::Pattern(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Shape::Points(points) => points.is_empty(),
            Shape::Polyline { points, .. } => points.len() < 2,
            Shape::Segments(points) => points.len() < 2,
            Shape::Triangles { indices, .. } => indices.len() < 3,
            Shape::Text(layout) => layout.is_empty(),
            Shape::Pattern(fill) => fill.loops.is_empty(),
        }
    }

    /// Every coordinate that must stay precise, including text anchors and pattern loops
    pub fn anchor_points(&self) -> Vec<Point2<f64>> {
        match self {
            Shape::Text(layout) => vec![layout.position],
            Shape::Pattern(fill) => fill.loops.iter().flatten().copied().collect(),
            shape => shape.points().to_vec(),
        }
    }

    /// Express every coordinate relative to `shift`
    pub fn rebased(self, shift: &CoordinateShift) -> Shape {
        if shift.is_zero() {
            return self;
        }
        let offset = nalgebra::Vector2::new(shift.x, shift.y);
        let rebase = |points: Vec<Point2<f64>>| -> Vec<Point2<f64>> {
            points.into_iter().map(|p| p - offset).collect()
        };
        match self {
            Shape::Points(points) => Shape::Points(rebase(points)),
            Shape::Polyline { points, closed } => Shape::Polyline {
                points: rebase(points),
                closed,
            },
            Shape::Segments(points) => Shape::Segments(rebase(points)),
            Shape::Triangles { points, indices } => Shape::Triangles {
                points: rebase(points),
                indices,
            },
            Shape::Text(mut layout) => {
                layout.position -= offset;
                Shape::Text(layout)
            }
            Shape::Pattern(mut fill) => {
                fill.loops = fill.loops.into_iter().map(rebase).collect();
                Shape::Pattern(fill)
            }
        }
    }
}

/// Kind of a stored geometry, used as part of the batch key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Points,
    Lines,
    Triangles,
    Text,
    Pattern,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Vertex positions (x, y)
    Points { positions: Vec<f32> },
    /// Indexed line segments (i0, i1)
    Lines {
        positions: Vec<f32>,
        indices: Vec<u32>,
    },
    /// Indexed triangles (i0, i1, i2)
    Triangles {
        positions: Vec<f32>,
        indices: Vec<u32>,
    },
    Text(TextLayout),
    Pattern(PatternFill),
}

/// Stored geometry: vertex buffers relative to `shift`
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub primitive: Primitive,
    pub shift: CoordinateShift,
}

impl Geometry {
    /// Build a geometry from a shape whose points are already relative to `shift`
    pub fn from_shape(shape: Shape, shift: CoordinateShift) -> Self {
        let primitive = match shape {
            Shape::Points(points) => Primitive::Points {
                positions: flatten(&points),
            },
            Shape::Polyline { points, closed } => {
                let n = points.len() as u32;
                let segment_count = if closed && n > 2 { n } else { n.saturating_sub(1) };
                let mut indices = Vec::with_capacity(segment_count as usize * 2);
                for i in 0..segment_count {
                    indices.push(i);
                    indices.push((i + 1) % n);
                }
                Primitive::Lines {
                    positions: flatten(&points),
                    indices,
                }
            }
            Shape::Segments(points) => {
                let pairs = (points.len() / 2) as u32;
                Primitive::Lines {
                    positions: flatten(&points[..pairs as usize * 2]),
                    indices: (0..pairs * 2).collect(),
                }
            }
            Shape::Triangles { points, indices } => Primitive::Triangles {
                positions: flatten(&points),
                indices,
            },
            Shape::Text(layout) => Primitive::Text(layout),
            Shape::Pattern(fill) => Primitive::Pattern(fill),
        };
        Self { primitive, shift }
    }

    #[inline]
    pub fn kind(&self) -> PrimitiveKind {
        match self.primitive {
            Primitive::Points { .. } => PrimitiveKind::Points,
            Primitive::Lines { .. } => PrimitiveKind::Lines,
            Primitive::Triangles { .. } => PrimitiveKind::Triangles,
            Primitive::Text(_) => PrimitiveKind::Text,
            Primitive::Pattern(_) => PrimitiveKind::Pattern,
        }
    }

    /// Flat vertex buffer, empty for text and pattern geometry
    #[inline]
    pub fn positions(&self) -> &[f32] {
        match &self.primitive {
            Primitive::Points { positions }
            | Primitive::Lines { positions, .. }
            | Primitive::Triangles { positions, .. } => positions,
            Primitive::Text(_) | Primitive::Pattern(_) => &[],
        }
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        match &self.primitive {
            Primitive::Lines { indices, .. } | Primitive::Triangles { indices, .. } => indices,
            _ => &[],
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions().len() / 2
    }

    /// Check if the geometry draws nothing
    pub fn is_empty(&self) -> bool {
        match &self.primitive {
            Primitive::Points { positions } => positions.is_empty(),
            Primitive::Lines { indices, .. } | Primitive::Triangles { indices, .. } => {
                indices.is_empty()
            }
            Primitive::Text(layout) => layout.is_empty(),
            Primitive::Pattern(fill) => fill.loops.is_empty(),
        }
    }

    /// Vertex positions restored to f64 and mapped through `transform`
    pub fn world_points<'a>(
        &'a self,
        transform: &'a Matrix3<f64>,
    ) -> impl Iterator<Item = Point2<f64>> + 'a {
        self.positions().chunks_exact(2).map(move |chunk| {
            let local = self.shift.restore(chunk[0], chunk[1]);
            transform.transform_point(&local)
        })
    }

    /// Calculate bounds (min, max) in the shifted space
    pub fn bounds(&self) -> Option<(Point2<f32>, Point2<f32>)> {
        let positions = self.positions();
        if positions.is_empty() {
            return None;
        }

        let mut min = Point2::new(f32::MAX, f32::MAX);
        let mut max = Point2::new(f32::MIN, f32::MIN);
        positions.chunks_exact(2).for_each(|chunk| {
            min.x = min.x.min(chunk[0]);
            min.y = min.y.min(chunk[1]);
            max.x = max.x.max(chunk[0]);
            max.y = max.y.max(chunk[1]);
        });
        Some((min, max))
    }
}

#[inline]
fn flatten(points: &[Point2<f64>]) -> Vec<f32> {
    let mut positions = Vec::with_capacity(points.len() * 2);
    for p in points {
        positions.push(p.x as f32);
        positions.push(p.y as f32);
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_shift() {
        let shift = CoordinateShift::new(500000.0, 5000000.0);
        assert!(!shift.is_zero());
        assert!(CoordinateShift::default().is_zero());

        let p = Point2::new(500000.125, 5000000.25);
        let [x, y] = shift.shifted(&p);
        assert_eq!(x, 0.125);
        assert_eq!(y, 0.25);
        assert_eq!(shift.restore(x, y), p);
    }

    #[test]
    fn test_precision_shifted_vs_unshifted() {
        // Two points 1mm apart at Swiss UTM magnitude
        let base_x = 2679012.0;
        let p1 = Point2::new(base_x, 1247892.0);
        let p2 = Point2::new(base_x + 0.001, 1247892.0);

        let diff_direct = p2.x as f32 - p1.x as f32;

        let shift = CoordinateShift::new(base_x, 1247892.0);
        let diff_shifted = shift.shifted(&p2)[0] - shift.shifted(&p1)[0];

        let error_direct = (diff_direct - 0.001).abs();
        let error_shifted = (diff_shifted - 0.001).abs();
        assert!(error_shifted < error_direct);
        assert!(error_shifted < 1e-6);
    }

    #[test]
    fn test_closed_polyline_indices() {
        let shape = Shape::Polyline {
            points: vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
            ],
            closed: true,
        };
        let geometry = Geometry::from_shape(shape, CoordinateShift::default());
        assert_eq!(geometry.kind(), PrimitiveKind::Lines);
        assert_eq!(geometry.indices(), &[0, 1, 1, 2, 2, 0]);
        assert_eq!(geometry.vertex_count(), 3);
    }

    #[test]
    fn test_open_polyline_and_segments() {
        let points = vec![Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), Point2::new(2.0, 2.0)];
        let open = Geometry::from_shape(
            Shape::Polyline {
                points: points.clone(),
                closed: false,
            },
            CoordinateShift::default(),
        );
        assert_eq!(open.indices(), &[0, 1, 1, 2]);

        // Odd trailing point is dropped
        let segments = Geometry::from_shape(Shape::Segments(points), CoordinateShift::default());
        assert_eq!(segments.vertex_count(), 2);
        assert_eq!(segments.indices(), &[0, 1]);
    }

    #[test]
    fn test_world_points_restore_shift() {
        let shift = CoordinateShift::new(1000.0, 2000.0);
        let geometry = Geometry::from_shape(
            Shape::Points(vec![Point2::new(1.5, -0.5)]),
            shift,
        );
        let moved = Matrix3::new_translation(&nalgebra::Vector2::new(10.0, 0.0));
        let world: Vec<_> = geometry.world_points(&moved).collect();
        assert_eq!(world, vec![Point2::new(1011.5, 1999.5)]);
    }

    #[test]
    fn test_rebased_shape_keeps_topology() {
        let shape = Shape::Triangles {
            points: vec![
                Point2::new(100.0, 200.0),
                Point2::new(101.0, 200.0),
                Point2::new(100.0, 201.0),
            ],
            indices: vec![0, 1, 2],
        };
        let rebased = shape.rebased(&CoordinateShift::new(100.0, 200.0));
        assert_eq!(rebased.points()[1], Point2::new(1.0, 0.0));
        assert!(matches!(rebased, Shape::Triangles { ref indices, .. } if indices == &[0, 1, 2]));
    }

    #[test]
    fn test_bounds() {
        let geometry = Geometry::from_shape(
            Shape::Points(vec![Point2::new(-1.0, 2.0), Point2::new(3.0, -4.0)]),
            CoordinateShift::default(),
        );
        let (min, max) = geometry.bounds().unwrap();
        assert_eq!(min, Point2::new(-1.0, -4.0));
        assert_eq!(max, Point2::new(3.0, 2.0));
    }
}
