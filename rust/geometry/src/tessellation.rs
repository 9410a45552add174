// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curve tessellation
//!
//! Arcs, ellipses, bulge segments and NURBS splines are flattened into
//! polylines. The subdivision count depends on the swept angle, the apparent
//! size of the curve relative to the drawing, and a budget derived from the
//! document's entity count, so dense drawings degrade gracefully.

use dxf_lite_core::Document;
use nalgebra::{Point2, Vector2, Vector3};
use std::f64::consts::TAU;

/// Curves at this fraction of the working scale get full detail
const FULL_DETAIL_FRACTION: f64 = 0.01;

/// Lower bound of the size-based detail factor
const MIN_SIZE_FACTOR: f64 = 0.25;

/// Lower bound of the entity-count budget
const MIN_BUDGET: f64 = 0.25;

const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TessellationConfig {
    /// Angle swept by one arc segment at full detail, radians
    pub arc_tessellation_angle: f64,
    /// Segment count of a full circle at the lowest detail
    pub min_arc_segments: usize,
    /// Hard cap on segments per curve
    pub max_arc_segments: usize,
    /// Evaluated points per spline control point at full detail
    pub spline_subdivision: usize,
    /// Entity count up to which the budget stays at full detail
    pub budget_reference: usize,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self {
            arc_tessellation_angle: 10f64.to_radians(),
            min_arc_segments: 8,
            max_arc_segments: 512,
            spline_subdivision: 4,
            budget_reference: 10_000,
        }
    }
}

/// Per-conversion parameters shared by tessellation and rebasing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    /// Detail multiplier in `[MIN_BUDGET, 1]`
    pub budget: f64,
    /// Characteristic drawing size
    pub working_scale: f64,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            budget: 1.0,
            working_scale: 1.0,
        }
    }
}

impl RenderContext {
    pub fn new(entity_count: usize, working_scale: f64, config: &TessellationConfig) -> Self {
        let budget = if entity_count <= config.budget_reference.max(1) {
            1.0
        } else {
            (config.budget_reference.max(1) as f64 / entity_count as f64)
                .sqrt()
                .max(MIN_BUDGET)
        };
        let working_scale = if working_scale.is_finite() && working_scale > 0.0 {
            working_scale
        } else {
            1.0
        };
        Self {
            budget,
            working_scale,
        }
    }

    /// Context for a document: entity count and header extents
    pub fn for_document(document: &Document, config: &TessellationConfig) -> Self {
        let scale = document.header.extents_size().unwrap_or(1.0);
        Self::new(document.total_entity_count(), scale, config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArcDirection {
    #[default]
    CounterClockwise,
    Clockwise,
}

/// Circular arc in its own plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSpec {
    pub center: Point2<f64>,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub direction: ArcDirection,
}

impl ArcSpec {
    pub fn ccw(center: Point2<f64>, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        Self {
            center,
            radius,
            start_angle,
            end_angle,
            direction: ArcDirection::CounterClockwise,
        }
    }

    pub fn circle(center: Point2<f64>, radius: f64) -> Self {
        Self::ccw(center, radius, 0.0, TAU)
    }

    /// Swept angle in `[0, 2π]`, measured along the arc direction
    pub fn sweep(&self) -> f64 {
        let raw = match self.direction {
            ArcDirection::CounterClockwise => self.end_angle - self.start_angle,
            ArcDirection::Clockwise => self.start_angle - self.end_angle,
        };
        normalize_sweep(raw)
    }
}

/// Elliptical arc; parameters follow the DXF definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseSpec {
    pub center: Point2<f64>,
    pub major_axis: Vector2<f64>,
    pub minor_axis: Vector2<f64>,
    pub start_param: f64,
    pub end_param: f64,
    pub direction: ArcDirection,
}

impl EllipseSpec {
    /// Planar ellipse with the minor axis 90° counter-clockwise of the major one
    pub fn planar(
        center: Point2<f64>,
        major_axis: Vector2<f64>,
        axis_ratio: f64,
        start_param: f64,
        end_param: f64,
    ) -> Self {
        Self {
            center,
            major_axis,
            minor_axis: Vector2::new(-major_axis.y, major_axis.x) * axis_ratio,
            start_param,
            end_param,
            direction: ArcDirection::CounterClockwise,
        }
    }

    /// WCS ellipse: minor axis = extrusion × major axis, projected onto XY
    pub fn from_wcs(
        center: Point2<f64>,
        major_axis: &Vector3<f64>,
        extrusion: &Vector3<f64>,
        axis_ratio: f64,
        start_param: f64,
        end_param: f64,
    ) -> Self {
        let normal = extrusion.try_normalize(EPSILON).unwrap_or_else(Vector3::z);
        let minor = normal.cross(major_axis) * axis_ratio;
        Self {
            center,
            major_axis: major_axis.xy(),
            minor_axis: minor.xy(),
            start_param,
            end_param,
            direction: ArcDirection::CounterClockwise,
        }
    }

    fn sweep(&self) -> f64 {
        let raw = match self.direction {
            ArcDirection::CounterClockwise => self.end_param - self.start_param,
            ArcDirection::Clockwise => self.start_param - self.end_param,
        };
        normalize_sweep(raw)
    }
}

/// Map a raw angle difference into `[0, 2π]`; exact full turns stay full
fn normalize_sweep(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    if raw.abs() >= TAU - EPSILON && raw.abs() <= TAU + EPSILON {
        return TAU;
    }
    let sweep = raw.rem_euclid(TAU);
    if sweep < EPSILON {
        0.0
    } else {
        sweep
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CurveTessellator {
    config: TessellationConfig,
    context: RenderContext,
}

impl CurveTessellator {
    pub fn new(config: TessellationConfig, context: RenderContext) -> Self {
        Self { config, context }
    }

    #[inline]
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Detail factor for a curve of the given apparent size
    fn size_factor(&self, size_hint: Option<f64>) -> f64 {
        match size_hint {
            Some(size) if size.is_finite() && size > 0.0 => {
                let relative = size / (self.context.working_scale * FULL_DETAIL_FRACTION);
                relative.sqrt().clamp(MIN_SIZE_FACTOR, 1.0)
            }
            _ => 1.0,
        }
    }

    /// Number of segments for a curve sweeping `sweep` radians
    pub fn segment_count(&self, sweep: f64, size_hint: Option<f64>) -> usize {
        if sweep <= 0.0 {
            return 1;
        }
        let angle = self.config.arc_tessellation_angle.max(1e-3);
        let detail = (sweep / angle) * self.size_factor(size_hint) * self.context.budget;
        let min = ((self.config.min_arc_segments as f64 * sweep / TAU).ceil() as usize).max(1);
        let max = self.config.max_arc_segments.max(min);
        // Tolerate rounding in exact multiples of the step angle
        ((detail - 1e-9).ceil() as usize).clamp(min, max)
    }

    /// Flatten a circular arc; at least two points, ordered along the direction
    pub fn tessellate_arc(
        &self,
        arc: &ArcSpec,
        size_hint: Option<f64>,
        count_hint: Option<usize>,
    ) -> Vec<Point2<f64>> {
        let sweep = if arc.radius > EPSILON { arc.sweep() } else { 0.0 };
        let segments = match count_hint {
            Some(count) if count > 0 => count,
            _ => self.segment_count(sweep, size_hint.or(Some(arc.radius))),
        };
        let step = match arc.direction {
            ArcDirection::CounterClockwise => sweep / segments as f64,
            ArcDirection::Clockwise => -sweep / segments as f64,
        };

        (0..=segments)
            .map(|i| {
                let angle = arc.start_angle + step * i as f64;
                Point2::new(
                    arc.center.x + arc.radius * angle.cos(),
                    arc.center.y + arc.radius * angle.sin(),
                )
            })
            .collect()
    }

    pub fn tessellate_ellipse(
        &self,
        ellipse: &EllipseSpec,
        size_hint: Option<f64>,
    ) -> Vec<Point2<f64>> {
        let sweep = ellipse.sweep();
        let size = ellipse.major_axis.norm();
        let segments = self.segment_count(sweep, size_hint.or(Some(size)));
        let step = match ellipse.direction {
            ArcDirection::CounterClockwise => sweep / segments as f64,
            ArcDirection::Clockwise => -sweep / segments as f64,
        };

        (0..=segments)
            .map(|i| {
                let t = ellipse.start_param + step * i as f64;
                ellipse.center + ellipse.major_axis * t.cos() + ellipse.minor_axis * t.sin()
            })
            .collect()
    }

    /// Flatten the arc segment between two polyline vertices
    ///
    /// Returns both endpoints; a zero bulge yields the straight segment.
    pub fn tessellate_bulge(
        &self,
        start: Point2<f64>,
        end: Point2<f64>,
        bulge: f64,
        size_hint: Option<f64>,
    ) -> Vec<Point2<f64>> {
        let chord = end - start;
        let length = chord.norm();
        if bulge.abs() < EPSILON || length < EPSILON || !bulge.is_finite() {
            return vec![start, end];
        }

        let left = Vector2::new(-chord.y, chord.x) / length;
        let offset = length * (1.0 - bulge * bulge) / (4.0 * bulge);
        let center = nalgebra::center(&start, &end) + left * offset;
        let radius = length * (1.0 + bulge * bulge) / (4.0 * bulge.abs());
        let start_angle = (start.y - center.y).atan2(start.x - center.x);
        let sweep = 4.0 * bulge.atan();

        let arc = ArcSpec {
            center,
            radius,
            start_angle,
            end_angle: start_angle + sweep,
            direction: if bulge > 0.0 {
                ArcDirection::CounterClockwise
            } else {
                ArcDirection::Clockwise
            },
        };
        let mut points = self.tessellate_arc(&arc, size_hint, None);
        // Pin the endpoints exactly
        if let Some(first) = points.first_mut() {
            *first = start;
        }
        if let Some(last) = points.last_mut() {
            *last = end;
        }
        points
    }

    /// Evaluate a (rational) B-spline with de Boor's algorithm
    ///
    /// Missing or inconsistent knot vectors are replaced by a clamped uniform
    /// one; missing weights make the curve non-rational.
    pub fn tessellate_spline(
        &self,
        control_points: &[Point2<f64>],
        degree: usize,
        knots: &[f64],
        weights: &[f64],
        size_hint: Option<f64>,
    ) -> Vec<Point2<f64>> {
        let n = control_points.len();
        if n < 2 {
            return control_points.to_vec();
        }
        let degree = degree.clamp(1, n - 1);

        let clamped;
        let knots = if knots.len() == n + degree + 1 && knots.windows(2).all(|w| w[0] <= w[1]) {
            knots
        } else {
            clamped = clamped_uniform_knots(n, degree);
            &clamped
        };
        let rational = weights.len() == n && weights.iter().all(|w| *w > 0.0);

        let homogeneous: Vec<(f64, f64, f64)> = control_points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let w = if rational { weights[i] } else { 1.0 };
                (p.x * w, p.y * w, w)
            })
            .collect();

        let (u_start, u_end) = (knots[degree], knots[n]);
        if u_end - u_start <= EPSILON {
            return vec![control_points[0], control_points[n - 1]];
        }

        let size = size_hint.unwrap_or_else(|| polygon_extent(control_points));
        let samples = (n * self.config.spline_subdivision.max(1)) as f64
            * self.size_factor(Some(size))
            * self.context.budget;
        let samples = (samples.ceil() as usize).clamp(n.max(2), self.config.max_arc_segments.max(n));

        (0..=samples)
            .map(|i| {
                let u = u_start + (u_end - u_start) * i as f64 / samples as f64;
                de_boor(&homogeneous, knots, degree, u)
            })
            .collect()
    }
}

fn polygon_extent(points: &[Point2<f64>]) -> f64 {
    let mut min = points[0];
    let mut max = points[0];
    for p in points {
        min = min.inf(p);
        max = max.sup(p);
    }
    (max - min).norm()
}

/// Clamped knot vector with uniformly spaced interior knots
pub fn clamped_uniform_knots(count: usize, degree: usize) -> Vec<f64> {
    let interior = count.saturating_sub(degree + 1);
    let mut knots = Vec::with_capacity(count + degree + 1);
    knots.extend(std::iter::repeat(0.0).take(degree + 1));
    for i in 1..=interior {
        knots.push(i as f64 / (interior + 1) as f64);
    }
    knots.extend(std::iter::repeat(1.0).take(degree + 1));
    knots
}

fn de_boor(points: &[(f64, f64, f64)], knots: &[f64], degree: usize, u: f64) -> Point2<f64> {
    let n = points.len();
    // Knot span index k with knots[k] <= u < knots[k + 1], clamped to the domain
    let mut k = degree;
    while k < n - 1 && knots[k + 1] <= u {
        k += 1;
    }

    let mut d: Vec<(f64, f64, f64)> = (0..=degree).map(|j| points[j + k - degree]).collect();
    for r in 1..=degree {
        for j in (r..=degree).rev() {
            let left = knots[j + k - degree];
            let right = knots[j + 1 + k - r];
            let alpha = if right - left > EPSILON {
                (u - left) / (right - left)
            } else {
                0.0
            };
            let (a, b) = (d[j - 1], d[j]);
            d[j] = (
                (1.0 - alpha) * a.0 + alpha * b.0,
                (1.0 - alpha) * a.1 + alpha * b.1,
                (1.0 - alpha) * a.2 + alpha * b.2,
            );
        }
    }

    let (x, y, w) = d[degree];
    if w.abs() > EPSILON {
        Point2::new(x / w, y / w)
    } else {
        Point2::new(x, y)
    }
}
