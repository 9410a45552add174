// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HATCH processor - boundary flattening and fill generation.

use super::helpers::{entity_ocs, flatten_bulges, to_wcs};
use crate::hatch::HatchGeometryBuilder;
use crate::mesh::Shape;
use crate::router::{EntityGeometry, GeometryProcessor, ProcessContext};
use crate::tessellation::{ArcDirection, ArcSpec, CurveTessellator, EllipseSpec};
use crate::{Error, Result};
use dxf_lite_core::{Entity, EntityKind, EntityType, HatchBoundary, HatchEdge};
use nalgebra::Point2;

/// Flatten one boundary loop (OCS)
fn flatten_boundary(tessellator: &CurveTessellator, boundary: &HatchBoundary) -> Vec<Point2<f64>> {
    match boundary {
        HatchBoundary::Polyline { vertices, .. } => flatten_bulges(tessellator, vertices, true),
        HatchBoundary::Edges(edges) => {
            let mut points: Vec<Point2<f64>> = Vec::new();
            for edge in edges {
                let flattened = flatten_edge(tessellator, edge);
                // Consecutive edges share endpoints
                let skip = usize::from(
                    matches!((points.last(), flattened.first()), (Some(a), Some(b)) if (a - b).norm() < 1e-9),
                );
                points.extend(flattened.into_iter().skip(skip));
            }
            points
        }
    }
}

fn flatten_edge(tessellator: &CurveTessellator, edge: &HatchEdge) -> Vec<Point2<f64>> {
    match edge {
        HatchEdge::Line { start, end } => vec![*start, *end],
        HatchEdge::Arc {
            center,
            radius,
            start_angle,
            end_angle,
            ccw,
        } => {
            // Clockwise edges store angles mirrored about the X axis
            let arc = if *ccw {
                ArcSpec::ccw(*center, *radius, *start_angle, *end_angle)
            } else {
                ArcSpec {
                    center: *center,
                    radius: *radius,
                    start_angle: -start_angle,
                    end_angle: -end_angle,
                    direction: ArcDirection::Clockwise,
                }
            };
            tessellator.tessellate_arc(&arc, None, None)
        }
        HatchEdge::Ellipse {
            center,
            major_axis,
            axis_ratio,
            start_angle,
            end_angle,
            ccw,
        } => {
            let mut spec =
                EllipseSpec::planar(*center, *major_axis, *axis_ratio, *start_angle, *end_angle);
            if !ccw {
                spec.start_param = -start_angle;
                spec.end_param = -end_angle;
                spec.direction = ArcDirection::Clockwise;
            }
            tessellator.tessellate_ellipse(&spec, None)
        }
        HatchEdge::Spline {
            degree,
            control_points,
            knots,
            weights,
        } => tessellator.tessellate_spline(control_points, *degree, knots, weights, None),
    }
}

/// HATCH processor
/// Solid hatches are triangulated per fill region; patterned hatches pass
/// their classified loops through for procedural line generation
pub struct HatchProcessor;

impl GeometryProcessor for HatchProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Hatch(hatch) = &entity.kind else {
            return Err(Error::geometry("HatchProcessor expects HATCH"));
        };

        let ocs = entity_ocs(entity);
        let loops: Vec<Vec<Point2<f64>>> = hatch
            .loops
            .iter()
            .map(|l| to_wcs(&ocs, flatten_boundary(ctx.tessellator, &l.boundary)))
            .collect();

        let builder = HatchGeometryBuilder::new(hatch.style);
        let geometry = if hatch.solid {
            builder.build_solid(loops)
        } else {
            builder.build_pattern(loops, &hatch.pattern)
        };

        let mut shapes: Vec<Shape> = geometry
            .regions
            .into_iter()
            .map(|region| Shape::Triangles {
                points: region.points,
                indices: region.indices,
            })
            .collect();
        if let Some(fill) = geometry.pattern {
            shapes.push(Shape::Pattern(fill));
        }
        Ok(EntityGeometry::from_shapes(shapes))
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Hatch]
    }
}
