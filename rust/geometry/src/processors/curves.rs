// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curve processors - lines, points, arcs, ellipses, polylines, splines and solids.

use super::helpers::{entity_ocs, extent, flatten_bulges, to_wcs, xy};
use crate::mesh::Shape;
use crate::router::{EntityGeometry, GeometryProcessor, ProcessContext};
use crate::tessellation::{ArcSpec, EllipseSpec};
use crate::triangulation::triangulate_polygon;
use crate::{Error, Result};
use dxf_lite_core::{Entity, EntityKind, EntityType};
use nalgebra::Point2;

fn unexpected(entity: &Entity) -> Error {
    Error::geometry(format!(
        "processor received {} entity {}",
        entity.type_name(),
        entity.handle
    ))
}

/// LINE processor
/// Lines are WCS; the endpoints are projected onto the XY plane
pub struct LineProcessor;

impl GeometryProcessor for LineProcessor {
    fn process(&self, entity: &Entity, _ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Line { start, end } = &entity.kind else {
            return Err(unexpected(entity));
        };
        Ok(EntityGeometry::from_shape(Shape::Polyline {
            points: vec![xy(start), xy(end)],
            closed: false,
        }))
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Line]
    }
}

pub struct PointProcessor;

impl GeometryProcessor for PointProcessor {
    fn process(&self, entity: &Entity, _ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Point { position } = &entity.kind else {
            return Err(unexpected(entity));
        };
        Ok(EntityGeometry::from_shape(Shape::Points(vec![xy(position)])))
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Point]
    }
}

fn check_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(Error::geometry(format!("invalid radius {}", radius)))
    }
}

/// CIRCLE processor
/// Center in OCS; tessellated as a closed polyline
pub struct CircleProcessor;

impl GeometryProcessor for CircleProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Circle { center, radius } = &entity.kind else {
            return Err(unexpected(entity));
        };
        check_radius(*radius)?;

        let mut points = ctx
            .tessellator
            .tessellate_arc(&ArcSpec::circle(xy(center), *radius), None, None);
        // The closing point duplicates the first
        points.pop();
        Ok(EntityGeometry::from_shape(Shape::Polyline {
            points: to_wcs(&entity_ocs(entity), points),
            closed: true,
        }))
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Circle]
    }
}

/// ARC processor
/// Angles are counter-clockwise in OCS; points are mapped to WCS afterwards,
/// so a mirrored extrusion reverses the apparent direction consistently
pub struct ArcProcessor;

impl GeometryProcessor for ArcProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        } = &entity.kind
        else {
            return Err(unexpected(entity));
        };
        check_radius(*radius)?;

        let arc = ArcSpec::ccw(xy(center), *radius, *start_angle, *end_angle);
        let points = ctx.tessellator.tessellate_arc(&arc, None, None);
        Ok(EntityGeometry::from_shape(Shape::Polyline {
            points: to_wcs(&entity_ocs(entity), points),
            closed: false,
        }))
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Arc]
    }
}

/// ELLIPSE processor
/// Center and major axis are WCS; the minor axis follows the extrusion
pub struct EllipseProcessor;

impl GeometryProcessor for EllipseProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Ellipse {
            center,
            major_axis,
            axis_ratio,
            start_param,
            end_param,
        } = &entity.kind
        else {
            return Err(unexpected(entity));
        };
        if major_axis.norm() <= 0.0 || !(*axis_ratio > 0.0 && *axis_ratio <= 1.0 + 1e-9) {
            return Err(Error::geometry("degenerate ellipse axes"));
        }

        let spec = EllipseSpec::from_wcs(
            xy(center),
            major_axis,
            &entity.extrusion,
            *axis_ratio,
            *start_param,
            *end_param,
        );
        let mut points = ctx.tessellator.tessellate_ellipse(&spec, None);
        let full = (end_param - start_param).abs() >= std::f64::consts::TAU - 1e-9;
        if full {
            points.pop();
        }
        Ok(EntityGeometry::from_shape(Shape::Polyline {
            points,
            closed: full,
        }))
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Ellipse]
    }
}

/// Polyline processor (LWPOLYLINE / 2D POLYLINE)
/// Bulged segments are flattened into arcs
pub struct PolylineProcessor;

impl GeometryProcessor for PolylineProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Polyline {
            vertices, closed, ..
        } = &entity.kind
        else {
            return Err(unexpected(entity));
        };

        let ocs = entity_ocs(entity);
        match vertices.len() {
            0 => Err(Error::geometry("polyline without vertices")),
            1 => Ok(EntityGeometry::from_shape(Shape::Points(to_wcs(
                &ocs,
                vec![vertices[0].position],
            )))),
            _ => {
                let points = flatten_bulges(ctx.tessellator, vertices, *closed);
                Ok(EntityGeometry::from_shape(Shape::Polyline {
                    points: to_wcs(&ocs, points),
                    closed: *closed,
                }))
            }
        }
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Polyline]
    }
}

/// SPLINE processor
/// NURBS evaluation of the control polygon; fit points when no control points exist
pub struct SplineProcessor;

impl GeometryProcessor for SplineProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Spline(spline) = &entity.kind else {
            return Err(unexpected(entity));
        };

        let points = if spline.control_points.len() >= 2 {
            let control: Vec<Point2<f64>> = spline.control_points.iter().map(xy).collect();
            ctx.tessellator.tessellate_spline(
                &control,
                spline.degree,
                &spline.knots,
                &spline.weights,
                None,
            )
        } else if spline.fit_points.len() >= 2 {
            // Interpolating spline through the fit points, degree capped by the point count
            let fit: Vec<Point2<f64>> = spline.fit_points.iter().map(xy).collect();
            let size = extent(fit.iter().copied());
            ctx.tessellator
                .tessellate_spline(&fit, spline.degree.min(2), &[], &[], Some(size))
        } else {
            return Err(Error::geometry("spline without control or fit points"));
        };

        Ok(EntityGeometry::from_shape(Shape::Polyline {
            points,
            closed: spline.closed,
        }))
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Spline]
    }
}

/// SOLID/TRACE processor
/// Corners come in DXF order (1, 2, 4, 3 around the outline)
pub struct SolidProcessor;

impl GeometryProcessor for SolidProcessor {
    fn process(&self, entity: &Entity, _ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Solid { corners } = &entity.kind else {
            return Err(unexpected(entity));
        };

        let outline: Vec<Point2<f64>> = match corners.as_slice() {
            [a, b, c] => vec![xy(a), xy(b), xy(c)],
            [a, b, c, d] if d == c => vec![xy(a), xy(b), xy(c)],
            [a, b, c, d] => vec![xy(a), xy(b), xy(d), xy(c)],
            _ => return Err(Error::geometry("solid needs 3 or 4 corners")),
        };
        let fill = triangulate_polygon(&outline)?;
        Ok(EntityGeometry::from_shape(Shape::Triangles {
            points: to_wcs(&entity_ocs(entity), fill.points),
            indices: fill.indices,
        }))
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Solid]
    }
}
