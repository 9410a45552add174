// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dimension and leader processors.
//!
//! A dimension with a resolvable pre-rendered block is drawn as that block.
//! Otherwise linear and aligned dimensions are composed from extension
//! lines, the dimension line, arrowheads and the measurement text.

use super::helpers::{arrowhead, xy};
use crate::mesh::Shape;
use crate::router::{BlockInstance, EntityGeometry, GeometryProcessor, ProcessContext};
use crate::text::{layout_text, TextParams};
use crate::{Error, Result};
use dxf_lite_core::{
    DimStyle, DimensionData, DimensionKind, Entity, EntityKind, EntityType, HorizontalAlignment,
    VerticalAlignment,
};
use nalgebra::{Matrix3, Point2, Vector2};
use std::f64::consts::{FRAC_PI_2, PI};

fn dim_style(ctx: &ProcessContext<'_>, name: Option<&str>) -> DimStyle {
    name.and_then(|n| ctx.index.dim_style(n))
        .cloned()
        .unwrap_or_default()
}

/// Measurement text: "<>" in an override is replaced by the measured value
pub(crate) fn dimension_text(measurement: f64, decimals: u8, text_override: Option<&str>) -> String {
    let value = format!("{:.*}", decimals as usize, measurement);
    match text_override {
        None | Some("") => value,
        Some(text) => text.replace("<>", &value),
    }
}

/// Keep text upright: rotations pointing left are flipped by π
fn readable(angle: f64) -> f64 {
    let a = angle.rem_euclid(2.0 * PI);
    if a > FRAC_PI_2 + 1e-9 && a <= 3.0 * FRAC_PI_2 + 1e-9 {
        a - PI
    } else {
        a
    }
}

/// DIMENSION processor
pub struct DimensionProcessor;

impl DimensionProcessor {
    fn compose(
        &self,
        entity: &Entity,
        dim: &DimensionData,
        ctx: &ProcessContext<'_>,
    ) -> Result<EntityGeometry> {
        let p1 = xy(&dim.first_point);
        let p2 = xy(&dim.second_point);
        let line_point = xy(&dim.line_point);

        let direction = match dim.kind {
            DimensionKind::Linear { rotation } => Vector2::new(rotation.cos(), rotation.sin()),
            DimensionKind::Aligned => (p2 - p1)
                .try_normalize(1e-12)
                .ok_or_else(|| Error::geometry("aligned dimension with coincident points"))?,
            other => {
                return Err(Error::UnsupportedEntity(format!(
                    "DIMENSION ({:?}) without block",
                    other
                )))
            }
        };
        let style = dim_style(ctx, dim.style.as_deref());
        let scale = if style.scale > 0.0 { style.scale } else { 1.0 };
        let measurement = (p2 - p1).dot(&direction).abs();

        // Feet of the extension lines on the dimension line
        let project = |p: Point2<f64>| line_point + direction * (p - line_point).dot(&direction);
        let q1 = project(p1);
        let q2 = project(p2);

        let mut segments = Vec::with_capacity(6);
        for (origin, foot) in [(p1, q1), (p2, q2)] {
            if let Some(out) = (foot - origin).try_normalize(1e-12) {
                segments.push(origin + out * style.extension_offset * scale);
                segments.push(foot + out * style.extension_extension * scale);
            }
        }
        segments.push(q1);
        segments.push(q2);
        let mut shapes = vec![Shape::Segments(segments)];

        let arrow_size = style.arrow_size * scale;
        if arrow_size > 0.0 && (q2 - q1).norm() > 1e-12 {
            let mut points = arrowhead(q1, q1 - q2, arrow_size);
            points.extend(arrowhead(q2, q2 - q1, arrow_size));
            if points.len() == 6 {
                shapes.push(Shape::Triangles {
                    points,
                    indices: vec![0, 1, 2, 3, 4, 5],
                });
            }
        }

        let text = dimension_text(measurement, style.decimal_places, dim.text.as_deref());
        let height = style.text_height * scale;
        let normal = Vector2::new(-direction.y, direction.x);
        let anchor = dim
            .text_position
            .map(|p| xy(&p))
            .unwrap_or_else(|| nalgebra::center(&q1, &q2) + normal * height * 0.5);
        let font = ctx.fonts.resolve_or_default(None);
        let layout = layout_text(
            &TextParams {
                text: &text,
                position: anchor,
                align_point: Some(anchor),
                rotation: readable(direction.y.atan2(direction.x)),
                height,
                width_factor: 1.0,
                oblique: 0.0,
                halign: HorizontalAlignment::Middle,
                valign: VerticalAlignment::Baseline,
            },
            font,
        );
        shapes.push(Shape::Text(layout));

        tracing::trace!(entity = %entity.handle, measurement, "dimension composed");
        Ok(EntityGeometry::from_shapes(shapes))
    }
}

impl GeometryProcessor for DimensionProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Dimension(dim) = &entity.kind else {
            return Err(Error::geometry("DimensionProcessor expects DIMENSION"));
        };

        // Pre-rendered block entities are already in WCS
        if let Some(block) = dim.block.as_deref().and_then(|name| ctx.index.block(name)) {
            return Ok(EntityGeometry {
                instances: vec![BlockInstance {
                    block: block.name.clone(),
                    transform: Matrix3::identity(),
                    clip: None,
                }],
                ..EntityGeometry::default()
            });
        }
        self.compose(entity, dim, ctx)
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Dimension]
    }
}

/// LEADER processor
/// Polyline through the vertices with an arrowhead at the first vertex
pub struct LeaderProcessor;

impl GeometryProcessor for LeaderProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Leader(leader) = &entity.kind else {
            return Err(Error::geometry("LeaderProcessor expects LEADER"));
        };
        if leader.vertices.len() < 2 {
            return Err(Error::geometry("leader needs two vertices"));
        }

        let points: Vec<Point2<f64>> = leader.vertices.iter().map(xy).collect();
        let mut shapes = Vec::with_capacity(2);
        if leader.arrowhead {
            let style = dim_style(ctx, leader.style.as_deref());
            let size = style.arrow_size * if style.scale > 0.0 { style.scale } else { 1.0 };
            let head = arrowhead(points[0], points[0] - points[1], size);
            if !head.is_empty() && size > 0.0 {
                shapes.push(Shape::Triangles {
                    points: head,
                    indices: vec![0, 1, 2],
                });
            }
        }
        shapes.insert(
            0,
            Shape::Polyline {
                points,
                closed: false,
            },
        );
        Ok(EntityGeometry::from_shapes(shapes))
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Leader]
    }
}
