// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Paper-space viewports and raster image frames.

use super::helpers::xy;
use crate::mesh::Shape;
use crate::router::{EntityGeometry, GeometryProcessor, ProcessContext};
use crate::scene::ViewportView;
use crate::spatial_filter::ClipRegion;
use crate::{Error, Result};
use dxf_lite_core::{Entity, EntityKind, EntityType, ViewportData};
use nalgebra::{Matrix3, Point2, Vector2};

/// Model → paper mapping of a viewport
///
/// The model point `view_center` lands on the paper `center`; model units are
/// scaled by `height / view_height` and the view is rotated by `-twist`.
pub fn viewport_transform(viewport: &ViewportData) -> Matrix3<f64> {
    let scale = if viewport.view_height > 0.0 {
        viewport.height / viewport.view_height
    } else {
        1.0
    };
    Matrix3::new_translation(&viewport.center.coords.xy())
        * Matrix3::new_scaling(scale)
        * Matrix3::new_rotation(-viewport.twist)
        * Matrix3::new_translation(&-viewport.view_center.coords)
}

/// VIEWPORT processor
/// Draws the frame and registers the view with its layout.
/// Viewport 1 is the paper-space overall view and produces nothing.
pub struct ViewportProcessor;

impl GeometryProcessor for ViewportProcessor {
    fn process(&self, entity: &Entity, _ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Viewport(viewport) = &entity.kind else {
            return Err(Error::geometry("ViewportProcessor expects VIEWPORT"));
        };
        if viewport.id == 1 {
            return Ok(EntityGeometry::default());
        }
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return Err(Error::geometry(format!(
                "viewport size {}x{}",
                viewport.width, viewport.height
            )));
        }

        let center = xy(&viewport.center);
        let half = Vector2::new(viewport.width / 2.0, viewport.height / 2.0);
        let clip = ClipRegion::rectangle(center - half, center + half, entity.handle);
        let frame = Shape::Polyline {
            points: clip.boundaries[0].clone(),
            closed: true,
        };

        Ok(EntityGeometry {
            shapes: vec![frame],
            viewport: Some(ViewportView {
                source: entity.handle,
                id: viewport.id,
                layout: String::new(),
                model_to_paper: viewport_transform(viewport),
                clip,
                frozen_layers: viewport.frozen_layers.clone(),
            }),
            ..EntityGeometry::default()
        })
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Viewport]
    }
}

/// IMAGE processor
/// Only the frame is drawn; pixel data is not loaded.
/// A clip boundary attached through a spatial filter is in pixel coordinates.
pub struct ImageProcessor;

impl GeometryProcessor for ImageProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Image(image) = &entity.kind else {
            return Err(Error::geometry("ImageProcessor expects IMAGE"));
        };
        if image.size.x <= 0.0 || image.size.y <= 0.0 {
            return Err(Error::geometry("image without pixel size"));
        }

        let origin = xy(&image.position);
        let u = image.u_vector.xy();
        let v = image.v_vector.xy();
        let pixel_to_world = Matrix3::new(u.x, v.x, origin.x, u.y, v.y, origin.y, 0.0, 0.0, 1.0);

        let corners: Vec<Point2<f64>> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(s, t)| origin + u * (s * image.size.x) + v * (t * image.size.y))
            .collect();

        let clip = ctx.filters.find_filter_handle(entity.handle).and_then(|handle| {
            ctx.index
                .spatial_filter(handle)
                .and_then(|filter| ClipRegion::from_filter(filter, &pixel_to_world, handle))
        });

        Ok(EntityGeometry {
            shapes: vec![Shape::Polyline {
                points: corners,
                closed: true,
            }],
            clip,
            ..EntityGeometry::default()
        })
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Image]
    }
}
