// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Text processors - TEXT/ATTRIB and MTEXT.

use super::helpers::{entity_ocs, xy};
use crate::mesh::Shape;
use crate::router::{EntityGeometry, GeometryProcessor, ProcessContext};
use crate::text::{layout_mtext, layout_text, FontHandle, MTextParams, TextParams};
use crate::{Error, Result};
use dxf_lite_core::{Entity, EntityKind, EntityType, TextStyle};

/// Text height used when neither the entity nor its style sets one
const DEFAULT_TEXT_HEIGHT: f64 = 2.5;

/// Style table entry, its font, and the effective height
fn resolve_font<'a>(
    ctx: &ProcessContext<'a>,
    style: Option<&str>,
    height: f64,
) -> (Option<&'a TextStyle>, FontHandle, f64) {
    let style = style.and_then(|name| ctx.index.text_style(name));
    let font = ctx
        .fonts
        .resolve_or_default(style.map(|s| s.font.as_str()).filter(|f| !f.is_empty()));
    let height = if height > 0.0 {
        height
    } else {
        style
            .map(|s| s.fixed_height)
            .filter(|h| *h > 0.0)
            .unwrap_or(DEFAULT_TEXT_HEIGHT)
    };
    (style, font, height)
}

/// Single-line TEXT processor
/// Position, alignment point and rotation are OCS
pub struct TextProcessor;

impl GeometryProcessor for TextProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Text(text) = &entity.kind else {
            return Err(Error::geometry("TextProcessor expects TEXT"));
        };

        let ocs = entity_ocs(entity);
        let (style, font, height) = resolve_font(ctx, text.style.as_deref(), text.height);
        let width_factor = Some(text.width_factor)
            .filter(|w| *w > 0.0)
            .or_else(|| style.map(|s| s.width_factor).filter(|w| *w > 0.0))
            .unwrap_or(1.0);

        let params = TextParams {
            text: &text.text,
            position: ocs.to_wcs(&xy(&text.position)),
            align_point: text.align_point.map(|p| ocs.to_wcs(&xy(&p))),
            rotation: ocs.angle_to_wcs(text.rotation),
            height,
            width_factor,
            oblique: style.map_or(0.0, |s| s.oblique_angle),
            halign: text.halign,
            valign: text.valign,
        };
        Ok(EntityGeometry::from_shape(Shape::Text(layout_text(
            &params, font,
        ))))
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Text]
    }
}

/// MTEXT processor
/// Position is WCS; rotation is the direction angle in WCS
pub struct MTextProcessor;

impl GeometryProcessor for MTextProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::MText(mtext) = &entity.kind else {
            return Err(Error::geometry("MTextProcessor expects MTEXT"));
        };

        let (style, font, height) = resolve_font(ctx, mtext.style.as_deref(), mtext.height);
        let params = MTextParams {
            text: &mtext.text,
            position: xy(&mtext.position),
            width: mtext.width,
            rotation: mtext.rotation,
            height,
            width_factor: style
                .map(|s| s.width_factor)
                .filter(|w| *w > 0.0)
                .unwrap_or(1.0),
            attachment: mtext.attachment,
            line_spacing: mtext.line_spacing,
        };
        Ok(EntityGeometry::from_shape(Shape::Text(layout_mtext(
            &params, font,
        ))))
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::MText]
    }
}
