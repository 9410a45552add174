// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layer, color and line type resolution.

use super::EntityGeometryGenerator;
use crate::scene::{SceneNode, Style};
use dxf_lite_core::{Color, Entity, EntityType, Handle, Layer, LineType, Rgb};

/// Layer name entities fall back to when their layer is missing
const DEFAULT_LAYER: &str = "0";

/// Resolved style of the insert enclosing a block entity
#[derive(Debug, Clone, PartialEq)]
pub struct ParentInsert {
    pub handle: Handle,
    pub layer: String,
    pub color: Rgb,
    pub line_type: String,
    pub line_weight: Option<f64>,
}

impl ParentInsert {
    pub fn from_node(node: &SceneNode) -> Self {
        Self {
            handle: node.source,
            layer: node.layer.clone(),
            color: node.style.color,
            line_type: node.style.line_type.clone(),
            line_weight: node.style.line_weight,
        }
    }
}

pub(super) struct ResolvedStyle {
    pub layer: String,
    pub style: Style,
    pub visible: bool,
}

/// Layer used when an entity names a layer the document lacks
fn synthetic_layer() -> Layer {
    Layer::new(DEFAULT_LAYER, Color::Index(7))
}

impl<'a> EntityGeometryGenerator<'a> {
    /// Resolve the effective layer and style; `None` when the layer is frozen
    pub(super) fn resolve_style(
        &self,
        entity: &Entity,
        parent: Option<&ParentInsert>,
    ) -> Option<ResolvedStyle> {
        // Layer "0" inside a block takes the enclosing insert's layer, or the
        // block definition's own layer when generated without an insert
        let on_zero = entity.layer == DEFAULT_LAYER || entity.layer.is_empty();
        let requested = match parent {
            Some(parent) if on_zero => parent.layer.as_str(),
            None if on_zero => self.definition_layer(entity).unwrap_or(DEFAULT_LAYER),
            _ => entity.layer.as_str(),
        };

        let fallback;
        let layer = match self.index.layer(requested) {
            Some(layer) => layer,
            None => {
                tracing::debug!(
                    entity = %entity.handle,
                    layer = requested,
                    "unknown layer, using default layer"
                );
                self.stats.borrow_mut().dangling_references += 1;
                fallback = synthetic_layer();
                &fallback
            }
        };

        if layer.frozen {
            self.stats.borrow_mut().hidden += 1;
            return None;
        }

        let color = match self.options.override_color {
            Some(color) => color,
            None => match entity.color {
                Color::ByLayer => layer_color(layer),
                Color::ByBlock => parent.map_or(Rgb::WHITE, |p| p.color),
                explicit => explicit.to_rgb().unwrap_or(Rgb::WHITE),
            },
        };

        let line_type = match entity.line_type.as_deref() {
            None => self.known_line_type(&layer.line_type),
            Some(name) if name.eq_ignore_ascii_case(LineType::BY_LAYER) => {
                self.known_line_type(&layer.line_type)
            }
            Some(name) if name.eq_ignore_ascii_case(LineType::BY_BLOCK) => parent
                .map(|p| p.line_type.clone())
                .unwrap_or_else(|| LineType::CONTINUOUS.to_string()),
            Some(name) => self.known_line_type(name),
        };

        let mut line_weight = entity.line_weight.or(layer.line_weight);
        if entity.entity_type() == EntityType::Hatch {
            if let Some(thickness) = self.options.override_hatch_line_thickness {
                line_weight = Some(thickness);
            }
        }

        Some(ResolvedStyle {
            layer: layer.name.clone(),
            style: Style {
                color,
                line_type,
                line_weight,
            },
            visible: entity.visible && !layer.off,
        })
    }

    /// Layer of the block definition owning `entity`, if any
    fn definition_layer(&self, entity: &Entity) -> Option<&'a str> {
        let block = self.index.block_by_owner(entity.owner?)?;
        block.layer.as_deref().filter(|layer| !layer.is_empty())
    }

    /// Line type name if the document defines it, else CONTINUOUS
    fn known_line_type(&self, name: &str) -> String {
        if name.eq_ignore_ascii_case(LineType::CONTINUOUS) {
            return LineType::CONTINUOUS.to_string();
        }
        match self.index.line_type(name) {
            Some(line_type) => line_type.name.clone(),
            None => {
                self.stats.borrow_mut().dangling_references += 1;
                LineType::CONTINUOUS.to_string()
            }
        }
    }
}

/// Layer colors are concrete; an inheriting value on a layer means white
fn layer_color(layer: &Layer) -> Rgb {
    layer.color.to_rgb().unwrap_or(Rgb::WHITE)
}
