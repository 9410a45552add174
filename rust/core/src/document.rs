// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document tree: header, entities, blocks, layers, layouts and tables

use crate::color::Color;
use crate::entity::Entity;
use crate::objects::ObjectEntry;
use crate::Handle;
use nalgebra::Point3;
use rustc_hash::FxHashMap;
use std::borrow::Cow;

/// Name of the always-present model space layout
pub const MODEL_LAYOUT: &str = "Model";

/// Block record handle used for model space when a document does not provide one
const DEFAULT_MODEL_RECORD: Handle = Handle(0x1F);
const DEFAULT_MODEL_LAYOUT: Handle = Handle(0x22);

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Header {
    /// $INSUNITS drawing unit code
    pub insunits: u16,
    /// $ANGBASE, radians
    pub angle_base: f64,
    /// $ANGDIR
    pub angle_clockwise: bool,
    /// $EXTMIN / $EXTMAX
    pub extents_min: Option<Point3<f64>>,
    pub extents_max: Option<Point3<f64>>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            insunits: 0,
            angle_base: 0.0,
            angle_clockwise: false,
            extents_min: None,
            extents_max: None,
        }
    }
}

impl Header {
    /// Largest extent dimension, if the header records extents
    pub fn extents_size(&self) -> Option<f64> {
        let (min, max) = (self.extents_min?, self.extents_max?);
        let size = (max.x - min.x).abs().max((max.y - min.y).abs());
        (size.is_finite() && size > 0.0).then_some(size)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layer {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub handle: Option<Handle>,
    pub color: Color,
    #[cfg_attr(feature = "serde", serde(default = "continuous"))]
    pub line_type: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub line_weight: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub frozen: bool,
    /// Layer switched off (hidden but still generated)
    #[cfg_attr(feature = "serde", serde(default))]
    pub off: bool,
}

#[cfg(feature = "serde")]
fn origin() -> Point3<f64> {
    Point3::origin()
}

#[cfg(feature = "serde")]
fn continuous() -> String {
    LineType::CONTINUOUS.to_string()
}

impl Layer {
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            handle: None,
            color,
            line_type: LineType::CONTINUOUS.to_string(),
            line_weight: None,
            frozen: false,
            off: false,
        }
    }
}

/// Named, reusable group of entities
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    pub name: String,
    /// Block record handle; entities inside the block carry it as owner
    pub record_handle: Handle,
    #[cfg_attr(feature = "serde", serde(default = "origin"))]
    pub base_point: Point3<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub layer: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub entities: Vec<Entity>,
}

impl Block {
    pub fn new(name: impl Into<String>, record_handle: Handle) -> Self {
        Self {
            name: name.into(),
            record_handle,
            base_point: Point3::origin(),
            layer: None,
            entities: Vec::new(),
        }
    }

    /// Anonymous blocks (dimensions, hatches, arrays) start with '*'
    pub fn is_anonymous(&self) -> bool {
        self.name.starts_with('*')
    }
}

/// Named drawing space
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layout {
    pub name: String,
    pub handle: Handle,
    /// Block record owning the layout's entities
    pub block_record_handle: Handle,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tab_order: u32,
}

impl Layout {
    #[inline]
    pub fn is_model(&self) -> bool {
        self.name == MODEL_LAYOUT
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextStyle {
    pub name: String,
    /// Font file or family name
    pub font: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fixed_height: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub width_factor: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub oblique_angle: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineType {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
    /// Dash pattern; positive = dash, negative = gap, zero = dot
    #[cfg_attr(feature = "serde", serde(default))]
    pub pattern: Vec<f64>,
}

impl LineType {
    pub const CONTINUOUS: &'static str = "CONTINUOUS";
    pub const BY_LAYER: &'static str = "BYLAYER";
    pub const BY_BLOCK: &'static str = "BYBLOCK";
}

/// Dimension style variables used when composing dimension geometry
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DimStyle {
    pub name: String,
    /// DIMASZ
    pub arrow_size: f64,
    /// DIMTXT
    pub text_height: f64,
    /// DIMEXO
    pub extension_offset: f64,
    /// DIMEXE
    pub extension_extension: f64,
    /// DIMSCALE
    pub scale: f64,
    /// DIMDEC
    pub decimal_places: u8,
}

impl Default for DimStyle {
    fn default() -> Self {
        Self {
            name: "STANDARD".to_string(),
            arrow_size: 0.18,
            text_height: 0.18,
            extension_offset: 0.0625,
            extension_extension: 0.18,
            scale: 1.0,
            decimal_places: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SortEntry {
    pub entity: Handle,
    pub sort_handle: Handle,
}

/// Explicit draw order for entities of one block record (SORTENTSTABLE)
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SortEntsTable {
    pub owner: Handle,
    pub entries: Vec<SortEntry>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Tables {
    pub text_styles: FxHashMap<String, TextStyle>,
    pub line_types: FxHashMap<String, LineType>,
    pub dim_styles: FxHashMap<String, DimStyle>,
    pub sort_ents: Vec<SortEntsTable>,
}

/// Structured CAD document, immutable input to scene generation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Document {
    pub header: Header,
    pub entities: Vec<Entity>,
    pub blocks: FxHashMap<String, Block>,
    pub layers: FxHashMap<String, Layer>,
    pub layouts: FxHashMap<String, Layout>,
    pub tables: Tables,
    pub objects: Vec<ObjectEntry>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with the "Model" layout and layer "0"
    pub fn new() -> Self {
        let mut doc = Self {
            header: Header::default(),
            entities: Vec::new(),
            blocks: FxHashMap::default(),
            layers: FxHashMap::default(),
            layouts: FxHashMap::default(),
            tables: Tables::default(),
            objects: Vec::new(),
        };
        doc.ensure_model_layout();
        doc.add_layer(Layer::new("0", Color::Index(7)));
        doc
    }

    /// Insert the default "Model" layout if missing; true when one was added
    pub fn ensure_model_layout(&mut self) -> bool {
        if self.model_layout().is_some() {
            return false;
        }
        self.add_layout(Layout {
            name: MODEL_LAYOUT.to_string(),
            handle: DEFAULT_MODEL_LAYOUT,
            block_record_handle: DEFAULT_MODEL_RECORD,
            tab_order: 0,
        });
        true
    }

    /// This document, copied only when the model layout has to be added
    pub fn with_model_layout(&self) -> Cow<'_, Document> {
        if self.model_layout().is_some() {
            return Cow::Borrowed(self);
        }
        let mut owned = self.clone();
        owned.ensure_model_layout();
        Cow::Owned(owned)
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.insert(layer.name.clone(), layer);
    }

    pub fn add_block(&mut self, block: Block) {
        self.blocks.insert(block.name.clone(), block);
    }

    pub fn add_layout(&mut self, layout: Layout) {
        self.layouts.insert(layout.name.clone(), layout);
    }

    pub fn model_layout(&self) -> Option<&Layout> {
        self.layouts.get(MODEL_LAYOUT)
    }

    /// Layouts ordered by tab order, model space first, ties broken by name
    pub fn sorted_layouts(&self) -> Vec<&Layout> {
        let mut layouts: Vec<&Layout> = self.layouts.values().collect();
        layouts.sort_by(|a, b| {
            b.is_model()
                .cmp(&a.is_model())
                .then(a.tab_order.cmp(&b.tab_order))
                .then_with(|| a.name.cmp(&b.name))
        });
        layouts
    }

    /// Total entity count, including block interiors
    pub fn total_entity_count(&self) -> usize {
        self.entities.len()
            + self
                .blocks
                .values()
                .map(|block| block.entities.len())
                .sum::<usize>()
    }
}
