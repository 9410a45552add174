// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene hierarchy
//!
//! Geometry is owned once by the [`GeometryArena`]; scene nodes refer to it
//! through [`GeometryKey`]s, so block instances share vertex data and only
//! carry their own transform.

use crate::error::{Error, ErrorClass};
use crate::mesh::{CoordinateShift, Geometry, PrimitiveKind};
use crate::spatial_filter::ClipRegion;
use dxf_lite_core::{EntityType, Handle, Rgb};
use nalgebra::Matrix3;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::collections::BTreeMap;

new_key_type! {
    /// Key of a geometry stored in the arena
    pub struct GeometryKey;
}

pub type GeometryArena = SlotMap<GeometryKey, Geometry>;

/// Resolved drawing style
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub color: Rgb,
    pub line_type: String,
    pub line_weight: Option<f64>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: Rgb::WHITE,
            line_type: dxf_lite_core::LineType::CONTINUOUS.to_string(),
            line_weight: None,
        }
    }
}

/// Change classification in compare mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Entity the node was generated from
    pub source: Handle,
    pub entity_type: EntityType,
    /// Node → parent transform
    pub transform: Matrix3<f64>,
    pub style: Style,
    pub layer: String,
    pub layout: String,
    pub visible: bool,
    /// Explicit sort handle from a SORTENTS table
    pub render_order: Option<Handle>,
    /// Clip region in the parent's coordinate space
    pub clip: Option<ClipRegion>,
    pub change: Option<ChangeKind>,
    pub geometry: SmallVec<[GeometryKey; 2]>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(source: Handle, entity_type: EntityType, layer: &str, layout: &str) -> Self {
        Self {
            source,
            entity_type,
            transform: Matrix3::identity(),
            style: Style::default(),
            layer: layer.to_string(),
            layout: layout.to_string(),
            visible: true,
            render_order: None,
            clip: None,
            change: None,
            geometry: SmallVec::new(),
            children: Vec::new(),
        }
    }

    /// Whether this node or any descendant draws something
    pub fn has_geometry(&self, arena: &GeometryArena) -> bool {
        self.has_own_geometry(arena) || self.children.iter().any(|c| c.has_geometry(arena))
    }

    pub fn has_own_geometry(&self, arena: &GeometryArena) -> bool {
        self.geometry
            .iter()
            .any(|key| arena.get(*key).is_some_and(|g| !g.is_empty()))
    }

    /// Whether any geometry of the subtree was rebased
    pub fn is_rebased(&self, arena: &GeometryArena) -> bool {
        self.geometry
            .iter()
            .filter_map(|key| arena.get(*key))
            .any(|g| !g.shift.is_zero())
            || self.children.iter().any(|c| c.is_rebased(arena))
    }

    /// Nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }

    /// Depth-first pre-order visit
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SceneNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// First node of the subtree generated from `handle`
    pub fn find(&self, handle: Handle) -> Option<&SceneNode> {
        if self.source == handle {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(handle))
    }

    /// Tag the subtree with a change kind and its display color
    pub fn tag_change(&mut self, kind: ChangeKind, color: Rgb) {
        self.change = Some(kind);
        self.style.color = color;
        for child in &mut self.children {
            child.tag_change(kind, color);
        }
    }
}

/// Paper-space viewport onto model space
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportView {
    pub source: Handle,
    pub id: u16,
    pub layout: String,
    /// Model → paper transform
    pub model_to_paper: Matrix3<f64>,
    /// Viewport rectangle in paper space
    pub clip: ClipRegion,
    pub frozen_layers: Vec<String>,
}

/// Batch compatibility key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub kind: PrimitiveKind,
    pub color: Rgb,
    pub line_type: String,
    /// Line weight bits, so the key stays `Eq`
    pub line_weight_bits: Option<u64>,
}

impl BatchKey {
    pub fn new(kind: PrimitiveKind, style: &Style) -> Self {
        Self {
            kind,
            color: style.color,
            line_type: style.line_type.clone(),
            line_weight_bits: style.line_weight.map(f64::to_bits),
        }
    }
}

/// Concatenated world-space geometry sharing one style
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub key: BatchKey,
    /// World-space clip shared by every member
    pub clip: Option<ClipRegion>,
    /// Positions relative to `shift`
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
    pub shift: CoordinateShift,
    /// Source entities in draw order
    pub sources: Vec<Handle>,
}

impl DrawBatch {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 2
    }
}

/// Nodes of one layer within a layout
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGroup {
    pub layer: String,
    pub nodes: Vec<SceneNode>,
    pub batches: Vec<DrawBatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutScene {
    pub name: String,
    pub handle: Handle,
    pub is_model: bool,
    /// Top-level nodes not yet grouped by the merger
    pub roots: Vec<SceneNode>,
    pub groups: Vec<LayerGroup>,
    pub viewports: Vec<ViewportView>,
}

impl LayoutScene {
    pub fn new(name: &str, handle: Handle, is_model: bool) -> Self {
        Self {
            name: name.to_string(),
            handle,
            is_model,
            roots: Vec::new(),
            groups: Vec::new(),
            viewports: Vec::new(),
        }
    }

    /// Top-level nodes, grouped ones first
    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.groups
            .iter()
            .flat_map(|g| g.nodes.iter())
            .chain(self.roots.iter())
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut SceneNode> {
        self.groups
            .iter_mut()
            .flat_map(|g| g.nodes.iter_mut())
            .chain(self.roots.iter_mut())
    }

    pub fn node_count(&self) -> usize {
        self.nodes().map(SceneNode::node_count).sum()
    }

    pub fn group(&self, layer: &str) -> Option<&LayerGroup> {
        self.groups.iter().find(|g| g.layer == layer)
    }

    pub fn find(&self, handle: Handle) -> Option<&SceneNode> {
        self.nodes().find_map(|n| n.find(handle))
    }
}

/// Counters collected during one conversion
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GenerationStats {
    pub processed: usize,
    pub nodes: usize,
    /// Skipped entities by type name
    pub unsupported: BTreeMap<String, usize>,
    pub dangling_references: usize,
    pub malformed: usize,
    /// Entities on frozen layers
    pub hidden: usize,
    pub cache_hits: usize,
    pub rebased: usize,
    pub pruned: usize,
    pub batches: usize,
}

impl GenerationStats {
    pub fn record_error(&mut self, type_name: &str, error: &Error) {
        match error.class() {
            ErrorClass::Unsupported => {
                *self.unsupported.entry(type_name.to_string()).or_default() += 1
            }
            ErrorClass::DanglingReference => self.dangling_references += 1,
            ErrorClass::MalformedGeometry => self.malformed += 1,
        }
    }

    pub fn unsupported_total(&self) -> usize {
        self.unsupported.values().sum()
    }

    /// Fold counters of another run into this one
    pub fn absorb(&mut self, other: &GenerationStats) {
        self.processed += other.processed;
        self.nodes += other.nodes;
        for (name, count) in &other.unsupported {
            *self.unsupported.entry(name.clone()).or_default() += count;
        }
        self.dangling_references += other.dangling_references;
        self.malformed += other.malformed;
        self.hidden += other.hidden;
        self.cache_hits += other.cache_hits;
        self.rebased += other.rebased;
        self.pruned += other.pruned;
        self.batches += other.batches;
    }
}

/// Final scene hierarchy of a conversion
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub layouts: Vec<LayoutScene>,
    pub arena: GeometryArena,
    pub stats: GenerationStats,
}

impl Scene {
    pub fn layout(&self, name: &str) -> Option<&LayoutScene> {
        self.layouts.iter().find(|l| l.name == name)
    }

    pub fn layout_mut(&mut self, name: &str) -> Option<&mut LayoutScene> {
        self.layouts.iter_mut().find(|l| l.name == name)
    }

    pub fn model(&self) -> Option<&LayoutScene> {
        self.layouts.iter().find(|l| l.is_model)
    }

    pub fn node_count(&self) -> usize {
        self.layouts.iter().map(LayoutScene::node_count).sum()
    }

    pub fn find(&self, handle: Handle) -> Option<&SceneNode> {
        self.layouts.iter().find_map(|l| l.find(handle))
    }

    pub fn geometry(&self, key: GeometryKey) -> Option<&Geometry> {
        self.arena.get(key)
    }
}
