// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity geometry generator - dynamic dispatch to geometry processors
//!
//! Routes drawing entities to the processor registered for their type,
//! resolves their style, stores the produced geometry once per handle in the
//! arena and expands block inserts into transformed child nodes.

mod caching;
mod style;
mod transforms;


pub use style::ParentInsert;
pub use transforms::insert_cell_transforms;

use crate::index::ReferenceIndex;
use crate::mesh::Shape;
use crate::processors::{
    ArcProcessor, CircleProcessor, DimensionProcessor, EllipseProcessor, HatchProcessor,
    ImageProcessor, InsertProcessor, LeaderProcessor, LineProcessor, MTextProcessor,
    PointProcessor, PolylineProcessor, SolidProcessor, SplineProcessor, TextProcessor,
    ViewportProcessor,
};
use crate::render_order::RenderOrderResolver;
use crate::scene::{GenerationStats, GeometryArena, GeometryKey, SceneNode, ViewportView};
use crate::spatial_filter::{ClipRegion, SpatialFilterResolver};
use crate::stabilizer::{NumericStabilizer, RebaseConfig};
use crate::tessellation::{CurveTessellator, RenderContext, TessellationConfig};
use crate::text::{FontManager, StaticFontManager};
use crate::Result;
use dxf_lite_core::{Entity, EntityType, Handle, Rgb};
use nalgebra::Matrix3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum block nesting followed while expanding inserts
pub const MAX_BLOCK_DEPTH: usize = 32;

/// Geometry processor trait
/// Each processor handles one or more entity types
pub trait GeometryProcessor {
    /// Process entity into shapes in its parent's coordinate system
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry>;

    /// Get supported entity types
    fn supported_types(&self) -> Vec<EntityType>;
}

/// Read-only services available to processors
pub struct ProcessContext<'a> {
    pub index: &'a ReferenceIndex<'a>,
    pub tessellator: &'a CurveTessellator,
    pub fonts: &'a dyn FontManager,
    pub filters: &'a SpatialFilterResolver<'a>,
}

/// Block placement requested by an insert or dimension
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInstance {
    pub block: String,
    /// Block → parent transform
    pub transform: Matrix3<f64>,
    /// Clip of this placement in the parent's coordinate system
    pub clip: Option<ClipRegion>,
}

/// Processor output for one entity
#[derive(Debug, Clone, Default)]
pub struct EntityGeometry {
    pub shapes: Vec<Shape>,
    pub instances: Vec<BlockInstance>,
    /// Clip in the parent's coordinate system
    pub clip: Option<ClipRegion>,
    /// Registered with the entity's layout; `layout` is filled by the generator
    pub viewport: Option<ViewportView>,
}

impl EntityGeometry {
    pub fn from_shape(shape: Shape) -> Self {
        Self {
            shapes: vec![shape],
            ..Self::default()
        }
    }

    pub fn from_shapes(shapes: Vec<Shape>) -> Self {
        Self {
            shapes,
            ..Self::default()
        }
    }
}

/// Per-handle generation result shared by every visit of the entity
#[derive(Debug, Clone, Default)]
pub(crate) struct CachedEntity {
    pub geometry: SmallVec<[GeometryKey; 2]>,
    pub instances: Vec<BlockInstance>,
    pub clip: Option<ClipRegion>,
    pub viewport: Option<ViewportView>,
}

/// Generator settings taken from the conversion configuration
#[derive(Debug, Clone, Default)]
pub struct GeneratorOptions {
    /// Force this color on every node
    pub override_color: Option<Rgb>,
    /// Force this line weight on hatches
    pub override_hatch_line_thickness: Option<f64>,
    pub rebase: RebaseConfig,
    pub tessellation: TessellationConfig,
}

/// Entity geometry generator - routes entities to processors
pub struct EntityGeometryGenerator<'a> {
    index: &'a ReferenceIndex<'a>,
    processors: HashMap<EntityType, Arc<dyn GeometryProcessor>>,
    tessellator: CurveTessellator,
    stabilizer: NumericStabilizer,
    filters: SpatialFilterResolver<'a>,
    render_order: RenderOrderResolver,
    fonts: Box<dyn FontManager + 'a>,
    options: GeneratorOptions,
    arena: RefCell<GeometryArena>,
    /// Key: entity handle, Value: stored geometry (`None` when the entity failed)
    entity_cache: RefCell<FxHashMap<Handle, Option<Arc<CachedEntity>>>>,
    /// Blocks currently being expanded, innermost last
    block_stack: RefCell<Vec<String>>,
    viewports: RefCell<Vec<ViewportView>>,
    stats: RefCell<GenerationStats>,
}

impl<'a> EntityGeometryGenerator<'a> {
    /// Create a generator with the default processors
    pub fn new(index: &'a ReferenceIndex<'a>, options: GeneratorOptions) -> Self {
        let document = index.document();
        let context = RenderContext::for_document(document, &options.tessellation);
        let mut generator = Self {
            index,
            processors: HashMap::new(),
            tessellator: CurveTessellator::new(options.tessellation, context),
            stabilizer: NumericStabilizer::new(&options.rebase, context.working_scale),
            filters: SpatialFilterResolver::new(index),
            render_order: RenderOrderResolver::new(&document.tables.sort_ents),
            fonts: Box::new(StaticFontManager::new()),
            options,
            arena: RefCell::new(GeometryArena::with_key()),
            entity_cache: RefCell::new(FxHashMap::default()),
            block_stack: RefCell::new(Vec::new()),
            viewports: RefCell::new(Vec::new()),
            stats: RefCell::new(GenerationStats::default()),
        };

        generator.register(Box::new(LineProcessor));
        generator.register(Box::new(PointProcessor));
        generator.register(Box::new(CircleProcessor));
        generator.register(Box::new(ArcProcessor));
        generator.register(Box::new(EllipseProcessor));
        generator.register(Box::new(PolylineProcessor));
        generator.register(Box::new(SplineProcessor));
        generator.register(Box::new(SolidProcessor));
        generator.register(Box::new(TextProcessor));
        generator.register(Box::new(MTextProcessor));
        generator.register(Box::new(InsertProcessor));
        generator.register(Box::new(HatchProcessor));
        generator.register(Box::new(DimensionProcessor));
        generator.register(Box::new(LeaderProcessor));
        generator.register(Box::new(ViewportProcessor));
        generator.register(Box::new(ImageProcessor));

        generator
    }

    /// Use an external font manager
    pub fn with_fonts(mut self, fonts: Box<dyn FontManager + 'a>) -> Self {
        self.fonts = fonts;
        self
    }

    /// Store geometry into an existing arena (shared between compared documents)
    pub fn with_arena(self, arena: GeometryArena) -> Self {
        self.arena.replace(arena);
        self
    }

    /// Register a geometry processor
    pub fn register(&mut self, processor: Box<dyn GeometryProcessor>) {
        let processor_arc: Arc<dyn GeometryProcessor> = Arc::from(processor);
        for entity_type in processor_arc.supported_types() {
            self.processors
                .insert(entity_type, Arc::clone(&processor_arc));
        }
    }

    #[inline]
    pub fn index(&self) -> &'a ReferenceIndex<'a> {
        self.index
    }

    pub fn render_context(&self) -> &RenderContext {
        self.tessellator.context()
    }

    pub fn stats(&self) -> GenerationStats {
        self.stats.borrow().clone()
    }

    /// Count an entity that was skipped before reaching the generator
    pub fn record_dangling(&self) {
        self.stats.borrow_mut().dangling_references += 1;
    }

    /// Generate the scene node of `entity` in `layout`
    ///
    /// `parent` is the enclosing insert when the entity lives inside a block.
    /// Returns `None` for skipped entities (unsupported type, dangling block,
    /// frozen layer); malformed geometry still yields an empty node.
    pub fn generate(
        &self,
        entity: &Entity,
        layout: &str,
        parent: Option<&ParentInsert>,
    ) -> Option<SceneNode> {
        self.stats.borrow_mut().processed += 1;

        let resolved = self.resolve_style(entity, parent)?;
        let cached = self.process_cached(entity)?;

        let mut node = SceneNode::new(entity.handle, entity.entity_type(), &resolved.layer, layout);
        node.style = resolved.style;
        node.visible = resolved.visible;
        node.render_order = self.render_order.order_of(entity.handle);
        node.clip = cached.clip.clone();
        node.geometry = cached.geometry.clone();

        if let Some(viewport) = &cached.viewport {
            let mut viewport = viewport.clone();
            viewport.layout = layout.to_string();
            self.viewports.borrow_mut().push(viewport);
        }

        let insert = ParentInsert::from_node(&node);
        for instance in &cached.instances {
            if let Some(cell) = self.expand_instance(entity, instance, layout, &insert) {
                node.children.push(cell);
            }
        }
        for attribute in transforms::attributes(entity) {
            if let Some(child) = self.generate(attribute, layout, Some(&insert)) {
                node.children.push(child);
            }
        }

        self.stats.borrow_mut().nodes += 1;
        Some(node)
    }

    /// Hand over the arena, statistics and collected viewports
    pub fn into_parts(self) -> (GeometryArena, GenerationStats, Vec<ViewportView>) {
        (
            self.arena.into_inner(),
            self.stats.into_inner(),
            self.viewports.into_inner(),
        )
    }

    fn context(&self) -> ProcessContext<'_> {
        ProcessContext {
            index: self.index,
            tessellator: &self.tessellator,
            fonts: self.fonts.as_ref(),
            filters: &self.filters,
        }
    }
}
