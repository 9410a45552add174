// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! DXF-Lite Geometry Processing
//!
//! Turns the entities of a [`dxf_lite_core::Document`] into a scene
//! hierarchy: handle lookup, curve tessellation, hatch triangulation with
//! earcutr, precision rebasing of far coordinates, block expansion and the
//! final prune/batch pass.
//!
//! ```rust
//! use dxf_lite_core::{Document, Entity, EntityKind, Handle, Point3};
//! use dxf_lite_geometry::{EntityGeometryGenerator, GeneratorOptions, ReferenceIndex};
//!
//! let mut doc = Document::new();
//! doc.entities.push(Entity::new(
//!     Handle(0x10),
//!     "0",
//!     EntityKind::Circle { center: Point3::origin(), radius: 5.0 },
//! ));
//!
//! let index = ReferenceIndex::new(&doc);
//! let generator = EntityGeometryGenerator::new(&index, GeneratorOptions::default());
//! let node = generator.generate(&doc.entities[0], "Model", None).unwrap();
//! assert_eq!(node.geometry.len(), 1);
//! ```

pub mod error;
pub mod hatch;
pub mod index;
pub mod merge;
pub mod mesh;
pub mod processors;
pub mod render_order;
pub mod router;
pub mod scene;
pub mod spatial_filter;
pub mod stabilizer;
pub mod tessellation;
pub mod text;
pub mod transform;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Point2, Vector2};

pub use error::{Error, ErrorClass, Result};
pub use hatch::{HatchGeometry, HatchGeometryBuilder, LoopRole};
pub use index::{Placement, ReferenceIndex};
pub use merge::{MergeReport, PrunePolicy, SceneMerger};
pub use mesh::{CoordinateShift, Geometry, Primitive, PrimitiveKind, Shape};
pub use render_order::RenderOrderResolver;
pub use router::{
    EntityGeometry, EntityGeometryGenerator, GeneratorOptions, GeometryProcessor, ParentInsert,
    ProcessContext,
};
pub use scene::{
    ChangeKind, DrawBatch, GenerationStats, GeometryArena, GeometryKey, LayerGroup, LayoutScene,
    Scene, SceneNode, Style, ViewportView,
};
pub use spatial_filter::{ClipRegion, SpatialFilterResolver};
pub use stabilizer::{NumericStabilizer, RebaseConfig, Stabilized};
pub use tessellation::{ArcDirection, ArcSpec, CurveTessellator, RenderContext, TessellationConfig};
pub use text::{FontHandle, FontManager, StaticFontManager, TextLayout};
pub use triangulation::{triangulate_polygon, triangulate_with_holes, Triangulation};
