// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # DXF-Lite Core
//!
//! Typed CAD document tree consumed by the DXF-Lite scene pipeline.
//!
//! ## Overview
//!
//! This crate holds the immutable input model for geometry generation:
//!
//! - **Document**: header, entities, blocks, layers, layouts, tables, objects
//! - **Entities**: type-tagged records ([`EntityKind`]) with a document-scoped [`Handle`]
//! - **Objects**: dictionaries and spatial filters reachable through owner-handle chains
//! - **Colors**: ACI palette resolution ([`Color`], [`aci_to_rgb`])
//!
//! Parsing raw bytes is done by a [`DocumentParser`] collaborator. With the
//! `serde` feature enabled, [`JsonDocumentParser`] reads a JSON-encoded tree.
//!
//! ## Quick Start
//!
//! ```rust
//! use dxf_lite_core::{Document, Entity, EntityKind, Handle, Point3};
//!
//! let mut doc = Document::new();
//! doc.entities.push(Entity::new(
//!     Handle(0x10),
//!     "0",
//!     EntityKind::Line {
//!         start: Point3::new(0.0, 0.0, 0.0),
//!         end: Point3::new(10.0, 0.0, 0.0),
//!     },
//! ));
//! assert_eq!(doc.entities.len(), 1);
//! assert!(doc.model_layout().is_some());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support and the JSON document parser

pub mod color;
pub mod document;
pub mod entity;
pub mod error;
pub mod objects;
pub mod parser;

pub use color::{aci_to_rgb, Color, Rgb};
pub use document::{
    Block, DimStyle, Document, Header, Layer, Layout, LineType, SortEntry, SortEntsTable, Tables,
    TextStyle, MODEL_LAYOUT,
};
pub use entity::{
    DimensionData, DimensionKind, Entity, EntityKind, EntityType, HatchBoundary, HatchData,
    HatchEdge, HatchLoop, HatchPatternData, HatchStyle, HorizontalAlignment, ImageData,
    InsertData, LeaderData, MTextAttachment, MTextData, PatternLine, PolylineVertex, SplineData,
    TextData, VerticalAlignment, ViewportData,
};
pub use error::{Error, Result};
pub use objects::{ObjectEntry, ObjectKind, SpatialFilter};
pub use parser::DocumentParser;
#[cfg(feature = "serde")]
pub use parser::JsonDocumentParser;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

use std::fmt;

/// Document-scoped entity/object identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Handle(pub u64);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}
