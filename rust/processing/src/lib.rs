// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # DXF-Lite Processing
//!
//! Whole-document conversion on top of [`dxf_lite_geometry`]: the
//! cancellable [`ScenePipeline`], compare mode, configuration and the
//! parsed-document cache.
//!
//! ```rust
//! use dxf_lite_core::{Document, Entity, EntityKind, Handle, Point3};
//! use dxf_lite_processing::{ConversionConfig, ScenePipeline};
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
//!
//! let mut pipeline = ScenePipeline::new(ConversionConfig::default());
//! let scene = pipeline.convert(&doc).into_scene().unwrap();
//! assert_eq!(scene.model().unwrap().groups.len(), 1);
//! ```

pub mod cache;
pub mod compare;
pub mod config;
pub mod error;
pub mod pipeline;

pub use cache::{document_key, load_document, DocumentCache, InMemoryDocumentCache};
pub use compare::{diff_documents, ChangeColors, ChangeRecord, CompareOptions};
pub use config::{parse_color, ConversionConfig};
pub use error::{ConversionError, Result};
pub use pipeline::{
    CancellationToken, ConversionOutcome, PipelineState, ProgressSink, ScenePipeline,
};
