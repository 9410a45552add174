// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Processors
//!
//! One processor per entity family, registered with the generator by type.
//! Each sub-module handles a category of entities:
//!
//! - `curves`: LINE, POINT, CIRCLE, ARC, ELLIPSE, polylines, SPLINE, SOLID
//! - `text`: TEXT and MTEXT layout through the font manager
//! - `insert`: block references (INSERT/MINSERT) and their spatial filters
//! - `hatch`: boundary flattening, island classification, fills and patterns
//! - `dimension`: dimensions (block or composed) and leaders
//! - `viewport`: paper-space viewports and raster image frames
//! - `helpers`: OCS mapping and bulge flattening shared by several processors

mod curves;
mod dimension;
mod hatch;
mod helpers;
mod insert;
mod text;
mod viewport;

#[cfg(test)]
mod tests;

// Re-export all processor types
pub use curves::{
    ArcProcessor, CircleProcessor, EllipseProcessor, LineProcessor, PointProcessor,
    PolylineProcessor, SolidProcessor, SplineProcessor,
};
pub use dimension::{DimensionProcessor, LeaderProcessor};
pub use hatch::HatchProcessor;
pub use insert::InsertProcessor;
pub use text::{MTextProcessor, TextProcessor};
pub use viewport::{ImageProcessor, ViewportProcessor};
