// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Non-graphical objects (OBJECTS section)
//!
//! Spatial filters are never referenced directly by the entity they clip.
//! The source format stores them behind dictionaries:
//! entity → extension dictionary → "ACAD_FILTER" dictionary → SPATIAL_FILTER,
//! each link expressed by the child's owner handle.

use crate::Handle;
use nalgebra::Point2;

#[cfg(feature = "serde")]
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectEntry {
    pub handle: Handle,
    #[cfg_attr(feature = "serde", serde(default))]
    pub owner: Option<Handle>,
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectKind {
    Dictionary { entries: Vec<(String, Handle)> },
    SpatialFilter(SpatialFilter),
    Other { type_name: String },
}

/// Clip boundary attached to an owner entity (XCLIP / image clip)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialFilter {
    /// Boundary polylines in the owner entity's local coordinates.
    /// A two-point boundary denotes an axis-aligned rectangle (opposite corners).
    pub boundaries: Vec<Vec<Point2<f64>>>,
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub enabled: bool,
    /// Inverted clip: keep what lies outside the boundary
    #[cfg_attr(feature = "serde", serde(default))]
    pub reversed: bool,
}

impl SpatialFilter {
    pub fn new(boundary: Vec<Point2<f64>>) -> Self {
        Self {
            boundaries: vec![boundary],
            enabled: true,
            reversed: false,
        }
    }
}
