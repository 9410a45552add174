// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drawing entities
//!
//! Angles are radians. Points of planar entities (arcs, circles, polylines,
//! text, hatches) are expressed in the entity's object coordinate system,
//! defined by [`Entity::extrusion`].

use crate::color::Color;
use crate::Handle;
use nalgebra::{Point2, Point3, Vector2, Vector3};
use std::fmt;

#[cfg(feature = "serde")]
fn default_extrusion() -> Vector3<f64> {
    Vector3::z()
}

#[cfg(feature = "serde")]
fn default_true() -> bool {
    true
}

#[cfg(feature = "serde")]
fn default_one() -> f64 {
    1.0
}

#[cfg(feature = "serde")]
fn default_unit_scale() -> Vector3<f64> {
    Vector3::new(1.0, 1.0, 1.0)
}

#[cfg(feature = "serde")]
fn default_count() -> u16 {
    1
}

/// A drawing entity: common attributes plus the type-specific payload
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    pub handle: Handle,
    /// Owning block record (model space, paper space or a block definition)
    #[cfg_attr(feature = "serde", serde(default))]
    pub owner: Option<Handle>,
    pub layer: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub color: Color,
    /// Line type name, `None` meaning BYLAYER
    #[cfg_attr(feature = "serde", serde(default))]
    pub line_type: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub line_weight: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub visible: bool,
    /// OCS normal
    #[cfg_attr(feature = "serde", serde(default = "default_extrusion"))]
    pub extrusion: Vector3<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub extension_dictionary: Option<Handle>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(handle: Handle, layer: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            handle,
            owner: None,
            layer: layer.into(),
            color: Color::ByLayer,
            line_type: None,
            line_weight: None,
            visible: true,
            extrusion: Vector3::z(),
            extension_dictionary: None,
            kind,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_owner(mut self, owner: Handle) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_line_type(mut self, line_type: impl Into<String>) -> Self {
        self.line_type = Some(line_type.into());
        self
    }

    pub fn with_extrusion(mut self, extrusion: Vector3<f64>) -> Self {
        self.extrusion = extrusion;
        self
    }

    pub fn with_extension_dictionary(mut self, dictionary: Handle) -> Self {
        self.extension_dictionary = Some(dictionary);
        self
    }

    #[inline]
    pub fn entity_type(&self) -> EntityType {
        self.kind.entity_type()
    }

    /// DXF type name (e.g. "LINE"), or the recorded name of an unknown entity
    pub fn type_name(&self) -> &str {
        match &self.kind {
            EntityKind::Unknown { type_name } => type_name,
            kind => kind.entity_type().dxf_name(),
        }
    }
}

/// Type tag used for processor dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Line,
    Point,
    Circle,
    Arc,
    Ellipse,
    Polyline,
    Spline,
    Solid,
    Text,
    MText,
    Insert,
    Hatch,
    Dimension,
    Leader,
    Viewport,
    Image,
    Unknown,
}

impl EntityType {
    pub fn dxf_name(self) -> &'static str {
        match self {
            EntityType::Line => "LINE",
            EntityType::Point => "POINT",
            EntityType::Circle => "CIRCLE",
            EntityType::Arc => "ARC",
            EntityType::Ellipse => "ELLIPSE",
            EntityType::Polyline => "LWPOLYLINE",
            EntityType::Spline => "SPLINE",
            EntityType::Solid => "SOLID",
            EntityType::Text => "TEXT",
            EntityType::MText => "MTEXT",
            EntityType::Insert => "INSERT",
            EntityType::Hatch => "HATCH",
            EntityType::Dimension => "DIMENSION",
            EntityType::Leader => "LEADER",
            EntityType::Viewport => "VIEWPORT",
            EntityType::Image => "IMAGE",
            EntityType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dxf_name())
    }
}

/// Type-specific entity payload
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum EntityKind {
    Line {
        start: Point3<f64>,
        end: Point3<f64>,
    },
    Point {
        position: Point3<f64>,
    },
    Circle {
        center: Point3<f64>,
        radius: f64,
    },
    Arc {
        center: Point3<f64>,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    Ellipse {
        center: Point3<f64>,
        /// Major axis endpoint relative to the center (WCS)
        major_axis: Vector3<f64>,
        axis_ratio: f64,
        start_param: f64,
        end_param: f64,
    },
    Polyline {
        vertices: Vec<PolylineVertex>,
        #[cfg_attr(feature = "serde", serde(default))]
        closed: bool,
        #[cfg_attr(feature = "serde", serde(default))]
        elevation: f64,
    },
    Spline(SplineData),
    /// Filled triangle or quadrilateral (SOLID/TRACE), DXF corner order
    Solid {
        corners: Vec<Point3<f64>>,
    },
    Text(TextData),
    MText(MTextData),
    Insert(InsertData),
    Hatch(HatchData),
    Dimension(DimensionData),
    Leader(LeaderData),
    Viewport(ViewportData),
    Image(ImageData),
    /// Entity type this model does not represent
    Unknown {
        type_name: String,
    },
}

impl EntityKind {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityKind::Line { .. } => EntityType::Line,
            EntityKind::Point { .. } => EntityType::Point,
            EntityKind::Circle { .. } => EntityType::Circle,
            EntityKind::Arc { .. } => EntityType::Arc,
            EntityKind::Ellipse { .. } => EntityType::Ellipse,
            EntityKind::Polyline { .. } => EntityType::Polyline,
            EntityKind::Spline(_) => EntityType::Spline,
            EntityKind::Solid { .. } => EntityType::Solid,
            EntityKind::Text(_) => EntityType::Text,
            EntityKind::MText(_) => EntityType::MText,
            EntityKind::Insert(_) => EntityType::Insert,
            EntityKind::Hatch(_) => EntityType::Hatch,
            EntityKind::Dimension(_) => EntityType::Dimension,
            EntityKind::Leader(_) => EntityType::Leader,
            EntityKind::Viewport(_) => EntityType::Viewport,
            EntityKind::Image(_) => EntityType::Image,
            EntityKind::Unknown { .. } => EntityType::Unknown,
        }
    }
}

/// Polyline vertex with the bulge of the segment starting at it
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolylineVertex {
    pub position: Point2<f64>,
    /// tan(θ/4) of the arc segment to the next vertex; negative is clockwise
    #[cfg_attr(feature = "serde", serde(default))]
    pub bulge: f64,
}

impl PolylineVertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            bulge: 0.0,
        }
    }

    pub fn with_bulge(x: f64, y: f64, bulge: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            bulge,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SplineData {
    pub degree: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub control_points: Vec<Point3<f64>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub knots: Vec<f64>,
    /// Rational weights, empty for non-rational splines
    #[cfg_attr(feature = "serde", serde(default))]
    pub weights: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fit_points: Vec<Point3<f64>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
    /// Fit between insertion and alignment point, height scaled
    Aligned,
    Middle,
    /// Fit between insertion and alignment point, width scaled
    Fit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VerticalAlignment {
    #[default]
    Baseline,
    Bottom,
    Middle,
    Top,
}

/// Single-line text (TEXT, ATTRIB)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextData {
    pub text: String,
    pub position: Point3<f64>,
    pub height: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotation: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_one"))]
    pub width_factor: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub style: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub halign: HorizontalAlignment,
    #[cfg_attr(feature = "serde", serde(default))]
    pub valign: VerticalAlignment,
    /// Second alignment point, used by every alignment except Left/Baseline
    #[cfg_attr(feature = "serde", serde(default))]
    pub align_point: Option<Point3<f64>>,
}

impl TextData {
    pub fn new(text: impl Into<String>, position: Point3<f64>, height: f64) -> Self {
        Self {
            text: text.into(),
            position,
            height,
            rotation: 0.0,
            width_factor: 1.0,
            style: None,
            halign: HorizontalAlignment::Left,
            valign: VerticalAlignment::Baseline,
            align_point: None,
        }
    }
}

/// MTEXT attachment point (DXF group 71, 1-9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MTextAttachment {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl MTextAttachment {
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => Self::TopCenter,
            3 => Self::TopRight,
            4 => Self::MiddleLeft,
            5 => Self::MiddleCenter,
            6 => Self::MiddleRight,
            7 => Self::BottomLeft,
            8 => Self::BottomCenter,
            9 => Self::BottomRight,
            _ => Self::TopLeft,
        }
    }

    /// Horizontal anchor: 0 = left, 1 = center, 2 = right
    pub fn column(self) -> u8 {
        (self as u8) % 3
    }

    /// Vertical anchor: 0 = top, 1 = middle, 2 = bottom
    pub fn row(self) -> u8 {
        (self as u8) / 3
    }
}

/// Multi-line text
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MTextData {
    /// Raw content including inline formatting codes
    pub text: String,
    pub position: Point3<f64>,
    pub height: f64,
    /// Reference rectangle width; no wrapping when absent or zero
    #[cfg_attr(feature = "serde", serde(default))]
    pub width: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotation: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attachment: MTextAttachment,
    #[cfg_attr(feature = "serde", serde(default = "default_one"))]
    pub line_spacing: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub style: Option<String>,
}

/// Block reference (INSERT / MINSERT)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InsertData {
    pub block: String,
    pub position: Point3<f64>,
    #[cfg_attr(feature = "serde", serde(default = "default_unit_scale"))]
    pub scale: Vector3<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotation: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_count"))]
    pub columns: u16,
    #[cfg_attr(feature = "serde", serde(default = "default_count"))]
    pub rows: u16,
    #[cfg_attr(feature = "serde", serde(default))]
    pub column_spacing: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub row_spacing: f64,
    /// Attached ATTRIB entities (text), in world coordinates
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: Vec<Entity>,
}

impl InsertData {
    pub fn new(block: impl Into<String>, position: Point3<f64>) -> Self {
        Self {
            block: block.into(),
            position,
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation: 0.0,
            columns: 1,
            rows: 1,
            column_spacing: 0.0,
            row_spacing: 0.0,
            attributes: Vec::new(),
        }
    }
}

/// Hatch island detection style (DXF group 75)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HatchStyle {
    /// Alternate fill/hole by nesting depth
    #[default]
    OddParity,
    /// Fill only the outermost area
    Outermost,
    /// Fill the outer boundaries, ignoring inner loops
    Ignore,
}

/// One line family of a hatch pattern
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternLine {
    pub angle: f64,
    pub base: Point2<f64>,
    pub offset: Vector2<f64>,
    /// Dash lengths; positive = dash, negative = gap, zero = dot
    #[cfg_attr(feature = "serde", serde(default))]
    pub dashes: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HatchPatternData {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub angle: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_one"))]
    pub scale: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lines: Vec<PatternLine>,
}

/// Edge of an edge-defined hatch boundary loop (OCS)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "edge"))]
pub enum HatchEdge {
    Line {
        start: Point2<f64>,
        end: Point2<f64>,
    },
    Arc {
        center: Point2<f64>,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        ccw: bool,
    },
    Ellipse {
        center: Point2<f64>,
        major_axis: Vector2<f64>,
        axis_ratio: f64,
        start_angle: f64,
        end_angle: f64,
        ccw: bool,
    },
    Spline {
        degree: usize,
        control_points: Vec<Point2<f64>>,
        #[cfg_attr(feature = "serde", serde(default))]
        knots: Vec<f64>,
        #[cfg_attr(feature = "serde", serde(default))]
        weights: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HatchBoundary {
    Polyline {
        vertices: Vec<PolylineVertex>,
        #[cfg_attr(feature = "serde", serde(default = "default_true"))]
        closed: bool,
    },
    Edges(Vec<HatchEdge>),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HatchLoop {
    pub boundary: HatchBoundary,
    /// Loop flagged external by the authoring application
    #[cfg_attr(feature = "serde", serde(default))]
    pub external: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub outermost: bool,
}

impl HatchLoop {
    pub fn polyline(vertices: Vec<PolylineVertex>) -> Self {
        Self {
            boundary: HatchBoundary::Polyline {
                vertices,
                closed: true,
            },
            external: false,
            outermost: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HatchData {
    pub solid: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pattern: HatchPatternData,
    #[cfg_attr(feature = "serde", serde(default))]
    pub style: HatchStyle,
    pub loops: Vec<HatchLoop>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub elevation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DimensionKind {
    /// Horizontal/vertical/rotated linear dimension; rotation of the dimension line
    Linear { rotation: f64 },
    Aligned,
    Angular,
    Radial,
    Diameter,
    Ordinate,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimensionData {
    pub kind: DimensionKind,
    /// Pre-rendered anonymous block (e.g. "*D12")
    #[cfg_attr(feature = "serde", serde(default))]
    pub block: Option<String>,
    /// Origin of the first extension line (DXF 13)
    pub first_point: Point3<f64>,
    /// Origin of the second extension line (DXF 14)
    pub second_point: Point3<f64>,
    /// Point on the dimension line (DXF 10)
    pub line_point: Point3<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub text_position: Option<Point3<f64>>,
    /// Override text; "<>" is replaced by the measurement
    #[cfg_attr(feature = "serde", serde(default))]
    pub text: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeaderData {
    pub vertices: Vec<Point3<f64>>,
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub arrowhead: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub style: Option<String>,
}

/// Paper-space window onto model space
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportData {
    /// Center in paper space
    pub center: Point3<f64>,
    pub width: f64,
    pub height: f64,
    /// Model-space point shown at the viewport center
    pub view_center: Point2<f64>,
    /// Model-space height shown by the viewport
    pub view_height: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub twist: f64,
    /// Viewport id; 1 is the paper-space overall viewport
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: u16,
    #[cfg_attr(feature = "serde", serde(default))]
    pub frozen_layers: Vec<String>,
}

/// Raster image reference
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageData {
    pub position: Point3<f64>,
    /// World size of one pixel along U
    pub u_vector: Vector3<f64>,
    /// World size of one pixel along V
    pub v_vector: Vector3<f64>,
    /// Image size in pixels
    pub size: Vector2<f64>,
}
