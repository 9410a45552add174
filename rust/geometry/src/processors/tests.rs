// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests for geometry processors.

use super::*;
use crate::index::ReferenceIndex;
use crate::mesh::Shape;
use crate::router::{EntityGeometry, GeometryProcessor, ProcessContext};
use crate::spatial_filter::SpatialFilterResolver;
use crate::tessellation::{CurveTessellator, RenderContext, TessellationConfig};
use crate::text::StaticFontManager;
use crate::triangulation::triangles_area;
use crate::{Error, ErrorClass};
use approx::assert_relative_eq;
use dxf_lite_core::{
    Block, DimensionData, DimensionKind, Document, Entity, EntityKind, Handle, HatchData,
    HatchLoop, InsertData, LeaderData, ObjectEntry, ObjectKind, Point2, Point3, PolylineVertex,
    SpatialFilter, TextData, TextStyle, Vector3,
};
use std::f64::consts::PI;

/// Run one processor on `entity` with services built from `doc`
fn run(doc: &Document, processor: &dyn GeometryProcessor, entity: &Entity) -> crate::Result<EntityGeometry> {
    let index = ReferenceIndex::new(doc);
    let tessellator = CurveTessellator::new(TessellationConfig::default(), RenderContext::default());
    let fonts = StaticFontManager::new();
    let filters = SpatialFilterResolver::new(&index);
    let ctx = ProcessContext {
        index: &index,
        tessellator: &tessellator,
        fonts: &fonts,
        filters: &filters,
    };
    processor.process(entity, &ctx)
}

fn only_points(geometry: &EntityGeometry) -> &[Point2<f64>] {
    assert_eq!(geometry.shapes.len(), 1);
    geometry.shapes[0].points()
}

fn square(x: f64, y: f64, size: f64) -> HatchLoop {
    HatchLoop::polyline(vec![
        PolylineVertex::new(x, y),
        PolylineVertex::new(x + size, y),
        PolylineVertex::new(x + size, y + size),
        PolylineVertex::new(x, y + size),
    ])
}

#[test]
fn test_arc_angles_are_monotonic() {
    let doc = Document::new();
    let arc = Entity::new(
        Handle(0x10),
        "0",
        EntityKind::Arc {
            center: Point3::origin(),
            radius: 1.0,
            start_angle: 0.0,
            end_angle: PI,
        },
    );
    let geometry = run(&doc, &ArcProcessor, &arc).unwrap();
    let points = only_points(&geometry);

    assert!(points.len() >= 2);
    let angles: Vec<f64> = points.iter().map(|p| p.y.atan2(p.x)).collect();
    assert_relative_eq!(angles[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(angles[angles.len() - 1].abs(), PI, epsilon = 1e-9);
    // atan2 may report the last point as -π
    for pair in angles[..angles.len() - 1].windows(2) {
        assert!(pair[1] >= pair[0] - 1e-12, "angles decrease: {:?}", pair);
    }
}

#[test]
fn test_arc_across_zero_keeps_direction() {
    let doc = Document::new();
    let arc = Entity::new(
        Handle(0x10),
        "0",
        EntityKind::Arc {
            center: Point3::origin(),
            radius: 2.0,
            start_angle: 350f64.to_radians(),
            end_angle: 10f64.to_radians(),
        },
    );
    let geometry = run(&doc, &ArcProcessor, &arc).unwrap();
    let points = only_points(&geometry);

    // A 20° sweep through angle zero: every point stays right of the center
    assert!(points.iter().all(|p| p.x > 1.9));
    assert!(points.first().unwrap().y < 0.0);
    assert!(points.last().unwrap().y > 0.0);
}

#[test]
fn test_zero_radius_arc_is_malformed() {
    let doc = Document::new();
    let arc = Entity::new(
        Handle(0x10),
        "0",
        EntityKind::Arc {
            center: Point3::origin(),
            radius: 0.0,
            start_angle: 0.0,
            end_angle: PI,
        },
    );
    let error = run(&doc, &ArcProcessor, &arc).unwrap_err();
    assert_eq!(error.class(), ErrorClass::MalformedGeometry);
}

#[test]
fn test_mirrored_circle_stays_closed() {
    let doc = Document::new();
    let circle = Entity::new(
        Handle(0x11),
        "0",
        EntityKind::Circle {
            center: Point3::new(5.0, 0.0, 0.0),
            radius: 1.0,
        },
    )
    .with_extrusion(Vector3::new(0.0, 0.0, -1.0));
    let geometry = run(&doc, &CircleProcessor, &circle).unwrap();

    let Shape::Polyline { points, closed } = &geometry.shapes[0] else {
        panic!("circle should be a polyline");
    };
    assert!(*closed);
    assert_ne!(points.first(), points.last());
    // OCS x is mirrored for a -Z extrusion
    for p in points {
        assert_relative_eq!((p - Point2::new(-5.0, 0.0)).norm(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn test_polyline_bulge_and_degenerate_cases() {
    let doc = Document::new();
    let semicircle = Entity::new(
        Handle(0x12),
        "0",
        EntityKind::Polyline {
            vertices: vec![
                PolylineVertex::with_bulge(0.0, 0.0, 1.0),
                PolylineVertex::new(2.0, 0.0),
            ],
            closed: false,
            elevation: 0.0,
        },
    );
    let geometry = run(&doc, &PolylineProcessor, &semicircle).unwrap();
    let points = only_points(&geometry);
    assert!(points.len() > 2);
    for p in points {
        assert_relative_eq!((p - Point2::new(1.0, 0.0)).norm(), 1.0, epsilon = 1e-9);
    }

    let single = Entity::new(
        Handle(0x13),
        "0",
        EntityKind::Polyline {
            vertices: vec![PolylineVertex::new(3.0, 4.0)],
            closed: false,
            elevation: 0.0,
        },
    );
    let geometry = run(&doc, &PolylineProcessor, &single).unwrap();
    assert!(matches!(geometry.shapes[0], Shape::Points(_)));

    let empty = Entity::new(
        Handle(0x14),
        "0",
        EntityKind::Polyline {
            vertices: Vec::new(),
            closed: true,
            elevation: 0.0,
        },
    );
    let error = run(&doc, &PolylineProcessor, &empty).unwrap_err();
    assert!(matches!(error, Error::InvalidGeometry(_)));
}

#[test]
fn test_solid_corner_order() {
    let doc = Document::new();
    // DXF order: corners 3 and 4 are swapped relative to the outline
    let solid = Entity::new(
        Handle(0x15),
        "0",
        EntityKind::Solid {
            corners: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(0.0, 3.0, 0.0),
                Point3::new(2.0, 3.0, 0.0),
            ],
        },
    );
    let geometry = run(&doc, &SolidProcessor, &solid).unwrap();
    let Shape::Triangles { points, indices } = &geometry.shapes[0] else {
        panic!("solid should be triangles");
    };
    assert_eq!(indices.len(), 6);
    assert_relative_eq!(triangles_area(points, indices), 6.0, epsilon = 1e-9);
}

#[test]
fn test_nested_hatch_area() {
    let doc = Document::new();
    let hatch = Entity::new(
        Handle(0x20),
        "0",
        EntityKind::Hatch(HatchData {
            solid: true,
            pattern: Default::default(),
            style: Default::default(),
            loops: vec![
                square(0.0, 0.0, 10.0),
                square(2.0, 2.0, 6.0),
                square(4.0, 4.0, 2.0),
            ],
            elevation: 0.0,
        }),
    );
    let geometry = run(&doc, &HatchProcessor, &hatch).unwrap();

    let area: f64 = geometry
        .shapes
        .iter()
        .map(|shape| match shape {
            Shape::Triangles { points, indices } => triangles_area(points, indices),
            _ => 0.0,
        })
        .sum();
    // 100 - 36 + 4
    assert_relative_eq!(area, 68.0, epsilon = 1e-6);
}

#[test]
fn test_insert_missing_block_is_dangling() {
    let doc = Document::new();
    let insert = Entity::new(
        Handle(0x30),
        "0",
        EntityKind::Insert(InsertData::new("NOPE", Point3::origin())),
    );
    let error = run(&doc, &InsertProcessor, &insert).unwrap_err();
    assert_eq!(error.class(), ErrorClass::DanglingReference);
}

#[test]
fn test_insert_picks_up_spatial_filter() {
    let mut doc = Document::new();
    doc.add_block(Block::new("DOOR", Handle(0x100)));

    let mut data = InsertData::new("DOOR", Point3::new(100.0, 0.0, 0.0));
    data.scale = Vector3::new(2.0, 2.0, 1.0);
    let insert = Entity::new(Handle(0x30), "0", EntityKind::Insert(data))
        .with_extension_dictionary(Handle(0x40));
    doc.entities.push(insert.clone());

    doc.objects.push(ObjectEntry {
        handle: Handle(0x40),
        owner: Some(Handle(0x30)),
        kind: ObjectKind::Dictionary {
            entries: vec![("ACAD_FILTER".to_string(), Handle(0x41))],
        },
    });
    doc.objects.push(ObjectEntry {
        handle: Handle(0x41),
        owner: Some(Handle(0x40)),
        kind: ObjectKind::Dictionary {
            entries: vec![("SPATIAL".to_string(), Handle(0x42))],
        },
    });
    doc.objects.push(ObjectEntry {
        handle: Handle(0x42),
        owner: Some(Handle(0x41)),
        kind: ObjectKind::SpatialFilter(SpatialFilter::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
        ])),
    });

    let geometry = run(&doc, &InsertProcessor, &insert).unwrap();
    assert_eq!(geometry.instances.len(), 1);
    let clip = geometry.instances[0]
        .clip
        .as_ref()
        .expect("insert should be clipped");
    assert_eq!(clip.source, Handle(0x42));
    assert!(clip.contains(&Point2::new(101.0, 1.0)));
    assert!(!clip.contains(&Point2::new(103.0, 1.0)));

    // MINSERT cells each clip through their own placement
    let mut grid = insert.clone();
    if let EntityKind::Insert(data) = &mut grid.kind {
        data.columns = 2;
        data.column_spacing = 10.0;
    }
    let geometry = run(&doc, &InsertProcessor, &grid).unwrap();
    let second = geometry.instances[1].clip.as_ref().unwrap();
    assert!(second.contains(&Point2::new(111.0, 1.0)));
    assert!(!second.contains(&Point2::new(101.0, 1.0)));
}

#[test]
fn test_dimension_prefers_block() {
    let mut doc = Document::new();
    doc.add_block(Block::new("*D1", Handle(0x101)));

    let mut data = DimensionData {
        kind: DimensionKind::Linear { rotation: 0.0 },
        block: Some("*D1".to_string()),
        first_point: Point3::new(0.0, 0.0, 0.0),
        second_point: Point3::new(10.0, 0.0, 0.0),
        line_point: Point3::new(0.0, 5.0, 0.0),
        text_position: None,
        text: None,
        style: None,
    };
    let dim = Entity::new(Handle(0x50), "0", EntityKind::Dimension(data.clone()));
    let geometry = run(&doc, &DimensionProcessor, &dim).unwrap();
    assert_eq!(geometry.instances.len(), 1);
    assert!(geometry.shapes.is_empty());

    // Without the block the dimension is composed
    data.block = Some("*D2".to_string());
    let dim = Entity::new(Handle(0x51), "0", EntityKind::Dimension(data));
    let geometry = run(&doc, &DimensionProcessor, &dim).unwrap();
    assert!(geometry.instances.is_empty());
    let text = geometry.shapes.iter().find_map(|shape| match shape {
        Shape::Text(layout) => Some(layout),
        _ => None,
    });
    assert_eq!(text.unwrap().lines[0].text, "10.0000");
}

#[test]
fn test_angular_dimension_without_block_is_unsupported() {
    let doc = Document::new();
    let dim = Entity::new(
        Handle(0x52),
        "0",
        EntityKind::Dimension(DimensionData {
            kind: DimensionKind::Angular,
            block: None,
            first_point: Point3::origin(),
            second_point: Point3::new(1.0, 0.0, 0.0),
            line_point: Point3::new(0.0, 1.0, 0.0),
            text_position: None,
            text: None,
            style: None,
        }),
    );
    let error = run(&doc, &DimensionProcessor, &dim).unwrap_err();
    assert_eq!(error.class(), ErrorClass::Unsupported);
}

#[test]
fn test_leader_with_arrowhead() {
    let doc = Document::new();
    let leader = Entity::new(
        Handle(0x53),
        "0",
        EntityKind::Leader(LeaderData {
            vertices: vec![Point3::origin(), Point3::new(5.0, 5.0, 0.0)],
            arrowhead: true,
            style: None,
        }),
    );
    let geometry = run(&doc, &LeaderProcessor, &leader).unwrap();
    assert_eq!(geometry.shapes.len(), 2);
    assert!(matches!(geometry.shapes[0], Shape::Polyline { .. }));
    assert_eq!(geometry.shapes[1].points()[0], Point2::origin());
}

#[test]
fn test_text_uses_fallback_font() {
    let doc = Document::new();
    let mut data = TextData::new("ABC", Point3::new(1.0, 2.0, 0.0), 0.0);
    data.style = Some("MISSING".to_string());
    let text = Entity::new(Handle(0x60), "0", EntityKind::Text(data));

    let geometry = run(&doc, &TextProcessor, &text).unwrap();
    let Shape::Text(layout) = &geometry.shapes[0] else {
        panic!("text should produce a layout");
    };
    assert!(layout.font.fallback);
    assert_relative_eq!(layout.height, 2.5);
    assert_eq!(layout.position, Point2::new(1.0, 2.0));
}

#[test]
fn test_text_ignores_zero_style_width_factor() {
    let mut doc = Document::new();
    doc.tables.text_styles.insert(
        "PLAIN".to_string(),
        TextStyle {
            name: "PLAIN".to_string(),
            font: "txt".to_string(),
            fixed_height: 0.0,
            width_factor: 0.0,
            oblique_angle: 0.0,
        },
    );
    let mut data = TextData::new("ABC", Point3::origin(), 2.0);
    data.width_factor = 0.0;
    data.style = Some("PLAIN".to_string());
    let text = Entity::new(Handle(0x61), "0", EntityKind::Text(data));

    let geometry = run(&doc, &TextProcessor, &text).unwrap();
    let Shape::Text(layout) = &geometry.shapes[0] else {
        panic!("text should produce a layout");
    };
    assert_relative_eq!(layout.width_factor, 1.0);
    assert!(layout.lines[0].width > 0.0);
}
