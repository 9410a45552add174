// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end conversions through the scene pipeline.

use approx::assert_relative_eq;
use dxf_lite_core::{
    aci_to_rgb, Color, Document, Entity, EntityKind, Handle, HatchData, HatchLoop,
    JsonDocumentParser, Layer, Layout, Point3, PolylineVertex, SortEntry, SortEntsTable,
};
use dxf_lite_geometry::triangulation::triangles_area;
use dxf_lite_geometry::{
    ArcSpec, CurveTessellator, Matrix3, NumericStabilizer, Point2, PrimitiveKind, RebaseConfig,
    RenderContext, Scene, SceneMerger, TessellationConfig,
};
use dxf_lite_processing::{
    CancellationToken, ConversionConfig, ConversionError, ConversionOutcome, PipelineState,
    ScenePipeline,
};
use std::f64::consts::PI;

const SHEET_RECORD: Handle = Handle(0x30);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn line(handle: u64, layer: &str, x: f64) -> Entity {
    Entity::new(
        Handle(handle),
        layer,
        EntityKind::Line {
            start: Point3::new(x, 0.0, 0.0),
            end: Point3::new(x, 1.0, 0.0),
        },
    )
}

fn square(x: f64, y: f64, size: f64) -> HatchLoop {
    HatchLoop::polyline(vec![
        PolylineVertex::new(x, y),
        PolylineVertex::new(x + size, y),
        PolylineVertex::new(x + size, y + size),
        PolylineVertex::new(x, y + size),
    ])
}

fn drawing(lines: u64) -> Document {
    let mut doc = Document::new();
    doc.add_layer(Layer::new("WALLS", Color::Index(1)));
    for i in 0..lines {
        doc.entities.push(line(0x100 + i, "WALLS", i as f64));
    }
    doc
}

fn with_sheet(mut doc: Document) -> Document {
    doc.add_layout(Layout {
        name: "Sheet1".to_string(),
        handle: Handle(0x31),
        block_record_handle: SHEET_RECORD,
        tab_order: 1,
    });
    doc.entities.push(line(0x200, "0", 0.0).with_owner(SHEET_RECORD));
    doc
}

fn done(outcome: ConversionOutcome) -> Scene {
    match outcome {
        ConversionOutcome::Done(scene) => scene,
        ConversionOutcome::Aborted { processed, .. } => {
            panic!("conversion aborted after {processed} entities")
        }
    }
}

#[test]
fn test_layer_colors_reach_nodes() {
    init_tracing();
    let mut pipeline = ScenePipeline::default();
    let scene = done(pipeline.convert(&drawing(3)));

    let model = scene.model().unwrap();
    let walls = model.group("WALLS").unwrap();
    assert_eq!(walls.nodes.len(), 3);
    assert!(walls.nodes.iter().all(|n| n.style.color == aci_to_rgb(1)));
    assert_eq!(walls.batches.len(), 1);
    assert_eq!(pipeline.state(), PipelineState::Done);
}

#[test]
fn test_sort_table_brings_entity_to_front() {
    let mut doc = Document::new();
    doc.add_layer(Layer::new("WALLS", Color::Index(1)));
    doc.entities.push(line(0x10, "WALLS", 0.0));
    doc.entities.push(line(0x11, "WALLS", 1.0));
    doc.tables.sort_ents.push(SortEntsTable {
        owner: Handle(0x1F),
        entries: vec![SortEntry {
            entity: Handle(0x10),
            sort_handle: Handle(0x20),
        }],
    });

    let scene = done(ScenePipeline::default().convert(&doc));
    let walls = scene.model().unwrap().group("WALLS").unwrap();
    let sources: Vec<Handle> = walls.batches.iter().flat_map(|b| b.sources.clone()).collect();
    assert_eq!(sources, vec![Handle(0x11), Handle(0x10)]);
}

#[test]
fn test_missing_model_layout_keeps_entities() {
    let mut doc = drawing(2);
    doc.layouts.clear();

    let mut pipeline = ScenePipeline::default();
    let scene = done(pipeline.convert(&doc));
    let walls = scene.model().unwrap().group("WALLS").unwrap();
    assert_eq!(walls.nodes.len(), 2);
    assert_eq!(scene.stats.dangling_references, 0);
}

#[test]
fn test_nested_hatch_area() {
    let mut doc = Document::new();
    doc.entities.push(Entity::new(
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
    ));

    let scene = done(ScenePipeline::default().convert(&doc));
    let node = scene.find(Handle(0x20)).unwrap();
    let area: f64 = node
        .geometry
        .iter()
        .filter_map(|key| scene.geometry(*key))
        .filter(|g| g.kind() == PrimitiveKind::Triangles)
        .map(|g| {
            let points: Vec<Point2<f64>> = g.world_points(&Matrix3::identity()).collect();
            triangles_area(&points, g.indices())
        })
        .sum();
    assert_relative_eq!(area, 68.0, epsilon = 1e-3);
}

#[test]
fn test_merge_is_a_fixed_point() {
    let mut doc = with_sheet(drawing(4));
    doc.entities.push(Entity::new(
        Handle(0x300),
        "WALLS",
        EntityKind::Circle {
            center: Point3::origin(),
            radius: 0.0,
        },
    ));

    let mut scene = done(ScenePipeline::default().convert(&doc));
    let merged = scene.layouts.clone();
    let report = SceneMerger::default().merge(&mut scene);

    assert_eq!(report.removed, 0);
    assert_eq!(scene.layouts, merged);
}

#[test]
fn test_cancel_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let mut pipeline = ScenePipeline::default().with_cancellation(token);

    let outcome = pipeline.convert(&drawing(10));
    assert!(matches!(
        outcome,
        ConversionOutcome::Aborted {
            processed: 0,
            generated_nodes: 0
        }
    ));
    assert_eq!(pipeline.state(), PipelineState::Aborted);
}

#[test]
fn test_cancel_mid_conversion() {
    init_tracing();
    let token = CancellationToken::new();
    let trigger = token.clone();
    let config = ConversionConfig {
        progress_interval: 1,
        ..ConversionConfig::default()
    };
    let mut pipeline = ScenePipeline::new(config)
        .with_cancellation(token)
        .with_progress(move |processed: usize, _total: usize| {
            if processed == 3 {
                trigger.cancel();
            }
        });

    match pipeline.convert(&drawing(10)) {
        ConversionOutcome::Aborted {
            processed,
            generated_nodes,
        } => {
            assert_eq!(processed, 3);
            assert!(generated_nodes <= 4);
        }
        ConversionOutcome::Done(_) => panic!("conversion ignored cancellation"),
    }
    assert!(pipeline.cancellation_token().is_cancelled());
}

#[test]
fn test_ignore_paper_space() {
    let doc = with_sheet(drawing(2));

    let scene = done(ScenePipeline::default().convert(&doc));
    assert_eq!(scene.layout("Sheet1").unwrap().node_count(), 1);

    let config = ConversionConfig {
        ignore_paper_space: true,
        ..ConversionConfig::default()
    };
    let scene = done(ScenePipeline::new(config).convert(&doc));
    assert!(scene.layout("Sheet1").is_none());
    assert_eq!(scene.node_count(), 2);
}

#[test]
fn test_orphan_lands_in_model_space() {
    let mut doc = drawing(1);
    doc.entities.push(line(0x400, "0", 5.0).with_owner(Handle(0xDEAD)));

    let scene = done(ScenePipeline::default().convert(&doc));
    assert!(scene.model().unwrap().find(Handle(0x400)).is_some());
    assert_eq!(scene.stats.dangling_references, 1);
}

#[test]
fn test_override_color() {
    let config = ConversionConfig {
        override_color: Some(aci_to_rgb(4)),
        ..ConversionConfig::default()
    };
    let scene = done(ScenePipeline::new(config).convert(&drawing(2)));
    let mut colors = Vec::new();
    for layout in &scene.layouts {
        for node in layout.nodes() {
            colors.push(node.style.color);
        }
    }
    assert_eq!(colors, vec![aci_to_rgb(4); 2]);
}

#[test]
fn test_merge_disabled_keeps_roots() {
    let config = ConversionConfig {
        enable_merge: false,
        ..ConversionConfig::default()
    };
    let scene = done(ScenePipeline::new(config).convert(&drawing(2)));
    let model = scene.model().unwrap();
    assert_eq!(model.roots.len(), 2);
    assert!(model.groups.is_empty());
}

#[test]
fn test_parse_failure_is_propagated() {
    let mut pipeline = ScenePipeline::default();
    let result = pipeline.convert_bytes(&JsonDocumentParser::new(), b"{ nope", "utf-8");

    assert!(matches!(result, Err(ConversionError::Parse(_))));
    assert_eq!(pipeline.state(), PipelineState::Idle);
}

#[test]
fn test_convert_json_bytes() {
    let json = br#"{
        "entities": [
            {"handle": 16, "layer": "0", "type": "Line",
             "start": [0.0, 0.0, 0.0], "end": [10.0, 0.0, 0.0]},
            {"handle": 17, "layer": "0", "type": "Circle",
             "center": [0.0, 0.0, 0.0], "radius": 2.0}
        ]
    }"#;

    let outcome = ScenePipeline::default()
        .convert_bytes(&JsonDocumentParser::new(), json, "utf-8")
        .unwrap();
    let scene = outcome.into_scene().unwrap();
    assert_eq!(scene.node_count(), 2);
    assert_eq!(scene.stats.processed, 2);
}

#[test]
fn test_far_coordinates_survive_conversion() {
    let mut doc = Document::new();
    doc.entities.push(Entity::new(
        Handle(0x10),
        "0",
        EntityKind::Line {
            start: Point3::new(2_679_012.0, 1_247_892.0, 0.0),
            end: Point3::new(2_679_112.0, 1_247_992.0, 0.0),
        },
    ));

    let scene = done(ScenePipeline::default().convert(&doc));
    let node = scene.find(Handle(0x10)).unwrap();
    assert!(node.is_rebased(&scene.arena));
    let geometry = scene.geometry(node.geometry[0]).unwrap();
    let points: Vec<Point2<f64>> = geometry.world_points(&node.transform).collect();
    assert_relative_eq!(points[0].x, 2_679_012.0, epsilon = 1e-3);
    assert_relative_eq!(points[1].y, 1_247_992.0, epsilon = 1e-3);
}

#[test]
fn test_rebase_is_idempotent() {
    let stabilizer = NumericStabilizer::new(&RebaseConfig::default(), 1.0);
    let points = vec![
        Point2::new(2_679_012.123, 1_247_892.654),
        Point2::new(2_679_112.123, 1_247_992.654),
    ];

    let once = stabilizer.stabilize(&points);
    let twice = stabilizer.restabilize(once.clone());
    assert!(once.rebased);
    assert_eq!(once, twice);
}

#[test]
fn test_unit_half_arc_is_monotonic() {
    let tessellator =
        CurveTessellator::new(TessellationConfig::default(), RenderContext::default());
    let arc = ArcSpec::ccw(Point2::origin(), 1.0, 0.0, PI);
    let points = tessellator.tessellate_arc(&arc, None, None);

    assert!(points.len() >= 2);
    // Upper half plane; clamp rounding noise below the x axis
    let angles: Vec<f64> = points.iter().map(|p| p.y.max(0.0).atan2(p.x)).collect();
    for pair in angles.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
    assert_relative_eq!(angles[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(*angles.last().unwrap(), PI, epsilon = 1e-9);
}

#[test]
fn test_arc_tessellation_is_monotonic() {
    let tessellator =
        CurveTessellator::new(TessellationConfig::default(), RenderContext::default());
    let arc = ArcSpec::ccw(Point2::origin(), 5.0, 3.0 * PI / 2.0, PI / 2.0);
    let points = tessellator.tessellate_arc(&arc, None, None);

    assert_relative_eq!(arc.sweep(), PI, epsilon = 1e-12);
    let angles: Vec<f64> = points
        .iter()
        .map(|p| p.y.atan2(p.x).rem_euclid(2.0 * PI))
        .map(|a| if a < PI { a + 2.0 * PI } else { a })
        .collect();
    for pair in angles.windows(2) {
        assert!(pair[1] > pair[0]);
    }
    assert_relative_eq!(angles[0], 3.0 * PI / 2.0, epsilon = 1e-9);
    assert_relative_eq!(*angles.last().unwrap(), 5.0 * PI / 2.0, epsilon = 1e-9);
}
