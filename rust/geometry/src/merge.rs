// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene merge pass
//!
//! Prunes containers without geometric descendants, groups top-level nodes
//! by layer within each layout, and concatenates consecutive compatible
//! geometry into draw batches. Pruning is mark/sweep: removability of a
//! container is only known once all of its children are marked.

use crate::mesh::{CoordinateShift, Geometry, PrimitiveKind};
use crate::scene::{BatchKey, DrawBatch, GeometryArena, LayerGroup, Scene, SceneNode};
use crate::spatial_filter::ClipRegion;
use dxf_lite_core::Handle;
use nalgebra::Matrix3;

/// Which nodes the sweep removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrunePolicy {
    /// Nodes whose subtree draws nothing
    #[default]
    Empty,
    /// Empty nodes plus invisible subtrees
    EmptyOrHidden,
}

impl PrunePolicy {
    fn is_removable(self, node: &SceneNode, arena: &GeometryArena, children: &[MarkTree]) -> bool {
        if self == PrunePolicy::EmptyOrHidden && !node.visible {
            return true;
        }
        !node.has_own_geometry(arena) && children.iter().all(|mark| mark.removable)
    }
}

/// Mark phase result, mirroring the node tree
struct MarkTree {
    removable: bool,
    children: Vec<MarkTree>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeReport {
    /// Nodes removed, counting whole subtrees
    pub removed: usize,
    pub batches: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SceneMerger {
    policy: PrunePolicy,
}

impl SceneMerger {
    pub fn new(policy: PrunePolicy) -> Self {
        Self { policy }
    }

    /// Prune, group and batch every layout; running it again changes nothing
    pub fn merge(&self, scene: &mut Scene) -> MergeReport {
        let mut report = MergeReport::default();
        for layout in &mut scene.layouts {
            let mut nodes: Vec<SceneNode> = std::mem::take(&mut layout.groups)
                .into_iter()
                .flat_map(|group| group.nodes)
                .collect();
            nodes.append(&mut layout.roots);

            let (kept, removed) = self.prune(nodes, &scene.arena);
            report.removed += removed;

            for node in kept {
                match layout.groups.iter_mut().find(|g| g.layer == node.layer) {
                    Some(group) => group.nodes.push(node),
                    None => layout.groups.push(LayerGroup {
                        layer: node.layer.clone(),
                        nodes: vec![node],
                        batches: Vec::new(),
                    }),
                }
            }
            for group in &mut layout.groups {
                group.batches = build_batches(&group.nodes, &scene.arena);
                report.batches += group.batches.len();
            }
        }

        scene.stats.pruned += report.removed;
        scene.stats.batches = report.batches;
        tracing::debug!(
            removed = report.removed,
            batches = report.batches,
            "scene merged"
        );
        report
    }

    /// Remove nodes the policy marks; returns survivors and the removed node count
    pub fn prune(&self, nodes: Vec<SceneNode>, arena: &GeometryArena) -> (Vec<SceneNode>, usize) {
        let marks: Vec<MarkTree> = nodes.iter().map(|node| self.mark(node, arena)).collect();
        let mut removed = 0;
        let kept = nodes
            .into_iter()
            .zip(marks)
            .filter_map(|(node, mark)| sweep(node, mark, &mut removed))
            .collect();
        (kept, removed)
    }

    fn mark(&self, node: &SceneNode, arena: &GeometryArena) -> MarkTree {
        let children: Vec<MarkTree> = node
            .children
            .iter()
            .map(|child| self.mark(child, arena))
            .collect();
        MarkTree {
            removable: self.policy.is_removable(node, arena, &children),
            children,
        }
    }
}

fn sweep(mut node: SceneNode, mark: MarkTree, removed: &mut usize) -> Option<SceneNode> {
    if mark.removable {
        *removed += node.node_count();
        return None;
    }
    node.children = std::mem::take(&mut node.children)
        .into_iter()
        .zip(mark.children)
        .filter_map(|(child, child_mark)| sweep(child, child_mark, removed))
        .collect();
    Some(node)
}

/// One drawable geometry with its world placement
struct Drawable<'a> {
    order: Handle,
    key: BatchKey,
    clip: Option<ClipRegion>,
    geometry: &'a Geometry,
    world: Matrix3<f64>,
    source: Handle,
}

fn collect_drawables<'a>(
    node: &SceneNode,
    arena: &'a GeometryArena,
    parent_world: &Matrix3<f64>,
    inherited: (Option<Handle>, Option<&ClipRegion>),
    out: &mut Vec<Drawable<'a>>,
) {
    if !node.visible {
        return;
    }
    let (parent_order, parent_clip) = inherited;
    let world = parent_world * node.transform;
    // Unlisted nodes sort by their own handle; block contents follow their insert
    let order = node.render_order.or(parent_order).unwrap_or(node.source);
    let own_clip = node.clip.as_ref().map(|clip| clip.transformed(parent_world));
    let clip = own_clip.as_ref().or(parent_clip);

    for key in &node.geometry {
        let Some(geometry) = arena.get(*key) else { continue };
        let kind = geometry.kind();
        if geometry.is_empty()
            || !matches!(
                kind,
                PrimitiveKind::Points | PrimitiveKind::Lines | PrimitiveKind::Triangles
            )
        {
            continue;
        }
        out.push(Drawable {
            order,
            key: BatchKey::new(kind, &node.style),
            clip: clip.cloned(),
            geometry,
            world,
            source: node.source,
        });
    }
    for child in &node.children {
        collect_drawables(child, arena, &world, (Some(order), clip), out);
    }
}

/// Concatenate consecutive compatible geometry in render order
pub fn build_batches(nodes: &[SceneNode], arena: &GeometryArena) -> Vec<DrawBatch> {
    let mut drawables = Vec::new();
    for node in nodes {
        collect_drawables(node, arena, &Matrix3::identity(), (None, None), &mut drawables);
    }
    // Stable, so document order survives within one sort handle
    drawables.sort_by_key(|d| d.order);

    let mut batches: Vec<DrawBatch> = Vec::new();
    for drawable in drawables {
        let compatible = batches
            .last()
            .is_some_and(|b| b.key == drawable.key && b.clip == drawable.clip);
        if !compatible {
            let origin = drawable
                .world
                .transform_point(&drawable.geometry.shift.as_point());
            batches.push(DrawBatch {
                key: drawable.key.clone(),
                clip: drawable.clip.clone(),
                positions: Vec::new(),
                indices: Vec::new(),
                shift: CoordinateShift::from_point(origin),
                sources: Vec::new(),
            });
        }
        let Some(batch) = batches.last_mut() else { continue };
        append(batch, &drawable);
    }
    batches
}

fn append(batch: &mut DrawBatch, drawable: &Drawable<'_>) {
    let base = batch.vertex_count() as u32;
    for point in drawable.geometry.world_points(&drawable.world) {
        let [x, y] = batch.shift.shifted(&point);
        batch.positions.push(x);
        batch.positions.push(y);
    }
    match drawable.key.kind {
        PrimitiveKind::Points => {}
        _ => batch
            .indices
            .extend(drawable.geometry.indices().iter().map(|i| i + base)),
    }
    if batch.sources.last() != Some(&drawable.source) {
        batch.sources.push(drawable.source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Shape;
    use crate::scene::{LayoutScene, Style};
    use dxf_lite_core::{EntityType, Rgb};
    use nalgebra::{Point2, Vector2};

    fn line_node(arena: &mut GeometryArena, handle: u64, layer: &str, color: Rgb) -> SceneNode {
        let key = arena.insert(Geometry::from_shape(
            Shape::Polyline {
                points: vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)],
                closed: false,
            },
            CoordinateShift::default(),
        ));
        let mut node = SceneNode::new(Handle(handle), EntityType::Line, layer, "Model");
        node.style = Style {
            color,
            ..Style::default()
        };
        node.geometry.push(key);
        node
    }

    fn container(handle: u64, children: Vec<SceneNode>) -> SceneNode {
        let mut node = SceneNode::new(Handle(handle), EntityType::Insert, "0", "Model");
        node.children = children;
        node
    }

    fn scene_with(roots: Vec<SceneNode>, arena: GeometryArena) -> Scene {
        let mut layout = LayoutScene::new("Model", Handle(0x22), true);
        layout.roots = roots;
        Scene {
            layouts: vec![layout],
            arena,
            stats: Default::default(),
        }
    }

    #[test]
    fn test_nested_empty_containers_removed() {
        let mut arena = GeometryArena::with_key();
        let line = line_node(&mut arena, 1, "A", Rgb::WHITE);
        let roots = vec![
            container(10, vec![container(11, vec![container(12, Vec::new())])]),
            container(20, vec![line, container(21, Vec::new())]),
        ];
        let mut scene = scene_with(roots, arena);

        let report = SceneMerger::default().merge(&mut scene);
        // 10, 11, 12 and 21
        assert_eq!(report.removed, 4);
        let model = scene.model().unwrap();
        assert_eq!(model.node_count(), 2);
        assert!(model.find(Handle(21)).is_none());
    }

    #[test]
    fn test_merge_reaches_fixed_point() {
        let mut arena = GeometryArena::with_key();
        let a = line_node(&mut arena, 1, "A", Rgb::WHITE);
        let b = line_node(&mut arena, 2, "B", Rgb::WHITE);
        let roots = vec![a, container(10, vec![container(11, Vec::new()), b]), container(20, Vec::new())];
        let mut scene = scene_with(roots, arena);

        let merger = SceneMerger::default();
        let first = merger.merge(&mut scene);
        let snapshot = scene.layouts.clone();
        let second = merger.merge(&mut scene);

        assert!(first.removed > 0);
        assert_eq!(second.removed, 0);
        assert_eq!(first.batches, second.batches);
        assert_eq!(scene.layouts, snapshot);
    }

    #[test]
    fn test_hidden_policy() {
        let mut arena = GeometryArena::with_key();
        let mut hidden = line_node(&mut arena, 1, "A", Rgb::WHITE);
        hidden.visible = false;
        let shown = line_node(&mut arena, 2, "A", Rgb::WHITE);

        let (kept, removed) = SceneMerger::new(PrunePolicy::Empty)
            .prune(vec![hidden.clone(), shown.clone()], &arena);
        assert_eq!((kept.len(), removed), (2, 0));

        let (kept, removed) =
            SceneMerger::new(PrunePolicy::EmptyOrHidden).prune(vec![hidden, shown], &arena);
        assert_eq!((kept.len(), removed), (1, 1));
    }

    #[test]
    fn test_groups_by_layer_in_first_seen_order() {
        let mut arena = GeometryArena::with_key();
        let roots = vec![
            line_node(&mut arena, 1, "B", Rgb::WHITE),
            line_node(&mut arena, 2, "A", Rgb::WHITE),
            line_node(&mut arena, 3, "B", Rgb::WHITE),
        ];
        let mut scene = scene_with(roots, arena);
        SceneMerger::default().merge(&mut scene);

        let model = scene.model().unwrap();
        let layers: Vec<&str> = model.groups.iter().map(|g| g.layer.as_str()).collect();
        assert_eq!(layers, vec!["B", "A"]);
        assert_eq!(model.group("B").unwrap().nodes.len(), 2);
        assert!(model.roots.is_empty());
    }

    #[test]
    fn test_batches_concatenate_world_geometry() {
        let mut arena = GeometryArena::with_key();
        let first = line_node(&mut arena, 1, "A", Rgb::WHITE);
        let mut second = line_node(&mut arena, 2, "A", Rgb::WHITE);
        second.transform = Matrix3::new_translation(&Vector2::new(0.0, 5.0));
        let red = line_node(&mut arena, 3, "A", Rgb::new(255, 0, 0));

        let batches = build_batches(&[first, second, red], &arena);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].sources, vec![Handle(1), Handle(2)]);
        assert_eq!(batches[0].indices, vec![0, 1, 2, 3]);
        assert_eq!(batches[0].positions[5], 5.0);
        assert_eq!(batches[1].key.color, Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_render_order_sorts_batches() {
        let mut arena = GeometryArena::with_key();
        let mut front = line_node(&mut arena, 1, "A", Rgb::WHITE);
        front.render_order = Some(Handle(0x20));
        let unlisted = line_node(&mut arena, 2, "A", Rgb::new(0, 0, 255));
        let mut back = line_node(&mut arena, 3, "A", Rgb::new(255, 0, 0));
        back.render_order = Some(Handle(0x01));

        let batches = build_batches(&[front, unlisted, back], &arena);
        let sources: Vec<Handle> = batches.iter().flat_map(|b| b.sources.clone()).collect();
        assert_eq!(sources, vec![Handle(3), Handle(2), Handle(1)]);
    }
}
