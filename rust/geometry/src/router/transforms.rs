// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Insert transforms and block expansion.

use super::{BlockInstance, EntityGeometryGenerator, ParentInsert, MAX_BLOCK_DEPTH};
use crate::error::Error;
use crate::scene::SceneNode;
use crate::transform::Ocs;
use dxf_lite_core::{Block, Entity, EntityKind, InsertData};
use nalgebra::{Matrix3, Vector2};

/// Block → parent transforms of every MINSERT cell, row-major
///
/// Each cell maps block coordinates through
/// OCS · T(position) · R(rotation) · T(cell offset) · S(scale) · T(-base point).
pub fn insert_cell_transforms(
    insert: &InsertData,
    block: &Block,
    ocs: &Ocs,
) -> Vec<Matrix3<f64>> {
    let placement = ocs.matrix()
        * Matrix3::new_translation(&insert.position.coords.xy())
        * Matrix3::new_rotation(insert.rotation);
    let scale_and_base = Matrix3::new_nonuniform_scaling(&insert.scale.xy())
        * Matrix3::new_translation(&-block.base_point.coords.xy());

    let columns = insert.columns.max(1);
    let rows = insert.rows.max(1);
    let mut cells = Vec::with_capacity(columns as usize * rows as usize);
    for row in 0..rows {
        for column in 0..columns {
            let offset = Vector2::new(
                column as f64 * insert.column_spacing,
                row as f64 * insert.row_spacing,
            );
            cells.push(placement * Matrix3::new_translation(&offset) * scale_and_base);
        }
    }
    cells
}

/// Attribute entities attached to an insert
pub(super) fn attributes(entity: &Entity) -> &[Entity] {
    match &entity.kind {
        EntityKind::Insert(insert) => &insert.attributes,
        _ => &[],
    }
}

impl<'a> EntityGeometryGenerator<'a> {
    /// Generate one block placement as a transformed container node
    pub(super) fn expand_instance(
        &self,
        owner: &Entity,
        instance: &BlockInstance,
        layout: &str,
        parent: &ParentInsert,
    ) -> Option<SceneNode> {
        let Some(block) = self.index.block(&instance.block) else {
            let error = Error::dangling("block", instance.block.as_str());
            tracing::warn!(entity = %owner.handle, %error, "block instance skipped");
            self.stats
                .borrow_mut()
                .record_error(owner.type_name(), &error);
            return None;
        };

        let recursion = {
            let stack = self.block_stack.borrow();
            stack.len() >= MAX_BLOCK_DEPTH || stack.iter().any(|name| name == &block.name)
        };
        if recursion {
            let error = Error::BlockRecursion(block.name.clone());
            tracing::warn!(entity = %owner.handle, %error, "block expansion stopped");
            self.stats
                .borrow_mut()
                .record_error(owner.type_name(), &error);
            return None;
        }

        self.block_stack.borrow_mut().push(block.name.clone());
        let children: Vec<SceneNode> = block
            .entities
            .iter()
            .filter_map(|entity| self.generate(entity, layout, Some(parent)))
            .collect();
        self.block_stack.borrow_mut().pop();

        let mut cell = SceneNode::new(owner.handle, owner.entity_type(), &parent.layer, layout);
        cell.transform = instance.transform;
        cell.clip = instance.clip.clone();
        cell.style.color = parent.color;
        cell.style.line_type = parent.line_type.clone();
        cell.style.line_weight = parent.line_weight;
        cell.children = children;
        self.stats.borrow_mut().nodes += 1;
        Some(cell)
    }
}
