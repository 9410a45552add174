// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! INSERT processor - block instancing.

use super::helpers::entity_ocs;
use crate::router::{
    insert_cell_transforms, BlockInstance, EntityGeometry, GeometryProcessor, ProcessContext,
};
use crate::spatial_filter::ClipRegion;
use crate::{Error, Result};
use dxf_lite_core::{Entity, EntityKind, EntityType};

/// INSERT/MINSERT processor
/// Emits one block instance per grid cell; the generator expands them.
/// An attached spatial filter (XCLIP) is expressed in block coordinates and
/// mapped through each cell's own transform.
pub struct InsertProcessor;

impl GeometryProcessor for InsertProcessor {
    fn process(&self, entity: &Entity, ctx: &ProcessContext<'_>) -> Result<EntityGeometry> {
        let EntityKind::Insert(insert) = &entity.kind else {
            return Err(Error::geometry("InsertProcessor expects INSERT"));
        };

        let block = ctx
            .index
            .block(&insert.block)
            .ok_or_else(|| Error::dangling("block", insert.block.as_str()))?;
        let transforms = insert_cell_transforms(insert, block, &entity_ocs(entity));

        let filter = ctx
            .filters
            .find_filter_handle(entity.handle)
            .and_then(|handle| Some((handle, ctx.index.spatial_filter(handle)?)));

        Ok(EntityGeometry {
            instances: transforms
                .into_iter()
                .map(|transform| BlockInstance {
                    block: block.name.clone(),
                    clip: filter.and_then(|(handle, definition)| {
                        ClipRegion::from_filter(definition, &transform, handle)
                    }),
                    transform,
                })
                .collect(),
            ..EntityGeometry::default()
        })
    }

    fn supported_types(&self) -> Vec<EntityType> {
        vec![EntityType::Insert]
    }
}
