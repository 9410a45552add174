// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-handle geometry caching.
//!
//! Every entity is processed at most once per conversion. Block entities
//! visited through many inserts reuse the same arena geometry.

use super::{CachedEntity, EntityGeometry, EntityGeometryGenerator};
use crate::error::{Error, ErrorClass};
use crate::mesh::{CoordinateShift, Geometry};
use dxf_lite_core::Entity;
use std::sync::Arc;

impl<'a> EntityGeometryGenerator<'a> {
    /// Cached processing result; `None` when the entity has to be skipped
    pub(super) fn process_cached(&self, entity: &Entity) -> Option<Arc<CachedEntity>> {
        // Check cache first
        if let Some(cached) = self.entity_cache.borrow().get(&entity.handle) {
            self.stats.borrow_mut().cache_hits += 1;
            return cached.clone();
        }

        let cached = match self.process_entity(entity) {
            Ok(geometry) => Some(Arc::new(self.store(geometry))),
            Err(error) => {
                self.stats
                    .borrow_mut()
                    .record_error(entity.type_name(), &error);
                match error.class() {
                    // Degenerate input still yields an (empty) node
                    ErrorClass::MalformedGeometry => {
                        tracing::debug!(entity = %entity.handle, %error, "malformed geometry");
                        Some(Arc::new(CachedEntity::default()))
                    }
                    ErrorClass::Unsupported => {
                        tracing::debug!(entity = %entity.handle, %error, "entity skipped");
                        None
                    }
                    ErrorClass::DanglingReference => {
                        tracing::warn!(entity = %entity.handle, %error, "entity skipped");
                        None
                    }
                }
            }
        };

        self.entity_cache
            .borrow_mut()
            .insert(entity.handle, cached.clone());
        cached
    }

    fn process_entity(&self, entity: &Entity) -> crate::Result<EntityGeometry> {
        let processor = self
            .processors
            .get(&entity.entity_type())
            .ok_or_else(|| Error::UnsupportedEntity(entity.type_name().to_string()))?;
        processor.process(entity, &self.context())
    }

    /// Stabilize shapes and move them into the arena
    fn store(&self, output: EntityGeometry) -> CachedEntity {
        let mut arena = self.arena.borrow_mut();
        let mut geometry = smallvec::SmallVec::new();
        for shape in output.shapes {
            if shape.is_empty() {
                continue;
            }
            let anchors = shape.anchor_points();
            let shift = match self.stabilizer.center(&anchors) {
                Some(center) if self.stabilizer.needs_rebase(&anchors) => {
                    self.stats.borrow_mut().rebased += 1;
                    center
                }
                _ => CoordinateShift::default(),
            };
            let shape = shape.rebased(&shift);
            geometry.push(arena.insert(Geometry::from_shape(shape, shift)));
        }

        CachedEntity {
            geometry,
            instances: output.instances,
            clip: output.clip,
            viewport: output.viewport,
        }
    }
}
