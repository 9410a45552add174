// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Compare mode: one scene built from two revisions of a document.
//!
//! Removed entities are drawn from the old document, everything else from the
//! new one. Every generated subtree is recolored by its change kind.

use crate::pipeline::{with_model_layout, ConversionOutcome, Pass, ScenePipeline, Selection};
use dxf_lite_core::{aci_to_rgb, Document, Entity, EntityKind, Handle, Rgb};
use dxf_lite_geometry::{ChangeKind, ReferenceIndex};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Change of one entity handle between two revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub handle: Handle,
    pub kind: ChangeKind,
}

impl ChangeRecord {
    pub fn new(handle: Handle, kind: ChangeKind) -> Self {
        Self { handle, kind }
    }
}

/// Colors applied per change kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeColors {
    pub added: Rgb,
    pub removed: Rgb,
    pub modified: Rgb,
    pub unchanged: Rgb,
}

impl Default for ChangeColors {
    fn default() -> Self {
        Self {
            added: aci_to_rgb(3),
            removed: aci_to_rgb(1),
            modified: aci_to_rgb(2),
            unchanged: aci_to_rgb(8),
        }
    }
}

impl ChangeColors {
    pub fn color_of(&self, kind: ChangeKind) -> Rgb {
        match kind {
            ChangeKind::Added => self.added,
            ChangeKind::Removed => self.removed,
            ChangeKind::Modified => self.modified,
            ChangeKind::Unchanged => self.unchanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Leave unchanged entities out of the scene
    pub skip_unchanged: bool,
    pub colors: ChangeColors,
}

fn top_level(document: &Document) -> FxHashMap<Handle, &Entity> {
    document.entities.iter().map(|e| (e.handle, e)).collect()
}

/// An insert whose block definition differs counts as modified
fn block_changed(old: &Document, new: &Document, entity: &Entity) -> bool {
    match &entity.kind {
        EntityKind::Insert(insert) => old.blocks.get(&insert.block) != new.blocks.get(&insert.block),
        _ => false,
    }
}

/// Classify every top-level entity handle of two revisions
///
/// Records are sorted by handle.
pub fn diff_documents(old: &Document, new: &Document) -> Vec<ChangeRecord> {
    let before = top_level(old);
    let after = top_level(new);

    let mut records: Vec<ChangeRecord> = after
        .par_iter()
        .map(|(handle, entity)| {
            let kind = match before.get(handle) {
                None => ChangeKind::Added,
                Some(prev) if *prev == *entity && !block_changed(old, new, entity) => {
                    ChangeKind::Unchanged
                }
                Some(_) => ChangeKind::Modified,
            };
            ChangeRecord::new(*handle, kind)
        })
        .collect();
    records.extend(
        before
            .keys()
            .filter(|handle| !after.contains_key(handle))
            .map(|handle| ChangeRecord::new(*handle, ChangeKind::Removed)),
    );
    records.sort_by_key(|r| r.handle);
    records
}

impl ScenePipeline {
    /// Build one scene from two revisions and their change records
    ///
    /// Handles without a record count as unchanged.
    pub fn compare(
        &mut self,
        old: &Document,
        new: &Document,
        records: &[ChangeRecord],
        options: &CompareOptions,
    ) -> ConversionOutcome {
        self.start();
        let kinds: FxHashMap<Handle, ChangeKind> =
            records.iter().map(|r| (r.handle, r.kind)).collect();
        let (old, new) = (with_model_layout(old), with_model_layout(new));
        let old_index = ReferenceIndex::new(&old);
        let new_index = ReferenceIndex::new(&new);
        tracing::info!(
            old_entities = old.entities.len(),
            new_entities = new.entities.len(),
            records = records.len(),
            "compare indexes built"
        );

        let colors = options.colors;
        let select_new = |entity: &Entity| {
            match kinds.get(&entity.handle).copied().unwrap_or(ChangeKind::Unchanged) {
                ChangeKind::Removed => Selection::Skip,
                ChangeKind::Unchanged if options.skip_unchanged => Selection::Skip,
                kind => Selection::Tagged(kind, colors.color_of(kind)),
            }
        };
        let select_old = |entity: &Entity| match kinds.get(&entity.handle) {
            Some(ChangeKind::Removed) => Selection::Tagged(ChangeKind::Removed, colors.removed),
            _ => Selection::Skip,
        };

        self.run(&[
            Pass {
                index: &new_index,
                select: &select_new,
            },
            Pass {
                index: &old_index,
                select: &select_old,
            },
        ])
    }

    /// Diff two revisions and compare them
    pub fn compare_documents(
        &mut self,
        old: &Document,
        new: &Document,
        options: &CompareOptions,
    ) -> ConversionOutcome {
        let records = diff_documents(old, new);
        self.compare(old, new, &records, options)
    }
}
