// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reference index
//!
//! Handle-keyed lookup tables built once per document. A missing key is an
//! ordinary outcome meaning "no such reference", never an error.

use dxf_lite_core::{
    Block, DimStyle, Document, Entity, EntityKind, Handle, Layer, LineType, Layout, ObjectEntry,
    ObjectKind, SpatialFilter, TextStyle,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Where a top-level entity belongs, derived from its owner handle
#[derive(Debug, Clone, Copy)]
pub enum Placement<'doc> {
    Layout(&'doc Layout),
    /// Owned by a block definition; generated only through inserts
    BlockInterior,
    /// Owner handle names nothing known
    Orphan,
}

/// O(1) resolution of handles, blocks, layouts and filter owners
pub struct ReferenceIndex<'doc> {
    document: &'doc Document,
    entities: FxHashMap<Handle, &'doc Entity>,
    blocks_by_owner: FxHashMap<Handle, &'doc Block>,
    layouts_by_owner: FxHashMap<Handle, &'doc Layout>,
    filters_by_owner: FxHashMap<Handle, SmallVec<[Handle; 2]>>,
    dictionaries_by_owner: FxHashMap<Handle, SmallVec<[Handle; 2]>>,
    objects: FxHashMap<Handle, &'doc ObjectEntry>,
    duplicates: usize,
}

impl<'doc> ReferenceIndex<'doc> {
    pub fn new(document: &'doc Document) -> Self {
        let mut index = Self {
            document,
            entities: FxHashMap::default(),
            blocks_by_owner: FxHashMap::default(),
            layouts_by_owner: FxHashMap::default(),
            filters_by_owner: FxHashMap::default(),
            dictionaries_by_owner: FxHashMap::default(),
            objects: FxHashMap::default(),
            duplicates: 0,
        };

        index.entities.reserve(document.total_entity_count());
        for entity in &document.entities {
            index.add_entity(entity);
        }
        // Blocks in name order so duplicate handles resolve deterministically
        let mut blocks: Vec<&Block> = document.blocks.values().collect();
        blocks.sort_by(|a, b| a.name.cmp(&b.name));
        for block in blocks {
            index.blocks_by_owner.entry(block.record_handle).or_insert(block);
            for entity in &block.entities {
                index.add_entity(entity);
            }
        }
        for layout in document.sorted_layouts() {
            index
                .layouts_by_owner
                .entry(layout.block_record_handle)
                .or_insert(layout);
        }

        for object in &document.objects {
            if index.objects.contains_key(&object.handle) {
                index.duplicates += 1;
                continue;
            }
            index.objects.insert(object.handle, object);
            let Some(owner) = object.owner else { continue };
            match object.kind {
                ObjectKind::SpatialFilter(_) => {
                    index.filters_by_owner.entry(owner).or_default().push(object.handle)
                }
                ObjectKind::Dictionary { .. } => index
                    .dictionaries_by_owner
                    .entry(owner)
                    .or_default()
                    .push(object.handle),
                ObjectKind::Other { .. } => {}
            }
        }

        if index.duplicates > 0 {
            tracing::warn!(
                duplicates = index.duplicates,
                "duplicate handles in document, first occurrence kept"
            );
        }
        tracing::debug!(
            entities = index.entities.len(),
            blocks = index.blocks_by_owner.len(),
            layouts = index.layouts_by_owner.len(),
            objects = index.objects.len(),
            "reference index built"
        );
        index
    }

    fn add_entity(&mut self, entity: &'doc Entity) {
        if self.entities.contains_key(&entity.handle) {
            self.duplicates += 1;
        } else {
            self.entities.insert(entity.handle, entity);
        }
        if let EntityKind::Insert(insert) = &entity.kind {
            for attribute in &insert.attributes {
                self.add_entity(attribute);
            }
        }
    }

    #[inline]
    pub fn document(&self) -> &'doc Document {
        self.document
    }

    #[inline]
    pub fn entity(&self, handle: Handle) -> Option<&'doc Entity> {
        self.entities.get(&handle).copied()
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Handles seen more than once while indexing
    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }

    #[inline]
    pub fn block(&self, name: &str) -> Option<&'doc Block> {
        self.document.blocks.get(name)
    }

    #[inline]
    pub fn block_by_owner(&self, owner: Handle) -> Option<&'doc Block> {
        self.blocks_by_owner.get(&owner).copied()
    }

    #[inline]
    pub fn layout_by_owner(&self, owner: Handle) -> Option<&'doc Layout> {
        self.layouts_by_owner.get(&owner).copied()
    }

    /// Spatial filters whose owner is `owner`
    pub fn filters_owned_by(&self, owner: Handle) -> &[Handle] {
        self.filters_by_owner
            .get(&owner)
            .map(|handles| handles.as_slice())
            .unwrap_or(&[])
    }

    /// Dictionaries whose owner is `owner`
    pub fn dictionaries_owned_by(&self, owner: Handle) -> &[Handle] {
        self.dictionaries_by_owner
            .get(&owner)
            .map(|handles| handles.as_slice())
            .unwrap_or(&[])
    }

    #[inline]
    pub fn object(&self, handle: Handle) -> Option<&'doc ObjectEntry> {
        self.objects.get(&handle).copied()
    }

    pub fn spatial_filter(&self, handle: Handle) -> Option<&'doc SpatialFilter> {
        match &self.object(handle)?.kind {
            ObjectKind::SpatialFilter(filter) => Some(filter),
            _ => None,
        }
    }

    /// Layout (or block interior) a top-level entity belongs to
    pub fn placement(&self, entity: &Entity) -> Placement<'doc> {
        let Some(owner) = entity.owner else {
            return self
                .document
                .model_layout()
                .map_or(Placement::Orphan, Placement::Layout);
        };
        if let Some(layout) = self.layout_by_owner(owner) {
            Placement::Layout(layout)
        } else if self.block_by_owner(owner).is_some() {
            Placement::BlockInterior
        } else {
            Placement::Orphan
        }
    }

    #[inline]
    pub fn layer(&self, name: &str) -> Option<&'doc Layer> {
        self.document.layers.get(name)
    }

    /// Table names are case-insensitive; exact matches are tried first
    pub fn line_type(&self, name: &str) -> Option<&'doc LineType> {
        lookup_ignore_case(&self.document.tables.line_types, name)
    }

    pub fn text_style(&self, name: &str) -> Option<&'doc TextStyle> {
        lookup_ignore_case(&self.document.tables.text_styles, name)
    }

    pub fn dim_style(&self, name: &str) -> Option<&'doc DimStyle> {
        lookup_ignore_case(&self.document.tables.dim_styles, name)
    }
}

fn lookup_ignore_case<'a, T>(table: &'a FxHashMap<String, T>, name: &str) -> Option<&'a T> {
    table.get(name).or_else(|| {
        table
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxf_lite_core::{Color, InsertData, Point3, TextData};

    fn line(handle: u64) -> Entity {
        Entity::new(
            Handle(handle),
            "0",
            EntityKind::Line {
                start: Point3::origin(),
                end: Point3::new(1.0, 0.0, 0.0),
            },
        )
    }

    fn sample() -> Document {
        let mut doc = Document::new();
        let mut insert = InsertData::new("B", Point3::origin());
        insert.attributes.push(Entity::new(
            Handle(0x31),
            "0",
            EntityKind::Text(TextData::new("TAG", Point3::origin(), 1.0)),
        ));
        doc.entities.push(line(0x10));
        doc.entities
            .push(Entity::new(Handle(0x30), "0", EntityKind::Insert(insert)));

        let mut block = Block::new("B", Handle(0x40));
        block.entities.push(line(0x41).with_owner(Handle(0x40)));
        // Same handle as a top-level entity: first occurrence wins
        block.entities.push(line(0x10).with_color(Color::Index(1)));
        doc.add_block(block);

        doc.objects.push(ObjectEntry {
            handle: Handle(0x50),
            owner: Some(Handle(0x30)),
            kind: ObjectKind::Dictionary {
                entries: Vec::new(),
            },
        });
        doc.objects.push(ObjectEntry {
            handle: Handle(0x51),
            owner: Some(Handle(0x50)),
            kind: ObjectKind::SpatialFilter(SpatialFilter::new(Vec::new())),
        });
        doc
    }

    #[test]
    fn test_entities_from_all_paths() {
        let doc = sample();
        let index = ReferenceIndex::new(&doc);

        assert!(index.entity(Handle(0x41)).is_some());
        assert!(index.entity(Handle(0x31)).is_some());
        assert_eq!(index.entity(Handle(0x10)).unwrap().color, Color::ByLayer);
        assert_eq!(index.duplicate_count(), 1);
        assert!(index.entity(Handle(0x999)).is_none());
    }

    #[test]
    fn test_owner_maps() {
        let doc = sample();
        let index = ReferenceIndex::new(&doc);

        assert_eq!(index.block_by_owner(Handle(0x40)).unwrap().name, "B");
        assert!(index.layout_by_owner(Handle(0x1F)).unwrap().is_model());
        assert_eq!(index.dictionaries_owned_by(Handle(0x30)), &[Handle(0x50)]);
        assert_eq!(index.filters_owned_by(Handle(0x50)), &[Handle(0x51)]);
        assert!(index.filters_owned_by(Handle(0x30)).is_empty());
        assert!(index.spatial_filter(Handle(0x51)).is_some());
        assert!(index.spatial_filter(Handle(0x50)).is_none());
    }

    #[test]
    fn test_placement() {
        let doc = sample();
        let index = ReferenceIndex::new(&doc);

        let model = line(1);
        assert!(matches!(index.placement(&model), Placement::Layout(l) if l.is_model()));
        let in_block = line(2).with_owner(Handle(0x40));
        assert!(matches!(index.placement(&in_block), Placement::BlockInterior));
        let orphan = line(3).with_owner(Handle(0xDEAD));
        assert!(matches!(index.placement(&orphan), Placement::Orphan));
    }

    #[test]
    fn test_table_lookup_ignores_case() {
        let mut doc = Document::new();
        doc.tables.line_types.insert(
            "DASHED".to_string(),
            LineType {
                name: "DASHED".to_string(),
                description: String::new(),
                pattern: vec![0.5, -0.25],
            },
        );
        let index = ReferenceIndex::new(&doc);
        assert!(index.line_type("dashed").is_some());
        assert!(index.line_type("HIDDEN").is_none());
    }
}
