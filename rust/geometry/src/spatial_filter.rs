// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial filter resolution and clip regions
//!
//! Filters are found by walking owner chains from the clipped entity through
//! its dictionaries. Walk results are cached per entity handle, so entities
//! sharing a dictionary chain pay for one walk each at most.

use crate::index::ReferenceIndex;
use crate::triangulation::{contour_bounds, is_convex, point_in_contour};
use dxf_lite_core::{Handle, ObjectKind, SpatialFilter};
use nalgebra::{Matrix3, Point2};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};

/// Dictionary levels followed before giving up
const MAX_CHAIN_DEPTH: usize = 8;

/// Clip boundary in the coordinate space of the node that carries it
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRegion {
    pub boundaries: Vec<Vec<Point2<f64>>>,
    /// Keep what lies outside the boundaries
    pub reversed: bool,
    /// Single convex boundary
    pub convex: bool,
    /// Filter object or viewport the region came from
    pub source: Handle,
}

impl ClipRegion {
    /// Axis-aligned rectangle from two opposite corners
    pub fn rectangle(a: Point2<f64>, b: Point2<f64>, source: Handle) -> Self {
        Self {
            boundaries: vec![rectangle_points(a, b)],
            reversed: false,
            convex: true,
            source,
        }
    }

    /// Map a filter boundary through `transform`; disabled or degenerate filters give `None`
    pub fn from_filter(
        filter: &SpatialFilter,
        transform: &Matrix3<f64>,
        source: Handle,
    ) -> Option<Self> {
        if !filter.enabled {
            return None;
        }
        let boundaries: Vec<Vec<Point2<f64>>> = filter
            .boundaries
            .iter()
            .filter_map(|boundary| match boundary.len() {
                2 => Some(rectangle_points(boundary[0], boundary[1])),
                n if n >= 3 => Some(boundary.clone()),
                _ => None,
            })
            .map(|boundary| {
                boundary
                    .iter()
                    .map(|p| transform.transform_point(p))
                    .collect()
            })
            .collect();
        if boundaries.is_empty() {
            return None;
        }
        let convex = boundaries.len() == 1 && is_convex(&boundaries[0]);
        Some(Self {
            boundaries,
            reversed: filter.reversed,
            convex,
            source,
        })
    }

    /// Even-odd containment over all boundaries, inverted when reversed
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        let crossings = self
            .boundaries
            .iter()
            .filter(|boundary| point_in_contour(point, boundary))
            .count();
        (crossings % 2 == 1) != self.reversed
    }

    pub fn transformed(&self, transform: &Matrix3<f64>) -> Self {
        Self {
            boundaries: self
                .boundaries
                .iter()
                .map(|b| b.iter().map(|p| transform.transform_point(p)).collect())
                .collect(),
            ..self.clone()
        }
    }

    pub fn bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let all: Vec<Point2<f64>> = self.boundaries.iter().flatten().copied().collect();
        contour_bounds(&all)
    }
}

fn rectangle_points(a: Point2<f64>, b: Point2<f64>) -> Vec<Point2<f64>> {
    let min = a.inf(&b);
    let max = a.sup(&b);
    vec![
        min,
        Point2::new(max.x, min.y),
        max,
        Point2::new(min.x, max.y),
    ]
}

/// Finds the spatial filter attached to an entity
pub struct SpatialFilterResolver<'a> {
    index: &'a ReferenceIndex<'a>,
    cache: RefCell<FxHashMap<Handle, Option<Handle>>>,
    walks: Cell<usize>,
}

impl<'a> SpatialFilterResolver<'a> {
    pub fn new(index: &'a ReferenceIndex<'a>) -> Self {
        Self {
            index,
            cache: RefCell::new(FxHashMap::default()),
            walks: Cell::new(0),
        }
    }

    /// Filter clipping `entity`, if any
    pub fn find_for_handle(&self, entity: Handle) -> Option<&'a SpatialFilter> {
        let filter = self.find_filter_handle(entity)?;
        self.index.spatial_filter(filter)
    }

    /// Handle of the filter object clipping `entity`
    pub fn find_filter_handle(&self, entity: Handle) -> Option<Handle> {
        if let Some(cached) = self.cache.borrow().get(&entity) {
            return *cached;
        }
        let found = self.walk(entity);
        self.cache.borrow_mut().insert(entity, found);
        found
    }

    /// Number of uncached chain walks performed
    pub fn walks(&self) -> usize {
        self.walks.get()
    }

    fn walk(&self, entity: Handle) -> Option<Handle> {
        self.walks.set(self.walks.get() + 1);

        let mut frontier: SmallVec<[Handle; 4]> = SmallVec::new();
        if let Some(dictionary) = self
            .index
            .entity(entity)
            .and_then(|e| e.extension_dictionary)
        {
            frontier.push(dictionary);
        }
        frontier.extend_from_slice(self.index.dictionaries_owned_by(entity));

        let mut visited = FxHashSet::default();
        for _ in 0..MAX_CHAIN_DEPTH {
            let mut next: SmallVec<[Handle; 4]> = SmallVec::new();
            for dictionary in frontier {
                if !visited.insert(dictionary) {
                    continue;
                }
                if let Some(filter) = self.index.filters_owned_by(dictionary).first() {
                    return Some(*filter);
                }
                if let Some(ObjectKind::Dictionary { entries }) =
                    self.index.object(dictionary).map(|o| &o.kind)
                {
                    for (_, child) in entries {
                        match self.index.object(*child).map(|o| &o.kind) {
                            Some(ObjectKind::SpatialFilter(_)) => return Some(*child),
                            Some(ObjectKind::Dictionary { .. }) => next.push(*child),
                            _ => {}
                        }
                    }
                }
                next.extend_from_slice(self.index.dictionaries_owned_by(dictionary));
            }
            if next.is_empty() {
                return None;
            }
            frontier = next;
        }
        tracing::warn!(entity = %entity, "dictionary chain too deep, no clip applied");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxf_lite_core::{Document, Entity, EntityKind, ObjectEntry, Point3};

    fn document() -> Document {
        let mut doc = Document::new();
        for handle in [0x10, 0x11] {
            doc.entities.push(
                Entity::new(
                    Handle(handle),
                    "0",
                    EntityKind::Point {
                        position: Point3::origin(),
                    },
                )
                .with_extension_dictionary(Handle(0x20)),
            );
        }
        doc.entities.push(Entity::new(
            Handle(0x12),
            "0",
            EntityKind::Point {
                position: Point3::origin(),
            },
        ));
        // entity → extension dictionary → ACAD_FILTER dictionary → filter
        doc.objects.push(ObjectEntry {
            handle: Handle(0x20),
            owner: Some(Handle(0x10)),
            kind: ObjectKind::Dictionary {
                entries: vec![("ACAD_FILTER".to_string(), Handle(0x21))],
            },
        });
        doc.objects.push(ObjectEntry {
            handle: Handle(0x21),
            owner: Some(Handle(0x20)),
            kind: ObjectKind::Dictionary {
                entries: Vec::new(),
            },
        });
        doc.objects.push(ObjectEntry {
            handle: Handle(0x22),
            owner: Some(Handle(0x21)),
            kind: ObjectKind::SpatialFilter(SpatialFilter::new(vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 5.0),
            ])),
        });
        doc
    }

    #[test]
    fn test_chain_walk_and_cache() {
        let doc = document();
        let index = ReferenceIndex::new(&doc);
        let resolver = SpatialFilterResolver::new(&index);

        assert_eq!(resolver.find_filter_handle(Handle(0x10)), Some(Handle(0x22)));
        assert_eq!(resolver.find_filter_handle(Handle(0x11)), Some(Handle(0x22)));
        assert!(resolver.find_for_handle(Handle(0x12)).is_none());
        assert_eq!(resolver.walks(), 3);

        // Repeated lookups hit the cache
        assert!(resolver.find_for_handle(Handle(0x10)).is_some());
        assert!(resolver.find_for_handle(Handle(0x12)).is_none());
        assert_eq!(resolver.walks(), 3);
    }

    #[test]
    fn test_two_point_boundary_is_rectangle() {
        let filter = SpatialFilter::new(vec![Point2::new(10.0, 5.0), Point2::new(0.0, 0.0)]);
        let clip = ClipRegion::from_filter(&filter, &Matrix3::identity(), Handle(1)).unwrap();
        assert_eq!(clip.boundaries[0].len(), 4);
        assert!(clip.convex);
        assert!(clip.contains(&Point2::new(5.0, 2.5)));
        assert!(!clip.contains(&Point2::new(11.0, 2.5)));
    }

    #[test]
    fn test_reversed_and_disabled_filters() {
        let mut filter = SpatialFilter::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)]);
        filter.reversed = true;
        let clip = ClipRegion::from_filter(&filter, &Matrix3::identity(), Handle(1)).unwrap();
        assert!(!clip.contains(&Point2::new(0.5, 0.5)));
        assert!(clip.contains(&Point2::new(2.0, 2.0)));

        filter.enabled = false;
        assert!(ClipRegion::from_filter(&filter, &Matrix3::identity(), Handle(1)).is_none());
    }

    #[test]
    fn test_concave_boundary_transformed() {
        let filter = SpatialFilter::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(2.0, 1.0),
            Point2::new(0.0, 4.0),
        ]);
        let shift = Matrix3::new_translation(&nalgebra::Vector2::new(100.0, 0.0));
        let clip = ClipRegion::from_filter(&filter, &shift, Handle(1)).unwrap();
        assert!(!clip.convex);
        assert!(clip.contains(&Point2::new(101.0, 0.5)));
        assert!(!clip.contains(&Point2::new(102.0, 3.0)));
        let (min, max) = clip.bounds().unwrap();
        assert_eq!(min, Point2::new(100.0, 0.0));
        assert_eq!(max, Point2::new(104.0, 4.0));
    }
}
