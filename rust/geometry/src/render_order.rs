// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Draw order from SORTENTS tables
//!
//! Each table lists (entity, sort handle) pairs overriding document order.
//! Drawables are keyed by their effective sort handle: the table's sort
//! handle when listed, otherwise the entity's own handle. A listed entity
//! whose sort handle is above its neighbours' handles draws after them.

use dxf_lite_core::{Handle, SortEntsTable};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct RenderOrderResolver {
    orders: FxHashMap<Handle, Handle>,
}

impl RenderOrderResolver {
    /// Build from the document's tables; an entity listed twice keeps its first sort handle
    pub fn new(tables: &[SortEntsTable]) -> Self {
        let mut orders = FxHashMap::default();
        for entry in tables.iter().flat_map(|table| &table.entries) {
            orders.entry(entry.entity).or_insert(entry.sort_handle);
        }
        Self { orders }
    }

    /// Explicit sort handle, `None` for entities absent from every table
    #[inline]
    pub fn order_of(&self, handle: Handle) -> Option<Handle> {
        self.orders.get(&handle).copied()
    }

    /// Key drawables are sorted by
    #[inline]
    pub fn effective_order(&self, handle: Handle) -> Handle {
        self.order_of(handle).unwrap_or(handle)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
