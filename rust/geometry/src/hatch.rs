// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hatch geometry
//!
//! Boundary loops arrive as an unordered set. Each loop's parent is the
//! smallest other loop containing its representative point (first vertex);
//! nesting depth then decides whether a loop is filled or cut out. Solid
//! hatches triangulate every fill against its direct holes, patterned
//! hatches pass the classified loops through for procedural line generation
//! at render time.

use crate::triangulation::{
    contour_bounds, point_in_contour, signed_area, triangles_area, triangulate_with_holes,
};
use dxf_lite_core::{HatchPatternData, HatchStyle, PatternLine};
use nalgebra::{Point2, Vector2};
use rayon::prelude::*;

/// Spacing of the built-in patterns at scale 1
const BUILTIN_SPACING: f64 = 0.125;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopRole {
    Fill,
    Hole,
    /// Below the nesting depth the hatch style considers
    Ignored,
}

/// Position of one loop in the containment hierarchy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopNode {
    pub parent: Option<usize>,
    pub depth: usize,
    pub role: LoopRole,
}

/// Triangulated fill area
#[derive(Debug, Clone, PartialEq)]
pub struct FillRegion {
    pub points: Vec<Point2<f64>>,
    pub indices: Vec<u32>,
}

impl FillRegion {
    pub fn area(&self) -> f64 {
        triangles_area(&self.points, &self.indices)
    }
}

/// Pattern definition resolved for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct HatchPattern {
    pub name: String,
    pub angle: f64,
    pub scale: f64,
    pub lines: Vec<PatternLine>,
}

/// Procedural fill: boundary loops plus the pattern to draw inside them
#[derive(Debug, Clone, PartialEq)]
pub struct PatternFill {
    /// Fill and hole loops; the renderer clips pattern lines even-odd
    pub loops: Vec<Vec<Point2<f64>>>,
    pub pattern: HatchPattern,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HatchGeometry {
    pub regions: Vec<FillRegion>,
    pub pattern: Option<PatternFill>,
}

impl HatchGeometry {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.pattern.is_none()
    }

    pub fn filled_area(&self) -> f64 {
        self.regions.iter().map(FillRegion::area).sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HatchGeometryBuilder {
    style: HatchStyle,
}

impl HatchGeometryBuilder {
    pub fn new(style: HatchStyle) -> Self {
        Self { style }
    }

    /// Build the containment hierarchy of `loops`
    pub fn classify(&self, loops: &[Vec<Point2<f64>>]) -> Vec<LoopNode> {
        let bounds: Vec<_> = loops.iter().map(|l| contour_bounds(l)).collect();
        let areas: Vec<f64> = loops.iter().map(|l| signed_area(l).abs()).collect();

        let parents: Vec<Option<usize>> = (0..loops.len())
            .map(|i| {
                let sample = loops[i].first()?;
                let (inner_min, inner_max) = bounds[i]?;
                (0..loops.len())
                    .filter(|&j| j != i)
                    .filter(|&j| {
                        // Strictly larger, identical loops ordered by index
                        areas[j] > areas[i] || (areas[j] == areas[i] && j < i)
                    })
                    .filter(|&j| {
                        bounds[j].is_some_and(|(min, max)| {
                            min.x <= inner_min.x
                                && min.y <= inner_min.y
                                && max.x >= inner_max.x
                                && max.y >= inner_max.y
                        })
                    })
                    .filter(|&j| point_in_contour(sample, &loops[j]))
                    .min_by(|&a, &b| areas[a].total_cmp(&areas[b]).then(b.cmp(&a)))
            })
            .collect();

        (0..loops.len())
            .map(|i| {
                let mut depth = 0;
                let mut cursor = parents[i];
                // Parents are strictly larger, so the chain terminates
                while let Some(p) = cursor {
                    depth += 1;
                    cursor = parents[p];
                }
                LoopNode {
                    parent: parents[i],
                    depth,
                    role: self.role_at(depth),
                }
            })
            .collect()
    }

    fn role_at(&self, depth: usize) -> LoopRole {
        match (self.style, depth) {
            (HatchStyle::OddParity, d) if d % 2 == 0 => LoopRole::Fill,
            (HatchStyle::OddParity, _) => LoopRole::Hole,
            (_, 0) => LoopRole::Fill,
            (HatchStyle::Outermost, 1) => LoopRole::Hole,
            _ => LoopRole::Ignored,
        }
    }

    /// Triangulate every fill loop against its direct hole children
    pub fn build_solid(&self, loops: Vec<Vec<Point2<f64>>>) -> HatchGeometry {
        let loops = normalize_loops(loops);
        if loops.is_empty() {
            return HatchGeometry::default();
        }
        let nodes = self.classify(&loops);

        let fills: Vec<usize> = (0..loops.len())
            .filter(|&i| nodes[i].role == LoopRole::Fill)
            .collect();

        let regions = fills
            .par_iter()
            .filter_map(|&fill| {
                let holes: Vec<Vec<Point2<f64>>> = (0..loops.len())
                    .filter(|&j| nodes[j].parent == Some(fill) && nodes[j].role == LoopRole::Hole)
                    .map(|j| loops[j].clone())
                    .collect();

                match triangulate_with_holes(&loops[fill], &holes) {
                    Ok(fill) => Some(FillRegion {
                        points: fill.points,
                        indices: fill.indices,
                    }),
                    Err(e) => {
                        tracing::warn!(
                            loop_index = fill,
                            error = %e,
                            "hatch fill triangulation failed"
                        );
                        None
                    }
                }
            })
            .filter(|region| !region.indices.is_empty())
            .collect();

        HatchGeometry {
            regions,
            pattern: None,
        }
    }

    /// Classify loops and pass them through with the resolved pattern
    pub fn build_pattern(
        &self,
        loops: Vec<Vec<Point2<f64>>>,
        pattern: &HatchPatternData,
    ) -> HatchGeometry {
        let loops = normalize_loops(loops);
        if loops.is_empty() {
            return HatchGeometry::default();
        }
        let nodes = self.classify(&loops);

        let kept = loops
            .into_iter()
            .zip(nodes)
            .filter(|(_, node)| node.role != LoopRole::Ignored)
            .map(|(points, _)| points)
            .collect();

        HatchGeometry {
            regions: Vec::new(),
            pattern: Some(PatternFill {
                loops: kept,
                pattern: resolve_pattern(pattern),
            }),
        }
    }
}

/// Drop loops that cannot bound an area and strip duplicated closing points
fn normalize_loops(loops: Vec<Vec<Point2<f64>>>) -> Vec<Vec<Point2<f64>>> {
    loops
        .into_iter()
        .map(|mut points| {
            while points.len() > 1 && points.first() == points.last() {
                points.pop();
            }
            points
        })
        .filter(|points| points.len() >= 3)
        .collect()
}

/// Pattern lines from the entity, else from the built-in table
pub fn resolve_pattern(data: &HatchPatternData) -> HatchPattern {
    let scale = if data.scale.is_finite() && data.scale > 0.0 {
        data.scale
    } else {
        1.0
    };
    let lines = if data.lines.is_empty() {
        builtin_pattern(&data.name).unwrap_or_else(|| {
            tracing::debug!(pattern = %data.name, "unknown hatch pattern, using ANSI31");
            builtin_pattern("ANSI31").unwrap_or_default()
        })
    } else {
        data.lines.clone()
    };

    HatchPattern {
        name: data.name.clone(),
        angle: data.angle,
        scale,
        lines,
    }
}

/// Line families of the built-in patterns
pub fn builtin_pattern(name: &str) -> Option<Vec<PatternLine>> {
    let family = |degrees: f64| PatternLine {
        angle: degrees.to_radians(),
        base: Point2::origin(),
        offset: Vector2::new(0.0, BUILTIN_SPACING),
        dashes: Vec::new(),
    };

    match name.to_ascii_uppercase().as_str() {
        "ANSI31" => Some(vec![family(45.0)]),
        "ANSI37" => Some(vec![family(45.0), family(135.0)]),
        "LINE" => Some(vec![family(0.0)]),
        "NET" => Some(vec![family(0.0), family(90.0)]),
        _ => None,
    }
}
