// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numeric stabilization for large coordinates
//!
//! Drawings in survey or map coordinates carry magnitudes far beyond the
//! precision of 32-bit floats. Vertex sets whose magnitude exceeds a
//! threshold relative to the working scale are rebased around their bounding
//! box center before narrowing; the center is kept as a [`CoordinateShift`].

use crate::mesh::CoordinateShift;
use nalgebra::Point2;

/// Rebase thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RebaseConfig {
    /// Rebase when a coordinate exceeds `threshold_factor * working_scale`
    pub threshold_factor: f64,
    /// Absolute lower bound for the rebase threshold
    pub min_magnitude: f64,
    /// Grid the rebase center is snapped to
    pub grid: f64,
}

impl Default for RebaseConfig {
    fn default() -> Self {
        Self {
            threshold_factor: 1000.0,
            min_magnitude: 10_000.0, // 10km
            grid: 1.0,
        }
    }
}

/// Vertex set after stabilization
#[derive(Debug, Clone, PartialEq)]
pub struct Stabilized {
    /// Points relative to `shift`
    pub points: Vec<Point2<f64>>,
    pub shift: CoordinateShift,
    pub rebased: bool,
}

impl Stabilized {
    /// Original coordinates, recovered in f64
    pub fn world_points(&self) -> impl Iterator<Item = Point2<f64>> + '_ {
        self.points
            .iter()
            .map(|p| Point2::new(p.x + self.shift.x, p.y + self.shift.y))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NumericStabilizer {
    threshold: f64,
    grid: f64,
}

impl NumericStabilizer {
    pub fn new(config: &RebaseConfig, working_scale: f64) -> Self {
        let scale = if working_scale.is_finite() && working_scale > 0.0 {
            working_scale
        } else {
            1.0
        };
        let grid = if config.grid.is_finite() && config.grid > 0.0 {
            config.grid
        } else {
            1.0
        };
        Self {
            threshold: config.min_magnitude.max(config.threshold_factor * scale),
            grid,
        }
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Check whether any coordinate exceeds the rebase threshold
    pub fn needs_rebase(&self, points: &[Point2<f64>]) -> bool {
        points
            .iter()
            .any(|p| p.x.abs() > self.threshold || p.y.abs() > self.threshold)
    }

    /// Rebase center for a vertex set: bounding box center snapped to the grid
    pub fn center(&self, points: &[Point2<f64>]) -> Option<CoordinateShift> {
        let first = points.first()?;
        let (mut min, mut max) = (*first, *first);
        for p in &points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        let snap = |v: f64| (v / self.grid).round() * self.grid;
        Some(CoordinateShift::new(
            snap((min.x + max.x) * 0.5),
            snap((min.y + max.y) * 0.5),
        ))
    }

    /// Rebase `points` if their magnitude calls for it
    pub fn stabilize(&self, points: &[Point2<f64>]) -> Stabilized {
        let shift = match self.center(points) {
            Some(center) if self.needs_rebase(points) => center,
            _ => {
                return Stabilized {
                    points: points.to_vec(),
                    shift: CoordinateShift::default(),
                    rebased: false,
                }
            }
        };

        Stabilized {
            points: points
                .iter()
                .map(|p| Point2::new(p.x - shift.x, p.y - shift.y))
                .collect(),
            shift,
            rebased: true,
        }
    }

    /// Stabilize again; an already rebased set is returned unchanged
    pub fn restabilize(&self, input: Stabilized) -> Stabilized {
        if input.rebased {
            return input;
        }
        self.stabilize(&input.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn far_points() -> Vec<Point2<f64>> {
        vec![
            Point2::new(2_679_012.123, 1_247_892.654),
            Point2::new(2_679_112.123, 1_247_992.654),
        ]
    }

    #[test]
    fn test_small_coordinates_untouched() {
        let stabilizer = NumericStabilizer::new(&RebaseConfig::default(), 1.0);
        let points = vec![Point2::new(10.0, 20.0), Point2::new(-5.0, 3.0)];
        let result = stabilizer.stabilize(&points);
        assert!(!result.rebased);
        assert!(result.shift.is_zero());
        assert_eq!(result.points, points);
    }

    #[test]
    fn test_large_coordinates_rebased_around_center() {
        let stabilizer = NumericStabilizer::new(&RebaseConfig::default(), 1.0);
        let result = stabilizer.stabilize(&far_points());
        assert!(result.rebased);
        assert_eq!(result.shift, CoordinateShift::new(2_679_062.0, 1_247_943.0));

        for (restored, original) in result.world_points().zip(far_points()) {
            assert_relative_eq!(restored.x, original.x, epsilon = 1e-9);
            assert_relative_eq!(restored.y, original.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rebase_is_idempotent() {
        let stabilizer = NumericStabilizer::new(&RebaseConfig::default(), 1.0);
        let once = stabilizer.stabilize(&far_points());
        let twice = stabilizer.restabilize(once.clone());
        assert_eq!(once, twice);

        // Rebased points are small and are not shifted again
        let again = stabilizer.stabilize(&once.points);
        assert!(!again.rebased);
        assert_eq!(again.points, once.points);
    }

    #[test]
    fn test_threshold_follows_working_scale() {
        let config = RebaseConfig::default();
        assert_eq!(NumericStabilizer::new(&config, 1.0).threshold(), 10_000.0);
        assert_eq!(NumericStabilizer::new(&config, 50.0).threshold(), 50_000.0);
        assert_eq!(NumericStabilizer::new(&config, f64::NAN).threshold(), 10_000.0);

        // A drawing 40km wide does not rebase coordinates within its own scale
        let stabilizer = NumericStabilizer::new(&config, 40_000.0);
        assert!(!stabilizer.needs_rebase(&far_points()[..1]));
    }

    #[test]
    fn test_empty_input() {
        let stabilizer = NumericStabilizer::new(&RebaseConfig::default(), 1.0);
        let result = stabilizer.stabilize(&[]);
        assert!(!result.rebased);
        assert!(result.points.is_empty());
    }
}
