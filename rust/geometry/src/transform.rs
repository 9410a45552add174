// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar transforms
//!
//! Scene transforms are 2D homogeneous matrices (`Matrix3`). Planar
//! entities carry an extrusion direction; their coordinates live in the
//! object coordinate system (OCS) derived from it with the arbitrary axis
//! algorithm and are projected onto the XY plane.

use nalgebra::{Matrix3, Point2, Vector2, Vector3};

/// Below this, a normal's X and Y components count as "near the Z axis"
const ARBITRARY_AXIS_LIMIT: f64 = 1.0 / 64.0;

/// Object coordinate system of a planar entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ocs {
    pub x_axis: Vector3<f64>,
    pub y_axis: Vector3<f64>,
}

impl Ocs {
    /// Derive the OCS axes from an extrusion direction
    pub fn from_extrusion(normal: &Vector3<f64>) -> Self {
        let n = normal.try_normalize(1e-12).unwrap_or_else(Vector3::z);
        let x_axis = if n.x.abs() < ARBITRARY_AXIS_LIMIT && n.y.abs() < ARBITRARY_AXIS_LIMIT {
            Vector3::y().cross(&n)
        } else {
            Vector3::z().cross(&n)
        }
        .normalize();
        let y_axis = n.cross(&x_axis).normalize();
        Self { x_axis, y_axis }
    }

    /// Whether the OCS coincides with WCS
    pub fn is_identity(&self) -> bool {
        (self.x_axis - Vector3::x()).norm() < 1e-12 && (self.y_axis - Vector3::y()).norm() < 1e-12
    }

    /// OCS → WCS, projected onto the XY plane
    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.x_axis.x, self.y_axis.x, 0.0,
            self.x_axis.y, self.y_axis.y, 0.0,
            0.0, 0.0, 1.0,
        )
    }

    #[inline]
    pub fn to_wcs(&self, p: &Point2<f64>) -> Point2<f64> {
        Point2::new(
            p.x * self.x_axis.x + p.y * self.y_axis.x,
            p.x * self.x_axis.y + p.y * self.y_axis.y,
        )
    }

    /// Map an OCS angle to the matching WCS direction angle
    pub fn angle_to_wcs(&self, angle: f64) -> f64 {
        let d = self.to_wcs(&Point2::new(angle.cos(), angle.sin()));
        d.y.atan2(d.x)
    }
}

/// Translation * rotation * scale
pub fn similarity(translation: Vector2<f64>, rotation: f64, scale: Vector2<f64>) -> Matrix3<f64> {
    Matrix3::new_translation(&translation)
        * Matrix3::new_rotation(rotation)
        * Matrix3::new_nonuniform_scaling(&scale)
}

/// Uniform scale factor of a transform's linear part (geometric mean)
pub fn scale_factor(transform: &Matrix3<f64>) -> f64 {
    let det = transform[(0, 0)] * transform[(1, 1)] - transform[(0, 1)] * transform[(1, 0)];
    det.abs().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_default_extrusion_is_identity() {
        let ocs = Ocs::from_extrusion(&Vector3::z());
        assert!(ocs.is_identity());
        assert_eq!(ocs.matrix(), Matrix3::identity());
    }

    #[test]
    fn test_negative_extrusion_mirrors_x() {
        let ocs = Ocs::from_extrusion(&Vector3::new(0.0, 0.0, -1.0));
        let p = ocs.to_wcs(&Point2::new(3.0, 4.0));
        assert_relative_eq!(p.x, -3.0);
        assert_relative_eq!(p.y, 4.0);

        // Angle 0 in OCS points to -X in WCS
        assert_relative_eq!(ocs.angle_to_wcs(0.0).abs(), std::f64::consts::PI);
        assert_relative_eq!(ocs.angle_to_wcs(FRAC_PI_2), FRAC_PI_2);
    }

    #[test]
    fn test_matrix_agrees_with_to_wcs() {
        let ocs = Ocs::from_extrusion(&Vector3::new(0.0, 0.0, -1.0));
        let p = Point2::new(1.5, -2.0);
        assert_relative_eq!(ocs.matrix().transform_point(&p), ocs.to_wcs(&p));
    }

    #[test]
    fn test_similarity() {
        let m = similarity(Vector2::new(10.0, 0.0), FRAC_PI_2, Vector2::new(2.0, 2.0));
        let p = m.transform_point(&Point2::new(1.0, 0.0));
        assert_relative_eq!(p, Point2::new(10.0, 2.0), epsilon = 1e-12);
        assert_relative_eq!(scale_factor(&m), 2.0, epsilon = 1e-12);
    }
}
