//! Running bounding box of every coordinate seen in a document.
//!
//! The box only ever grows. Once the stream is consumed its center becomes the
//! origin of the GPU vertex data, which keeps f32 positions precise for
//! projected coordinates in the millions.

use glam::DVec3;

use crate::geometry::mesh::Point3;

/// Fraction of the full diagonal used to seed the initial camera distance.
pub const DIAGONAL_DAMPING: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    lower: DVec3,
    upper: DVec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBox {
    /// Empty box: lower corner at +inf, upper corner at -inf.
    pub fn new() -> Self {
        Self {
            lower: DVec3::splat(f64::INFINITY),
            upper: DVec3::splat(f64::NEG_INFINITY),
        }
    }

    /// True until at least one value was observed on every axis.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lower.x > self.upper.x || self.lower.y > self.upper.y || self.lower.z > self.upper.z
    }

    #[inline]
    pub fn expand_x(&mut self, x: f64) {
        if x < self.lower.x {
            self.lower.x = x;
        }
        if x > self.upper.x {
            self.upper.x = x;
        }
    }

    #[inline]
    pub fn expand_y(&mut self, y: f64) {
        if y < self.lower.y {
            self.lower.y = y;
        }
        if y > self.upper.y {
            self.upper.y = y;
        }
    }

    #[inline]
    pub fn expand_z(&mut self, z: f64) {
        if z < self.lower.z {
            self.lower.z = z;
        }
        if z > self.upper.z {
            self.upper.z = z;
        }
    }

    #[inline]
    pub fn expand(&mut self, point: Point3) {
        self.expand_x(point.x);
        self.expand_y(point.y);
        self.expand_z(point.z);
    }

    pub fn lower(&self) -> DVec3 {
        self.lower
    }

    pub fn upper(&self) -> DVec3 {
        self.upper
    }

    /// Componentwise midpoint, or the origin for an empty box.
    pub fn center(&self) -> DVec3 {
        if self.is_empty() {
            return DVec3::ZERO;
        }
        (self.lower + self.upper) * 0.5
    }

    /// Corner-to-corner length.
    pub fn diagonal(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (self.upper - self.lower).length()
    }

    /// Damped diagonal, used as the initial camera distance.
    pub fn diagonal_edge_length(&self) -> f64 {
        self.diagonal() * DIAGONAL_DAMPING
    }

    pub fn contains(&self, point: Point3) -> bool {
        point.cmpge(self.lower).all() && point.cmple(self.upper).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lcg(seed: &mut u64) -> f64 {
        *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((*seed >> 11) as f64 / (1u64 << 53) as f64) * 2_000_000.0 - 1_000_000.0
    }

    #[test]
    fn test_empty_box() {
        let bbox = BoundingBox::new();
        assert!(bbox.is_empty());
        assert_eq!(bbox.center(), DVec3::ZERO);
        assert_eq!(bbox.diagonal_edge_length(), 0.0);
    }

    #[test]
    fn test_monotonic_expansion() {
        let mut seed = 42;
        let mut bbox = BoundingBox::new();
        let mut seen = Vec::new();

        for _ in 0..500 {
            let p = DVec3::new(lcg(&mut seed), lcg(&mut seed), lcg(&mut seed));
            let (lower, upper) = (bbox.lower(), bbox.upper());

            bbox.expand_x(p.x);
            bbox.expand_y(p.y);
            bbox.expand_z(p.z);
            seen.push(p);

            assert!(bbox.lower().cmple(lower).all());
            assert!(bbox.upper().cmpge(upper).all());
            assert!(bbox.lower().cmple(bbox.upper()).all());
        }

        for p in seen {
            assert!(bbox.contains(p));
        }
    }

    #[test]
    fn test_center_and_diagonal() {
        let mut bbox = BoundingBox::new();
        bbox.expand(DVec3::new(542_000.0, 6_587_000.0, 10.0));
        bbox.expand(DVec3::new(542_030.0, 6_587_040.0, 10.0));

        assert_eq!(bbox.center(), DVec3::new(542_015.0, 6_587_020.0, 10.0));
        assert_relative_eq!(bbox.diagonal(), 50.0);
        assert_relative_eq!(bbox.diagonal_edge_length(), 10.0);
    }

    #[test]
    fn test_nan_does_not_enter_bounds() {
        let mut bbox = BoundingBox::new();
        bbox.expand(DVec3::new(1.0, 2.0, 3.0));
        bbox.expand(DVec3::new(f64::NAN, 5.0, f64::NAN));

        assert_eq!(bbox.lower(), DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.upper(), DVec3::new(1.0, 5.0, 3.0));
    }
}
