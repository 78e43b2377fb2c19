//! Face normals for CityGML rings.

use glam::DVec3;

use crate::geometry::mesh::Point3;

const CLASSIFY_EPSILON: f64 = 1e-6;

/// Unit normal of a ring by Newell's method.
///
/// Falls back to the cross product of the first three points when the Newell
/// sum vanishes, and to the X axis when that is degenerate too. The result is
/// always finite and unit length for any input, including empty rings.
pub fn ring_normal(ring: &[Point3]) -> DVec3 {
    if let Some(normal) = newell_sum(ring).try_normalize() {
        return normal;
    }

    if ring.len() >= 3 {
        let cross = (ring[1] - ring[0]).cross(ring[2] - ring[0]);
        if let Some(normal) = cross.try_normalize() {
            return normal;
        }
    }

    DVec3::X
}

fn newell_sum(ring: &[Point3]) -> DVec3 {
    let mut sum = DVec3::ZERO;
    let n = ring.len();
    if n < 2 {
        return sum;
    }

    // GML rings repeat their first point, so the closing pair is (p, p) and
    // adds nothing for them. Open rings still get their last edge.
    for i in 0..n {
        let cur = ring[i];
        let next = ring[(i + 1) % n];
        sum.x += (cur.z + next.z) * (cur.y - next.y);
        sum.y += (cur.x + next.x) * (cur.z - next.z);
        sum.z += (cur.y + next.y) * (cur.x - next.x);
    }

    sum
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceClass {
    Roof,
    Wall,
    Floor,
}

/// Orientation class of a face from the vertical component of its normal.
pub fn classify_surface(normal: DVec3) -> SurfaceClass {
    if normal.z > CLASSIFY_EPSILON {
        SurfaceClass::Roof
    } else if normal.z < -CLASSIFY_EPSILON {
        SurfaceClass::Floor
    } else {
        SurfaceClass::Wall
    }
}
