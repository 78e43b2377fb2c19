//! Polygon tessellation
//!
//! Rings are projected onto the plane of the face normal and handed to
//! earcutr. Output vertices are copies of the input points, never
//! reconstructed from the 2D projection.

use glam::{DVec2, DVec3};

use crate::error::{Error, Result};
use crate::geometry::mesh::{Point3, Ring};
use crate::geometry::normal::ring_normal;

/// Turns an exterior ring plus holes into a flat triangle vertex list.
pub trait Tessellator {
    fn tessellate(&self, exterior: &[Point3], holes: &[Ring], normal: DVec3)
    -> Result<Vec<Point3>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EarcutTessellator;

impl Tessellator for EarcutTessellator {
    fn tessellate(
        &self,
        exterior: &[Point3],
        holes: &[Ring],
        normal: DVec3,
    ) -> Result<Vec<Point3>> {
        let exterior = open_ring(exterior);
        if exterior.len() < 3 {
            return Ok(Vec::new());
        }
        let holes: Vec<&[Point3]> = holes.iter().map(|h| open_ring(h)).collect();

        let all_finite = exterior.iter().all(|p| p.is_finite())
            && holes.iter().all(|h| h.iter().all(|p| p.is_finite()));
        if all_finite {
            return earcut_rings(exterior, &holes, normal);
        }

        tessellate_non_finite(exterior, &holes, normal)
    }
}

fn earcut_rings(
    exterior: &[Point3],
    holes: &[&[Point3]],
    normal: DVec3,
) -> Result<Vec<Point3>> {
    let holes: Vec<&[Point3]> = holes.iter().copied().filter(|h| h.len() >= 3).collect();

    // FAST PATH: plain triangle
    if exterior.len() == 3 && holes.is_empty() {
        let mut triangle = exterior.to_vec();
        orient_triangle(&mut triangle, normal);
        return Ok(triangle);
    }

    let (u_axis, v_axis) = plane_basis(normal);
    let origin = exterior[0];

    let total: usize = exterior.len() + holes.iter().map(|h| h.len()).sum::<usize>();
    let mut points_3d: Vec<Point3> = Vec::with_capacity(total);
    let mut flat: Vec<f64> = Vec::with_capacity(total * 2);
    let mut hole_indices = Vec::with_capacity(holes.len());

    for p in exterior {
        push_projected(&mut flat, project(*p, origin, u_axis, v_axis));
        points_3d.push(*p);
    }
    for hole in holes {
        hole_indices.push(points_3d.len());
        for p in hole {
            push_projected(&mut flat, project(*p, origin, u_axis, v_axis));
            points_3d.push(*p);
        }
    }

    let indices = earcutr::earcut(&flat, &hole_indices, 2)
        .map_err(|e| Error::Triangulation(format!("{:?}", e)))?;

    let mut triangles = Vec::with_capacity(indices.len());
    for tri in indices.chunks_exact(3) {
        let mut triangle = [points_3d[tri[0]], points_3d[tri[1]], points_3d[tri[2]]];
        orient_triangle(&mut triangle, normal);
        triangles.extend_from_slice(&triangle);
    }

    Ok(triangles)
}

/// Non-finite points cannot be projected. The finite remainder of every ring
/// is triangulated as usual and each bad point is kept in one triangle with
/// its ring neighbours, which never rasterizes.
fn tessellate_non_finite(
    exterior: &[Point3],
    holes: &[&[Point3]],
    normal: DVec3,
) -> Result<Vec<Point3>> {
    let exterior_finite: Vec<Point3> =
        exterior.iter().copied().filter(|p| p.is_finite()).collect();
    let holes_finite: Vec<Vec<Point3>> = holes
        .iter()
        .map(|h| h.iter().copied().filter(|p| p.is_finite()).collect())
        .collect();
    let hole_refs: Vec<&[Point3]> = holes_finite.iter().map(Vec::as_slice).collect();

    let mut triangles = if exterior_finite.len() >= 3 {
        // the face normal may be a fallback axis when the bad point was among
        // the first three; project on the plane of what is left
        let mut plane = ring_normal(&exterior_finite);
        if plane.dot(normal) < 0.0 {
            plane = -plane;
        }
        earcut_rings(&exterior_finite, &hole_refs, plane).unwrap_or_else(|e| {
            log::debug!("{}, using a fan for the finite points", e);
            fan_triangulate(&exterior_finite)
        })
    } else {
        Vec::new()
    };

    for ring in std::iter::once(exterior).chain(holes.iter().copied()) {
        push_non_finite(&mut triangles, ring);
    }

    Ok(triangles)
}

fn push_non_finite(triangles: &mut Vec<Point3>, ring: &[Point3]) {
    let n = ring.len();
    for (i, p) in ring.iter().enumerate() {
        if p.is_finite() {
            continue;
        }
        triangles.push(ring[(i + n - 1) % n]);
        triangles.push(*p);
        triangles.push(ring[(i + 1) % n]);
    }
}

/// Drops the repeated closing vertex GML rings carry.
fn open_ring(ring: &[Point3]) -> &[Point3] {
    match ring {
        [first, .., last] if same_point(*first, *last) => &ring[..ring.len() - 1],
        _ => ring,
    }
}

/// Equality that also matches a repeated NaN vertex.
fn same_point(a: Point3, b: Point3) -> bool {
    a == b || a.to_array().map(f64::to_bits) == b.to_array().map(f64::to_bits)
}

fn fan_triangulate(ring: &[Point3]) -> Vec<Point3> {
    let mut triangles = Vec::with_capacity((ring.len() - 2) * 3);
    for i in 1..ring.len() - 1 {
        triangles.push(ring[0]);
        triangles.push(ring[i]);
        triangles.push(ring[i + 1]);
    }
    triangles
}

/// Orthonormal (u, v) with u x v == normal.
fn plane_basis(normal: DVec3) -> (DVec3, DVec3) {
    let abs = normal.abs();
    let reference = if abs.x <= abs.y && abs.x <= abs.z {
        DVec3::X
    } else if abs.y <= abs.z {
        DVec3::Y
    } else {
        DVec3::Z
    };

    let u_axis = normal.cross(reference).normalize();
    let v_axis = normal.cross(u_axis).normalize();
    (u_axis, v_axis)
}

#[inline]
fn project(p: Point3, origin: Point3, u_axis: DVec3, v_axis: DVec3) -> DVec2 {
    let d = p - origin;
    DVec2::new(d.dot(u_axis), d.dot(v_axis))
}

#[inline]
fn push_projected(flat: &mut Vec<f64>, p: DVec2) {
    flat.push(p.x);
    flat.push(p.y);
}

/// Winding follows the face normal.
fn orient_triangle(triangle: &mut [Point3], normal: DVec3) {
    let facing = (triangle[1] - triangle[0])
        .cross(triangle[2] - triangle[0])
        .dot(normal);
    if facing < 0.0 {
        triangle.swap(1, 2);
    }
}
