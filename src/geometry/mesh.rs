use glam::DVec3;

/// A coordinate in the source CRS, kept in f64 since projected coordinates
/// routinely reach the millions.
pub type Point3 = DVec3;

/// Ordered boundary of a polygon. Not required to repeat its first point.
pub type Ring = Vec<Point3>;

/// One exterior ring followed by zero or more holes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    pub rings: Vec<Ring>,
}

impl Polygon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ring(&mut self, ring: Ring) {
        self.rings.push(ring);
    }

    pub fn exterior(&self) -> Option<&Ring> {
        self.rings.first()
    }

    pub fn holes(&self) -> &[Ring] {
        if self.rings.is_empty() {
            &[]
        } else {
            &self.rings[1..]
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn clear(&mut self) {
        self.rings.clear();
    }
}

/// Triangles of one source polygon together with their baked shade color.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshEntry {
    /// Flat vertex list, three vertices per triangle.
    pub triangles: Vec<Point3>,
    pub color: [f32; 3],
}

impl MeshEntry {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }
}

pub type MeshList = Vec<MeshEntry>;
