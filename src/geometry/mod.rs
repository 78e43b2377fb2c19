pub mod bounds;
pub mod mesh;
pub mod normal;
pub mod tessellate;

pub use bounds::BoundingBox;
pub use mesh::{MeshEntry, MeshList, Point3, Polygon, Ring};
pub use normal::{SurfaceClass, classify_surface, ring_normal};
pub use tessellate::{EarcutTessellator, Tessellator};
