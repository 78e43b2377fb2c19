pub mod camera;
pub mod gpu;
pub mod mesh_buffers;

pub use camera::{CameraController, CameraUniform};
pub use gpu::GpuState;
pub use mesh_buffers::{MeshBatch, MeshBuffers};
