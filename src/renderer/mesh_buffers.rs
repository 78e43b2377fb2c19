use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use wgpu::util::DeviceExt;

use crate::geometry::MeshEntry;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Position {
    pub position: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Color {
    pub color: [f32; 3],
}

/// Flattened mesh list, one position and one color per vertex.
///
/// Positions are relative to `center` so f32 keeps its precision for
/// projected coordinates in the millions.
#[derive(Debug, Default, Clone)]
pub struct MeshBatch {
    pub positions: Vec<Position>,
    pub colors: Vec<Color>,
}

impl MeshBatch {
    pub fn from_meshes(meshes: &[MeshEntry], center: DVec3) -> Self {
        let vertex_count: usize = meshes.iter().map(|m| m.triangles.len()).sum();
        let mut positions = Vec::with_capacity(vertex_count);
        let mut colors = Vec::with_capacity(vertex_count);

        for mesh in meshes {
            for point in &mesh.triangles {
                positions.push(Position {
                    position: (*point - center).as_vec3().to_array(),
                });
                colors.push(Color { color: mesh.color });
            }
        }

        Self { positions, colors }
    }

    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// GPU copy of a `MeshBatch`. Drawn with the implicit index `0..vertex_count`.
pub struct MeshBuffers {
    position_buffer: wgpu::Buffer,
    color_buffer: wgpu::Buffer,
    vertex_count: u32,
}

impl MeshBuffers {
    pub fn upload(device: &wgpu::Device, batch: &MeshBatch) -> Self {
        let position_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Position Buffer"),
            contents: bytemuck::cast_slice(&batch.positions),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let color_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Color Buffer"),
            contents: bytemuck::cast_slice(&batch.colors),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            position_buffer,
            color_buffer,
            vertex_count: batch.vertex_count(),
        }
    }

    pub fn position_buffer(&self) -> &wgpu::Buffer {
        &self.position_buffer
    }

    pub fn color_buffer(&self) -> &wgpu::Buffer {
        &self.color_buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

pub fn position_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Position>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

pub fn color_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Color>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_relative_to_center() {
        let base = DVec3::new(2_600_000.0, 1_200_000.0, 400.0);
        let meshes = vec![
            MeshEntry {
                triangles: vec![base, base + DVec3::X, base + DVec3::new(0.25, 1.0, 0.0)],
                color: [0.5, 0.0, 0.0],
            },
            MeshEntry {
                triangles: vec![base, base + DVec3::Z, base + DVec3::Y],
                color: [0.2, 0.2, 0.2],
            },
        ];

        let batch = MeshBatch::from_meshes(&meshes, base);

        assert_eq!(batch.vertex_count(), 6);
        assert_eq!(batch.colors.len(), 6);
        assert_eq!(batch.positions[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(batch.positions[2].position, [0.25, 1.0, 0.0]);
        assert_eq!(batch.colors[2].color, [0.5, 0.0, 0.0]);
        assert_eq!(batch.colors[3].color, [0.2, 0.2, 0.2]);
    }

    #[test]
    fn test_empty_batch() {
        let batch = MeshBatch::from_meshes(&[], DVec3::ZERO);
        assert!(batch.is_empty());
        assert_eq!(batch.vertex_count(), 0);
    }

    #[test]
    fn test_vertex_strides() {
        assert_eq!(position_layout().array_stride, 12);
        assert_eq!(color_layout().array_stride, 12);
    }
}
