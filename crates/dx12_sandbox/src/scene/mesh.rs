use bytemuck::Pod;
use bytemuck::Zeroable;

use super::Transform;
use crate::error::SandboxResult;
use crate::gpu::Api;
use crate::gpu::CommandList;
use crate::gpu::ResourceState;
use crate::gpu::TrackedResource;
use crate::upload::UploadPipeline;

/// Matches the `POSITION` / `TEXCOORD` input layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

const fn vertex(position: [f32; 3], uv: [f32; 2]) -> Vertex {
    Vertex { position, uv }
}

/// CPU-side geometry, indexed as a triangle list.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// A unit cube centred on the origin, four textured vertices per face.
    pub fn cube() -> Self {
        let vertices = vec![
            // front
            vertex([-0.5, 0.5, -0.5], [0.0, 0.0]),
            vertex([0.5, -0.5, -0.5], [1.0, 1.0]),
            vertex([-0.5, -0.5, -0.5], [0.0, 1.0]),
            vertex([0.5, 0.5, -0.5], [1.0, 0.0]),
            // right
            vertex([0.5, -0.5, -0.5], [0.0, 1.0]),
            vertex([0.5, 0.5, 0.5], [1.0, 0.0]),
            vertex([0.5, -0.5, 0.5], [1.0, 1.0]),
            vertex([0.5, 0.5, -0.5], [0.0, 0.0]),
            // left
            vertex([-0.5, 0.5, 0.5], [0.0, 0.0]),
            vertex([-0.5, -0.5, -0.5], [1.0, 1.0]),
            vertex([-0.5, -0.5, 0.5], [0.0, 1.0]),
            vertex([-0.5, 0.5, -0.5], [1.0, 0.0]),
            // back
            vertex([0.5, 0.5, 0.5], [0.0, 0.0]),
            vertex([-0.5, -0.5, 0.5], [1.0, 1.0]),
            vertex([0.5, -0.5, 0.5], [0.0, 1.0]),
            vertex([-0.5, 0.5, 0.5], [1.0, 0.0]),
            // top
            vertex([-0.5, 0.5, -0.5], [0.0, 1.0]),
            vertex([0.5, 0.5, 0.5], [1.0, 0.0]),
            vertex([0.5, 0.5, -0.5], [1.0, 1.0]),
            vertex([-0.5, 0.5, 0.5], [0.0, 0.0]),
            // bottom
            vertex([0.5, -0.5, 0.5], [0.0, 0.0]),
            vertex([-0.5, -0.5, -0.5], [1.0, 1.0]),
            vertex([0.5, -0.5, -0.5], [0.0, 1.0]),
            vertex([-0.5, -0.5, 0.5], [1.0, 0.0]),
        ];

        let indices = (0..6u32)
            .flat_map(|face| {
                let base = face * 4;
                [base, base + 1, base + 2, base, base + 3, base + 1]
            })
            .collect();

        Self { vertices, indices }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Geometry resident in device-local memory plus where to draw it.
pub struct Mesh<A: Api> {
    vertex_buffer: TrackedResource<A>,
    index_buffer: TrackedResource<A>,
    index_count: u32,
    pub transform: Transform,
}

impl<A: Api> Mesh<A> {
    pub const VERTEX_STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// Records the vertex and index uploads into `list`.
    pub fn upload(
        device: &A::Device,
        list: &mut A::CommandList,
        uploads: &mut UploadPipeline<A>,
        data: &MeshData,
    ) -> SandboxResult<Self> {
        let vertex_buffer = uploads.upload_buffer(
            device,
            list,
            data.vertex_bytes(),
            ResourceState::VertexAndConstantBuffer,
            "Vertex Buffer Resource Heap",
        )?;
        let index_buffer = uploads.upload_buffer(
            device,
            list,
            data.index_bytes(),
            ResourceState::IndexBuffer,
            "Index Buffer Resource Heap",
        )?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
            transform: Transform::default(),
        })
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_buffer(&self) -> &TrackedResource<A> {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &TrackedResource<A> {
        &self.index_buffer
    }

    /// Binds both buffers, transitioning either one first if needed.
    pub fn bind(&mut self, list: &mut A::CommandList) {
        self.vertex_buffer
            .transition(list, ResourceState::VertexAndConstantBuffer);
        self.index_buffer.transition(list, ResourceState::IndexBuffer);
        list.set_vertex_buffer(
            self.vertex_buffer.resource(),
            Self::VERTEX_STRIDE,
            self.vertex_buffer.size() as u32,
        );
        list.set_index_buffer(self.index_buffer.resource(), self.index_buffer.size() as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_eight_corners_and_twelve_triangles() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);

        let mut corners: Vec<[f32; 3]> = Vec::new();
        for vertex in &cube.vertices {
            if !corners.contains(&vertex.position) {
                corners.push(vertex.position);
            }
        }
        assert_eq!(corners.len(), 8);
        assert!(
            corners
                .iter()
                .all(|corner| corner.iter().all(|axis| axis.abs() == 0.5))
        );
    }

    #[test]
    fn indices_stay_within_their_face() {
        let cube = MeshData::cube();
        for (face, chunk) in cube.indices.chunks_exact(6).enumerate() {
            let base = face as u32 * 4;
            assert!(chunk.iter().all(|index| (base..base + 4).contains(index)));
        }
    }

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 20);
        let cube = MeshData::cube();
        assert_eq!(cube.vertex_bytes().len(), 24 * 20);
        assert_eq!(cube.index_bytes().len(), 36 * 4);
    }
}
