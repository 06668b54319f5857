//! GPU meshes and materials handed over by the asset loader.

use wgpu::util::DeviceExt;

/// Describes how a vertex type is laid out in a vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// A range of the shared index buffer drawn with one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submesh {
    pub first_index: u32,
    pub index_count: u32,
    pub base_vertex: i32,
}

/// Vertex and index data of one loaded model, split into submeshes.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub submeshes: Vec<Submesh>,
}

impl Mesh {
    /// Upload `vertices` and one index list per submesh into shared buffers.
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        submesh_indices: &[Vec<u32>],
    ) -> Self {
        let mut indices = Vec::new();
        let mut submeshes = Vec::with_capacity(submesh_indices.len());
        for list in submesh_indices {
            submeshes.push(Submesh {
                first_index: indices.len() as u32,
                index_count: list.len() as u32,
                base_vertex: 0,
            });
            indices.extend_from_slice(list);
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Index Buffer")),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            submeshes,
        }
    }
}

/// Surface parameters of a submesh. The albedo texture indexes the texture
/// registry; `None` falls back to the built-in white texture.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub albedo: cgmath::Vector3<f32>,
    pub emissive: cgmath::Vector3<f32>,
    pub smoothness: f32,
    pub albedo_texture: Option<usize>,
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            albedo: cgmath::Vector3::new(1.0, 1.0, 1.0),
            emissive: cgmath::Vector3::new(0.0, 0.0, 0.0),
            smoothness: 0.0,
            albedo_texture: None,
        }
    }
}

/// Constant material terms as the shaders read them at `@group(2) @binding(2)`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub albedo: [f32; 3],
    pub smoothness: f32,
    pub emissive: [f32; 3],
    // Uniforms require 16 byte (4 float) spacing
    _padding: u32,
}

impl From<&Material> for MaterialUniform {
    fn from(material: &Material) -> Self {
        Self {
            albedo: material.albedo.into(),
            smoothness: material.smoothness.clamp(0.0, 1.0),
            emissive: material.emissive.into(),
            _padding: 0,
        }
    }
}
