//! wgpu side of the block binding protocol.
//!
//! The global block is bound with its exact offset through a bind group that
//! is rebuilt after each frame write. Local blocks all share one size, so a
//! single bind group with a dynamic offset covers every entity; the offset is
//! supplied per draw.

use std::{num::NonZeroU64, time::Duration};

use anyhow::Context as _;

use crate::{
    buffer::{StreamingBuffer, layout},
    data_structures::{
        block::Block,
        entity::Entity,
        mesh::{MaterialUniform, Mesh},
        texture::Texture,
    },
    error::BindError,
    frame::FrameBlocks,
    pass::{BindingPoint, MATERIAL_GROUP, PassEncoder},
};

/// Bind group layouts shared by every pipeline that reads the blocks.
#[derive(Debug)]
pub struct UniformLayouts {
    pub global: wgpu::BindGroupLayout,
    pub local: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    max_lights: usize,
}

impl UniformLayouts {
    pub fn new(device: &wgpu::Device, max_lights: usize) -> Self {
        let global = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("global_block_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(layout::global_block_capacity(max_lights)),
                },
                count: None,
            }],
        });
        let local = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("local_block_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(layout::LOCAL_BLOCK_SIZE),
                },
                count: None,
            }],
        });
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<MaterialUniform>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        });
        Self {
            global,
            local,
            material,
            max_lights,
        }
    }

    pub fn max_lights(&self) -> usize {
        self.max_lights
    }

    /// Albedo texture, sampler and constant terms of one material.
    pub fn material_bind_group(
        &self,
        device: &wgpu::Device,
        albedo: &Texture,
        params: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_bind_group"),
            layout: &self.material,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&albedo.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&albedo.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }
}

/// Bind groups over this frame's blocks.
#[derive(Debug)]
pub struct FrameBindings {
    global: wgpu::BindGroup,
    global_block: Block,
    local: wgpu::BindGroup,
    local_alignment: u64,
}

impl FrameBindings {
    /// Build the bind groups for the blocks `frame` recorded.
    ///
    /// The global range is widened to the size the shader declares so the
    /// fixed-size light array is always backed by buffer memory.
    pub fn new(
        device: &wgpu::Device,
        layouts: &UniformLayouts,
        light_buffer: &StreamingBuffer,
        uniform_buffer: &StreamingBuffer,
        frame: &FrameBlocks,
        local_alignment: u64,
    ) -> anyhow::Result<Self> {
        let global_size = frame
            .global
            .size
            .max(layout::global_block_capacity(layouts.max_lights()));
        anyhow::ensure!(
            frame.global.offset + global_size <= light_buffer.capacity(),
            "global block at {} needs {} bytes but {} holds only {}",
            frame.global.offset,
            global_size,
            light_buffer.label(),
            light_buffer.capacity()
        );
        anyhow::ensure!(
            layout::LOCAL_BLOCK_SIZE <= uniform_buffer.capacity(),
            "{} cannot hold a single local block",
            uniform_buffer.label()
        );

        let global = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("global_block_bind_group"),
            layout: &layouts.global,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: light_buffer.gpu_buffer(),
                    offset: frame.global.offset,
                    size: NonZeroU64::new(global_size),
                }),
            }],
        });
        let local = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("local_block_bind_group"),
            layout: &layouts.local,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: uniform_buffer.gpu_buffer(),
                    offset: 0,
                    size: NonZeroU64::new(layout::LOCAL_BLOCK_SIZE),
                }),
            }],
        });

        Ok(Self {
            global,
            global_block: frame.global,
            local,
            local_alignment,
        })
    }

    /// Dynamic offset for a local block, checked against the device alignment.
    pub fn local_offset(&self, block: Block) -> Result<u32, BindError> {
        if block.size != layout::LOCAL_BLOCK_SIZE {
            return Err(BindError::SizeMismatch {
                expected: layout::LOCAL_BLOCK_SIZE,
                actual: block.size,
            });
        }
        let misaligned = BindError::MisalignedOffset {
            offset: block.offset,
            alignment: self.local_alignment,
        };
        if block.offset % self.local_alignment != 0 {
            return Err(misaligned);
        }
        u32::try_from(block.offset).map_err(|_| misaligned)
    }
}

/// Issues the binder's commands into a wgpu render pass.
pub struct WgpuPassEncoder<'a, 'p> {
    pub render_pass: &'a mut wgpu::RenderPass<'p>,
    pub bindings: &'a FrameBindings,
    pub meshes: &'a [Mesh],
    /// Material bind groups indexed like the material table. `None` skips
    /// material binding, e.g. for pipelines without a texture group.
    pub materials: Option<(&'a [wgpu::BindGroup], &'a wgpu::BindGroup)>,
}

impl<'a, 'p> PassEncoder for WgpuPassEncoder<'a, 'p> {
    fn bind_block(&mut self, point: BindingPoint, block: Block) -> Result<(), BindError> {
        match point {
            BindingPoint::Global => {
                let expected = self.bindings.global_block;
                if block != expected {
                    return Err(BindError::SizeMismatch {
                        expected: expected.size,
                        actual: block.size,
                    });
                }
                self.render_pass
                    .set_bind_group(point.index(), &self.bindings.global, &[]);
            }
            BindingPoint::Local => {
                let offset = self.bindings.local_offset(block)?;
                self.render_pass
                    .set_bind_group(point.index(), &self.bindings.local, &[offset]);
            }
        }
        Ok(())
    }

    fn draw_entity(&mut self, entity: &Entity) -> Result<(), BindError> {
        let Some(mesh) = self.meshes.get(entity.mesh) else {
            log::warn!("{}: mesh {} is not loaded, skipping draw", entity.name, entity.mesh);
            return Ok(());
        };
        self.render_pass
            .set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.render_pass
            .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        for (i, submesh) in mesh.submeshes.iter().enumerate() {
            if let Some((groups, fallback)) = self.materials {
                let group = entity
                    .materials
                    .get(i)
                    .and_then(|material| groups.get(*material))
                    .unwrap_or(fallback);
                self.render_pass.set_bind_group(MATERIAL_GROUP, group, &[]);
            }
            let first = submesh.first_index;
            self.render_pass.draw_indexed(
                first..first + submesh.index_count,
                submesh.base_vertex,
                0..1,
            );
        }
        Ok(())
    }
}

/// Read a streaming buffer's GPU contents back to host memory.
///
/// Blocks until the copy finished; used by the GPU tests to check that what
/// the shaders see equals what was written.
pub fn read_back(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &StreamingBuffer,
    size: u64,
) -> anyhow::Result<Vec<u8>> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("stream readback"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("stream readback encoder"),
    });
    encoder.copy_buffer_to_buffer(buffer.gpu_buffer(), 0, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let slice = staging.slice(..);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).ok();
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .context("device lost while reading back a streaming buffer")?;
    futures::executor::block_on(rx.receive())
        .context("readback callback was dropped")?
        .context("mapping the readback buffer failed")?;
    let bytes = slice.get_mapped_range().to_vec();
    staging.unmap();
    Ok(bytes)
}
