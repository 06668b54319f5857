//! Per-frame serialisation of camera, lights and entity transforms.
//!
//! [`FrameAggregator::write_frame`] runs once per frame before any pass:
//!
//! 1. map the light buffer, write the global block, unmap
//! 2. map the uniform buffer, write one local block per entity and active
//!    view in insertion order, storing each block on its entity, unmap
//!
//! A frame either serialises completely or not at all. On error every
//! entity's recorded blocks are cleared so no pass can bind a stale range.

use crate::{
    buffer::{BufferBackend, StreamingBuffer, is_power_of_two, layout},
    camera::Camera,
    data_structures::{
        block::Block,
        entity::{Entity, View},
        light::Light,
    },
    error::StreamError,
    water::WaterPlane,
};

/// The camera-side state serialised each frame.
#[derive(Debug, Clone)]
pub struct FrameScene<'a> {
    pub camera: &'a Camera,
    pub lights: &'a [Light],
    /// When set, reflection and refraction blocks are written as well.
    pub water: Option<WaterPlane>,
}

/// What a completed frame write recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBlocks {
    pub global: Block,
    pub light_count: usize,
    pub views: Vec<View>,
    /// Head of the uniform buffer after the last entity.
    pub uniform_bytes: u64,
}

impl FrameBlocks {
    pub fn has_view(&self, view: View) -> bool {
        self.views.contains(&view)
    }
}

/// Writes the global and per-entity blocks with the device's alignment rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameAggregator {
    block_alignment: u64,
    max_lights: usize,
}

impl FrameAggregator {
    /// `block_alignment` is the device's uniform offset alignment; every
    /// local block starts on a multiple of it.
    pub fn new(block_alignment: u64, max_lights: usize) -> Result<Self, StreamError> {
        if !is_power_of_two(block_alignment) {
            return Err(StreamError::InvalidAlignment(block_alignment));
        }
        Ok(Self {
            block_alignment,
            max_lights,
        })
    }

    pub fn block_alignment(&self) -> u64 {
        self.block_alignment
    }

    pub fn max_lights(&self) -> usize {
        self.max_lights
    }

    /// Map `buffer`, write the global block and unmap.
    pub fn write_global<B: BufferBackend>(
        &self,
        buffer: &mut StreamingBuffer<B>,
        camera_position: cgmath::Vector3<f32>,
        lights: &[Light],
    ) -> Result<Block, StreamError> {
        let mut mapping = buffer.map_for_write();
        let block = mapping.write_global_block(camera_position, lights, self.max_lights)?;
        mapping.unmap();
        Ok(block)
    }

    /// Map `buffer` and write every entity's local block for each view.
    ///
    /// Returns the head after the last block.
    pub fn write_locals<B: BufferBackend>(
        &self,
        buffer: &mut StreamingBuffer<B>,
        entities: &mut [Entity],
        views: &[(View, Camera)],
    ) -> Result<u64, StreamError> {
        let mut mapping = buffer.map_for_write();
        for entity in entities.iter_mut() {
            entity.clear_blocks();
            entity.refresh_world();
        }
        for (view, camera) in views {
            let view_projection = camera.view_projection();
            for entity in entities.iter_mut() {
                let world = entity.world();
                let block = mapping.write_local_block(
                    &world,
                    &(view_projection * world),
                    self.block_alignment,
                )?;
                entity.record_block(*view, block);
            }
        }
        Ok(mapping.unmap())
    }

    /// Serialise one complete frame into the two streaming buffers.
    pub fn write_frame<G: BufferBackend, L: BufferBackend>(
        &self,
        light_buffer: &mut StreamingBuffer<G>,
        uniform_buffer: &mut StreamingBuffer<L>,
        entities: &mut [Entity],
        scene: &FrameScene<'_>,
    ) -> Result<FrameBlocks, StreamError> {
        let result = self.try_write_frame(light_buffer, uniform_buffer, entities, scene);
        if let Err(e) = &result {
            log::error!("frame serialisation failed: {e}");
            entities.iter_mut().for_each(Entity::clear_blocks);
        }
        result
    }

    fn try_write_frame<G: BufferBackend, L: BufferBackend>(
        &self,
        light_buffer: &mut StreamingBuffer<G>,
        uniform_buffer: &mut StreamingBuffer<L>,
        entities: &mut [Entity],
        scene: &FrameScene<'_>,
    ) -> Result<FrameBlocks, StreamError> {
        let global = self.write_global(light_buffer, scene.camera.eye(), scene.lights)?;

        let views: Vec<(View, Camera)> = match scene.water {
            None => vec![(View::Main, scene.camera.clone())],
            Some(water) => View::ALL
                .iter()
                .map(|view| (*view, water.camera_for(*view, scene.camera)))
                .collect(),
        };
        let uniform_bytes = self.write_locals(uniform_buffer, entities, &views)?;

        log::debug!(
            "frame written: global block {} bytes, {} entities, {} uniform bytes",
            global.size,
            entities.len(),
            uniform_bytes
        );
        Ok(FrameBlocks {
            global,
            light_count: scene.lights.len(),
            views: views.into_iter().map(|(view, _)| view).collect(),
            uniform_bytes,
        })
    }
}

/// Bytes the local blocks of `entity_count` entities over `view_count`
/// views occupy, alignment gaps included.
pub fn local_bytes(entity_count: usize, view_count: usize, block_alignment: u64) -> u64 {
    let blocks = (entity_count * view_count) as u64;
    if blocks == 0 {
        return 0;
    }
    let stride = layout::LOCAL_BLOCK_SIZE.div_ceil(block_alignment) * block_alignment;
    stride * (blocks - 1) + layout::LOCAL_BLOCK_SIZE
}
