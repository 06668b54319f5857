//! Byte layout of the two uniform blocks the shading passes read.
//!
//! Both blocks follow std140 rules: a `vec3` occupies 12 bytes but starts on
//! a 16 byte boundary, so a following scalar packs into its fourth slot while
//! a following vector starts on the next boundary. Matrices are four
//! column `vec4`s.
//!
//! ```text
//! global (binding 0)                 local (binding 1)
//!  0  vec3 camera_position            0  mat4 world
//! 12  u32  light_count               64  mat4 world_view_projection
//! 16  Light[light_count]            128
//!
//! Light (64 bytes, 16 byte aligned)
//!  0  u32  type
//! 16  vec3 color
//! 32  vec3 direction
//! 48  vec3 position
//! 60  f32  intensity
//! ```

use cgmath::{Matrix4, Vector3, Vector4};

use crate::{
    buffer::{BufferBackend, Mapping},
    data_structures::{
        block::Block,
        light::{Light, LightType},
    },
    error::StreamError,
};

pub const SCALAR_SIZE: u64 = 4;
pub const SCALAR_ALIGN: u64 = 4;
/// A `vec3` carries three floats of payload.
pub const VEC3_SIZE: u64 = 12;
/// ...but is aligned like a `vec4`.
pub const VEC3_ALIGN: u64 = 16;
pub const VEC4_SIZE: u64 = 16;
pub const VEC4_ALIGN: u64 = 16;
pub const MAT4_SIZE: u64 = 64;
pub const MAT4_ALIGN: u64 = 16;

/// Every light record starts on this boundary.
pub const LIGHT_RECORD_ALIGN: u64 = 16;
pub const LIGHT_RECORD_SIZE: u64 = 64;
/// Camera position and light count.
pub const GLOBAL_HEADER_SIZE: u64 = 16;
/// Two matrices: world and world-view-projection.
pub const LOCAL_BLOCK_SIZE: u64 = 2 * MAT4_SIZE;

/// Bytes a global block needs to describe `max_lights` lights.
pub fn global_block_capacity(max_lights: usize) -> u64 {
    GLOBAL_HEADER_SIZE + LIGHT_RECORD_SIZE * max_lights as u64
}

impl<'a, B: BufferBackend> Mapping<'a, B> {
    pub fn push_u32(&mut self, value: u32) -> Result<u64, StreamError> {
        self.push_aligned_data(bytemuck::bytes_of(&value), SCALAR_ALIGN)
    }

    pub fn push_f32(&mut self, value: f32) -> Result<u64, StreamError> {
        self.push_aligned_data(bytemuck::bytes_of(&value), SCALAR_ALIGN)
    }

    pub fn push_vec3(&mut self, value: Vector3<f32>) -> Result<u64, StreamError> {
        let raw: [f32; 3] = value.into();
        self.push_aligned_data(bytemuck::bytes_of(&raw), VEC3_ALIGN)
    }

    pub fn push_vec4(&mut self, value: Vector4<f32>) -> Result<u64, StreamError> {
        let raw: [f32; 4] = value.into();
        self.push_aligned_data(bytemuck::bytes_of(&raw), VEC4_ALIGN)
    }

    pub fn push_mat4(&mut self, value: &Matrix4<f32>) -> Result<u64, StreamError> {
        let raw: [[f32; 4]; 4] = (*value).into();
        self.push_aligned_data(bytemuck::bytes_of(&raw), MAT4_ALIGN)
    }

    /// Append one light record in shader field order.
    pub fn push_light(&mut self, light: &Light) -> Result<u64, StreamError> {
        let start = self.align_head(LIGHT_RECORD_ALIGN)?;
        self.push_u32(light.kind as u32)?;
        self.push_vec3(light.color)?;
        self.push_vec3(light.direction)?;
        self.push_vec3(light.position)?;
        self.push_f32(light.intensity)?;
        Ok(start)
    }

    /// Write the global block: camera position, light count, then every light.
    ///
    /// The light count is checked against `max_lights` before anything is
    /// written.
    pub fn write_global_block(
        &mut self,
        camera_position: Vector3<f32>,
        lights: &[Light],
        max_lights: usize,
    ) -> Result<Block, StreamError> {
        if lights.len() > max_lights {
            return Err(StreamError::TooManyLights {
                count: lights.len(),
                max: max_lights,
            });
        }
        let offset = self.align_head(VEC4_ALIGN)?;
        self.push_vec3(camera_position)?;
        self.push_u32(lights.len() as u32)?;
        for light in lights {
            self.push_light(light)?;
        }
        Ok(Block {
            offset,
            size: self.head() - offset,
        })
    }

    /// Write one entity's local block, starting on `block_alignment`.
    pub fn write_local_block(
        &mut self,
        world: &Matrix4<f32>,
        world_view_projection: &Matrix4<f32>,
        block_alignment: u64,
    ) -> Result<Block, StreamError> {
        let offset = self.align_head(block_alignment)?;
        self.push_mat4(world)?;
        self.push_mat4(world_view_projection)?;
        Ok(Block {
            offset,
            size: self.head() - offset,
        })
    }
}

/// The global block read back from raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalParams {
    pub camera_position: Vector3<f32>,
    pub lights: Vec<Light>,
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| bytemuck::pod_read_unaligned::<u32>(b))
}

fn read_f32(bytes: &[u8], at: usize) -> Option<f32> {
    bytes
        .get(at..at + 4)
        .map(|b| bytemuck::pod_read_unaligned::<f32>(b))
}

fn read_vec3(bytes: &[u8], at: usize) -> Option<Vector3<f32>> {
    bytes
        .get(at..at + VEC3_SIZE as usize)
        .map(|b| bytemuck::pod_read_unaligned::<[f32; 3]>(b).into())
}

/// Decode a global block by the documented field order.
///
/// `bytes` must start at the block's offset. Returns `None` when the bytes
/// are too short for the light count they announce or a light type tag is
/// unknown.
pub fn decode_global_block(bytes: &[u8]) -> Option<GlobalParams> {
    let camera_position = read_vec3(bytes, 0)?;
    let count = read_u32(bytes, VEC3_SIZE as usize)?;
    let needed = u64::from(count)
        .checked_mul(LIGHT_RECORD_SIZE)?
        .checked_add(GLOBAL_HEADER_SIZE)?;
    if (bytes.len() as u64) < needed {
        return None;
    }
    let count = count as usize;
    let mut lights = Vec::with_capacity(count);
    for i in 0..count {
        let base = (GLOBAL_HEADER_SIZE + LIGHT_RECORD_SIZE * i as u64) as usize;
        lights.push(Light {
            kind: LightType::try_from(read_u32(bytes, base)?).ok()?,
            color: read_vec3(bytes, base + 16)?,
            direction: read_vec3(bytes, base + 32)?,
            position: read_vec3(bytes, base + 48)?,
            intensity: read_f32(bytes, base + 60)?,
        });
    }
    Some(GlobalParams {
        camera_position,
        lights,
    })
}

/// Decode one local block into `(world, world_view_projection)`.
pub fn decode_local_block(bytes: &[u8]) -> Option<(Matrix4<f32>, Matrix4<f32>)> {
    let mat = |at: usize| {
        bytes
            .get(at..at + MAT4_SIZE as usize)
            .map(|b| Matrix4::from(bytemuck::pod_read_unaligned::<[[f32; 4]; 4]>(b)))
    };
    Some((mat(0)?, mat(MAT4_SIZE as usize)?))
}
