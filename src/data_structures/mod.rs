//! Engine data structures: entities, lights, meshes, textures and blocks.
//!
//! - `block` is an offset and size inside a streaming buffer
//! - `entity` holds an object's transform, mesh/material indices and its recorded blocks
//! - `light` contains the light records serialised into the global block
//! - `mesh` contains GPU vertex/index buffers, submeshes and materials
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `transform` holds position, rotation and scale

pub mod block;
pub mod entity;
pub mod light;
pub mod mesh;
pub mod texture;
pub mod transform;
