//! Render pipelines and the wgpu side of block binding.
//!
//! - `uniforms` contains the bind group layouts for the two uniform blocks,
//!   the per-frame bind groups and the wgpu pass encoder
//! - `forward` contains the forward and deferred geometry pipelines

pub mod forward;
pub mod uniforms;
