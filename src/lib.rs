//! uniflow-ngin
//!
//! The per-frame data path of a small real-time 3D renderer. Camera, lights
//! and entity transforms are serialised every frame into two streaming
//! uniform buffers with explicit std140 layout, and each render pass binds
//! sub-ranges of them before its draws.
//!
//! High-level modules
//! - `buffer`: the streaming buffer, its scoped mapping and the block layout
//! - `frame`: writes the global and per-entity blocks for one frame
//! - `pass`: passes, binding points and the bind-then-draw sequence
//! - `pipelines`: wgpu bind groups and render pipelines over the blocks
//! - `context`: owns the device, buffers and scene tables
//! - `data_structures`: entities, lights, meshes, materials, textures
//! - `camera` and `water`: the matrices each view is written with
//! - `resources`: texture loading
//!

pub mod buffer;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod frame;
pub mod logging;
pub mod pass;
pub mod pipelines;
pub mod resources;
pub mod water;

// Re-exported so downstream code builds transforms with the same math types.
pub use cgmath;
