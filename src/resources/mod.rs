//! Loading of external assets the renderer samples from.

pub mod texture;

pub use texture::TextureRegistry;
