use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use image::GenericImageView;

use crate::data_structures::texture::Texture;

/// Reads a file below the asset root.
pub fn load_binary(root: &Path, file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = root.join(file_name);
    std::fs::read(&path).with_context(|| format!("could not read {}", path.display()))
}

/// Decode image bytes, warning about channel layouts the shaders do not expect.
pub fn decode_image(bytes: &[u8], file_name: &str) -> anyhow::Result<image::DynamicImage> {
    let img = image::load_from_memory(bytes)
        .with_context(|| format!("could not decode {file_name}"))?;
    let channels = img.color().channel_count();
    if channels != 3 && channels != 4 {
        log::warn!(
            "{file_name}: {channels} channel images are not supported, converting to RGBA8"
        );
    }
    Ok(img)
}

/// Textures loaded from disk, each file uploaded once.
///
/// Lookups are by the path as passed in, so `a.png` and `./a.png` load twice.
#[derive(Debug)]
pub struct TextureRegistry {
    root: PathBuf,
    textures: Vec<Texture>,
    by_path: HashMap<String, usize>,
}

impl TextureRegistry {
    /// `root` is prepended to every file name passed to [`Self::load`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            textures: Vec::new(),
            by_path: HashMap::new(),
        }
    }

    /// Index of the texture for `file_name`, loading it on first use.
    ///
    /// A missing or undecodable file is logged and yields `None`; the material
    /// slot stays empty and rendering goes on.
    pub fn load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        file_name: &str,
    ) -> Option<usize> {
        if let Some(index) = self.by_path.get(file_name) {
            return Some(*index);
        }
        let img = match load_binary(&self.root, file_name)
            .and_then(|bytes| decode_image(&bytes, file_name))
        {
            Ok(img) => img,
            Err(e) => {
                log::error!("texture {file_name} not loaded: {e:#}");
                return None;
            }
        };
        let (width, height) = img.dimensions();
        log::debug!("texture {file_name}: {width}x{height}");
        Some(self.insert(file_name, Texture::from_image(device, queue, &img, Some(file_name))))
    }

    /// Register an already uploaded texture under `key`.
    ///
    /// A later [`Self::load`] of the same key returns this texture.
    pub fn insert(&mut self, key: &str, texture: Texture) -> usize {
        let index = self.textures.len();
        self.textures.push(texture);
        self.by_path.insert(key.to_string(), index);
        index
    }

    pub fn get(&self, index: usize) -> Option<&Texture> {
        self.textures.get(index)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
