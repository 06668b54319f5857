//! Scene entities and the per-view blocks recorded for them.

use cgmath::SquareMatrix;

use crate::data_structures::{block::Block, transform::Transform};

/// The camera a set of local blocks was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// The main camera.
    Main,
    /// The main camera mirrored across the water plane.
    WaterReflection,
    /// The main eye looking through the water surface.
    WaterRefraction,
}

impl View {
    pub const COUNT: usize = 3;
    pub const ALL: [View; View::COUNT] = [View::Main, View::WaterReflection, View::WaterRefraction];

    fn index(self) -> usize {
        match self {
            View::Main => 0,
            View::WaterReflection => 1,
            View::WaterRefraction => 2,
        }
    }
}

/// What role an entity plays in the passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityKind {
    #[default]
    Opaque,
    /// The water plane itself; it is not drawn into its own reflection or refraction.
    WaterSurface,
}

/// An object in the scene: a transform plus indices into the shared mesh and
/// material tables.
///
/// `materials[i]` is the material of submesh `i`.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub transform: Transform,
    pub mesh: usize,
    pub materials: Vec<usize>,
    pub kind: EntityKind,
    world: cgmath::Matrix4<f32>,
    blocks: [Option<Block>; View::COUNT],
}

impl Entity {
    pub fn new(name: &str, mesh: usize, materials: Vec<usize>, transform: Transform) -> Self {
        let world = transform.to_matrix();
        Self {
            name: name.to_string(),
            transform,
            mesh,
            materials,
            kind: EntityKind::Opaque,
            world,
            blocks: [None; View::COUNT],
        }
    }

    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = kind;
        self
    }

    /// World matrix as of the last frame write.
    pub fn world(&self) -> cgmath::Matrix4<f32> {
        self.world
    }

    /// Local block written for `view` during the last frame.
    pub fn local_block(&self, view: View) -> Option<Block> {
        self.blocks[view.index()]
    }

    /// Recompute the world matrix from the transform fields.
    pub(crate) fn refresh_world(&mut self) -> cgmath::Matrix4<f32> {
        self.world = self.transform.to_matrix();
        self.world
    }

    pub(crate) fn record_block(&mut self, view: View, block: Block) {
        self.blocks[view.index()] = Some(block);
    }

    /// Forget every block from the previous frame.
    pub(crate) fn clear_blocks(&mut self) {
        self.blocks = [None; View::COUNT];
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::new(),
            mesh: 0,
            materials: Vec::new(),
            kind: EntityKind::Opaque,
            world: cgmath::Matrix4::identity(),
            blocks: [None; View::COUNT],
        }
    }
}
