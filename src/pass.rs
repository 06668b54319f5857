//! Binding recorded blocks for the draw calls of a pass.
//!
//! Every pass follows the same protocol: bind the global block once at
//! [`BindingPoint::Global`], then for each entity it draws, bind that
//! entity's local block at [`BindingPoint::Local`] and issue the draw. The
//! local binding point is shared by all entities, so it is rebound before
//! every draw. Several passes may consume the blocks of one frame write.

use crate::{
    data_structures::{
        block::Block,
        entity::{Entity, EntityKind, View},
    },
    error::BindError,
    frame::FrameBlocks,
};

/// Fixed slots the shaders read the two uniform blocks from.
///
/// In wgpu terms these are bind group indices; every pipeline layout built by
/// this crate puts the blocks at these indices.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingPoint {
    /// Camera position and lights.
    Global = 0,
    /// The current entity's matrices.
    Local = 1,
}

impl BindingPoint {
    pub const fn index(self) -> u32 {
        self as u32
    }
}

/// Bind group index of the material textures, after the two uniform blocks.
pub const MATERIAL_GROUP: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    Forward,
    DeferredGeometry,
    Skybox,
    WaterReflection,
    WaterRefraction,
}

impl Pass {
    pub const ALL: [Pass; 5] = [
        Pass::Forward,
        Pass::DeferredGeometry,
        Pass::Skybox,
        Pass::WaterReflection,
        Pass::WaterRefraction,
    ];

    /// The view whose local blocks this pass binds.
    pub fn view(self) -> View {
        match self {
            Pass::Forward | Pass::DeferredGeometry | Pass::Skybox => View::Main,
            Pass::WaterReflection => View::WaterReflection,
            Pass::WaterRefraction => View::WaterRefraction,
        }
    }

    /// Whether `entity` is drawn in this pass.
    pub fn draws(self, entity: &Entity) -> bool {
        match self {
            Pass::Forward => true,
            Pass::Skybox => false,
            Pass::DeferredGeometry | Pass::WaterReflection | Pass::WaterRefraction => {
                entity.kind != EntityKind::WaterSurface
            }
        }
    }
}

/// The draw-time side of a pass: binds block ranges and issues draws.
pub trait PassEncoder {
    fn bind_block(&mut self, point: BindingPoint, block: Block) -> Result<(), BindError>;

    /// Draw every submesh of `entity`. Its local block is already bound.
    fn draw_entity(&mut self, entity: &Entity) -> Result<(), BindError>;
}

/// Bind the frame's blocks and draw every entity `pass` includes.
///
/// Returns the number of entities drawn.
pub fn bind_and_draw<E: PassEncoder>(
    encoder: &mut E,
    pass: Pass,
    frame: &FrameBlocks,
    entities: &[Entity],
) -> Result<usize, BindError> {
    let view = pass.view();
    if !frame.has_view(view) {
        return Err(BindError::ViewNotWritten(view));
    }
    encoder.bind_block(BindingPoint::Global, frame.global)?;

    let mut drawn = 0;
    for (index, entity) in entities.iter().enumerate() {
        if !pass.draws(entity) {
            continue;
        }
        let block = entity
            .local_block(view)
            .ok_or(BindError::MissingBlock { entity: index })?;
        encoder.bind_block(BindingPoint::Local, block)?;
        encoder.draw_entity(entity)?;
        drawn += 1;
    }
    log::trace!("{pass:?}: drew {drawn} entities");
    Ok(drawn)
}
