#![allow(dead_code)]

use uniflow_ngin::{
    buffer::{HostBackend, StreamingBuffer},
    camera::Camera,
    cgmath::Vector3,
    data_structures::{
        block::Block,
        entity::{Entity, EntityKind},
        light::Light,
        transform::Transform,
    },
    error::BindError,
    pass::{BindingPoint, PassEncoder},
};

pub fn host_buffer(capacity: usize) -> StreamingBuffer<HostBackend> {
    StreamingBuffer::with_backend("test buffer", capacity, HostBackend::new())
}

pub fn entity_at(name: &str, x: f32, y: f32, z: f32) -> Entity {
    Entity::new(name, 0, vec![0], Transform::from(Vector3::new(x, y, z)))
}

pub fn water_surface() -> Entity {
    entity_at("water", 0.0, 0.0, 0.0).with_kind(EntityKind::WaterSurface)
}

pub fn camera() -> Camera {
    let mut camera = Camera::new((0.0, 5.0, 10.0), (0.0, 0.0, 0.0));
    camera.aspect = 16.0 / 9.0;
    camera
}

pub fn sun() -> Light {
    Light::directional(
        Vector3::new(0.0, 50.0, 0.0),
        Vector3::new(1.0, 0.9, 0.8),
        2.0,
        Vector3::new(0.0, -1.0, 0.0),
    )
}

pub fn lamp(x: f32) -> Light {
    Light::point(Vector3::new(x, 2.0, 0.0), Vector3::new(0.2, 0.4, 1.0), 0.5)
}

/// What a pass asked the encoder to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Bind(BindingPoint, Block),
    Draw(String),
}

/// A [`PassEncoder`] that records instead of talking to a GPU.
#[derive(Debug, Default)]
pub struct RecordingEncoder {
    pub commands: Vec<Command>,
}

impl RecordingEncoder {
    pub fn binds(&self, point: BindingPoint) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Bind(p, _) if *p == point))
            .count()
    }

    pub fn draws(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Draw(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl PassEncoder for RecordingEncoder {
    fn bind_block(&mut self, point: BindingPoint, block: Block) -> Result<(), BindError> {
        self.commands.push(Command::Bind(point, block));
        Ok(())
    }

    fn draw_entity(&mut self, entity: &Entity) -> Result<(), BindError> {
        self.commands.push(Command::Draw(entity.name.clone()));
        Ok(())
    }
}
