//! Scene lights as the global uniform block describes them.

use cgmath::{InnerSpace, Vector3, Zero};

/// Type tag written as the first field of every light record.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Directional = 0,
    Point = 1,
}

impl TryFrom<u32> for LightType {
    type Error = u32;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(LightType::Directional),
            1 => Ok(LightType::Point),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightType,
    pub color: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub position: Vector3<f32>,
    pub intensity: f32,
}

impl Light {
    /// A light shining along `direction` from infinitely far away.
    ///
    /// `position` is kept for editors that show the light somewhere in the scene.
    pub fn directional(
        position: Vector3<f32>,
        color: Vector3<f32>,
        intensity: f32,
        direction: Vector3<f32>,
    ) -> Self {
        let direction = if direction.is_zero() {
            direction
        } else {
            direction.normalize()
        };
        Self {
            kind: LightType::Directional,
            color,
            direction,
            position,
            intensity,
        }
    }

    pub fn point(position: Vector3<f32>, color: Vector3<f32>, intensity: f32) -> Self {
        Self {
            kind: LightType::Point,
            color,
            direction: Vector3::zero(),
            position,
            intensity,
        }
    }
}
