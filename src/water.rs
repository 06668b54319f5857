//! Cameras for the water reflection and refraction targets.
//!
//! The water surface is the horizontal plane `y = height`. Reflection renders
//! the scene from the main camera mirrored below that plane; refraction
//! renders it from the main eye. The two views always differ: a mirrored
//! camera is never reused for refraction or the other way round.

use cgmath::Point3;

use crate::{camera::Camera, data_structures::entity::View};

/// The horizontal plane the water surface lies in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterPlane {
    pub height: f32,
}

impl WaterPlane {
    pub fn new(height: f32) -> Self {
        Self { height }
    }

    fn mirror(&self, p: Point3<f32>) -> Point3<f32> {
        Point3::new(p.x, 2.0 * self.height - p.y, p.z)
    }

    /// The main camera mirrored across the plane.
    pub fn reflection_camera(&self, camera: &Camera) -> Camera {
        Camera {
            position: self.mirror(camera.position),
            target: self.mirror(camera.target),
            orbit: None,
            ..camera.clone()
        }
    }

    /// The camera looking through the surface into the water.
    pub fn refraction_camera(&self, camera: &Camera) -> Camera {
        Camera {
            orbit: None,
            ..camera.clone()
        }
    }

    /// The camera whose matrices are written for `view`.
    pub fn camera_for(&self, view: View, camera: &Camera) -> Camera {
        match view {
            View::Main => camera.clone(),
            View::WaterReflection => self.reflection_camera(camera),
            View::WaterRefraction => self.refraction_camera(camera),
        }
    }
}
