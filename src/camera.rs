//! Camera types producing the view and projection matrices.

use std::time::Duration;

use cgmath::{Deg, Matrix4, Point3, Rad, Vector3};

/// Converts OpenGL clip space (z in -1..1) to wgpu clip space (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Circles the camera around its target at a fixed radius and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub radius: f32,
    pub height: f32,
    /// Radians per second.
    pub speed: f32,
    pub angle: Rad<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Deg<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    pub orbit: Option<Orbit>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
            fovy: Deg(60.0),
            aspect: 1.0,
            znear: 0.1,
            zfar: 1000.0,
            orbit: None,
        }
    }

    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection() * self.view()
    }

    /// Camera position as a vector, the way the global block stores it.
    pub fn eye(&self) -> Vector3<f32> {
        Vector3::new(self.position.x, self.position.y, self.position.z)
    }

    /// Recompute the aspect ratio from the display size and advance the orbit.
    pub fn update(&mut self, display_size: [u32; 2], dt: Duration) {
        if display_size[0] > 0 && display_size[1] > 0 {
            self.aspect = display_size[0] as f32 / display_size[1] as f32;
        }
        if let Some(orbit) = self.orbit.as_mut() {
            orbit.angle += Rad(orbit.speed * dt.as_secs_f32());
            let (sin, cos) = (orbit.angle.0.sin(), orbit.angle.0.cos());
            self.position = Point3::new(
                self.target.x + sin * orbit.radius,
                self.target.y + orbit.height,
                self.target.z + cos * orbit.radius,
            );
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new((0.0, 0.0, -3.0), (0.0, 0.0, 0.0))
    }
}
