//! Runtime configuration of the renderer.

/// Settings read by the aggregator and the passes every frame.
///
/// Change them between frames through [`Context::config`](crate::context::Context);
/// the next frame write picks them up.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub clear_colour: wgpu::Color,
    /// Size of the light array the shaders declare.
    pub max_lights: usize,
    /// Streaming buffer size in bytes. `None` uses the device's maximum
    /// uniform binding size.
    pub stream_capacity: Option<u64>,
    /// Also write reflection and refraction blocks for the water passes.
    pub water_enabled: bool,
    pub water_height: f32,
    /// Applied to the main camera on every update.
    pub fovy: cgmath::Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl RenderConfig {
    pub const MAX_LIGHTS: usize = 16;
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
            max_lights: Self::MAX_LIGHTS,
            stream_capacity: None,
            water_enabled: false,
            water_height: 0.0,
            fovy: cgmath::Deg(60.0),
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}
