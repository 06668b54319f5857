use std::time::Duration;

use anyhow::Context as _;
use wgpu::util::DeviceExt;

use crate::{
    buffer::{BufferKind, StreamingBuffer, layout},
    camera::Camera,
    config::RenderConfig,
    data_structures::{
        entity::{Entity, View},
        light::Light,
        mesh::{Material, MaterialUniform, Mesh},
        texture::Texture,
    },
    error::BindError,
    frame::{self, FrameAggregator, FrameBlocks, FrameScene},
    pass::{Pass, bind_and_draw},
    pipelines::{
        forward::{GBUFFER_FORMATS, mk_deferred_geometry_pipeline, mk_forward_pipeline},
        uniforms::{FrameBindings, UniformLayouts, WgpuPassEncoder},
    },
    resources::TextureRegistry,
    water::WaterPlane,
};

/// Everything one renderer instance owns.
///
/// There is no global state: the GPU handles, both streaming buffers and the
/// scene tables live here and are passed explicitly. Call [`Context::update`]
/// once per frame before any pass is recorded.
#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: RenderConfig,
    pub camera: Camera,
    /// Entities in draw order. Transform fields may be edited between frames.
    pub entities: Vec<Entity>,
    pub lights: Vec<Light>,
    pub textures: TextureRegistry,
    color_format: wgpu::TextureFormat,
    display_size: [u32; 2],
    light_buffer: StreamingBuffer,
    uniform_buffer: StreamingBuffer,
    aggregator: FrameAggregator,
    layouts: UniformLayouts,
    forward_pipeline: wgpu::RenderPipeline,
    deferred_pipeline: wgpu::RenderPipeline,
    depth_texture: Texture,
    gbuffer: [Texture; 3],
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    material_groups: Vec<wgpu::BindGroup>,
    white: Texture,
    fallback_material: wgpu::BindGroup,
    frame: Option<FrameBlocks>,
    bindings: Option<FrameBindings>,
}

impl Context {
    /// Set up a context on the default adapter without a surface.
    ///
    /// Rendering goes to textures supplied by the caller, in
    /// `Rgba8UnormSrgb`.
    pub fn new_headless(config: RenderConfig, display_size: [u32; 2]) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = futures::executor::block_on(instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            },
        ))
        .context("failed to find a suitable GPU adapter")?;
        log::info!("adapter: {:?}", adapter.get_info());

        let (device, queue) = futures::executor::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("uniflow device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            },
        ))
        .context("failed to create wgpu device/queue")?;

        Self::new(
            device,
            queue,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            display_size,
            config,
        )
    }

    /// Build the renderer state on an existing device.
    ///
    /// `config.max_lights` is baked into the shaders here; later changes to
    /// it have no effect.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        display_size: [u32; 2],
        config: RenderConfig,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            config.max_lights > 0,
            "the light array needs room for at least one light"
        );
        let limits = device.limits();
        let block_alignment = u64::from(limits.min_uniform_buffer_offset_alignment);
        let aggregator = FrameAggregator::new(block_alignment, config.max_lights)
            .context("device reports an unusable uniform offset alignment")?;
        let uniform_capacity = config
            .stream_capacity
            .unwrap_or(u64::from(limits.max_uniform_buffer_binding_size));
        log::info!(
            "uniform offset alignment {block_alignment}, streaming capacity {uniform_capacity} \
             bytes, {} lights",
            config.max_lights
        );

        let light_buffer = StreamingBuffer::create(
            &device,
            &queue,
            layout::global_block_capacity(config.max_lights),
            BufferKind::Uniform,
            "global block buffer",
        )?;
        let uniform_buffer = StreamingBuffer::create(
            &device,
            &queue,
            uniform_capacity,
            BufferKind::Uniform,
            "local block buffer",
        )?;

        let layouts = UniformLayouts::new(&device, config.max_lights);
        let forward_pipeline = mk_forward_pipeline(&device, color_format, &layouts);
        let deferred_pipeline = mk_deferred_geometry_pipeline(&device, &layouts);

        let white = Texture::create_solid(&device, &queue, [255, 255, 255, 255], "white");
        let fallback_params = material_params(&device, &Material::new("default"));
        let fallback_material = layouts.material_bind_group(&device, &white, &fallback_params);
        let depth_texture = Texture::create_depth_texture(&device, display_size, "depth_texture");
        let gbuffer = create_gbuffer(&device, display_size);

        let mut camera = Camera::default();
        camera.update(display_size, Duration::ZERO);

        Ok(Self {
            device,
            queue,
            config,
            camera,
            entities: Vec::new(),
            lights: Vec::new(),
            textures: TextureRegistry::new("assets"),
            color_format,
            display_size,
            light_buffer,
            uniform_buffer,
            aggregator,
            layouts,
            forward_pipeline,
            deferred_pipeline,
            depth_texture,
            gbuffer,
            meshes: Vec::new(),
            materials: Vec::new(),
            material_groups: Vec::new(),
            white,
            fallback_material,
            frame: None,
            bindings: None,
        })
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    pub fn display_size(&self) -> [u32; 2] {
        self.display_size
    }

    /// Recreate the size dependent targets.
    pub fn resize(&mut self, display_size: [u32; 2]) {
        if display_size == self.display_size {
            return;
        }
        self.display_size = display_size;
        self.depth_texture =
            Texture::create_depth_texture(&self.device, display_size, "depth_texture");
        self.gbuffer = create_gbuffer(&self.device, display_size);
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// Register a material. Its albedo texture, if loaded, is bound for every
    /// submesh using it; otherwise the white fallback is. Albedo tint,
    /// emissive and smoothness go into a small uniform next to the texture.
    pub fn add_material(&mut self, material: Material) -> usize {
        let params = material_params(&self.device, &material);
        let albedo = match material.albedo_texture.and_then(|i| self.textures.get(i)) {
            Some(texture) => texture,
            None => {
                if material.albedo_texture.is_some() {
                    log::warn!("{}: albedo texture is not loaded", material.name);
                }
                &self.white
            }
        };
        let group = self
            .layouts
            .material_bind_group(&self.device, albedo, &params);
        self.materials.push(material);
        self.material_groups.push(group);
        self.materials.len() - 1
    }

    pub fn add_entity(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        let views = if self.config.water_enabled { View::COUNT } else { 1 };
        let needed = frame::local_bytes(
            self.entities.len(),
            views,
            self.aggregator.block_alignment(),
        );
        if needed > self.uniform_buffer.capacity() {
            log::warn!(
                "{} entities need {needed} bytes of local blocks, the buffer holds {}",
                self.entities.len(),
                self.uniform_buffer.capacity()
            );
        }
        self.entities.len() - 1
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn light_buffer(&self) -> &StreamingBuffer {
        &self.light_buffer
    }

    pub fn uniform_buffer(&self) -> &StreamingBuffer {
        &self.uniform_buffer
    }

    pub fn aggregator(&self) -> &FrameAggregator {
        &self.aggregator
    }

    /// Blocks recorded by the last successful [`Self::update`].
    pub fn frame(&self) -> Option<&FrameBlocks> {
        self.frame.as_ref()
    }

    /// The G-buffer written by [`Pass::DeferredGeometry`]: albedo, normal, position.
    pub fn gbuffer(&self) -> &[Texture; 3] {
        &self.gbuffer
    }

    /// Advance the camera, then serialise this frame's blocks and rebuild the
    /// bind groups over them.
    ///
    /// On failure no pass can be drawn until the next successful update.
    pub fn update(&mut self, dt: Duration) -> anyhow::Result<&FrameBlocks> {
        self.frame = None;
        self.bindings = None;

        self.camera.fovy = self.config.fovy;
        self.camera.znear = self.config.znear;
        self.camera.zfar = self.config.zfar;
        self.camera.update(self.display_size, dt);

        let scene = FrameScene {
            camera: &self.camera,
            lights: &self.lights,
            water: self
                .config
                .water_enabled
                .then(|| WaterPlane::new(self.config.water_height)),
        };
        let blocks = self
            .aggregator
            .write_frame(
                &mut self.light_buffer,
                &mut self.uniform_buffer,
                &mut self.entities,
                &scene,
            )
            .context("frame blocks could not be written")?;
        let bindings = FrameBindings::new(
            &self.device,
            &self.layouts,
            &self.light_buffer,
            &self.uniform_buffer,
            &blocks,
            self.aggregator.block_alignment(),
        )?;
        self.bindings = Some(bindings);
        let frame: &FrameBlocks = self.frame.insert(blocks);
        Ok(frame)
    }

    /// Bind this frame's blocks into `render_pass` and draw the entities
    /// `pass` includes. The pipeline must already be set.
    pub fn draw_pass(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        pass: Pass,
    ) -> Result<usize, BindError> {
        let (Some(frame), Some(bindings)) = (&self.frame, &self.bindings) else {
            return Err(BindError::ViewNotWritten(pass.view()));
        };
        let mut encoder = WgpuPassEncoder {
            render_pass,
            bindings,
            meshes: &self.meshes,
            materials: Some((&self.material_groups, &self.fallback_material)),
        };
        bind_and_draw(&mut encoder, pass, frame, &self.entities)
    }

    /// Record and submit `pass` with the forward pipeline into `target`,
    /// clearing colour and depth first.
    ///
    /// Used for the forward, skybox and both water passes. Returns the number
    /// of entities drawn.
    pub fn render(&self, pass: Pass, target: &wgpu::TextureView) -> anyhow::Result<usize> {
        self.record(
            pass,
            target,
            wgpu::LoadOp::Clear(self.config.clear_colour),
            wgpu::LoadOp::Clear(1.0),
        )
    }

    /// Like [`Context::render`], but draws over what `target` and the depth
    /// buffer already hold, so a skybox can follow the forward pass.
    pub fn render_into(&self, pass: Pass, target: &wgpu::TextureView) -> anyhow::Result<usize> {
        self.record(pass, target, wgpu::LoadOp::Load, wgpu::LoadOp::Load)
    }

    fn record(
        &self,
        pass: Pass,
        target: &wgpu::TextureView,
        color_load: wgpu::LoadOp<wgpu::Color>,
        depth_load: wgpu::LoadOp<f32>,
    ) -> anyhow::Result<usize> {
        anyhow::ensure!(
            pass != Pass::DeferredGeometry,
            "the deferred geometry pass writes the G-buffer, use render_gbuffer"
        );
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        let drawn = {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(self.depth_attachment(depth_load)),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            render_pass.set_pipeline(&self.forward_pipeline);
            self.draw_pass(&mut render_pass, pass)?
        };
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(drawn)
    }

    /// Record and submit the deferred geometry pass into the G-buffer.
    pub fn render_gbuffer(&self) -> anyhow::Result<usize> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Deferred Geometry Encoder"),
            });
        let attachments = self.gbuffer.each_ref().map(|target| {
            Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })
        });
        let drawn = {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Deferred Geometry Pass"),
                color_attachments: &attachments,
                depth_stencil_attachment: Some(self.depth_attachment(wgpu::LoadOp::Clear(1.0))),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            render_pass.set_pipeline(&self.deferred_pipeline);
            self.draw_pass(&mut render_pass, Pass::DeferredGeometry)?
        };
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(drawn)
    }

    fn depth_attachment(
        &self,
        load: wgpu::LoadOp<f32>,
    ) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.depth_texture.view,
            depth_ops: Some(wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }
    }
}

fn create_gbuffer(device: &wgpu::Device, size: [u32; 2]) -> [Texture; 3] {
    let labels = ["gbuffer albedo", "gbuffer normal", "gbuffer position"];
    std::array::from_fn(|i| {
        Texture::create_render_target(device, size, GBUFFER_FORMATS[i], labels[i])
    })
}

fn material_params(device: &wgpu::Device, material: &Material) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} material params", material.name)),
        contents: bytemuck::cast_slice(&[MaterialUniform::from(material)]),
        usage: wgpu::BufferUsages::UNIFORM,
    })
}
