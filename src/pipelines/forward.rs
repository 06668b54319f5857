//! Render pipelines whose shaders read the global and local blocks.

use crate::{
    data_structures::{
        mesh::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::uniforms::UniformLayouts,
};

/// Colour formats of the deferred geometry targets: albedo, normal, position.
pub const GBUFFER_FORMATS: [wgpu::TextureFormat; 3] = [
    wgpu::TextureFormat::Rgba8UnormSrgb,
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Rgba16Float,
];

/// Shader source with the block declarations and `MAX_LIGHTS` prepended.
pub fn shader_source(max_lights: usize, body: &str) -> String {
    format!(
        "const MAX_LIGHTS: u32 = {max_lights}u;\n{}\n{body}",
        include_str!("blocks.wgsl")
    )
}

fn block_pipeline_layout(
    device: &wgpu::Device,
    layouts: &UniformLayouts,
    label: &str,
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        // Indices must match `BindingPoint` and `MATERIAL_GROUP`.
        bind_group_layouts: &[&layouts.global, &layouts.local, &layouts.material],
        immediate_size: 0,
    })
}

/// Lit forward pipeline, also used for the water reflection and refraction
/// targets.
pub fn mk_forward_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &UniformLayouts,
) -> wgpu::RenderPipeline {
    let layout = block_pipeline_layout(device, layouts, "Forward Pipeline Layout");
    let source = shader_source(layouts.max_lights(), include_str!("forward.wgsl"));
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Forward Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        &[Some(wgpu::ColorTargetState {
            format: color_format,
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        })],
        Some(Texture::DEPTH_FORMAT),
        &[ModelVertex::desc()],
        shader,
    )
}

/// Geometry stage of the deferred path, writing the three G-buffer targets.
pub fn mk_deferred_geometry_pipeline(
    device: &wgpu::Device,
    layouts: &UniformLayouts,
) -> wgpu::RenderPipeline {
    let layout = block_pipeline_layout(device, layouts, "Deferred Geometry Pipeline Layout");
    let source = shader_source(layouts.max_lights(), include_str!("deferred.wgsl"));
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Deferred Geometry Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    };
    let targets = GBUFFER_FORMATS.map(|format| {
        Some(wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })
    });
    mk_render_pipeline(
        device,
        &layout,
        &targets,
        Some(Texture::DEPTH_FORMAT),
        &[ModelVertex::desc()],
        shader,
    )
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    targets: &[Option<wgpu::ColorTargetState>],
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
    })
}
