//! Bind group layouts and render pipelines. Every program is compiled under
//! a validation error scope; one that fails becomes `None` and its pass is
//! skipped instead of aborting the frame.

use std::num::NonZeroU64;

use log::error;

use super::shaders;
use super::targets::{COLOR_FORMAT, DEPTH_FORMAT, NORMAL_FORMAT, VELOCITY_FORMAT};
use super::uniforms::{
    AnalyticUniforms, FrameUniforms, ObjectUniforms, PortalUniforms, PortalVertex, PostUniforms,
};
use crate::shapes::Vertex;

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    size: usize,
    dynamic: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

fn texture_entry(binding: u32, sample_type: wgpu::TextureSampleType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, ty: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

const FILTERABLE: wgpu::TextureSampleType = wgpu::TextureSampleType::Float { filterable: true };

/// Layouts shared between pipeline creation and bind group creation.
pub struct Layouts {
    /// Frame uniforms, shadow map and comparison sampler.
    pub frame: wgpu::BindGroupLayout,
    /// Frame uniforms only; the shadow pass cannot sample the map it writes.
    pub shadow_frame: wgpu::BindGroupLayout,
    /// Per-object uniforms addressed by dynamic offset.
    pub object: wgpu::BindGroupLayout,
    /// Post uniforms plus every G-buffer attachment.
    pub post: wgpu::BindGroupLayout,
    pub analytic: wgpu::BindGroupLayout,
    pub portal: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_fragment = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let frame_size = std::mem::size_of::<FrameUniforms>();
        Self {
            frame: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("frame-layout"),
                entries: &[
                    uniform_entry(0, vertex_fragment, frame_size, false),
                    texture_entry(1, wgpu::TextureSampleType::Depth),
                    sampler_entry(2, wgpu::SamplerBindingType::Comparison),
                ],
            }),
            shadow_frame: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("shadow-frame-layout"),
                entries: &[uniform_entry(0, vertex_fragment, frame_size, false)],
            }),
            object: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("object-layout"),
                entries: &[uniform_entry(
                    0,
                    vertex_fragment,
                    std::mem::size_of::<ObjectUniforms>(),
                    true,
                )],
            }),
            post: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("post-layout"),
                entries: &[
                    uniform_entry(
                        0,
                        wgpu::ShaderStages::FRAGMENT,
                        std::mem::size_of::<PostUniforms>(),
                        false,
                    ),
                    texture_entry(1, FILTERABLE),
                    texture_entry(2, wgpu::TextureSampleType::Depth),
                    texture_entry(3, FILTERABLE),
                    texture_entry(4, FILTERABLE),
                    sampler_entry(5, wgpu::SamplerBindingType::Filtering),
                ],
            }),
            analytic: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("analytic-layout"),
                entries: &[uniform_entry(
                    0,
                    wgpu::ShaderStages::FRAGMENT,
                    std::mem::size_of::<AnalyticUniforms>(),
                    false,
                )],
            }),
            portal: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("portal-layout"),
                entries: &[
                    uniform_entry(
                        0,
                        vertex_fragment,
                        std::mem::size_of::<PortalUniforms>(),
                        false,
                    ),
                    texture_entry(1, FILTERABLE),
                    sampler_entry(2, wgpu::SamplerBindingType::Filtering),
                ],
            }),
        }
    }
}

/// Every compiled program. A `None` entry failed to build.
pub struct Pipelines {
    pub geometry_culled: Option<wgpu::RenderPipeline>,
    pub geometry_double_sided: Option<wgpu::RenderPipeline>,
    pub shadow: Option<wgpu::RenderPipeline>,
    pub depth_debug: Option<wgpu::RenderPipeline>,
    pub motion_blur: Option<wgpu::RenderPipeline>,
    pub depth_of_field: Option<wgpu::RenderPipeline>,
    pub toon: Option<wgpu::RenderPipeline>,
    pub directional_blur: Option<wgpu::RenderPipeline>,
    pub forest: Option<wgpu::RenderPipeline>,
    pub water: Option<wgpu::RenderPipeline>,
    pub portal: Option<wgpu::RenderPipeline>,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        texture_layout: &wgpu::BindGroupLayout,
        output_format: wgpu::TextureFormat,
    ) -> Self {
        let geometry_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("geometry-pipeline-layout"),
            bind_group_layouts: &[&layouts.frame, &layouts.object, texture_layout],
            push_constant_ranges: &[],
        });
        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow-pipeline-layout"),
            bind_group_layouts: &[&layouts.shadow_frame, &layouts.object],
            push_constant_ranges: &[],
        });
        let post_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post-pipeline-layout"),
            bind_group_layouts: &[&layouts.post, texture_layout],
            push_constant_ranges: &[],
        });
        let analytic_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("analytic-pipeline-layout"),
            bind_group_layouts: &[&layouts.analytic],
            push_constant_ranges: &[],
        });
        let portal_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("portal-pipeline-layout"),
            bind_group_layouts: &[&layouts.portal],
            push_constant_ranges: &[],
        });

        let geometry = |label: &str, cull_mode| {
            compile(device, label, &shaders::scene_source(shaders::GEOMETRY), |module| {
                geometry_pipeline(device, label, &geometry_layout, module, cull_mode)
            })
        };
        let post = |label: &str, body: &str| {
            compile(device, label, &shaders::post_source(body), |module| {
                fullscreen_pipeline(device, label, &post_layout, module, output_format)
            })
        };
        let analytic = |label: &str, body: &str| {
            compile(device, label, &shaders::analytic_source(body), |module| {
                fullscreen_pipeline(device, label, &analytic_layout, module, output_format)
            })
        };

        Self {
            geometry_culled: geometry("geometry-culled", Some(wgpu::Face::Back)),
            geometry_double_sided: geometry("geometry-double-sided", None),
            shadow: compile(
                device,
                "shadow",
                &shaders::scene_source(shaders::SHADOW),
                |module| shadow_pipeline(device, &shadow_layout, module),
            ),
            depth_debug: post("depth-debug", shaders::DEPTH_DEBUG),
            motion_blur: post("motion-blur", shaders::MOTION_BLUR),
            depth_of_field: post("depth-of-field", shaders::DEPTH_OF_FIELD),
            toon: post("toon", shaders::TOON),
            directional_blur: post("directional-blur", shaders::DIRECTIONAL_BLUR),
            forest: analytic("forest", shaders::FOREST),
            water: analytic("water", shaders::WATER),
            portal: compile(device, "portal", shaders::PORTAL, |module| {
                portal_pipeline(device, &portal_layout, module, output_format)
            }),
        }
    }
}

/// Builds a shader module and pipeline, turning validation errors into a
/// logged `None`.
fn compile(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    build: impl FnOnce(&wgpu::ShaderModule) -> wgpu::RenderPipeline,
) -> Option<wgpu::RenderPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let pipeline = build(&module);
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => {
            error!("failed to build {label} program: {err}");
            None
        }
        None => Some(pipeline),
    }
}

fn vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 2] {
    const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
    const TINT_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
        wgpu::vertex_attr_array![3 => Float32x4];
    [
        wgpu::VertexBufferLayout {
            array_stride: Vertex::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        },
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 4]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &TINT_ATTRIBUTES,
        },
    ]
}

fn depth_state(bias: wgpu::DepthBiasState) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: Default::default(),
        bias,
    }
}

fn geometry_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    cull_mode: Option<wgpu::Face>,
) -> wgpu::RenderPipeline {
    let buffers = vertex_layouts();
    let target = |format| {
        Some(wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &buffers,
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(depth_state(Default::default())),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[
                target(COLOR_FORMAT),
                target(VELOCITY_FORMAT),
                target(NORMAL_FORMAT),
            ],
        }),
        multiview: None,
        cache: None,
    })
}

fn shadow_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    let buffers = vertex_layouts();
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("shadow"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_shadow"),
            compilation_options: Default::default(),
            buffers: &buffers[..1],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(depth_state(wgpu::DepthBiasState {
            constant: 2,
            slope_scale: 2.0,
            clamp: 0.0,
        })),
        multisample: wgpu::MultisampleState::default(),
        fragment: None,
        multiview: None,
        cache: None,
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_fullscreen"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

fn portal_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("portal"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_portal"),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<PortalVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &ATTRIBUTES,
            }],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_portal"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}
