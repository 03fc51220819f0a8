use anyhow::Result;
use bytemuck::{bytes_of, Zeroable};
use glam::{Mat4, UVec2};
use log::debug;
use wgpu::util::DeviceExt;

use super::capture::{self, CapturedImage};
use super::gpu::GpuContext;
use super::pipelines::{Layouts, Pipelines};
use super::targets::{FrameTargets, Target};
use super::texture::TextureCache;
use super::uniforms::{
    mat4, AnalyticUniforms, FrameUniforms, ObjectUniforms, PortalUniforms, PortalVertex,
    PostUniforms, MAX_LIGHTS,
};
use super::{
    light_space_matrix, shadow_caster, AnalyticScene, PostEffect, RenderMode, FOG_COLOR,
    MOTION_BLUR_MAX_PIXELS, MOTION_BLUR_SAMPLES,
};
use crate::camera::Camera;
use crate::engine::Frame;

const PORTAL_OPACITY: f32 = 1.0;

const WHITE: wgpu::Color = wgpu::Color::WHITE;
const TRANSPARENT: wgpu::Color = wgpu::Color::TRANSPARENT;

/// Rounds a uniform block size up to the device's dynamic offset alignment.
pub fn aligned_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

/// Vertex and tint buffers of the batch last uploaded.
struct GeometryBuffers {
    vertices: wgpu::Buffer,
    tints: wgpu::Buffer,
}

/// Per-object uniform storage addressed by dynamic offsets.
struct ObjectBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: usize,
    stride: u64,
}

impl ObjectBuffer {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: usize) -> Self {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let size = std::mem::size_of::<ObjectUniforms>() as u64;
        let stride = aligned_stride(size, alignment);
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("object-uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object-bind-group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(size),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            capacity,
            stride,
        }
    }

    fn offset(&self, index: usize) -> u32 {
        (self.stride * index as u64) as u32
    }
}

/// Bind groups that reference viewport-sized attachments.
struct SizedBindGroups {
    post_gbuffer: wgpu::BindGroup,
    post_scratch: wgpu::BindGroup,
    portal: wgpu::BindGroup,
}

impl SizedBindGroups {
    fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        targets: &FrameTargets,
        post_buffer: &wgpu::Buffer,
        portal_buffer: &wgpu::Buffer,
        sampler: &wgpu::Sampler,
    ) -> Self {
        let post = |label: &str, color: &wgpu::TextureView| {
            let gbuffer = &targets.gbuffer;
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layouts.post,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: post_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(color),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.depth.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.velocity.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.normal.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        };
        Self {
            post_gbuffer: post("post-gbuffer", &targets.gbuffer.color.view),
            post_scratch: post("post-scratch", &targets.scratch.view),
            portal: device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("portal-bind-group"),
                layout: &layouts.portal,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: portal_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&targets.portal.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            }),
        }
    }
}

/// A uniform buffer with its single-entry bind group.
struct UniformBlock {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformBlock {
    fn new<T: Zeroable + bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes_of(&T::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }
}

/// Records every pass of a frame into an output view of a fixed format.
pub struct Renderer {
    output_format: wgpu::TextureFormat,
    layouts: Layouts,
    pipelines: Pipelines,
    textures: TextureCache,
    targets: FrameTargets,
    linear_sampler: wgpu::Sampler,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    shadow_bind_group: wgpu::BindGroup,
    objects: ObjectBuffer,
    geometry: Option<GeometryBuffers>,
    uploaded_revision: u64,
    post_buffer: wgpu::Buffer,
    analytic: UniformBlock,
    portal_analytic: UniformBlock,
    portal_buffer: wgpu::Buffer,
    portal_vertices: wgpu::Buffer,
    sized: SizedBindGroups,
}

impl Renderer {
    pub fn new(gpu: &GpuContext, output_format: wgpu::TextureFormat) -> Self {
        let device = &gpu.device;
        let layouts = Layouts::new(device);
        let textures = TextureCache::new(device, &gpu.queue);
        let pipelines = Pipelines::new(device, &layouts, textures.layout(), output_format);
        let targets = FrameTargets::new(device, UVec2::ONE, output_format);

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear-clamp"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let shadow_sampler = shadow_sampler(gpu);

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame-uniforms"),
            contents: bytes_of(&FrameUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: &layouts.frame,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.shadow.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow-frame-bind-group"),
            layout: &layouts.shadow_frame,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let post_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("post-uniforms"),
            contents: bytes_of(&PostUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let portal_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("portal-uniforms"),
            contents: bytes_of(&PortalUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let portal_vertices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("portal-vertices"),
            size: (std::mem::size_of::<PortalVertex>() * 6) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sized = SizedBindGroups::new(
            device,
            &layouts,
            &targets,
            &post_buffer,
            &portal_buffer,
            &linear_sampler,
        );

        Self {
            output_format,
            objects: ObjectBuffer::new(device, &layouts.object, 16),
            analytic: UniformBlock::new::<AnalyticUniforms>(
                device,
                "analytic-uniforms",
                &layouts.analytic,
            ),
            portal_analytic: UniformBlock::new::<AnalyticUniforms>(
                device,
                "portal-analytic-uniforms",
                &layouts.analytic,
            ),
            layouts,
            pipelines,
            textures,
            targets,
            linear_sampler,
            frame_buffer,
            frame_bind_group,
            shadow_bind_group,
            geometry: None,
            uploaded_revision: 0,
            post_buffer,
            portal_buffer,
            portal_vertices,
            sized,
        }
    }

    pub fn output_format(&self) -> wgpu::TextureFormat {
        self.output_format
    }

    /// Records and submits one frame into `output`, sized `frame.viewport`.
    pub fn render(&mut self, gpu: &GpuContext, frame: &Frame<'_>, output: &wgpu::TextureView) {
        let device = &gpu.device;
        if self.targets.ensure_size(device, frame.viewport) {
            self.sized = SizedBindGroups::new(
                device,
                &self.layouts,
                &self.targets,
                &self.post_buffer,
                &self.portal_buffer,
                &self.linear_sampler,
            );
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });
        match frame.mode {
            RenderMode::FullscreenProcedural(scene) => {
                self.prepare_fullscreen(gpu, frame);
                self.encode_fullscreen(&mut encoder, frame, scene, output);
            }
            RenderMode::PlanetGeometryScene | RenderMode::GeometryScene => {
                let textured = self.prepare_geometry(gpu, frame);
                self.encode_geometry(&mut encoder, frame, &textured, output);
            }
        }
        gpu.queue.submit(Some(encoder.finish()));
    }

    /// Renders the frame off-screen at `size` and reads it back as RGBA8.
    pub fn capture(
        &mut self,
        gpu: &GpuContext,
        frame: &Frame<'_>,
        size: UVec2,
    ) -> Result<CapturedImage> {
        let size = size.max(UVec2::ONE);
        let target = Target::new(
            &gpu.device,
            "capture",
            size,
            self.output_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        let frame = Frame {
            viewport: size,
            ..*frame
        };
        self.render(gpu, &frame, &target.view);
        capture::read_texture(&gpu.device, &gpu.queue, target.texture(), size)
    }

    fn write_post_uniforms(&self, queue: &wgpu::Queue, frame: &Frame<'_>, has_sky: bool) {
        let size = frame.viewport.max(UVec2::ONE).as_vec2();
        let dof = &frame.settings.depth_of_field;
        let uniforms = PostUniforms {
            inverse_view_projection: mat4((frame.projection * frame.view).inverse()),
            texel: [1.0 / size.x, 1.0 / size.y, size.x, size.y],
            depth_of_field: [
                frame.camera.near(),
                frame.camera.far(),
                dof.focus_distance,
                dof.focus_range,
            ],
            blur: [
                dof.max_blur_radius,
                if dof.enabled { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
            motion: [
                MOTION_BLUR_MAX_PIXELS,
                MOTION_BLUR_SAMPLES as f32,
                frame.directional_blur,
                if has_sky { 1.0 } else { 0.0 },
            ],
            time: [frame.time, 0.0, 0.0, 0.0],
        };
        queue.write_buffer(&self.post_buffer, 0, bytes_of(&uniforms));
    }

    fn prepare_fullscreen(&self, gpu: &GpuContext, frame: &Frame<'_>) {
        let queue = &gpu.queue;
        let main = analytic_uniforms(frame.camera, frame.viewport, frame);
        queue.write_buffer(&self.analytic.buffer, 0, bytes_of(&main));

        if let Some(portal) = frame.portal {
            let size = self.targets.portal.size();
            let partner = analytic_uniforms(portal.camera, size, frame);
            queue.write_buffer(&self.portal_analytic.buffer, 0, bytes_of(&partner));

            let uniforms = PortalUniforms {
                view_projection: mat4(frame.projection * frame.view),
                params: [PORTAL_OPACITY, 0.0, 0.0, 0.0],
            };
            queue.write_buffer(&self.portal_buffer, 0, bytes_of(&uniforms));
            let vertices = portal
                .quad
                .map(|(position, uv)| PortalVertex::new(position, uv));
            queue.write_buffer(&self.portal_vertices, 0, bytemuck::cast_slice(&vertices));
        }
        self.write_post_uniforms(queue, frame, false);
    }

    fn analytic_pipeline(&self, scene: AnalyticScene) -> Option<&wgpu::RenderPipeline> {
        match scene {
            AnalyticScene::Forest => self.pipelines.forest.as_ref(),
            AnalyticScene::Water => self.pipelines.water.as_ref(),
        }
    }

    fn encode_fullscreen(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: &Frame<'_>,
        scene: AnalyticScene,
        output: &wgpu::TextureView,
    ) {
        if let Some(portal) = frame.portal {
            let mut pass = color_pass(
                encoder,
                "portal-scene",
                &self.targets.portal.view,
                TRANSPARENT,
            );
            if let Some(pipeline) = self.analytic_pipeline(portal.scene) {
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.portal_analytic.bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }

        let blurred = frame.post == PostEffect::DirectionalBlur
            && self.pipelines.directional_blur.is_some();
        let destination = if blurred {
            &self.targets.scratch.view
        } else {
            output
        };
        {
            let mut pass = color_pass(encoder, "analytic-scene", destination, wgpu::Color::BLACK);
            if let Some(pipeline) = self.analytic_pipeline(scene) {
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.analytic.bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
            if let (Some(_), Some(pipeline)) = (frame.portal, self.pipelines.portal.as_ref()) {
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.sized.portal, &[]);
                pass.set_vertex_buffer(0, self.portal_vertices.slice(..));
                pass.draw(0..6, 0..1);
            }
        }

        if blurred {
            self.encode_post(
                encoder,
                self.pipelines.directional_blur.as_ref(),
                &self.sized.post_scratch,
                None,
                output,
            );
        }
    }

    /// Uploads geometry, per-object and per-frame uniforms. Returns the
    /// draws whose texture resolved.
    fn prepare_geometry(&mut self, gpu: &GpuContext, frame: &Frame<'_>) -> Vec<bool> {
        let device = &gpu.device;
        let queue = &gpu.queue;
        let batch = frame.batch;

        if batch.revision() != self.uploaded_revision {
            self.geometry = if batch.is_empty() {
                None
            } else {
                debug!("uploading {} vertices", batch.vertex_count());
                Some(GeometryBuffers {
                    vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("scene-vertices"),
                        contents: bytemuck::cast_slice(&batch.vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
                    tints: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("scene-tints"),
                        contents: bytemuck::cast_slice(&batch.tints),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
                })
            };
            self.uploaded_revision = batch.revision();
        }

        if batch.draws.len() > self.objects.capacity {
            let capacity = batch.draws.len().next_power_of_two();
            self.objects = ObjectBuffer::new(device, &self.layouts.object, capacity);
        }

        let textured: Vec<bool> = batch
            .draws
            .iter()
            .map(|draw| match &draw.texture {
                Some(texture) => self.textures.load(device, queue, &texture.path),
                None => false,
            })
            .collect();

        let stride = self.objects.stride as usize;
        let mut staging = vec![0u8; stride * batch.draws.len()];
        for (index, (draw, has_texture)) in batch.draws.iter().zip(&textured).enumerate() {
            let uniforms = ObjectUniforms::from_draw(draw, *has_texture);
            let bytes = bytes_of(&uniforms);
            staging[index * stride..index * stride + bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            queue.write_buffer(&self.objects.buffer, 0, &staging);
        }

        let has_sky = match frame.sky_texture {
            Some(path) => self.textures.load(device, queue, path),
            None => false,
        };

        queue.write_buffer(&self.frame_buffer, 0, bytes_of(&frame_uniforms(frame)));
        self.write_post_uniforms(queue, frame, has_sky);
        textured
    }

    fn encode_geometry(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: &Frame<'_>,
        textured: &[bool],
        output: &wgpu::TextureView,
    ) {
        let draws = &frame.batch.draws;
        let caster = shadow_caster_index(frame);

        if let (Some(_), Some(pipeline), Some(geometry)) =
            (caster, self.pipelines.shadow.as_ref(), self.geometry.as_ref())
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow-pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(depth_attachment(&self.targets.shadow.view)),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.shadow_bind_group, &[]);
            pass.set_vertex_buffer(0, geometry.vertices.slice(..));
            for (index, draw) in draws.iter().enumerate() {
                pass.set_bind_group(1, &self.objects.bind_group, &[self.objects.offset(index)]);
                pass.draw(draw.vertex_range(), 0..1);
            }
        }

        {
            let clear = match frame.mode {
                RenderMode::PlanetGeometryScene => TRANSPARENT,
                _ => WHITE,
            };
            let gbuffer = &self.targets.gbuffer;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("geometry-pass"),
                color_attachments: &[
                    clear_attachment(&gbuffer.color.view, clear),
                    clear_attachment(&gbuffer.velocity.view, TRANSPARENT),
                    clear_attachment(&gbuffer.normal.view, TRANSPARENT),
                ],
                depth_stencil_attachment: Some(depth_attachment(&gbuffer.depth.view)),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let pipeline = if frame.cull_back_faces {
                self.pipelines.geometry_culled.as_ref()
            } else {
                self.pipelines.geometry_double_sided.as_ref()
            };
            if let (Some(pipeline), Some(geometry)) = (pipeline, self.geometry.as_ref()) {
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.frame_bind_group, &[]);
                pass.set_vertex_buffer(0, geometry.vertices.slice(..));
                pass.set_vertex_buffer(1, geometry.tints.slice(..));
                for (index, (draw, has_texture)) in draws.iter().zip(textured).enumerate() {
                    let texture = draw
                        .texture
                        .as_ref()
                        .filter(|_| *has_texture)
                        .map(|texture| texture.path.as_path());
                    pass.set_bind_group(1, &self.objects.bind_group, &[self.objects.offset(index)]);
                    pass.set_bind_group(2, self.textures.bind_group(texture), &[]);
                    pass.draw(draw.vertex_range(), 0..1);
                }
            }
        }

        let pipeline = match frame.post {
            PostEffect::DepthDebug => self.pipelines.depth_debug.as_ref(),
            PostEffect::MotionBlur => self.pipelines.motion_blur.as_ref(),
            PostEffect::DepthOfField => self.pipelines.depth_of_field.as_ref(),
            PostEffect::Toon => self.pipelines.toon.as_ref(),
            PostEffect::None | PostEffect::DirectionalBlur => None,
        };
        self.encode_post(
            encoder,
            pipeline,
            &self.sized.post_gbuffer,
            frame.sky_texture,
            output,
        );
    }

    fn encode_post(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: Option<&wgpu::RenderPipeline>,
        inputs: &wgpu::BindGroup,
        sky: Option<&std::path::Path>,
        output: &wgpu::TextureView,
    ) {
        let mut pass = color_pass(encoder, "post-pass", output, wgpu::Color::BLACK);
        if let Some(pipeline) = pipeline {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, inputs, &[]);
            pass.set_bind_group(1, self.textures.bind_group(sky), &[]);
            pass.draw(0..3, 0..1);
        }
    }
}

fn shadow_sampler(gpu: &GpuContext) -> wgpu::Sampler {
    let (address_mode, border_color) = if gpu.supports_border_clamp() {
        (
            wgpu::AddressMode::ClampToBorder,
            Some(wgpu::SamplerBorderColor::OpaqueWhite),
        )
    } else {
        (wgpu::AddressMode::ClampToEdge, None)
    };
    gpu.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("shadow-sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        compare: Some(wgpu::CompareFunction::LessEqual),
        border_color,
        ..Default::default()
    })
}

fn color_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
    clear: wgpu::Color,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[clear_attachment(view, clear)],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

fn clear_attachment(
    view: &wgpu::TextureView,
    clear: wgpu::Color,
) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        depth_slice: None,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(clear),
            store: wgpu::StoreOp::Store,
        },
    })
}

fn depth_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

/// Index of the shadow caster, if it is among the uploaded lights. Only the
/// planet scene casts shadows.
fn shadow_caster_index(frame: &Frame<'_>) -> Option<usize> {
    if frame.mode != RenderMode::PlanetGeometryScene {
        return None;
    }
    shadow_caster(frame.lights).filter(|index| *index < MAX_LIGHTS)
}

fn frame_uniforms(frame: &Frame<'_>) -> FrameUniforms {
    let mut uniforms = FrameUniforms::zeroed();
    uniforms.view = mat4(frame.view);
    uniforms.projection = mat4(frame.projection);
    uniforms.prev_view = mat4(frame.prev_view);
    uniforms.prev_projection = mat4(frame.prev_projection);
    uniforms.camera_position = frame.camera.position().extend(frame.time).to_array();
    let globals = frame.globals;
    uniforms.globals = [globals.ka, globals.kd, globals.ks, globals.kt];
    uniforms.fog = FOG_COLOR.extend(frame.fog_density).to_array();
    uniforms.pack_lights(frame.lights);

    let caster = shadow_caster_index(frame);
    uniforms.light_space = match caster {
        Some(index) => mat4(light_space_matrix(&frame.lights[index])),
        None => mat4(Mat4::IDENTITY),
    };
    uniforms.params[0] = if frame.settings.fog { 1.0 } else { 0.0 };
    uniforms.params[2] = frame.prev_time;
    uniforms.params[3] = caster.map_or(0.0, |index| index as f32 + 1.0);
    uniforms
}

fn analytic_uniforms(camera: &Camera, size: UVec2, frame: &Frame<'_>) -> AnalyticUniforms {
    let size = size.max(UVec2::ONE).as_vec2();
    AnalyticUniforms {
        resolution: [size.x, size.y, 1.0, frame.time],
        mouse: frame.mouse.to_array(),
        camera_position: camera.position().extend(camera.fov_y()).to_array(),
        camera_look: camera.look().extend(frame.frame_index as f32).to_array(),
        camera_up: camera.up().extend(0.0).to_array(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_stride_respects_offset_alignment() {
        let size = std::mem::size_of::<ObjectUniforms>() as u64;
        let stride = aligned_stride(size, 256);
        assert_eq!(stride % 256, 0);
        assert!(stride >= size);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(10, 0), 10);
    }
}
