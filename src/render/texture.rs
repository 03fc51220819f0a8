use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};

/// A decoded image uploaded to the GPU, bound together with its sampler.
pub struct GpuTexture {
    _texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
}

/// Path-keyed texture cache. Decode failures are remembered so a broken
/// path is only tried once; lookups for it return the white fallback.
pub struct TextureCache {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    entries: HashMap<PathBuf, Option<GpuTexture>>,
    fallback: GpuTexture,
}

impl TextureCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material-texture-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let fallback = upload(device, queue, &layout, &sampler, "white", 1, 1, &[255; 4]);
        Self {
            layout,
            sampler,
            entries: HashMap::new(),
            fallback,
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Decodes and uploads `path` on first use. Returns whether a real
    /// texture is available for it.
    pub fn load(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) -> bool {
        if let Some(entry) = self.entries.get(path) {
            return entry.is_some();
        }
        let max_dimension = device.limits().max_texture_dimension_2d;
        let entry = match decode(path, max_dimension) {
            Ok(image) => {
                debug!("loaded texture {}", path.display());
                let (width, height) = image.dimensions();
                Some(upload(
                    device,
                    queue,
                    &self.layout,
                    &self.sampler,
                    &path.display().to_string(),
                    width,
                    height,
                    image.as_raw(),
                ))
            }
            Err(err) => {
                warn!("rendering without texture: {err:?}");
                None
            }
        };
        let loaded = entry.is_some();
        self.entries.insert(path.to_path_buf(), entry);
        loaded
    }

    /// Bind group for `path`, or the white fallback.
    pub fn bind_group(&self, path: Option<&Path>) -> &wgpu::BindGroup {
        path.and_then(|path| self.entries.get(path))
            .and_then(Option::as_ref)
            .map(|texture| &texture.bind_group)
            .unwrap_or(&self.fallback.bind_group)
    }
}

/// Decodes `path` to RGBA8, rejecting images the device cannot hold.
fn decode(path: &Path, max_dimension: u32) -> Result<image::RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode texture {}", path.display()))?;
    if image.width() > max_dimension || image.height() > max_dimension {
        return Err(anyhow!(
            "texture {} is {}x{}, larger than the device limit of {max_dimension}",
            path.display(),
            image.width(),
            image.height()
        ));
    }
    Ok(image.to_rgba8())
}

#[allow(clippy::too_many_arguments)]
fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    GpuTexture {
        _texture: texture,
        bind_group,
    }
}
