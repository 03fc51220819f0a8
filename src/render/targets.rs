//! Off-screen attachments. Each target owns its texture and is rebuilt
//! wholesale on resize, so stale views never outlive their texture.

use glam::UVec2;
use log::debug;

use super::SHADOW_MAP_SIZE;

pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const VELOCITY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct Target {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    size: UVec2,
}

impl Target {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        size: UVec2,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let size = size.max(UVec2::ONE);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }

    /// Sampled color attachment.
    pub fn color(
        device: &wgpu::Device,
        label: &str,
        size: UVec2,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self::new(
            device,
            label,
            size,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }
}

/// Multi-attachment target written by the geometry pass.
pub struct GBuffer {
    pub color: Target,
    pub velocity: Target,
    pub normal: Target,
    pub depth: Target,
}

impl GBuffer {
    pub fn new(device: &wgpu::Device, size: UVec2) -> Self {
        Self {
            color: Target::color(device, "gbuffer-color", size, COLOR_FORMAT),
            velocity: Target::color(device, "gbuffer-velocity", size, VELOCITY_FORMAT),
            normal: Target::color(device, "gbuffer-normal", size, NORMAL_FORMAT),
            depth: Target::color(device, "gbuffer-depth", size, DEPTH_FORMAT),
        }
    }

    pub fn size(&self) -> UVec2 {
        self.color.size()
    }
}

/// Every size-dependent attachment of the pipeline plus the fixed-size
/// shadow map.
pub struct FrameTargets {
    pub gbuffer: GBuffer,
    /// Viewport-sized color target for multi-stage full-screen effects.
    pub scratch: Target,
    /// Half-resolution target the portal scene is drawn into.
    pub portal: Target,
    pub shadow: Target,
    output_format: wgpu::TextureFormat,
}

impl FrameTargets {
    pub fn new(device: &wgpu::Device, size: UVec2, output_format: wgpu::TextureFormat) -> Self {
        let size = size.max(UVec2::ONE);
        Self {
            gbuffer: GBuffer::new(device, size),
            scratch: Target::color(device, "scratch", size, output_format),
            portal: Target::color(device, "portal", portal_size(size), output_format),
            shadow: Target::color(
                device,
                "shadow-map",
                UVec2::splat(SHADOW_MAP_SIZE),
                DEPTH_FORMAT,
            ),
            output_format,
        }
    }

    pub fn size(&self) -> UVec2 {
        self.gbuffer.size()
    }

    /// Recreates the viewport-sized attachments when the size changed.
    /// Returns `true` when anything was rebuilt.
    pub fn ensure_size(&mut self, device: &wgpu::Device, size: UVec2) -> bool {
        let size = size.max(UVec2::ONE);
        if size == self.size() {
            return false;
        }
        debug!("resizing render targets to {}x{}", size.x, size.y);
        self.gbuffer = GBuffer::new(device, size);
        self.scratch = Target::color(device, "scratch", size, self.output_format);
        self.portal = Target::color(device, "portal", portal_size(size), self.output_format);
        true
    }
}

/// Half the viewport, never smaller than one pixel.
pub fn portal_size(viewport: UVec2) -> UVec2 {
    (viewport / 2).max(UVec2::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portal_target_is_half_resolution() {
        assert_eq!(portal_size(UVec2::new(1280, 720)), UVec2::new(640, 360));
        assert_eq!(portal_size(UVec2::new(1, 1)), UVec2::ONE);
    }
}
