//! GPU-to-CPU readback of a rendered frame.

use std::path::Path;
use std::sync::mpsc;

use anyhow::{anyhow, Context, Result};
use glam::UVec2;
use log::info;

/// Row pitch alignment required for texture-to-buffer copies.
pub const PADDED_ROW_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Tightly packed RGBA8 pixels, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl CapturedImage {
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let image = image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .context("captured pixel buffer does not match its dimensions")?;
        image
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(
            "saved {}x{} capture to {}",
            self.width,
            self.height,
            path.display()
        );
        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = ((y * self.width + x) * 4) as usize;
        let texel = self.pixels.get(start..start + 4)?;
        Some([texel[0], texel[1], texel[2], texel[3]])
    }
}

pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    unpadded.div_ceil(PADDED_ROW_ALIGNMENT) * PADDED_ROW_ALIGNMENT
}

/// Strips row padding and, for BGRA sources, swaps to RGBA.
pub fn unpad_rows(data: &[u8], width: u32, height: u32, padded: u32, bgra: bool) -> Vec<u8> {
    let row_bytes = (width * 4) as usize;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in data.chunks(padded as usize).take(height as usize) {
        pixels.extend_from_slice(&row[..row_bytes.min(row.len())]);
    }
    if bgra {
        for texel in pixels.chunks_exact_mut(4) {
            texel.swap(0, 2);
        }
    }
    pixels
}

fn is_bgra(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
    )
}

/// Copies a 4-byte-per-texel color texture into host memory. Blocks until
/// the GPU has finished.
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    size: UVec2,
) -> Result<CapturedImage> {
    let format = texture.format();
    if format.block_copy_size(None) != Some(4) {
        return Err(anyhow!("cannot read back {format:?} textures"));
    }
    let padded = padded_bytes_per_row(size.x);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("capture-readback"),
        size: u64::from(padded) * u64::from(size.y),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("capture-encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(size.y),
            },
        },
        wgpu::Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(Some(encoder.finish()));

    let slice = buffer.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .context("device lost while waiting for capture")?;
    receiver
        .recv()
        .context("capture mapping callback never ran")?
        .context("failed to map capture buffer")?;

    let pixels = {
        let data = slice.get_mapped_range();
        unpad_rows(&data, size.x, size.y, padded, is_bgra(format))
    };
    buffer.unmap();

    Ok(CapturedImage {
        width: size.x,
        height: size.y,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_pad_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
    }

    #[test]
    fn unpadding_drops_row_tails_and_swizzles() {
        let padded = 256;
        let mut data = vec![0u8; padded * 2];
        data[..4].copy_from_slice(&[1, 2, 3, 4]);
        data[padded..padded + 4].copy_from_slice(&[5, 6, 7, 8]);
        data[4] = 99;

        let rgba = unpad_rows(&data, 1, 2, padded as u32, false);
        assert_eq!(rgba, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let swapped = unpad_rows(&data, 1, 2, padded as u32, true);
        assert_eq!(swapped, vec![3, 2, 1, 4, 7, 6, 5, 8]);
    }

    #[test]
    fn captured_image_saves_png() {
        let image = CapturedImage {
            width: 2,
            height: 1,
            pixels: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        assert_eq!(image.pixel(1, 0), Some([0, 0, 255, 255]));
        assert_eq!(image.pixel(2, 0), None);

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("frame.png");
        image.save_png(&path).expect("save png");
        let decoded = image::open(&path).expect("decode png").to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.as_raw(), &image.pixels);
    }
}
