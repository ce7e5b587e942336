use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Sampled texture bound by the solid and integer-quad pipelines.
///
/// Renderers rebuild their bind group when the `id` they last bound changes.
pub struct QuadTexture {
    id: u64,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl QuadTexture {
    /// Uploads tightly packed RGBA8 pixels.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Self> {
        check_upload(
            label,
            width,
            height,
            pixels.len(),
            device.limits().max_texture_dimension_2d,
        )?;

        let extent = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
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
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            _texture: texture,
            view,
            sampler,
        })
    }

    /// Two-colour checkerboard with `cell`-pixel squares.
    pub fn checkerboard(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: u32,
        cell: u32,
        a: [u8; 4],
        b: [u8; 4],
    ) -> Result<Self> {
        let pixels = checkerboard_pixels(size, cell, a, b);
        Self::from_rgba8(device, queue, "rosette checkerboard", size, size, &pixels)
    }

    /// Decodes an image file (png/jpeg/bmp) and uploads it.
    pub fn from_image(device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        log::info!("loaded texture {} ({w}x{h})", path.display());
        Self::from_rgba8(device, queue, &path.display().to_string(), w, h, img.as_raw())
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

/// Rejects uploads `create_texture` would fail on: empty, larger than the
/// device's 2D limit, or with a pixel buffer of the wrong length.
fn check_upload(label: &str, width: u32, height: u32, len: usize, max_dim: u32) -> Result<()> {
    anyhow::ensure!(width > 0 && height > 0, "texture {label} has zero size");
    anyhow::ensure!(
        width <= max_dim && height <= max_dim,
        "texture {label} is {width}x{height}, device limit is {max_dim}x{max_dim}"
    );
    let expected = width as usize * height as usize * 4;
    anyhow::ensure!(
        len == expected,
        "texture {label}: expected {expected} bytes, got {len}"
    );
    Ok(())
}

pub(crate) fn checkerboard_pixels(size: u32, cell: u32, a: [u8; 4], b: [u8; 4]) -> Vec<u8> {
    let cell = cell.max(1);
    let mut out = Vec::with_capacity(size as usize * size as usize * 4);
    for y in 0..size {
        for x in 0..size {
            let px = if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b };
            out.extend_from_slice(&px);
        }
    }
    out
}
