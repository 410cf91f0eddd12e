use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("failed to load texture {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture is {width}x{height}, the device allows at most {max} per side")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// RGBA8 pixels, rows bottom-up to match OBJ texture coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffuseImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DiffuseImage {
    pub fn load(path: &Path) -> Result<Self, TextureError> {
        let image = image::open(path).map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = image.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();
        info!(path = %path.display(), width, height, "diffuse texture loaded");

        Ok(Self {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }

    /// 1x1 opaque white, so untextured meshes render with their lighting only
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        }
    }

    /// The image at `path`, or white when it cannot be read. The flag is `true` when the file
    /// was used.
    pub fn load_or_white(path: &Path) -> (Self, bool) {
        match Self::load(path) {
            Ok(image) => (image, true),
            Err(e) => {
                warn!("{e}; using a white texture");
                (Self::white(), false)
            }
        }
    }

    pub fn check_size(&self, max_dimension: u32) -> Result<(), TextureError> {
        if self.width > max_dimension || self.height > max_dimension {
            return Err(TextureError::TooLarge {
                width: self.width,
                height: self.height,
                max: max_dimension,
            });
        }
        Ok(())
    }
}

/// Sampled 2D texture plus its sampler
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl GpuTexture {
    /// `image` must fit the device limits, see [`DiffuseImage::check_size`]
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, image: &DiffuseImage, label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
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
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width * 4),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self { texture, view, sampler }
    }
}
