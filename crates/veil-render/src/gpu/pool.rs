//! Resource pooling for efficient memory reuse
//!
//! Pools allow offscreen targets released by one pass (or one frame) to be
//! picked up by the next without going back to the driver.

use crate::resources::TextureDesc;
use std::collections::HashMap;
use std::sync::Arc;

/// Usage every pooled color texture is created with
pub const COLOR_TARGET_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

/// Key for texture pool lookup
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct TextureKey {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl TextureKey {
    pub fn color_target(desc: &TextureDesc) -> Self {
        Self {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: COLOR_TARGET_USAGE,
        }
    }

    pub fn to_descriptor<'a>(&self, label: Option<&'a str>) -> wgpu::TextureDescriptor<'a> {
        wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: self.usage,
            view_formats: &[],
        }
    }
}

struct Pooled {
    texture: wgpu::Texture,
    released_at: u64,
}

/// Pool for reusing textures
pub struct TexturePool {
    device: Arc<wgpu::Device>,
    available: HashMap<TextureKey, Vec<Pooled>>,
}

impl TexturePool {
    /// Frames an unused texture is kept before `cleanup_old` drops it
    pub const MAX_AGE: u64 = 60;

    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self {
            device,
            available: HashMap::new(),
        }
    }

    /// Acquire a texture from the pool (or create new one)
    pub fn acquire(&mut self, key: TextureKey, label: &str) -> wgpu::Texture {
        if let Some(textures) = self.available.get_mut(&key) {
            if let Some(pooled) = textures.pop() {
                log::trace!("Reusing pooled texture {:?}", key);
                return pooled.texture;
            }
        }

        log::debug!("Creating new pooled texture '{}' {:?}", label, key);
        self.device.create_texture(&key.to_descriptor(Some(label)))
    }

    /// Release a texture back to the pool
    pub fn release(&mut self, texture: wgpu::Texture, key: TextureKey, frame: u64) {
        self.available.entry(key).or_default().push(Pooled {
            texture,
            released_at: frame,
        });
    }

    /// Drop textures that have sat unused for more than `MAX_AGE` frames
    pub fn cleanup_old(&mut self, current_frame: u64) {
        self.available.retain(|_key, textures| {
            textures.retain(|pooled| current_frame.saturating_sub(pooled.released_at) < Self::MAX_AGE);
            !textures.is_empty()
        });
    }

    /// Number of textures waiting for reuse
    pub fn available(&self) -> usize {
        self.available.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_target_key_follows_the_descriptor() {
        let desc = TextureDesc {
            width: 800,
            height: 600,
            format: wgpu::TextureFormat::Rgba16Float,
        };
        let key = TextureKey::color_target(&desc);
        assert_eq!((key.width, key.height, key.format), (800, 600, desc.format));
        assert!(key.usage.contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING));

        let resized = TextureDesc { width: 400, ..desc };
        assert_ne!(TextureKey::color_target(&resized), key);
    }

    #[test]
    fn descriptor_is_a_single_2d_level() {
        let key = TextureKey::color_target(&TextureDesc {
            width: 64,
            height: 32,
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
        });
        let descriptor = key.to_descriptor(Some("_Scratch"));
        assert_eq!(descriptor.label, Some("_Scratch"));
        assert_eq!(descriptor.size.width, 64);
        assert_eq!(descriptor.size.height, 32);
        assert_eq!(descriptor.size.depth_or_array_layers, 1);
        assert_eq!(descriptor.mip_level_count, 1);
        assert_eq!(descriptor.dimension, wgpu::TextureDimension::D2);
        assert_eq!(descriptor.usage, COLOR_TARGET_USAGE);
    }
}
