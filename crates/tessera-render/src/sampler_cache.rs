//! Sampler cache for sprite sampler reuse.
//!
//! Sprite draws only ever vary addressing and filtering, so the key is
//! just those two modes. Identical keys share one GPU sampler.

use std::sync::Arc;

use ahash::HashMap;
use parking_lot::RwLock;
use tessera_core::profiling::profile_function;

/// A hashable sampler configuration.
///
/// U and V share the address mode. Mipmapping is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerKey {
    pub address_mode: wgpu::AddressMode,
    pub filter: wgpu::FilterMode,
}

impl SamplerKey {
    pub const fn new(address_mode: wgpu::AddressMode, filter: wgpu::FilterMode) -> Self {
        Self { address_mode, filter }
    }

    /// Linear filtering clamped to the edge, the sprite default.
    pub const fn linear_clamp() -> Self {
        Self::new(wgpu::AddressMode::ClampToEdge, wgpu::FilterMode::Linear)
    }

    pub const fn linear_repeat() -> Self {
        Self::new(wgpu::AddressMode::Repeat, wgpu::FilterMode::Linear)
    }

    pub fn to_descriptor<'a>(&self, label: Option<&'a str>) -> wgpu::SamplerDescriptor<'a> {
        wgpu::SamplerDescriptor {
            label,
            address_mode_u: self.address_mode,
            address_mode_v: self.address_mode,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: self.filter,
            min_filter: self.filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        }
    }
}

impl Default for SamplerKey {
    fn default() -> Self {
        Self::linear_clamp()
    }
}

/// A thread-safe cache of GPU samplers.
///
/// # Example
///
/// ```ignore
/// use tessera_render::{SamplerCache, SamplerKey};
///
/// let cache = SamplerCache::new();
/// let sampler = cache.get_or_create(&device, SamplerKey::linear_clamp());
/// // Same key, same sampler
/// let again = cache.get_or_create(&device, SamplerKey::linear_clamp());
/// ```
pub struct SamplerCache {
    cache: RwLock<HashMap<SamplerKey, Arc<wgpu::Sampler>>>,
}

impl Default for SamplerCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplerCache {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::default()),
        }
    }

    /// Get a sampler from the cache or create a new one.
    pub fn get_or_create(&self, device: &wgpu::Device, key: SamplerKey) -> Arc<wgpu::Sampler> {
        profile_function!();
        if let Some(sampler) = self.cache.read().get(&key) {
            return Arc::clone(sampler);
        }

        let mut cache = self.cache.write();
        // Another thread may have inserted while we waited for the write lock
        if let Some(sampler) = cache.get(&key) {
            return Arc::clone(sampler);
        }

        tracing::debug!("Creating sprite sampler {:?}", key);
        let sampler = Arc::new(device.create_sampler(&key.to_descriptor(Some("Sprite Sampler"))));
        cache.insert(key, Arc::clone(&sampler));
        sampler
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Release all cached samplers.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}
