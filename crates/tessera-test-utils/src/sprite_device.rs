//! Trait abstracting the device capabilities the sprite batcher consumes.
//!
//! The `SpriteDevice` trait is the whole contract between the batcher and a
//! graphics backend: bind a texture, pick a sampler addressing mode, upload
//! one block of quad vertices, issue indexed draws, and get/set the small
//! blend/depth/cull state facade used by the begin/end bracket.

/// Opaque texture identity as seen by the device.
///
/// Two draws batch together only if their ids are equal. The backend maps
/// ids to its own texture objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Alpha blend state of the device's output merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlphaBlendState {
    pub enabled: bool,
    pub operation: wgpu::BlendOperation,
    pub src_factor: wgpu::BlendFactor,
    pub dst_factor: wgpu::BlendFactor,
    /// Packed ARGB blend constant.
    pub blend_constant: u32,
}

impl AlphaBlendState {
    /// Blending disabled, with the `REPLACE` factors.
    pub const DISABLED: Self = Self {
        enabled: false,
        operation: wgpu::BlendOperation::Add,
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::Zero,
        blend_constant: 0,
    };

    /// Straight alpha blending: `src * a + dst * (1 - a)`.
    pub const fn alpha(blend_constant: u32) -> Self {
        Self {
            enabled: true,
            operation: wgpu::BlendOperation::Add,
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            blend_constant,
        }
    }

    /// The equivalent wgpu blend state, `None` when disabled.
    pub fn to_wgpu(self) -> Option<wgpu::BlendState> {
        if !self.enabled {
            return None;
        }
        let component = wgpu::BlendComponent {
            src_factor: self.src_factor,
            dst_factor: self.dst_factor,
            operation: self.operation,
        };
        Some(wgpu::BlendState {
            color: component,
            alpha: component,
        })
    }
}

impl Default for AlphaBlendState {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// Depth test/write switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test_enabled: bool,
    pub write_enabled: bool,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enabled: true,
            write_enabled: true,
        }
    }
}

/// Device capabilities needed by the sprite batcher.
///
/// # Borrow Checking Pattern
///
/// Methods take `&self` so a device can be shared behind an `Arc` between
/// the batcher and whoever records the final render pass. Implementations
/// use interior mutability (see `MockSpriteDevice`).
///
/// # Example
///
/// ```rust,no_run
/// use tessera_test_utils::{SpriteDevice, TextureId};
///
/// fn draw_one_quad(device: &dyn SpriteDevice, vertices: &[u8]) {
///     device.bind_texture(0, Some(TextureId(1)));
///     device.set_address_mode(0, wgpu::AddressMode::ClampToEdge);
///     device.write_vertices_discard(vertices);
///     device.draw_indexed(0, 4, 0, 2);
/// }
/// ```
pub trait SpriteDevice: Send + Sync {
    // Texture and sampler state

    /// Bind a texture to a sampler slot. `None` binds the untextured fallback.
    fn bind_texture(&self, slot: u32, texture: Option<TextureId>);

    /// Set U and V addressing for a sampler slot.
    fn set_address_mode(&self, slot: u32, mode: wgpu::AddressMode);

    /// Set min/mag filtering for a sampler slot. Mipmapping is always off.
    fn set_filter_mode(&self, slot: u32, filter: wgpu::FilterMode);

    /// Bind the built-in texture-modulate program, dropping any custom shading.
    fn bind_builtin_program(&self);

    // Geometry

    /// Replace the whole quad vertex region with `data`.
    ///
    /// Equivalent to a discard map, full copy, and unmap. Draws previously
    /// issued keep seeing the data they were issued with.
    fn write_vertices_discard(&self, data: &[u8]);

    /// Draw `primitive_count` triangles from the static quad index buffer.
    ///
    /// `start_index` indexes the index buffer; `start_vertex` and
    /// `vertex_count` describe the referenced vertex range.
    fn draw_indexed(&self, start_vertex: u32, vertex_count: u32, start_index: u32, primitive_count: u32);

    // Render state facade

    fn alpha_blend(&self) -> AlphaBlendState;
    fn set_alpha_blend(&self, state: AlphaBlendState);

    fn depth(&self) -> DepthState;
    fn set_depth(&self, state: DepthState);

    fn cull_mode(&self) -> Option<wgpu::Face>;
    fn set_cull_mode(&self, mode: Option<wgpu::Face>);
}

impl<D: SpriteDevice + ?Sized> SpriteDevice for std::sync::Arc<D> {
    fn bind_texture(&self, slot: u32, texture: Option<TextureId>) {
        (**self).bind_texture(slot, texture)
    }

    fn set_address_mode(&self, slot: u32, mode: wgpu::AddressMode) {
        (**self).set_address_mode(slot, mode)
    }

    fn set_filter_mode(&self, slot: u32, filter: wgpu::FilterMode) {
        (**self).set_filter_mode(slot, filter)
    }

    fn bind_builtin_program(&self) {
        (**self).bind_builtin_program()
    }

    fn write_vertices_discard(&self, data: &[u8]) {
        (**self).write_vertices_discard(data)
    }

    fn draw_indexed(&self, start_vertex: u32, vertex_count: u32, start_index: u32, primitive_count: u32) {
        (**self).draw_indexed(start_vertex, vertex_count, start_index, primitive_count)
    }

    fn alpha_blend(&self) -> AlphaBlendState {
        (**self).alpha_blend()
    }

    fn set_alpha_blend(&self, state: AlphaBlendState) {
        (**self).set_alpha_blend(state)
    }

    fn depth(&self) -> DepthState {
        (**self).depth()
    }

    fn set_depth(&self, state: DepthState) {
        (**self).set_depth(state)
    }

    fn cull_mode(&self) -> Option<wgpu::Face> {
        (**self).cull_mode()
    }

    fn set_cull_mode(&self, mode: Option<wgpu::Face>) {
        (**self).set_cull_mode(mode)
    }
}
