//! Quad vertex layout and draw entries.

use static_assertions::const_assert_eq;
use tessera_test_utils::TextureId;

/// Number of vertices in every queued quad.
pub const VERTICES_PER_QUAD: usize = 4;
/// Number of indices per quad in the static index buffer.
pub const INDICES_PER_QUAD: usize = 6;

/// A single sprite vertex, already transformed.
///
/// `color` is packed `0xAARRGGBB`; on little-endian targets its bytes read
/// B, G, R, A, which is what the vertex layout's `Unorm8x4` decodes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 4],
    pub color: u32,
    pub tex_coord: [f32; 2],
}

const_assert_eq!(std::mem::size_of::<QuadVertex>(), 28);

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x4, 1 => Unorm8x4, 2 => Float32x2];

    /// Vertex buffer layout matching `shaders/sprite.wgsl`.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Corner slots of a quad, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

/// One queued quad with its batching key.
///
/// The corners need not form a rectangle: sector entries put an arc
/// midpoint in `TopRight` and the shape center in `BottomLeft`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawEntry {
    /// TL, TR, BL, BR.
    pub vertices: [QuadVertex; VERTICES_PER_QUAD],
    pub texture: Option<TextureId>,
    /// Texture coordinates leave `[0, 1]`, so the sampler must wrap.
    pub uv_extended: bool,
}

impl DrawEntry {
    pub fn vertex(&self, corner: Corner) -> &QuadVertex {
        &self.vertices[corner as usize]
    }

    /// The key adjacent entries must share to be drawn together.
    #[inline]
    pub fn batch_key(&self) -> (Option<TextureId>, bool) {
        (self.texture, self.uv_extended)
    }

    pub fn tex_coords(&self) -> [[f32; 2]; VERTICES_PER_QUAD] {
        self.vertices.map(|v| v.tex_coord)
    }

    /// Remap all texture coordinates as `uv * scale + bias`.
    ///
    /// The entry is marked UV-extended whatever the result, because scaled
    /// coordinates generally leave `[0, 1]`.
    pub fn change_uv(&mut self, scale: glam::Vec2, bias: glam::Vec2) {
        for vertex in &mut self.vertices {
            let uv = glam::Vec2::from(vertex.tex_coord) * scale + bias;
            vertex.tex_coord = uv.to_array();
        }
        self.uv_extended = true;
    }
}

/// Index list for `quad_count` quads using the triangulation `(b, b+1, b+2), (b+2, b+1, b+3)`.
pub fn quad_indices(quad_count: usize) -> Vec<u16> {
    let mut indices = Vec::with_capacity(quad_count * INDICES_PER_QUAD);
    for quad in 0..quad_count {
        let base = (quad * VERTICES_PER_QUAD) as u16;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);
    }
    indices
}
