//! Texture handles passed to draw calls.

use tessera_test_utils::TextureId;

/// A texture as seen by producers: device identity plus pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteTexture {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

impl SpriteTexture {
    pub const fn new(id: TextureId, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }

    pub fn size(&self) -> glam::Vec2 {
        glam::Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Pixel extent used to normalize texture coordinates.
///
/// Untextured draws use a 1x1 extent so their coordinates stay in `[0, 1]`.
#[inline]
pub fn texture_extent(texture: Option<&SpriteTexture>) -> glam::Vec2 {
    texture.map_or(glam::Vec2::ONE, SpriteTexture::size)
}

/// Device identity of an optional texture.
#[inline]
pub fn texture_id(texture: Option<&SpriteTexture>) -> Option<TextureId> {
    texture.map(|t| t.id)
}
