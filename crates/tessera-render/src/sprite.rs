//! Deferred sprite batching.
//!
//! A [`SpriteBatch`] collects draw requests between `begin` and `end`,
//! tessellates them into quads under the current transform and submits
//! them to a [`SpriteDevice`] in as few draw calls as texture and UV
//! addressing changes allow.
//!
//! # Example
//!
//! ```rust
//! use tessera_core::geometry::RectF;
//! use tessera_render::{Color, SpriteBatch, SpriteBatchConfig, SpriteSettings, SpriteTexture};
//! use tessera_test_utils::{MockSpriteDevice, TextureId};
//!
//! let mut batch = SpriteBatch::new(MockSpriteDevice::new(), SpriteBatchConfig::default());
//! let atlas = SpriteTexture::new(TextureId(1), 256, 256);
//!
//! batch.begin(SpriteSettings::RESTORE_STATE_ALPHA_BLENDED);
//! batch.draw_rect(Some(&atlas), RectF::new(0.0, 0.0, 32.0, 32.0), None, Color::WHITE);
//! batch.draw_full_circle(None, RectF::new(40.0, 0.0, 32.0, 32.0), None, 16, Color::RED);
//! batch.end();
//!
//! assert_eq!(batch.batch_count(), 2);
//! ```

use std::f32::consts::TAU;
use std::ops::{Deref, DerefMut};

use glam::{Mat4, Vec2};
use tessera_core::geometry::RectF;
use tessera_core::profiling::profile_function;
use tessera_test_utils::SpriteDevice;

use crate::batch::{BatchFlusher, SpriteBatchStats};
use crate::color::Color;
use crate::config::SpriteBatchConfig;
use crate::geometry::{self, GeometryContext, LineStyle, MIN_ARC_DIV, MIN_CIRCLE_DIV, Sweep};
use crate::queue::DrawQueue;
use crate::settings::SpriteSettings;
use crate::state::{RenderStateSnapshot, apply_sprite_state};
use crate::texture::SpriteTexture;
use crate::transform::SpriteTransform;
use crate::vertex::DrawEntry;

/// Deferred 2D draw batcher over a [`SpriteDevice`].
///
/// # Borrow Checking Pattern
///
/// All mutation takes `&mut self`; the device is only borrowed shared, so
/// an `Arc` backend can be recorded into a render pass elsewhere.
pub struct SpriteBatch<D: SpriteDevice> {
    device: D,
    config: SpriteBatchConfig,
    queue: DrawQueue,
    flusher: BatchFlusher,
    transform: SpriteTransform,
    settings: SpriteSettings,
    saved_state: Option<RenderStateSnapshot>,
    began: bool,
    stats: SpriteBatchStats,
}

impl<D: SpriteDevice> SpriteBatch<D> {
    pub fn new(device: D, config: SpriteBatchConfig) -> Self {
        let config = config.validated();
        Self {
            device,
            queue: DrawQueue::new(config.max_deferred_draws, config.flush_threshold),
            flusher: BatchFlusher::with_capacity(config.max_deferred_draws),
            config,
            transform: SpriteTransform::new(),
            settings: SpriteSettings::default(),
            saved_state: None,
            began: false,
            stats: SpriteBatchStats::default(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &SpriteBatchConfig {
        &self.config
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Start a session.
    ///
    /// The transform is reset to identity and the transform stack is
    /// cleared, so a transform set before `begin` does not carry into the
    /// session. Set it after `begin` instead.
    pub fn begin(&mut self, settings: SpriteSettings) {
        profile_function!();
        debug_assert!(!self.began, "SpriteBatch::begin called twice without end");
        tracing::trace!("Sprite batch begin: {:?}", settings);

        self.settings = settings;
        self.transform.reset(settings.uses_transform_stack());

        self.saved_state = settings
            .restores_state()
            .then(|| RenderStateSnapshot::capture(&self.device));

        if settings.changes_state() {
            apply_sprite_state(&self.device, settings);
        }
        self.began = true;
    }

    /// Flush everything queued and close the session.
    pub fn end(&mut self) {
        profile_function!();
        debug_assert!(self.began, "SpriteBatch::end called without begin");
        tracing::trace!("Sprite batch end: {} quads queued", self.queue.len());

        self.flush();
        if let Some(snapshot) = self.saved_state.take() {
            snapshot.restore(&self.device, self.settings);
        }
        self.began = false;
    }

    /// Submit the queued quads now.
    pub fn flush(&mut self) {
        self.flusher.flush(&self.device, &mut self.queue, &mut self.stats);
    }

    pub fn is_began(&self) -> bool {
        self.began
    }

    /// Settings of the current, or last, session.
    pub fn settings(&self) -> SpriteSettings {
        self.settings
    }

    // =========================================================================
    // Transform
    // =========================================================================

    pub fn transform(&self) -> &Mat4 {
        self.transform.current()
    }

    pub fn is_using_transform_stack(&self) -> bool {
        self.transform.is_stacking()
    }

    pub fn set_transform(&mut self, matrix: Mat4) {
        self.transform.set(matrix);
    }

    /// `matrix` is applied after the current transform.
    pub fn multiply_transform(&mut self, matrix: Mat4) {
        self.transform.multiply(matrix);
    }

    /// `matrix` is applied before the current transform.
    pub fn pre_multiply_transform(&mut self, matrix: Mat4) {
        self.transform.pre_multiply(matrix);
    }

    /// Undo the last stacked transform change. Requires `USE_POST_TRANSFORM_STACK`.
    pub fn pop_transform(&mut self) {
        self.transform.pop();
    }

    // =========================================================================
    // Rects and quads
    // =========================================================================

    /// Draw a texture at its native pixel size.
    pub fn draw(&mut self, texture: &SpriteTexture, position: Vec2, color: Color) {
        let dst = RectF::from_position_size(position, texture.size());
        self.draw_rect(Some(texture), dst, None, color);
    }

    pub fn draw_rect(&mut self, texture: Option<&SpriteTexture>, dst: RectF, src: Option<RectF>, color: Color) {
        self.draw_rect_colors(texture, dst, src, [color; 4]);
    }

    /// Rect with per-corner colors, in TL, TR, BL, BR order.
    pub fn draw_rect_colors(
        &mut self,
        texture: Option<&SpriteTexture>,
        dst: RectF,
        src: Option<RectF>,
        colors: [Color; 4],
    ) {
        let entry = geometry::rect(&self.context(texture), dst, src, pack(colors));
        self.enqueue(entry);
    }

    /// Quad with explicit TL, TR, BL, BR corners sampling `src`.
    pub fn draw_quad(
        &mut self,
        texture: Option<&SpriteTexture>,
        corners: [Vec2; 4],
        src: Option<RectF>,
        colors: [Color; 4],
    ) {
        let entry = geometry::quad(&self.context(texture), corners, src, pack(colors));
        self.enqueue(entry);
    }

    /// Quad with explicit normalized texture coordinates.
    ///
    /// Coordinates outside `[0, 1]` switch the quad to wrap addressing.
    pub fn draw_quad_uv(
        &mut self,
        texture: Option<&SpriteTexture>,
        corners: [Vec2; 4],
        tex_coords: [[f32; 2]; 4],
        colors: [Color; 4],
    ) {
        let mut entry = self.context(texture).quad(corners, tex_coords, pack(colors));
        entry.uv_extended = tex_coords
            .iter()
            .flatten()
            .any(|c| !(0.0..=1.0).contains(c));
        self.enqueue(entry);
    }

    /// Rect whose coordinates are scaled and shifted for repeating textures.
    pub fn draw_tiled(
        &mut self,
        texture: Option<&SpriteTexture>,
        dst: RectF,
        uv_scale: Vec2,
        uv_shift: Vec2,
        color: Color,
    ) {
        let entry = geometry::tiled(&self.context(texture), dst, uv_scale, uv_shift, color.to_argb());
        self.enqueue(entry);
    }

    /// [`draw_tiled`](Self::draw_tiled) at the texture's native size.
    pub fn draw_tiled_at(
        &mut self,
        texture: &SpriteTexture,
        position: Vec2,
        uv_scale: Vec2,
        uv_shift: Vec2,
        color: Color,
    ) {
        let dst = RectF::from_position_size(position, texture.size());
        self.draw_tiled(Some(texture), dst, uv_scale, uv_shift, color);
    }

    // =========================================================================
    // Circles and arcs
    // =========================================================================

    /// Filled elliptical sector inscribed in `dst`, from `start` to `end` radians.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_circle(
        &mut self,
        texture: Option<&SpriteTexture>,
        dst: RectF,
        src: Option<RectF>,
        start: f32,
        end: f32,
        div: u32,
        color: Color,
    ) {
        let sweep = Sweep::new(start, end, self.cap_div(div), MIN_CIRCLE_DIV);
        let entries = geometry::sector(&self.context(texture), dst, src, sweep, color.to_argb());
        self.enqueue_all(entries);
    }

    pub fn draw_full_circle(
        &mut self,
        texture: Option<&SpriteTexture>,
        dst: RectF,
        src: Option<RectF>,
        div: u32,
        color: Color,
    ) {
        self.draw_circle(texture, dst, src, 0.0, TAU, div, color);
    }

    /// Elliptical arc stroke inscribed in `dst`. `stroke` is clamped to the smaller radius.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_circle_arc(
        &mut self,
        texture: Option<&SpriteTexture>,
        dst: RectF,
        src: Option<RectF>,
        stroke: f32,
        start: f32,
        end: f32,
        div: u32,
        color: Color,
    ) {
        let sweep = Sweep::new(start, end, self.cap_div(div), MIN_ARC_DIV);
        let entries = geometry::ring_sector(&self.context(texture), dst, src, stroke, sweep, color.to_argb());
        self.enqueue_all(entries);
    }

    pub fn draw_full_circle_arc(
        &mut self,
        texture: Option<&SpriteTexture>,
        dst: RectF,
        src: Option<RectF>,
        stroke: f32,
        div: u32,
        color: Color,
    ) {
        self.draw_circle_arc(texture, dst, src, stroke, 0.0, TAU, div, color);
    }

    // =========================================================================
    // Rounded rects and lines
    // =========================================================================

    /// Filled rounded rect. `div` subdivides each corner.
    pub fn draw_rounded_rect(
        &mut self,
        texture: Option<&SpriteTexture>,
        dst: RectF,
        src: Option<RectF>,
        radius: f32,
        div: u32,
        color: Color,
    ) {
        let div = self.cap_div(div);
        let entries = geometry::rounded_rect(&self.context(texture), dst, src, radius, div, color.to_argb());
        self.enqueue_all(entries);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_rounded_rect_border(
        &mut self,
        texture: Option<&SpriteTexture>,
        dst: RectF,
        src: Option<RectF>,
        stroke: f32,
        radius: f32,
        div: u32,
        color: Color,
    ) {
        let div = self.cap_div(div);
        let entries =
            geometry::rounded_rect_border(&self.context(texture), dst, src, stroke, radius, div, color.to_argb());
        self.enqueue_all(entries);
    }

    /// Thick line from `start` to `end`.
    pub fn draw_line(
        &mut self,
        texture: Option<&SpriteTexture>,
        start: Vec2,
        end: Vec2,
        color: Color,
        style: &LineStyle,
    ) {
        let entries = geometry::line(&self.context(texture), start, end, color.to_argb(), style);
        self.enqueue_all(entries);
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    pub fn stats(&self) -> &SpriteBatchStats {
        &self.stats
    }

    /// Draw calls issued since the last [`reset_stats`](Self::reset_stats).
    pub fn batch_count(&self) -> u64 {
        self.stats.draw_calls
    }

    pub fn reset_stats(&mut self) {
        self.stats = SpriteBatchStats::default();
    }

    /// Number of quads waiting for the next flush.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn context(&self, texture: Option<&SpriteTexture>) -> GeometryContext {
        GeometryContext::new(*self.transform.current(), texture)
    }

    fn cap_div(&self, div: u32) -> u32 {
        let max = self.config.max_subdivisions;
        if div > max {
            tracing::warn!("Sprite subdivision count {} exceeds the limit, clamped to {}", div, max);
            return max;
        }
        div
    }

    fn enqueue(&mut self, entry: DrawEntry) {
        debug_assert!(self.began, "sprite drawn outside begin/end");
        if self.queue.push(entry) {
            self.flush();
        }
    }

    fn enqueue_all(&mut self, entries: impl IntoIterator<Item = DrawEntry>) {
        for entry in entries {
            self.enqueue(entry);
        }
    }
}

fn pack(colors: [Color; 4]) -> [u32; 4] {
    colors.map(Color::to_argb)
}

/// Ends the running session, begins a new one, and on drop ends it and
/// resumes the previous session with its transform and transform stack.
///
/// ```rust
/// use tessera_render::{SpriteBatch, SpriteBatchConfig, SpriteBeginEndScope, SpriteSettings};
/// use tessera_test_utils::MockSpriteDevice;
///
/// let mut batch = SpriteBatch::new(MockSpriteDevice::new(), SpriteBatchConfig::default());
/// batch.begin(SpriteSettings::CHANGE_STATE);
/// {
///     let scoped = SpriteBeginEndScope::new(&mut batch, SpriteSettings::KEEP_STATE);
///     assert_eq!(scoped.settings(), SpriteSettings::KEEP_STATE);
/// }
/// assert_eq!(batch.settings(), SpriteSettings::CHANGE_STATE);
/// batch.end();
/// ```
pub struct SpriteBeginEndScope<'a, D: SpriteDevice> {
    batch: &'a mut SpriteBatch<D>,
    previous: Option<(SpriteSettings, SpriteTransform)>,
}

impl<'a, D: SpriteDevice> SpriteBeginEndScope<'a, D> {
    pub fn new(batch: &'a mut SpriteBatch<D>, settings: SpriteSettings) -> Self {
        let previous = batch.is_began().then(|| (batch.settings(), batch.transform.clone()));
        if previous.is_some() {
            batch.end();
        }
        batch.begin(settings);
        Self { batch, previous }
    }
}

impl<D: SpriteDevice> Drop for SpriteBeginEndScope<'_, D> {
    fn drop(&mut self) {
        if self.batch.is_began() {
            self.batch.end();
        }
        if let Some((settings, transform)) = self.previous.take() {
            self.batch.begin(settings);
            self.batch.transform = transform;
        }
    }
}

impl<D: SpriteDevice> Deref for SpriteBeginEndScope<'_, D> {
    type Target = SpriteBatch<D>;

    fn deref(&self) -> &Self::Target {
        self.batch
    }
}

impl<D: SpriteDevice> DerefMut for SpriteBeginEndScope<'_, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.batch
    }
}

/// Changes the transform for its lifetime.
///
/// With the transform stack enabled the change is popped on drop;
/// otherwise the previous matrix is set back.
pub struct SpriteTransformScope<'a, D: SpriteDevice> {
    batch: &'a mut SpriteBatch<D>,
    previous: Mat4,
}

impl<'a, D: SpriteDevice> SpriteTransformScope<'a, D> {
    /// Set `matrix`, or apply it after the current transform when `multiply` is true.
    pub fn new(batch: &'a mut SpriteBatch<D>, matrix: Mat4, multiply: bool) -> Self {
        let previous = *batch.transform();
        if multiply {
            batch.multiply_transform(matrix);
        } else {
            batch.set_transform(matrix);
        }
        Self { batch, previous }
    }
}

impl<D: SpriteDevice> Drop for SpriteTransformScope<'_, D> {
    fn drop(&mut self) {
        if self.batch.is_using_transform_stack() {
            self.batch.pop_transform();
        } else {
            self.batch.set_transform(self.previous);
        }
    }
}

impl<D: SpriteDevice> Deref for SpriteTransformScope<'_, D> {
    type Target = SpriteBatch<D>;

    fn deref(&self) -> &Self::Target {
        self.batch
    }
}

impl<D: SpriteDevice> DerefMut for SpriteTransformScope<'_, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tessera_test_utils::{MockSpriteDevice, TextureId};

    fn batch() -> SpriteBatch<MockSpriteDevice> {
        SpriteBatch::new(MockSpriteDevice::new(), SpriteBatchConfig::default())
    }

    #[test]
    fn test_queue_until_end() {
        let mut batch = batch();
        batch.begin(SpriteSettings::KEEP_STATE);
        batch.draw_rect(None, RectF::new(0.0, 0.0, 4.0, 4.0), None, Color::WHITE);
        batch.draw_rect(None, RectF::new(4.0, 0.0, 4.0, 4.0), None, Color::WHITE);

        assert_eq!(batch.queued(), 2);
        assert_eq!(batch.device().count_draws(), 0);

        batch.end();
        assert_eq!(batch.queued(), 0);
        assert_eq!(batch.device().count_draws(), 1);
        assert_eq!(batch.stats().quads, 2);
    }

    #[test]
    fn test_keep_state_touches_nothing() {
        let mut batch = batch();
        batch.begin(SpriteSettings::KEEP_STATE);
        batch.end();
        assert_eq!(batch.device().call_count(), 0);
    }

    #[test]
    fn test_subdivision_cap() {
        let config = SpriteBatchConfig::default().with_max_subdivisions(16);
        let mut batch = SpriteBatch::new(MockSpriteDevice::new(), config);
        batch.begin(SpriteSettings::KEEP_STATE);
        batch.draw_full_circle(None, RectF::new(0.0, 0.0, 10.0, 10.0), None, 1000, Color::WHITE);
        assert_eq!(batch.queued(), 16);
        batch.end();
    }

    #[test]
    fn test_draw_uses_native_size() {
        let mut batch = batch();
        let tex = SpriteTexture::new(TextureId(2), 30, 20);
        batch.begin(SpriteSettings::KEEP_STATE);
        batch.draw(&tex, Vec2::new(5.0, 5.0), Color::WHITE);
        batch.end();

        let vertices: Vec<crate::vertex::QuadVertex> = bytemuck::pod_collect_to_vec(&batch.device().last_vertex_write());
        let br = vertices[3].position;
        assert!((br[0] - 34.5).abs() < 1e-5);
        assert!((br[1] - 24.5).abs() < 1e-5);
    }

    #[test]
    fn test_draw_quad_uv_detects_wrap() {
        let mut batch = batch();
        let corners = [Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ONE];
        batch.begin(SpriteSettings::KEEP_STATE);
        batch.draw_quad_uv(None, corners, [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]], [Color::WHITE; 4]);
        batch.draw_quad_uv(None, corners, [[0.0, 0.0], [3.0, 0.0], [0.0, 1.0], [3.0, 1.0]], [Color::WHITE; 4]);
        batch.end();

        let draws = batch.device().draw_calls();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].address_mode, wgpu::AddressMode::ClampToEdge);
        assert_eq!(draws[1].address_mode, wgpu::AddressMode::Repeat);
    }

    #[test]
    fn test_begin_resets_transform() {
        let mut batch = batch();
        batch.set_transform(Mat4::from_scale(Vec3::splat(2.0)));
        batch.begin(SpriteSettings::KEEP_STATE);
        assert_eq!(*batch.transform(), Mat4::IDENTITY);
        batch.end();
    }

    #[test]
    fn test_transform_scope_restores() {
        let mut batch = batch();
        batch.begin(SpriteSettings::KEEP_STATE);
        let base = Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0));
        batch.set_transform(base);
        {
            let scoped = SpriteTransformScope::new(&mut batch, Mat4::from_scale(Vec3::splat(2.0)), true);
            assert!((scoped.transform().w_axis.x - 6.0).abs() < 1e-6);
        }
        assert_eq!(*batch.transform(), base);
        batch.end();
    }

    #[test]
    fn test_transform_scope_pops_stack() {
        let mut batch = batch();
        batch.begin(SpriteSettings::KEEP_STATE | SpriteSettings::USE_POST_TRANSFORM_STACK);
        let base = Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0));
        batch.set_transform(base);
        {
            let _scoped = SpriteTransformScope::new(&mut batch, Mat4::IDENTITY, false);
        }
        assert_eq!(*batch.transform(), base);
        batch.end();
    }

    #[test]
    fn test_begin_end_scope_resumes_previous_session() {
        let mut batch = batch();
        batch.begin(SpriteSettings::KEEP_STATE);
        batch.draw_rect(None, RectF::new(0.0, 0.0, 1.0, 1.0), None, Color::WHITE);
        {
            let mut scoped = SpriteBeginEndScope::new(&mut batch, SpriteSettings::KEEP_STATE);
            // Starting the scope ended the outer session.
            assert_eq!(scoped.device().count_draws(), 1);
            scoped.draw_rect(None, RectF::new(0.0, 0.0, 1.0, 1.0), None, Color::WHITE);
        }
        assert!(batch.is_began());
        assert_eq!(batch.device().count_draws(), 2);
        batch.end();
    }

    #[test]
    fn test_begin_end_scope_keeps_outer_transform_stack() {
        let mut batch = batch();
        batch.begin(SpriteSettings::KEEP_STATE | SpriteSettings::USE_POST_TRANSFORM_STACK);
        batch.set_transform(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        batch.multiply_transform(Mat4::from_scale(Vec3::splat(2.0)));
        {
            let mut scoped = SpriteBeginEndScope::new(&mut batch, SpriteSettings::KEEP_STATE);
            scoped.set_transform(Mat4::from_translation(Vec3::new(-1.0, 0.0, 0.0)));
        }
        assert!(batch.is_using_transform_stack());
        assert!((batch.transform().w_axis.x - 10.0).abs() < 1e-6);

        batch.pop_transform();
        assert!((batch.transform().w_axis.x - 5.0).abs() < 1e-6);
        batch.end();
    }

    #[test]
    fn test_reset_stats() {
        let mut batch = batch();
        batch.begin(SpriteSettings::KEEP_STATE);
        batch.draw_rect(None, RectF::new(0.0, 0.0, 1.0, 1.0), None, Color::WHITE);
        batch.end();
        assert_eq!(batch.batch_count(), 1);

        batch.reset_stats();
        assert_eq!(batch.batch_count(), 0);
        assert_eq!(*batch.stats(), SpriteBatchStats::default());
    }
}
