//! Quad tessellation for sprite primitives.
//!
//! Every primitive is emitted as [`DrawEntry`] quads (TL, TR, BL, BR)
//! triangulated as `(0, 1, 2), (2, 1, 3)`. Builders are pure: they read the
//! transform and texture extent from a [`GeometryContext`] and never touch
//! the queue or the device.
//!
//! Angles are radians. A point at angle `a` on an ellipse is
//! `center + (cos a * rx, -sin a * ry)`, so 0 points right and `PI / 2` points
//! up on screen.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Mat4, Vec2};
use tessera_core::geometry::RectF;
use tessera_test_utils::TextureId;

use crate::texture::{SpriteTexture, texture_extent, texture_id};
use crate::transform::transform_corners;
use crate::vertex::{DrawEntry, QuadVertex};

/// Subdivision floor for filled circles.
pub const MIN_CIRCLE_DIV: u32 = 4;
/// Subdivision floor for arcs, rounded corners and line caps.
pub const MIN_ARC_DIV: u32 = 2;
/// Subdivisions of each round line cap.
pub const LINE_CAP_DIV: u32 = 8;

/// Angle bases of the rounded-rect corners: TL, TR, BR, BL.
const CORNER_BASES: [f32; 4] = [FRAC_PI_2, 0.0, -FRAC_PI_2, -PI];

/// Transform and texture a builder stamps onto every quad.
#[derive(Debug, Clone, Copy)]
pub struct GeometryContext {
    pub matrix: Mat4,
    pub texture: Option<TextureId>,
    /// Texture size in pixels, 1x1 when untextured.
    pub extent: Vec2,
}

impl GeometryContext {
    pub fn new(matrix: Mat4, texture: Option<&SpriteTexture>) -> Self {
        Self {
            matrix,
            texture: texture_id(texture),
            extent: texture_extent(texture),
        }
    }

    /// Build one transformed quad from explicit corners and coordinates.
    pub fn quad(&self, corners: [Vec2; 4], tex_coords: [[f32; 2]; 4], colors: [u32; 4]) -> DrawEntry {
        let positions = transform_corners(&self.matrix, corners);
        let mut vertices = [QuadVertex::default(); 4];
        for (i, vertex) in vertices.iter_mut().enumerate() {
            *vertex = QuadVertex {
                position: positions[i],
                color: colors[i],
                tex_coord: tex_coords[i],
            };
        }
        DrawEntry {
            vertices,
            texture: self.texture,
            uv_extended: false,
        }
    }

    /// Normalized UV rectangle of a pixel source window. `None` is the whole texture.
    pub fn uv_rect(&self, src: Option<RectF>) -> [[f32; 2]; 4] {
        let Some(src) = src else {
            return [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        };
        let inv = safe_recip(self.extent);
        let (u0, v0) = (src.x * inv.x, src.y * inv.y);
        let (u1, v1) = (src.right() * inv.x, src.bottom() * inv.y);
        [[u0, v0], [u1, v0], [u0, v1], [u1, v1]]
    }
}

/// Maps a point inside a destination rectangle to texture coordinates.
///
/// The point is scaled per axis by `src.size / dst.size`, offset by
/// `src.origin` and normalized by the texture extent. A zero-size `dst`
/// axis maps everything to the source origin on that axis.
#[derive(Debug, Clone, Copy)]
pub struct UvMap {
    dst_origin: Vec2,
    src_origin: Vec2,
    ratio: Vec2,
    inv_extent: Vec2,
}

impl UvMap {
    pub fn new(extent: Vec2, dst: RectF, src: Option<RectF>) -> Self {
        let src = src.unwrap_or_else(|| RectF::from_position_size(Vec2::ZERO, extent));
        let ratio = Vec2::new(
            if dst.width != 0.0 { src.width / dst.width } else { 0.0 },
            if dst.height != 0.0 { src.height / dst.height } else { 0.0 },
        );
        Self {
            dst_origin: dst.position(),
            src_origin: src.position(),
            ratio,
            inv_extent: safe_recip(extent),
        }
    }

    #[inline]
    pub fn uv(&self, p: Vec2) -> [f32; 2] {
        (((p - self.dst_origin) * self.ratio + self.src_origin) * self.inv_extent).to_array()
    }

    fn uvs(&self, corners: [Vec2; 4]) -> [[f32; 2]; 4] {
        corners.map(|p| self.uv(p))
    }
}

fn safe_recip(v: Vec2) -> Vec2 {
    Vec2::new(
        if v.x != 0.0 { 1.0 / v.x } else { 0.0 },
        if v.y != 0.0 { 1.0 / v.y } else { 0.0 },
    )
}

/// Angular partition of `[start, end]` into equal steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    pub start: f32,
    pub step: f32,
    pub div: u32,
}

impl Sweep {
    /// Partition with at least `min_div` segments. A reversed range has a zero step.
    pub fn new(start: f32, end: f32, div: u32, min_div: u32) -> Self {
        let div = div.max(min_div).max(1);
        Self {
            start,
            step: (end - start).max(0.0) / div as f32,
            div,
        }
    }

    /// `(a0, mid, a1)` of segment `i`.
    #[inline]
    pub fn segment(&self, i: u32) -> (f32, f32, f32) {
        let a0 = self.start + i as f32 * self.step;
        (a0, a0 + self.step * 0.5, a0 + self.step)
    }

    pub fn end(&self) -> f32 {
        self.start + self.div as f32 * self.step
    }
}

#[inline]
pub fn ellipse_point(center: Vec2, radius: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    center + Vec2::new(cos * radius.x, -sin * radius.y)
}

fn rect_corners(rect: RectF) -> [Vec2; 4] {
    [
        Vec2::new(rect.x, rect.y),
        Vec2::new(rect.right(), rect.y),
        Vec2::new(rect.x, rect.bottom()),
        Vec2::new(rect.right(), rect.bottom()),
    ]
}

/// Axis-aligned rect with optional source window and per-corner colors.
pub fn rect(ctx: &GeometryContext, dst: RectF, src: Option<RectF>, colors: [u32; 4]) -> DrawEntry {
    ctx.quad(rect_corners(dst), ctx.uv_rect(src), colors)
}

/// Arbitrary corner quad sampling a source window.
pub fn quad(ctx: &GeometryContext, corners: [Vec2; 4], src: Option<RectF>, colors: [u32; 4]) -> DrawEntry {
    ctx.quad(corners, ctx.uv_rect(src), colors)
}

/// Rect whose default `[0, 1]` coordinates are remapped for wrap sampling.
pub fn tiled(ctx: &GeometryContext, dst: RectF, uv_scale: Vec2, uv_shift: Vec2, color: u32) -> DrawEntry {
    let mut entry = rect(ctx, dst, None, [color; 4]);
    entry.change_uv(uv_scale, uv_shift);
    entry
}

/// Rect piece textured through a shared mapping.
fn mapped_rect(ctx: &GeometryContext, map: &UvMap, piece: RectF, color: u32) -> DrawEntry {
    let corners = rect_corners(piece);
    ctx.quad(corners, map.uvs(corners), [color; 4])
}

fn sector_pieces(
    ctx: GeometryContext,
    uv: impl Fn(Vec2) -> [f32; 2] + Copy,
    center: Vec2,
    radius: Vec2,
    sweep: Sweep,
    color: u32,
) -> impl Iterator<Item = DrawEntry> {
    (0..sweep.div).map(move |i| {
        let (a0, am, a1) = sweep.segment(i);
        let corners = [
            ellipse_point(center, radius, a0),
            ellipse_point(center, radius, am),
            center,
            ellipse_point(center, radius, a1),
        ];
        ctx.quad(corners, corners.map(uv), [color; 4])
    })
}

fn ring_pieces(
    ctx: GeometryContext,
    map: UvMap,
    center: Vec2,
    radius: Vec2,
    stroke: f32,
    sweep: Sweep,
    color: u32,
) -> impl Iterator<Item = DrawEntry> {
    let stroke = stroke.clamp(0.0, radius.min_element().max(0.0));
    let inner = radius - Vec2::splat(stroke);
    (0..sweep.div).map(move |i| {
        let (a0, _, a1) = sweep.segment(i);
        let corners = [
            ellipse_point(center, radius, a0),
            ellipse_point(center, radius, a1),
            ellipse_point(center, inner, a0),
            ellipse_point(center, inner, a1),
        ];
        ctx.quad(corners, map.uvs(corners), [color; 4])
    })
}

/// Filled elliptical sector inscribed in `dst`.
pub fn sector(
    ctx: &GeometryContext,
    dst: RectF,
    src: Option<RectF>,
    sweep: Sweep,
    color: u32,
) -> impl Iterator<Item = DrawEntry> + use<> {
    let map = UvMap::new(ctx.extent, dst, src);
    sector_pieces(*ctx, move |p| map.uv(p), dst.center(), dst.size() * 0.5, sweep, color)
}

/// Elliptical ring sector inscribed in `dst`, `stroke` thick.
pub fn ring_sector(
    ctx: &GeometryContext,
    dst: RectF,
    src: Option<RectF>,
    stroke: f32,
    sweep: Sweep,
    color: u32,
) -> impl Iterator<Item = DrawEntry> + use<> {
    let map = UvMap::new(ctx.extent, dst, src);
    ring_pieces(*ctx, map, dst.center(), dst.size() * 0.5, stroke, sweep, color)
}

/// Corner radius actually used for a rounded rect.
#[inline]
pub fn effective_corner_radius(dst: &RectF, radius: f32) -> f32 {
    radius.clamp(0.0, (dst.min_side() * 0.5).max(0.0))
}

/// Centers of the TL, TR, BR and BL corner arcs.
fn corner_centers(dst: &RectF, r: f32) -> [Vec2; 4] {
    [
        Vec2::new(dst.x + r, dst.y + r),
        Vec2::new(dst.right() - r, dst.y + r),
        Vec2::new(dst.right() - r, dst.bottom() - r),
        Vec2::new(dst.x + r, dst.bottom() - r),
    ]
}

fn corner_sweep(corner: usize, div: u32) -> Sweep {
    let base = CORNER_BASES[corner];
    Sweep::new(base, base + FRAC_PI_2, div, MIN_ARC_DIV)
}

/// Filled rounded rectangle: three strips plus four quarter sectors.
///
/// `div` is the subdivision count of each corner.
pub fn rounded_rect(
    ctx: &GeometryContext,
    dst: RectF,
    src: Option<RectF>,
    radius: f32,
    div: u32,
    color: u32,
) -> impl Iterator<Item = DrawEntry> + use<> {
    let ctx = *ctx;
    let map = UvMap::new(ctx.extent, dst, src);
    let r = effective_corner_radius(&dst, radius);
    let side_height = dst.height - 2.0 * r;

    let strips = [
        RectF::new(dst.x + r, dst.y, dst.width - 2.0 * r, dst.height),
        RectF::new(dst.x, dst.y + r, r, side_height),
        RectF::new(dst.right() - r, dst.y + r, r, side_height),
    ]
    .map(|piece| mapped_rect(&ctx, &map, piece, color));

    let centers = corner_centers(&dst, r);
    strips.into_iter().chain((0..4).flat_map(move |corner| {
        let sweep = corner_sweep(corner, div);
        sector_pieces(ctx, move |p| map.uv(p), centers[corner], Vec2::splat(r), sweep, color)
    }))
}

/// Rounded rectangle outline: four edge strips plus four quarter rings.
///
/// The stroke is limited to half the shorter side.
pub fn rounded_rect_border(
    ctx: &GeometryContext,
    dst: RectF,
    src: Option<RectF>,
    stroke: f32,
    radius: f32,
    div: u32,
    color: u32,
) -> impl Iterator<Item = DrawEntry> + use<> {
    let ctx = *ctx;
    let map = UvMap::new(ctx.extent, dst, src);
    let r = effective_corner_radius(&dst, radius);
    let sw = stroke.clamp(0.0, (dst.min_side() * 0.5).max(0.0));
    let inner_width = dst.width - 2.0 * r;
    let inner_height = dst.height - 2.0 * r;

    let edges = [
        RectF::new(dst.x + r, dst.y, inner_width, sw),
        RectF::new(dst.x + r, dst.bottom() - sw, inner_width, sw),
        RectF::new(dst.x, dst.y + r, sw, inner_height),
        RectF::new(dst.right() - sw, dst.y + r, sw, inner_height),
    ]
    .map(|piece| mapped_rect(&ctx, &map, piece, color));

    let centers = corner_centers(&dst, r);
    edges.into_iter().chain((0..4).flat_map(move |corner| {
        ring_pieces(ctx, map, centers[corner], Vec2::splat(r), sw, corner_sweep(corner, div), color)
    }))
}

/// End-cap style of a thick line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineCap {
    /// The line stops exactly at its endpoints.
    #[default]
    Butt,
    /// Half circles centered on the endpoints.
    Round,
    /// Both ends extended by half the width.
    Square,
}

/// Parameters of a thick line draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub width: f32,
    pub cap: LineCap,
    pub uv_scale: Vec2,
    pub uv_shift: Vec2,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            cap: LineCap::Butt,
            uv_scale: Vec2::ONE,
            uv_shift: Vec2::ZERO,
        }
    }
}

impl LineStyle {
    pub fn new(width: f32) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    pub fn with_cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_uv_scale(mut self, uv_scale: Vec2) -> Self {
        self.uv_scale = uv_scale;
        self
    }

    pub fn with_uv_shift(mut self, uv_shift: Vec2) -> Self {
        self.uv_shift = uv_shift;
        self
    }
}

/// Angle of a direction vector under the screen-up angle convention.
#[inline]
fn direction_angle(d: Vec2) -> f32 {
    (-d.y).atan2(d.x)
}

/// Texture mapping in a line's own frame.
///
/// U grows along `dir` in texture widths, starting `u_offset` pixels before
/// `origin`. V spans the line width from the `+perp` edge (0) to the
/// `-perp` edge (1), whichever way the line points on screen.
#[derive(Debug, Clone, Copy)]
struct LineUv {
    origin: Vec2,
    dir: Vec2,
    perp: Vec2,
    u_offset: f32,
    half_width: f32,
    inv_tex_width: f32,
    inv_width: f32,
}

impl LineUv {
    #[inline]
    fn uv(&self, p: Vec2) -> [f32; 2] {
        let d = p - self.origin;
        let along = d.dot(self.dir);
        let across = d.dot(self.perp);
        [
            (along + self.u_offset) * self.inv_tex_width,
            (self.half_width - across) * self.inv_width,
        ]
    }
}

/// Thick line from `start` to `end`.
///
/// U runs along the line in texture widths, V runs across it. Round caps
/// add two half-circle sectors mapped in the same frame, so the texture
/// continues through them. Every entry is then remapped by the style's UV
/// scale and shift, so line entries always sample with wrap addressing.
pub fn line(
    ctx: &GeometryContext,
    start: Vec2,
    end: Vec2,
    color: u32,
    style: &LineStyle,
) -> impl Iterator<Item = DrawEntry> + use<> {
    let ctx = *ctx;
    let style = *style;
    let w = style.width.max(0.0);
    let hw = w * 0.5;
    let dir = (end - start).normalize_or_zero();
    let perp = Vec2::new(dir.y, -dir.x);

    let (s, e) = match style.cap {
        LineCap::Square => (start - dir * hw, end + dir * hw),
        LineCap::Butt | LineCap::Round => (start, end),
    };
    let corners = [s + perp * hw, e + perp * hw, s - perp * hw, e - perp * hw];

    let frame = LineUv {
        origin: s,
        dir,
        perp,
        u_offset: if style.cap == LineCap::Round { hw } else { 0.0 },
        half_width: hw,
        inv_tex_width: safe_recip(ctx.extent).x,
        inv_width: if w > 0.0 { 1.0 / w } else { 0.0 },
    };
    let body = ctx.quad(corners, corners.map(|p| frame.uv(p)), [color; 4]);

    let caps = (style.cap == LineCap::Round).then(move || {
        let uv = move |p| frame.uv(p);
        let radius = Vec2::splat(hw);
        let perp_angle = direction_angle(perp);
        let start_cap = sector_pieces(
            ctx,
            uv,
            start,
            radius,
            Sweep::new(perp_angle, perp_angle + PI, LINE_CAP_DIV, MIN_ARC_DIV),
            color,
        );
        let end_cap = sector_pieces(
            ctx,
            uv,
            end,
            radius,
            Sweep::new(perp_angle - PI, perp_angle, LINE_CAP_DIV, MIN_ARC_DIV),
            color,
        );
        start_cap.chain(end_cap)
    });

    std::iter::once(body)
        .chain(caps.into_iter().flatten())
        .map(move |mut entry| {
            entry.change_uv(style.uv_scale, style.uv_shift);
            entry
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::HALF_TEXEL_BIAS;
    use crate::vertex::Corner;
    use std::f32::consts::TAU;

    const EPS: f32 = 1e-4;

    fn untextured() -> GeometryContext {
        GeometryContext::new(Mat4::IDENTITY, None)
    }

    fn textured(width: u32, height: u32) -> GeometryContext {
        let tex = SpriteTexture::new(TextureId(1), width, height);
        GeometryContext::new(Mat4::IDENTITY, Some(&tex))
    }

    /// Screen position of a corner with the half-texel bias removed.
    fn pos(entry: &DrawEntry, corner: Corner) -> Vec2 {
        let p = entry.vertex(corner).position;
        Vec2::new(p[0] - HALF_TEXEL_BIAS, p[1] - HALF_TEXEL_BIAS)
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < EPS
    }

    #[test]
    fn test_rect_default_uvs() {
        let entry = rect(&textured(64, 64), RectF::new(0.0, 0.0, 10.0, 10.0), None, [0xFFFFFFFF; 4]);
        assert_eq!(entry.tex_coords(), [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        assert!(!entry.uv_extended);
        assert!(close(pos(&entry, Corner::BottomRight), Vec2::new(10.0, 10.0)));
    }

    #[test]
    fn test_rect_source_window_normalized() {
        let entry = rect(
            &textured(200, 100),
            RectF::new(0.0, 0.0, 10.0, 10.0),
            Some(RectF::new(50.0, 25.0, 100.0, 50.0)),
            [0; 4],
        );
        let uv = entry.tex_coords();
        assert!((uv[0][0] - 0.25).abs() < EPS);
        assert!((uv[0][1] - 0.25).abs() < EPS);
        assert!((uv[3][0] - 0.75).abs() < EPS);
        assert!((uv[3][1] - 0.75).abs() < EPS);
    }

    #[test]
    fn test_tiled_is_extended() {
        let entry = tiled(&textured(32, 32), RectF::new(0.0, 0.0, 64.0, 64.0), Vec2::splat(2.0), Vec2::ZERO, 0);
        assert!(entry.uv_extended);
        assert!((entry.tex_coords()[3][0] - 2.0).abs() < EPS);
    }

    #[test]
    fn test_sweep_partition_covers_full_circle() {
        for div in [1, 3, 4, 7, 32] {
            let sweep = Sweep::new(0.0, TAU, div, MIN_CIRCLE_DIV);
            assert_eq!(sweep.div, div.max(4));
            assert!((sweep.end() - TAU).abs() < EPS);
            assert!((sweep.step * sweep.div as f32 - TAU).abs() < EPS);
        }
    }

    #[test]
    fn test_reversed_sweep_is_degenerate() {
        let sweep = Sweep::new(1.0, 0.0, 8, MIN_ARC_DIV);
        assert_eq!(sweep.step, 0.0);
    }

    #[test]
    fn test_sector_segments_are_contiguous() {
        let dst = RectF::new(0.0, 0.0, 100.0, 100.0);
        let entries: Vec<_> = sector(&untextured(), dst, None, Sweep::new(0.0, TAU, 12, MIN_CIRCLE_DIV), 0).collect();
        assert_eq!(entries.len(), 12);

        let center = Vec2::new(50.0, 50.0);
        for pair in entries.windows(2) {
            assert!(close(pos(&pair[0], Corner::BottomRight), pos(&pair[1], Corner::TopLeft)));
        }
        for entry in &entries {
            assert!(close(pos(entry, Corner::BottomLeft), center));
            assert!(((pos(entry, Corner::TopRight) - center).length() - 50.0).abs() < EPS);
        }
        // Starts pointing right, first step goes up on screen.
        assert!(close(pos(&entries[0], Corner::TopLeft), Vec2::new(100.0, 50.0)));
        assert!(pos(&entries[0], Corner::BottomRight).y < 50.0);
        assert!(close(pos(&entries[11], Corner::BottomRight), Vec2::new(100.0, 50.0)));
    }

    #[test]
    fn test_sector_uv_maps_dst_into_src() {
        let dst = RectF::new(10.0, 10.0, 20.0, 20.0);
        let entries: Vec<_> = sector(&textured(100, 100), dst, None, Sweep::new(0.0, TAU, 4, MIN_CIRCLE_DIV), 0).collect();
        let center_uv = entries[0].vertex(Corner::BottomLeft).tex_coord;
        assert!((center_uv[0] - 0.5).abs() < EPS);
        assert!((center_uv[1] - 0.5).abs() < EPS);
        let right_uv = entries[0].vertex(Corner::TopLeft).tex_coord;
        assert!((right_uv[0] - 1.0).abs() < EPS);
    }

    #[test]
    fn test_zero_size_dst_uses_source_origin() {
        let map = UvMap::new(Vec2::splat(10.0), RectF::new(5.0, 5.0, 0.0, 0.0), Some(RectF::new(2.0, 4.0, 6.0, 6.0)));
        let uv = map.uv(Vec2::new(5.0, 5.0));
        assert!((uv[0] - 0.2).abs() < EPS);
        assert!((uv[1] - 0.4).abs() < EPS);
    }

    #[test]
    fn test_ring_stroke_clamped_to_radius() {
        let dst = RectF::new(0.0, 0.0, 40.0, 20.0);
        let entries: Vec<_> =
            ring_sector(&untextured(), dst, None, 100.0, Sweep::new(0.0, PI, 4, MIN_ARC_DIV), 0).collect();
        assert_eq!(entries.len(), 4);
        let center = Vec2::new(20.0, 10.0);
        for entry in &entries {
            let inner = pos(entry, Corner::BottomLeft);
            // Inner radii are (10, 0): the inner edge collapses onto the horizontal axis.
            assert!((inner.y - center.y).abs() < EPS);
            assert!((inner.x - center.x).abs() <= 10.0 + EPS);
        }
    }

    #[test]
    fn test_ring_quad_corners() {
        let dst = RectF::new(0.0, 0.0, 20.0, 20.0);
        let entries: Vec<_> =
            ring_sector(&untextured(), dst, None, 4.0, Sweep::new(0.0, FRAC_PI_2, 2, MIN_ARC_DIV), 0).collect();
        let first = &entries[0];
        assert!(close(pos(first, Corner::TopLeft), Vec2::new(20.0, 10.0)));
        assert!(close(pos(first, Corner::BottomLeft), Vec2::new(16.0, 10.0)));
        assert!(close(pos(&entries[1], Corner::TopRight), Vec2::new(10.0, 0.0)));
        assert!(close(pos(&entries[1], Corner::BottomRight), Vec2::new(10.0, 4.0)));
    }

    #[test]
    fn test_rounded_rect_piece_count() {
        let dst = RectF::new(0.0, 0.0, 100.0, 50.0);
        let count = rounded_rect(&untextured(), dst, None, 10.0, 3, 0).count();
        assert_eq!(count, 3 + 4 * 3);

        let count = rounded_rect_border(&untextured(), dst, None, 2.0, 10.0, 1, 0).count();
        assert_eq!(count, 4 + 4 * MIN_ARC_DIV as usize);
    }

    #[test]
    fn test_rounded_rect_oversized_radius_stays_inside() {
        let dst = RectF::new(10.0, 20.0, 60.0, 30.0);
        assert!((effective_corner_radius(&dst, 1000.0) - 15.0).abs() < EPS);

        let entries: Vec<_> = rounded_rect(&untextured(), dst, None, 1000.0, 8, 0)
            .chain(rounded_rect_border(&untextured(), dst, None, 4.0, 1000.0, 8, 0))
            .collect();
        for entry in &entries {
            for corner in [Corner::TopLeft, Corner::TopRight, Corner::BottomLeft, Corner::BottomRight] {
                assert!(dst.contains_point(pos(entry, corner), EPS), "{:?}", pos(entry, corner));
            }
        }

        // Side strips collapse to zero height instead of inverting.
        let side = &entries[1];
        assert!(pos(side, Corner::BottomLeft).y >= pos(side, Corner::TopLeft).y - EPS);
    }

    #[test]
    fn test_rounded_rect_corner_arcs() {
        let dst = RectF::new(0.0, 0.0, 100.0, 100.0);
        let entries: Vec<_> = rounded_rect(&untextured(), dst, None, 10.0, 2, 0).collect();
        // TL corner starts at the top edge and ends on the left edge.
        let tl = &entries[3..5];
        assert!(close(pos(&tl[0], Corner::TopLeft), Vec2::new(10.0, 0.0)));
        assert!(close(pos(&tl[1], Corner::BottomRight), Vec2::new(0.0, 10.0)));
        // BL corner ends on the bottom edge.
        let bl = &entries[9..11];
        assert!(close(pos(&bl[1], Corner::BottomRight), Vec2::new(10.0, 100.0)));
    }

    #[test]
    fn test_rounded_rect_texture_is_continuous() {
        let dst = RectF::new(0.0, 0.0, 100.0, 100.0);
        let entries: Vec<_> = rounded_rect(&textured(50, 50), dst, None, 10.0, 2, 0).collect();
        let center_strip = &entries[0];
        let uv = center_strip.vertex(Corner::TopLeft).tex_coord;
        assert!((uv[0] - 0.1).abs() < EPS);
        assert!(uv[1].abs() < EPS);
    }

    fn quad_length(entry: &DrawEntry, dir: Vec2) -> f32 {
        (pos(entry, Corner::TopRight) - pos(entry, Corner::TopLeft)).dot(dir)
    }

    #[test]
    fn test_line_cap_lengths() {
        let ctx = textured(16, 16);
        let (s, e) = (Vec2::new(10.0, 10.0), Vec2::new(40.0, 50.0));
        let dir = (e - s).normalize();

        let butt: Vec<_> = line(&ctx, s, e, 0, &LineStyle::new(6.0)).collect();
        assert_eq!(butt.len(), 1);
        assert!((quad_length(&butt[0], dir) - 50.0).abs() < EPS);

        let square: Vec<_> = line(&ctx, s, e, 0, &LineStyle::new(6.0).with_cap(LineCap::Square)).collect();
        assert!((quad_length(&square[0], dir) - 56.0).abs() < EPS);

        let round: Vec<_> = line(&ctx, s, e, 0, &LineStyle::new(6.0).with_cap(LineCap::Round)).collect();
        assert_eq!(round.len(), 1 + 2 * LINE_CAP_DIV as usize);
        assert!((quad_length(&round[0], dir) - 50.0).abs() < EPS);
    }

    #[test]
    fn test_line_width_and_uvs() {
        let ctx = textured(10, 4);
        let entries: Vec<_> = line(&ctx, Vec2::ZERO, Vec2::new(20.0, 0.0), 0, &LineStyle::new(4.0)).collect();
        let body = &entries[0];

        assert!(body.uv_extended);
        assert!(close(pos(body, Corner::TopLeft), Vec2::new(0.0, -2.0)));
        assert!(close(pos(body, Corner::BottomRight), Vec2::new(20.0, 2.0)));
        assert_eq!(body.vertex(Corner::TopLeft).tex_coord, [0.0, 0.0]);
        assert!((body.vertex(Corner::BottomRight).tex_coord[0] - 2.0).abs() < EPS);
        assert!((body.vertex(Corner::BottomRight).tex_coord[1] - 1.0).abs() < EPS);
    }

    #[test]
    fn test_round_caps_point_away_from_line() {
        let ctx = textured(10, 4);
        let entries: Vec<_> = line(
            &ctx,
            Vec2::ZERO,
            Vec2::new(20.0, 0.0),
            0,
            &LineStyle::new(4.0).with_cap(LineCap::Round),
        )
        .collect();
        let body = &entries[0];
        assert!((body.vertex(Corner::TopLeft).tex_coord[0] - 0.2).abs() < EPS);
        assert!((body.vertex(Corner::TopRight).tex_coord[0] - 2.2).abs() < EPS);

        let start_cap = &entries[1..9];
        let end_cap = &entries[9..];
        for entry in start_cap {
            assert!(pos(entry, Corner::TopRight).x <= EPS);
        }
        for entry in end_cap {
            assert!(pos(entry, Corner::TopRight).x >= 20.0 - EPS);
        }
        assert!(entries.iter().all(|e| e.uv_extended));
    }

    #[test]
    fn test_round_cap_texture_continues_in_every_direction() {
        let ctx = textured(16, 16);
        let style = LineStyle::new(8.0).with_cap(LineCap::Round);
        let start = Vec2::new(200.0, 200.0);
        let offsets = [
            Vec2::new(100.0, 0.0),
            Vec2::new(0.0, 100.0),
            Vec2::new(-100.0, 0.0),
            Vec2::new(0.0, -100.0),
            Vec2::new(70.0, -40.0),
        ];

        for offset in offsets {
            let entries: Vec<_> = line(&ctx, start, start + offset, 0, &style).collect();
            let body = &entries[0];
            let mut shared = 0;
            for cap in &entries[1..] {
                for cap_vertex in &cap.vertices {
                    for body_vertex in &body.vertices {
                        let (a, b) = (cap_vertex.position, body_vertex.position);
                        if (a[0] - b[0]).abs() < 1e-3 && (a[1] - b[1]).abs() < 1e-3 {
                            shared += 1;
                            let (ua, ub) = (cap_vertex.tex_coord, body_vertex.tex_coord);
                            assert!(
                                (ua[0] - ub[0]).abs() < 1e-3 && (ua[1] - ub[1]).abs() < 1e-3,
                                "offset {:?}: cap uv {:?} != body uv {:?}",
                                offset,
                                ua,
                                ub
                            );
                        }
                    }
                }
            }
            // Each cap meets both long edges of the body.
            assert!(shared >= 4, "offset {:?}: only {} shared corners", offset, shared);

            // The start cap's center sits mid-width at the line's start.
            let center = entries[1].vertex(Corner::BottomLeft).tex_coord;
            assert!((center[0] - 0.25).abs() < EPS);
            assert!((center[1] - 0.5).abs() < EPS);
        }
    }

    #[test]
    fn test_zero_length_line_is_degenerate() {
        let entries: Vec<_> = line(&untextured(), Vec2::ONE, Vec2::ONE, 0, &LineStyle::new(8.0)).collect();
        let body = &entries[0];
        assert!(close(pos(body, Corner::TopLeft), pos(body, Corner::BottomRight)));
    }

    #[test]
    fn test_line_uv_style_applied() {
        let style = LineStyle::new(2.0).with_uv_scale(Vec2::new(0.5, 1.0)).with_uv_shift(Vec2::new(0.25, 0.0));
        let entries: Vec<_> = line(&textured(10, 10), Vec2::ZERO, Vec2::new(10.0, 0.0), 0, &style).collect();
        let uv = entries[0].vertex(Corner::TopRight).tex_coord;
        assert!((uv[0] - 0.75).abs() < EPS);
    }
}
