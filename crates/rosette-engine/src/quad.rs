//! CPU reference of the quad shaders.
//!
//! Mirrors what `solid.vert`, `quad_int.vert`, `solid.frag` and `texture.frag`
//! compute, so placement can be reasoned about without a GPU. The renderer
//! tests check these results against offscreen readbacks.

use crate::coords::Vec2;
use crate::vertex::{IntQuadInstance, SolidInstance};

/// Vertices emitted per instance (triangle strip).
pub const VERTICES_PER_QUAD: u32 = 4;

/// One corner of an instanced quad.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Corners in per-instance vertex-index order.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Corner produced by the per-instance vertex index (`gl_VertexIndex`).
    #[inline]
    pub fn from_vertex_index(index: u32) -> Option<Corner> {
        Self::ALL.get(index as usize).copied()
    }

    /// Offset applied to `position`, in units of `size`.
    #[inline]
    pub const fn offset(self) -> Vec2 {
        match self {
            Corner::TopLeft => Vec2::new(0.0, 0.0),
            Corner::TopRight => Vec2::new(1.0, 0.0),
            Corner::BottomLeft => Vec2::new(0.0, 1.0),
            Corner::BottomRight => Vec2::new(1.0, 1.0),
        }
    }
}

/// The corner-offset table, indexed by vertex index.
pub const CORNER_OFFSETS: [Vec2; 4] = [
    Corner::TopLeft.offset(),
    Corner::TopRight.offset(),
    Corner::BottomLeft.offset(),
    Corner::BottomRight.offset(),
];

/// Expands one instance into its four vertices: `position + offset * size`.
pub fn expand(position: Vec2, size: Vec2) -> [Vec2; 4] {
    CORNER_OFFSETS.map(|offset| position + offset.mul_elem(size))
}

/// Clip-space vertices `solid.vert` emits for `instance`.
pub fn expand_solid(instance: &SolidInstance) -> [Vec2; 4] {
    expand(instance.position.into(), instance.size.into())
}

/// Normalises a pixel position: `pos / aspect * 2 - 1`.
///
/// Returns `None` when an aspect component is zero or not finite.
pub fn to_ndc(pos: Vec2, aspect: Vec2) -> Option<Vec2> {
    if aspect.x == 0.0 || aspect.y == 0.0 || !aspect.is_finite() {
        return None;
    }
    Some(pos.div_elem(aspect) * 2.0 - Vec2::splat(1.0))
}

/// NDC vertices `quad_int.vert` emits for `instance`.
///
/// The corner arithmetic is done in integers (as the shader does) before the
/// conversion to float.
pub fn expand_int(instance: &IntQuadInstance, aspect: Vec2) -> Option<[Vec2; 4]> {
    let [px, py] = instance.position;
    let [sx, sy] = instance.size;
    let mut out = [Vec2::zero(); 4];
    for (slot, corner) in out.iter_mut().zip(Corner::ALL) {
        let off = corner.offset();
        let x = px.wrapping_add((off.x as i32).wrapping_mul(sx));
        let y = py.wrapping_add((off.y as i32).wrapping_mul(sy));
        *slot = to_ndc(Vec2::new(x as f32, y as f32), aspect)?;
    }
    Some(out)
}

/// Converts a window cursor position (physical px, top-left origin) to NDC.
///
/// wgpu NDC is y-up, so the row is flipped before normalising.
pub fn pixel_to_ndc(pixel: Vec2, aspect: Vec2) -> Option<Vec2> {
    to_ndc(Vec2::new(pixel.x, aspect.y - pixel.y), aspect)
}

/// `solid.frag`: `0.5 * color + 0.5 * texel`, componentwise.
#[inline]
pub fn blend_half(color: [f32; 4], texel: [f32; 4]) -> [f32; 4] {
    std::array::from_fn(|i| 0.5 * color[i] + 0.5 * texel[i])
}

/// `texture.frag`: sampled rgb with alpha forced to 1.
#[inline]
pub fn opaque(texel: [f32; 4]) -> [f32; 4] {
    [texel[0], texel[1], texel[2], 1.0]
}

/// Texture coordinate `texture.frag` samples at for a fragment centre.
pub fn frag_coord_uv(frag_coord: Vec2, aspect: Vec2) -> Vec2 {
    frag_coord.div_elem(aspect)
}
