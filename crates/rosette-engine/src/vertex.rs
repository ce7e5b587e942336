//! Host-side mirror of the shader ABI.
//!
//! Every struct here is `#[repr(C)]` + `Pod` and matches a shader input or
//! uniform block byte for byte. Attribute locations are fixed by the shaders;
//! `crate::shader` tests reflect the compiled modules against these layouts.

use bytemuck::{Pod, Zeroable};

use crate::coords::{ColorRgba, Vec2};

// ── basic pipeline ────────────────────────────────────────────────────────

/// Per-vertex input of `basic.vert`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct BasicVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl BasicVertex {
    pub const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x4  // color
    ];

    #[inline]
    pub fn new(position: [f32; 3], color: ColorRgba) -> Self {
        Self { position, color: color.to_array() }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BasicVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// `Params` uniform block of `basic.vert` (`int data[4]`, std140).
///
/// std140 rounds every array element up to 16 bytes, so each value sits in
/// lane 0 of a padded slot. The shader declares the block but never reads it.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ParamsUniform {
    pub data: [[i32; 4]; 4],
}

impl ParamsUniform {
    pub fn new(values: [i32; 4]) -> Self {
        let mut data = [[0; 4]; 4];
        for (slot, v) in data.iter_mut().zip(values) {
            slot[0] = v;
        }
        Self { data }
    }

    pub fn values(&self) -> [i32; 4] {
        [self.data[0][0], self.data[1][0], self.data[2][0], self.data[3][0]]
    }
}

// ── solid pipeline ────────────────────────────────────────────────────────

/// Per-instance input of `solid.vert`: corner position and size in clip space.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SolidInstance {
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub color: [f32; 4],
}

impl SolidInstance {
    pub const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2, // size
        2 => Float32x4  // color
    ];

    #[inline]
    pub fn new(position: Vec2, size: Vec2, color: ColorRgba) -> Self {
        Self {
            position: position.to_array(),
            size: size.to_array(),
            color: color.to_array(),
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SolidInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

// ── integer-quad pipeline ─────────────────────────────────────────────────

/// Per-instance input of `quad_int.vert`: pixel position, pixel size, depth.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct IntQuadInstance {
    pub position: [i32; 2],
    pub size: [i32; 2],
    pub depth: f32,
}

impl IntQuadInstance {
    pub const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Sint32x2, // position
        1 => Sint32x2, // size
        2 => Float32   // depth
    ];

    #[inline]
    pub const fn new(position: [i32; 2], size: [i32; 2], depth: f32) -> Self {
        Self { position, size, depth }
    }

    /// Square of side `side` centred on `center` (pixel coordinates).
    pub fn centered(center: [i32; 2], side: i32, depth: f32) -> Self {
        let half = side / 2;
        Self::new([center[0] - half, center[1] - half], [side, side], depth)
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<IntQuadInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// `Aspect` uniform block shared by `quad_int.vert` and `texture.frag`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct AspectUniform {
    pub aspect: [f32; 2],
    pub _pad: [f32; 2], // 16-byte alignment
}

impl AspectUniform {
    #[inline]
    pub const fn new(aspect: [f32; 2]) -> Self {
        Self { aspect, _pad: [0.0; 2] }
    }
}
