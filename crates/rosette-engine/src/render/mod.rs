//! GPU host side of the shader pairs.
//!
//! One renderer per shader pair; each owns its pipeline, bind group and
//! vertex buffers and binds them exactly as the shaders declare (see
//! `crate::vertex` for the attribute and uniform layouts).
//!
//! Convention:
//! - basic vertices and solid instances are already in clip space
//! - integer instances are physical pixels, normalised by the `Aspect` uniform

mod common;
mod ctx;

pub mod basic;
pub mod int_quad;
pub mod shader;
pub mod solid;
pub mod texture;

#[cfg(test)]
mod testing;

pub use basic::BasicRenderer;
pub use ctx::{RenderCtx, RenderTarget};
pub use int_quad::IntQuadRenderer;
pub use solid::SolidRenderer;
pub use texture::QuadTexture;
