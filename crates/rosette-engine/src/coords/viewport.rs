/// Surface size used as the `aspect` vector of the integer-quad pipeline.
///
/// Integer quads are specified in physical pixels, so this is always the
/// configured surface size, never the logical window size.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Size as `[width, height]`, clamped to at least one pixel per axis.
    #[inline]
    pub fn aspect(self) -> [f32; 2] {
        [self.width.max(1.0), self.height.max(1.0)]
    }
}
