use crate::render::shader::{self, ShaderError};
use crate::render::{RenderCtx, RenderTarget};
use crate::vertex::{BasicVertex, ParamsUniform};

use super::common::{
    alpha_blend, begin_load_pass, create_pipeline, uniform_entry, GrowableBuffer, PipelineDesc,
};

/// Draws per-vertex coloured triangles (`basic.vert` + `basic.frag`).
///
/// Positions are already in clip space; colours pass through unchanged and
/// are alpha-blended over the target.
pub struct BasicRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    pipeline_error: Option<ShaderError>,

    bind_group: Option<wgpu::BindGroup>,
    params_ubo: Option<wgpu::Buffer>,

    vbo: GrowableBuffer,
}

impl Default for BasicRenderer {
    fn default() -> Self {
        Self {
            pipeline_format: None,
            pipeline: None,
            pipeline_error: None,
            bind_group: None,
            params_ubo: None,
            vbo: GrowableBuffer::new("rosette basic vbo"),
        }
    }
}

impl BasicRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last pipeline creation failure, if any.
    pub fn error(&self) -> Option<&ShaderError> {
        self.pipeline_error.as_ref()
    }

    /// Renders `vertices` as a triangle list.
    ///
    /// A trailing partial triangle is ignored by the rasterizer.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        vertices: &[BasicVertex],
        params: ParamsUniform,
    ) {
        if vertices.len() < 3 {
            return;
        }
        self.ensure_pipeline(ctx);

        let Some(ubo) = self.params_ubo.as_ref() else { return };
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&params));

        let Some(vbo) = self.vbo.write(ctx, vertices) else { return };
        let (Some(pipeline), Some(bind_group)) = (self.pipeline.as_ref(), self.bind_group.as_ref())
        else {
            return;
        };

        let mut rpass = begin_load_pass(target, "rosette basic pass");
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.draw(0..vertices.len() as u32, 0..1);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) {
            return;
        }
        self.pipeline_format = Some(ctx.surface_format);

        let modules = match shader::BASIC.create_modules(ctx.device) {
            Ok(m) => m,
            Err(e) => {
                log::error!("BasicRenderer disabled: {e}");
                self.pipeline = None;
                self.pipeline_error = Some(e);
                return;
            }
        };

        let ubo_size = std::mem::size_of::<ParamsUniform>() as u64;
        let bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rosette basic bgl"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX, ubo_size)],
        });

        let pipeline = create_pipeline(
            ctx,
            &modules,
            &bgl,
            PipelineDesc {
                label: "rosette basic pipeline",
                buffers: &[BasicVertex::layout()],
                topology: wgpu::PrimitiveTopology::TriangleList,
                blend: Some(alpha_blend()),
            },
        );

        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rosette basic params ubo"),
            size: ubo_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rosette basic bind group"),
            layout: &bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        self.pipeline = Some(pipeline);
        self.pipeline_error = None;
        self.params_ubo = Some(ubo);
        self.bind_group = Some(bind_group);
        log::debug!("BasicRenderer: pipeline built for {:?}", ctx.surface_format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ColorRgba;
    use crate::render::testing::{assert_rgba_near, HeadlessGpu};

    fn covering_triangle(color: ColorRgba) -> [BasicVertex; 3] {
        [
            BasicVertex::new([-1.0, -1.0, 0.0], color),
            BasicVertex::new([3.0, -1.0, 0.0], color),
            BasicVertex::new([-1.0, 3.0, 0.0], color),
        ]
    }

    #[test]
    fn vertex_colour_reaches_the_target() {
        let Some(gpu) = HeadlessGpu::new() else { return };
        let mut renderer = BasicRenderer::new();
        let tri = covering_triangle(ColorRgba::new(0.0, 1.0, 0.0, 1.0));

        let px = gpu.render_offscreen(16, 16, |ctx, target| {
            renderer.render(ctx, target, &tri, ParamsUniform::new([0, 1, 2, 3]));
        });

        assert!(renderer.error().is_none());
        assert_rgba_near(px.at(8, 8), [0, 255, 0, 255]);
    }

    #[test]
    fn vertex_alpha_is_blended() {
        let Some(gpu) = HeadlessGpu::new() else { return };
        let mut renderer = BasicRenderer::new();
        let tri = covering_triangle(ColorRgba::new(0.0, 1.0, 0.0, 0.5));

        let px = gpu.render_offscreen(16, 16, |ctx, target| {
            renderer.render(ctx, target, &tri, ParamsUniform::new([0; 4]));
        });

        // Half green over transparent black.
        assert_rgba_near(px.at(8, 8), [0, 128, 0, 128]);
    }
}
