use crate::quad::VERTICES_PER_QUAD;
use crate::render::shader::{self, ShaderError};
use crate::render::{QuadTexture, RenderCtx, RenderTarget};
use crate::vertex::{AspectUniform, IntQuadInstance};

use super::common::{
    begin_load_pass, create_pipeline, sampler_entry, texture_entry, uniform_entry, GrowableBuffer,
    PipelineDesc,
};

/// Instanced integer-coordinate quad renderer (`quad_int.vert` + `texture.frag`).
///
/// Instances are in physical pixels; the `Aspect` uniform is refreshed from
/// the physical surface size every call. Output is the texture sampled at
/// `frag_coord / aspect` with alpha forced to 1, so no blending is needed.
///
/// `depth` lands in clip-space z. There is no depth attachment, so it only
/// needs to stay within `[0, 1]` to avoid clipping.
pub struct IntQuadRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    pipeline_error: Option<ShaderError>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    bound_texture: Option<u64>,
    aspect_ubo: Option<wgpu::Buffer>,

    instance_vbo: GrowableBuffer,
}

impl Default for IntQuadRenderer {
    fn default() -> Self {
        Self {
            pipeline_format: None,
            pipeline: None,
            pipeline_error: None,
            bind_group_layout: None,
            bind_group: None,
            bound_texture: None,
            aspect_ubo: None,
            instance_vbo: GrowableBuffer::new("rosette int quad instance vbo"),
        }
    }
}

impl IntQuadRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last pipeline creation failure, if any.
    pub fn error(&self) -> Option<&ShaderError> {
        self.pipeline_error.as_ref()
    }

    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        instances: &[IntQuadInstance],
        texture: &QuadTexture,
    ) {
        if instances.is_empty() {
            return;
        }
        self.ensure_pipeline(ctx);
        self.ensure_bindings(ctx, texture);
        self.write_aspect_uniform(ctx);

        let Some(vbo) = self.instance_vbo.write(ctx, instances) else { return };
        let (Some(pipeline), Some(bind_group)) = (self.pipeline.as_ref(), self.bind_group.as_ref())
        else {
            return;
        };

        let mut rpass = begin_load_pass(target, "rosette int quad pass");
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.draw(0..VERTICES_PER_QUAD, 0..instances.len() as u32);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) {
            return;
        }
        self.pipeline_format = Some(ctx.surface_format);

        let modules = match shader::INT_QUAD.create_modules(ctx.device) {
            Ok(m) => m,
            Err(e) => {
                log::error!("IntQuadRenderer disabled: {e}");
                self.pipeline = None;
                self.pipeline_error = Some(e);
                return;
            }
        };

        let ubo_size = std::mem::size_of::<AspectUniform>() as u64;
        let bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rosette int quad bgl"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ubo_size,
                ),
                texture_entry(1),
                sampler_entry(2),
            ],
        });

        let pipeline = create_pipeline(
            ctx,
            &modules,
            &bgl,
            PipelineDesc {
                label: "rosette int quad pipeline",
                buffers: &[IntQuadInstance::layout()],
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                blend: Some(wgpu::BlendState::REPLACE),
            },
        );

        self.pipeline = Some(pipeline);
        self.pipeline_error = None;
        self.bind_group_layout = Some(bgl);

        self.bind_group = None;
        self.bound_texture = None;
        self.aspect_ubo = None;
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>, texture: &QuadTexture) {
        if self.bound_texture == Some(texture.id()) && self.bind_group.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let ubo = self.aspect_ubo.get_or_insert_with(|| {
            ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("rosette int quad aspect ubo"),
                size: std::mem::size_of::<AspectUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        self.bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rosette int quad bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(texture.sampler()),
                },
            ],
        }));
        self.bound_texture = Some(texture.id());
    }

    fn write_aspect_uniform(&self, ctx: &RenderCtx<'_>) {
        let Some(ubo) = self.aspect_ubo.as_ref() else { return };
        let u = AspectUniform::new(ctx.surface_size.aspect());
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::quad;
    use crate::render::testing::{assert_rgba_near, solid_texture, HeadlessGpu};

    const SIZE: u32 = 64;
    const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

    /// Pixel bounds `[x0, x1) x [y0, y1)` (rows from the top) of the NDC quad
    /// the CPU reference computes for `inst`.
    fn reference_bounds(inst: &IntQuadInstance) -> (u32, u32, u32, u32) {
        let half = SIZE as f32 / 2.0;
        let ndc = quad::expand_int(inst, Vec2::splat(SIZE as f32)).unwrap();
        let (x0, x1) = span(ndc.map(|p| ((p.x + 1.0) * half).round() as u32));
        let (y0, y1) = span(ndc.map(|p| ((1.0 - p.y) * half).round() as u32));
        (x0, x1, y0, y1)
    }

    fn span(v: [u32; 4]) -> (u32, u32) {
        (v.into_iter().min().unwrap(), v.into_iter().max().unwrap())
    }

    #[test]
    fn quad_lands_at_aspect_normalised_pixels() {
        let Some(gpu) = HeadlessGpu::new() else { return };
        let texture = solid_texture(&gpu, [255, 0, 0, 255]);
        let mut renderer = IntQuadRenderer::new();
        let inst = IntQuadInstance::new([16, 16], [16, 16], 0.5);

        let px = gpu.render_offscreen(SIZE, SIZE, |ctx, target| {
            renderer.render(ctx, target, &[inst], &texture);
        });
        assert!(renderer.error().is_none());

        // (pos + corner * size) / aspect * 2 - 1, NDC y up.
        let (x0, x1, y0, y1) = reference_bounds(&inst);
        assert_eq!((x0, x1, y0, y1), (16, 32, 32, 48));

        let red = [255, 0, 0, 255];
        for (x, y) in [(x0, y0), (x1 - 1, y0), (x0, y1 - 1), (x1 - 1, y1 - 1)] {
            assert_rgba_near(px.at(x, y), red);
        }
        for (x, y) in [(x0 - 1, y0), (x1, y0), (x0, y0 - 1), (x0, y1)] {
            assert_eq!(px.at(x, y), TRANSPARENT, "({x}, {y}) should be outside");
        }
    }

    #[test]
    fn texel_alpha_is_forced_opaque() {
        let Some(gpu) = HeadlessGpu::new() else { return };
        let texture = solid_texture(&gpu, [0, 0, 255, 0]);
        let mut renderer = IntQuadRenderer::new();
        let full = IntQuadInstance::new([0, 0], [SIZE as i32, SIZE as i32], 0.5);

        let px = gpu.render_offscreen(SIZE, SIZE, |ctx, target| {
            renderer.render(ctx, target, &[full], &texture);
        });

        let expected = quad::opaque([0.0, 0.0, 1.0, 0.0]).map(|v| (v * 255.0) as u8);
        assert_eq!(expected, [0, 0, 255, 255]);
        assert_rgba_near(px.at(10, 10), expected);
        assert_rgba_near(px.at(50, 50), expected);
    }

    #[test]
    fn depth_outside_unit_range_is_clipped() {
        let Some(gpu) = HeadlessGpu::new() else { return };
        let texture = solid_texture(&gpu, [255, 255, 255, 255]);
        let mut renderer = IntQuadRenderer::new();
        let behind = IntQuadInstance::new([0, 0], [SIZE as i32, SIZE as i32], 1.5);

        let px = gpu.render_offscreen(SIZE, SIZE, |ctx, target| {
            renderer.render(ctx, target, &[behind], &texture);
        });

        assert_eq!(px.at(32, 32), TRANSPARENT);
    }
}
