use crate::quad::VERTICES_PER_QUAD;
use crate::render::shader::{self, ShaderError};
use crate::render::{QuadTexture, RenderCtx, RenderTarget};
use crate::vertex::SolidInstance;

use super::common::{
    alpha_blend, begin_load_pass, create_pipeline, sampler_entry, texture_entry, GrowableBuffer,
    PipelineDesc,
};

/// Instanced quad renderer (`solid.vert` + `solid.frag`).
///
/// Each instance is a clip-space corner + size + colour, expanded to a
/// 4-vertex triangle strip. The fragment colour is an even mix of the
/// instance colour and the texture sampled at the quad-local coordinate.
pub struct SolidRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    pipeline_error: Option<ShaderError>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    bound_texture: Option<u64>,

    instance_vbo: GrowableBuffer,
}

impl Default for SolidRenderer {
    fn default() -> Self {
        Self {
            pipeline_format: None,
            pipeline: None,
            pipeline_error: None,
            bind_group_layout: None,
            bind_group: None,
            bound_texture: None,
            instance_vbo: GrowableBuffer::new("rosette solid instance vbo"),
        }
    }
}

impl SolidRenderer {
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
        instances: &[SolidInstance],
        texture: &QuadTexture,
    ) {
        if instances.is_empty() {
            return;
        }
        self.ensure_pipeline(ctx);
        self.ensure_bindings(ctx, texture);

        let Some(vbo) = self.instance_vbo.write(ctx, instances) else { return };
        let (Some(pipeline), Some(bind_group)) = (self.pipeline.as_ref(), self.bind_group.as_ref())
        else {
            return;
        };

        let mut rpass = begin_load_pass(target, "rosette solid pass");
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

        let modules = match shader::SOLID.create_modules(ctx.device) {
            Ok(m) => m,
            Err(e) => {
                log::error!("SolidRenderer disabled: {e}");
                self.pipeline = None;
                self.pipeline_error = Some(e);
                return;
            }
        };

        let bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rosette solid bgl"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });

        let pipeline = create_pipeline(
            ctx,
            &modules,
            &bgl,
            PipelineDesc {
                label: "rosette solid pipeline",
                buffers: &[SolidInstance::layout()],
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                blend: Some(alpha_blend()),
            },
        );

        self.pipeline = Some(pipeline);
        self.pipeline_error = None;
        self.bind_group_layout = Some(bgl);

        // Layout changed; force a rebuild against the new one.
        self.bind_group = None;
        self.bound_texture = None;
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>, texture: &QuadTexture) {
        if self.bound_texture == Some(texture.id()) && self.bind_group.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        self.bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rosette solid bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(texture.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(texture.sampler()),
                },
            ],
        }));
        self.bound_texture = Some(texture.id());
    }
}
