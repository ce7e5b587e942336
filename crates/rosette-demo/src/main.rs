use std::path::PathBuf;
use std::time::Instant;

use rosette_engine::coords::{ColorRgba, Vec2};
use rosette_engine::core::{App, AppControl, FrameCtx};
use rosette_engine::device::GpuInit;
use rosette_engine::logging::{init_logging, LoggingConfig};
use rosette_engine::quad;
use rosette_engine::render::{BasicRenderer, IntQuadRenderer, QuadTexture, SolidRenderer};
use rosette_engine::vertex::{BasicVertex, IntQuadInstance, ParamsUniform, SolidInstance};
use rosette_engine::window::{Runtime, RuntimeConfig};
use winit::event::{ElementState, MouseButton, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

/// Side of a click-spawned integer quad, in physical pixels.
const SPAWN_SIDE: i32 = 40;

#[derive(Debug, Clone)]
struct DemoConfig {
    texture_path: Option<PathBuf>,
    clear: ColorRgba,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            texture_path: None,
            clear: ColorRgba::from_u8(0xf4, 0xc2, 0xd7, 0xff),
        }
    }
}

impl DemoConfig {
    fn from_args() -> Self {
        Self {
            texture_path: std::env::args_os().nth(1).map(PathBuf::from),
            ..Self::default()
        }
    }
}

struct Demo {
    config: DemoConfig,

    basic: BasicRenderer,
    solid: SolidRenderer,
    int_quads: IntQuadRenderer,
    texture: Option<QuadTexture>,

    triangle: Vec<BasicVertex>,
    solid_instances: Vec<SolidInstance>,
    int_instances: Vec<IntQuadInstance>,

    cursor: Vec2,
    surface_size: Vec2,
    fullscreen_requested: bool,

    frames: u32,
    last_report: Instant,
}

impl Demo {
    fn new(config: DemoConfig) -> Self {
        let triangle = vec![
            BasicVertex::new([-0.9, -0.9, 0.0], ColorRgba::new(1.0, 0.0, 0.0, 1.0)),
            BasicVertex::new([-0.5, -0.9, 0.0], ColorRgba::new(0.0, 1.0, 0.0, 1.0)),
            BasicVertex::new([-0.7, -0.5, 0.0], ColorRgba::new(0.0, 0.0, 1.0, 1.0)),
        ];

        let solid_instances = (0..5)
            .map(|i| {
                let t = i as f32 / 4.0;
                SolidInstance::new(
                    Vec2::new(-0.9 + 0.36 * i as f32, 0.55),
                    Vec2::new(0.3, 0.3),
                    ColorRgba::new(1.0, 0.4 + 0.4 * t, 0.7 - 0.5 * t, 1.0),
                )
            })
            .collect();

        let int_instances = vec![
            IntQuadInstance::new([40, 40], [120, 80], 0.5),
            IntQuadInstance::new([200, 60], [64, 64], 0.25),
        ];

        Self {
            config,
            basic: BasicRenderer::new(),
            solid: SolidRenderer::new(),
            int_quads: IntQuadRenderer::new(),
            texture: None,
            triangle,
            solid_instances,
            int_instances,
            cursor: Vec2::zero(),
            surface_size: Vec2::new(1.0, 1.0),
            fullscreen_requested: false,
            frames: 0,
            last_report: Instant::now(),
        }
    }

    fn load_texture(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> anyhow::Result<QuadTexture> {
        if let Some(path) = &self.config.texture_path {
            match QuadTexture::from_image(device, queue, path) {
                Ok(t) => return Ok(t),
                Err(e) => log::warn!("{e:#}; using checkerboard"),
            }
        }
        QuadTexture::checkerboard(device, queue, 256, 32, [255, 255, 255, 255], [60, 20, 80, 255])
    }

    /// Left click or touch: integer quad centred on the cursor (pixel rows counted from the bottom).
    fn spawn_int_quad(&mut self) {
        let x = self.cursor.x.round() as i32;
        let y = (self.surface_size.y - self.cursor.y).round() as i32;
        self.int_instances
            .push(IntQuadInstance::centered([x, y], SPAWN_SIDE, 0.5));
        log::debug!("int quad at ({x}, {y}); {} total", self.int_instances.len());
    }

    /// Right click: solid quad whose top-left corner sits under the cursor.
    fn spawn_solid_quad(&mut self) {
        let Some(ndc) = quad::pixel_to_ndc(self.cursor, self.surface_size) else { return };
        let size = Vec2::new(0.15, -0.15 * self.surface_size.x / self.surface_size.y);
        self.solid_instances
            .push(SolidInstance::new(ndc, size, ColorRgba::new(0.2, 0.6, 1.0, 0.9)));
        log::debug!("solid quad at {ndc:?}; {} total", self.solid_instances.len());
    }

    fn report_fps(&mut self) {
        self.frames += 1;
        let elapsed = self.last_report.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            log::info!(
                "{:.1} fps, {} solid + {} int quads",
                self.frames as f32 / elapsed,
                self.solid_instances.len(),
                self.int_instances.len()
            );
            self.frames = 0;
            self.last_report = Instant::now();
        }
    }
}

impl App for Demo {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
            }
            WindowEvent::Resized(size) => {
                self.surface_size = Vec2::new(size.width.max(1) as f32, size.height.max(1) as f32);
            }
            WindowEvent::Touch(touch) if touch.phase == TouchPhase::Started => {
                self.cursor = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                self.spawn_int_quad();
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button, .. } => match button {
                MouseButton::Left => self.spawn_int_quad(),
                MouseButton::Right => self.spawn_solid_quad(),
                _ => {}
            },
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => return AppControl::Exit,
                    PhysicalKey::Code(KeyCode::F11) => self.fullscreen_requested = true,
                    PhysicalKey::Code(KeyCode::KeyC) => {
                        self.int_instances.clear();
                        self.solid_instances.clear();
                        log::info!("cleared quads");
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if std::mem::take(&mut self.fullscreen_requested) {
            ctx.runtime.toggle_fullscreen();
        }

        let size = ctx.gpu.size();
        self.surface_size = Vec2::new(size.width.max(1) as f32, size.height.max(1) as f32);

        if self.texture.is_none() {
            match self.load_texture(ctx.gpu.device(), ctx.gpu.queue()) {
                Ok(t) => self.texture = Some(t),
                Err(e) => {
                    log::error!("failed to create quad texture: {e:#}");
                    return AppControl::Exit;
                }
            }
        }

        let Self {
            config,
            basic,
            solid,
            int_quads,
            texture,
            triangle,
            solid_instances,
            int_instances,
            ..
        } = self;
        let Some(texture) = texture.as_ref() else { return AppControl::Continue };

        let control = ctx.render(config.clear, |rctx, target| {
            basic.render(rctx, target, triangle, ParamsUniform::new([0, 1, 2, 3]));
            solid.render(rctx, target, solid_instances, texture);
            int_quads.render(rctx, target, int_instances, texture);
        });

        self.report_fps();
        ctx.runtime.request_redraw();
        control
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = DemoConfig::from_args();
    log::info!(
        "left click/touch: int quad, right click: solid quad, C: clear, F11: fullscreen, Esc: quit"
    );

    Runtime::run(
        RuntimeConfig {
            title: "shades of pink".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        Demo::new(config),
    )
}
