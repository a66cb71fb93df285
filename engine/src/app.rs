use std::error::Error;
use std::time::{Duration, Instant};

use pixels::{PixelsBuilder, SurfaceTexture};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::graphics::Renderer2d;
use crate::pixels_renderer::PixelsRenderer2d;
use crate::surface::SurfaceSize;

pub struct AppConfig {
    pub title: String,
    pub desired_size: PhysicalSize<u32>,
    pub clamp_to_monitor: bool,
    pub vsync: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            desired_size: PhysicalSize::new(1280, 800),
            clamp_to_monitor: true,
            vsync: None,
        }
    }
}

/// Per-frame pointer input, reset after every update.
///
/// `mouse_down`/`mouse_up` are edges (pressed/released this frame), not
/// levels; `wheel_y` accumulates scroll lines since the last frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputFrame {
    pub mouse_pos: Option<(u32, u32)>,
    pub mouse_down: bool,
    pub mouse_up: bool,
    pub wheel_y: f32,
}

pub trait GameApp {
    fn update(&mut self, input: InputFrame, dt: Duration, size: SurfaceSize);
    fn render(&mut self, gfx: &mut dyn Renderer2d);

    /// Returning true requests shutdown after this frame.
    fn wants_exit(&self) -> bool {
        false
    }
}

pub fn run_game<G: GameApp + 'static>(config: AppConfig, mut game: G) -> Result<(), Box<dyn Error>> {
    let event_loop = EventLoop::new();

    let monitor_size = if config.clamp_to_monitor {
        event_loop.primary_monitor().map(|m| m.size())
    } else {
        None
    };
    let initial_size = match monitor_size {
        Some(monitor) => PhysicalSize::new(
            config.desired_size.width.min(monitor.width),
            config.desired_size.height.min(monitor.height),
        ),
        None => config.desired_size,
    };

    let window = WindowBuilder::new()
        .with_title(config.title)
        .with_inner_size(initial_size)
        .build(&event_loop)?;

    let window_size = window.inner_size();
    let surface_size = SurfaceSize::new(window_size.width, window_size.height);

    let surface_texture = SurfaceTexture::new(surface_size.width, surface_size.height, &window);
    let mut builder = PixelsBuilder::new(surface_size.width, surface_size.height, surface_texture);
    if let Some(vsync) = config.vsync {
        builder = builder.enable_vsync(vsync);
    }
    let pixels = builder.build()?;
    let mut renderer = PixelsRenderer2d::new(pixels, surface_size)?;

    let mut input = InputFrame::default();
    let mut last_frame = Instant::now();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match &event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::Resized(size) => {
                    if let Err(err) = renderer.resize(SurfaceSize::new(size.width, size.height)) {
                        eprintln!("resize failed: {err}");
                    }
                    window.request_redraw();
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input.mouse_pos = Some((position.x.max(0.0) as u32, position.y.max(0.0) as u32));
                }
                WindowEvent::MouseInput {
                    state: mouse_state,
                    button: MouseButton::Left,
                    ..
                } => match mouse_state {
                    ElementState::Pressed => input.mouse_down = true,
                    ElementState::Released => input.mouse_up = true,
                },
                WindowEvent::MouseWheel { delta, .. } => {
                    input.wheel_y += match delta {
                        MouseScrollDelta::LineDelta(_, y) => *y,
                        MouseScrollDelta::PixelDelta(pos) => (pos.y / 40.0) as f32,
                    };
                }
                _ => {}
            },
            Event::RedrawRequested(_) => {
                let now = Instant::now();
                let dt = now.saturating_duration_since(last_frame);
                last_frame = now;

                game.update(input, dt, renderer.size());
                renderer.draw_frame(|gfx| game.render(gfx));
                if let Err(err) = renderer.present() {
                    eprintln!("present failed: {err}");
                }

                input.mouse_down = false;
                input.mouse_up = false;
                input.wheel_y = 0.0;

                if game.wants_exit() {
                    *control_flow = ControlFlow::Exit;
                }
            }
            Event::MainEventsCleared => {
                window.request_redraw();
            }
            _ => {}
        }
    });
}
