use std::error::Error;
use std::time::Duration;

use engine::app::{AppConfig, GameApp, InputFrame, run_game};
use engine::graphics::Renderer2d;
use engine::surface::SurfaceSize;
use engine::ui::Rect;
use winit::dpi::PhysicalSize;

use game::layout::LayoutConfig;
use game::store::NullEffectSink;
use game::sync::{ApiClient, SyncBridge};
use game::tree;
use game::ui;
use game::widget::SkillTreeWidget;

struct MedPhysApp {
    widget: SkillTreeWidget,
    viewport: Rect,
    mouse: (f32, f32),
    // A press consumed by a filter tab must not leak into the canvas as an
    // empty-click on release.
    tab_press: bool,
    // Keeps the sync bridge's tasks running for the life of the window.
    _runtime: tokio::runtime::Runtime,
}

impl GameApp for MedPhysApp {
    fn update(&mut self, input: InputFrame, dt: Duration, size: SurfaceSize) {
        self.viewport = Rect::from_size(size.width, size.height);

        if let Some((x, y)) = input.mouse_pos {
            let pos = (x as f32, y as f32);
            if pos != self.mouse {
                self.mouse = pos;
                self.widget.pointer_moved(pos, self.viewport);
            }
        }

        if input.mouse_down {
            match ui::tab_at(self.widget.store().def(), self.viewport, self.mouse) {
                Some(filter) => {
                    self.tab_press = true;
                    self.widget.set_filter(filter);
                }
                None => self.widget.pointer_pressed(self.mouse, self.viewport),
            }
        }
        if input.mouse_up {
            if self.tab_press {
                self.tab_press = false;
            } else {
                self.widget.pointer_released(self.mouse, self.viewport);
            }
        }
        if input.wheel_y != 0.0 {
            self.widget.wheel(input.wheel_y, self.mouse, self.viewport);
        }

        self.widget.frame(dt);
        for event in self.widget.drain_events() {
            tracing::debug!(?event, "widget event");
        }
    }

    fn render(&mut self, gfx: &mut dyn Renderer2d) {
        ui::draw_widget(gfx, &self.widget, self.viewport);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let (def, def_path) = tree::load_default();
    match &def_path {
        Some(path) => tracing::info!("loaded skill tree from {path:?}"),
        None => tracing::info!("using compiled-in skill tree"),
    }

    let client = ApiClient::from_env();
    tracing::info!("syncing progress with {}", client.base_url());
    let bridge = SyncBridge::new(client, runtime.handle().clone());

    let widget = SkillTreeWidget::new(
        def,
        &LayoutConfig::default(),
        Some(bridge),
        Box::new(NullEffectSink),
    );

    let app = MedPhysApp {
        widget,
        viewport: Rect::from_size(1280, 800),
        mouse: (0.0, 0.0),
        tab_press: false,
        _runtime: runtime,
    };

    run_game(
        AppConfig {
            title: "MEDICAL PHYSICS".to_string(),
            desired_size: PhysicalSize::new(1280, 800),
            ..AppConfig::default()
        },
        app,
    )
}
