//! Zoom/pan view state. One affine transform for the whole scene: screen =
//! viewport center + offset + world * scale.

use engine::ui::Rect;

use crate::layout::Vec2f;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 2.0;
pub const ZOOM_STEP: f32 = 0.1;
pub const DRAG_THRESHOLD_PX: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub scale: f32,
    pub offset: Vec2f,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2f::new(0.0, 0.0),
        }
    }
}

impl Camera {
    pub fn reset(&mut self) {
        *self = Camera::default();
    }

    pub fn world_to_screen(&self, world: Vec2f, viewport: Rect) -> (f32, f32) {
        let (cx, cy) = viewport.center();
        (
            cx as f32 + self.offset.x + world.x * self.scale,
            cy as f32 + self.offset.y + world.y * self.scale,
        )
    }

    pub fn screen_to_world(&self, sx: f32, sy: f32, viewport: Rect) -> Vec2f {
        let (cx, cy) = viewport.center();
        Vec2f::new(
            (sx - cx as f32 - self.offset.x) / self.scale,
            (sy - cy as f32 - self.offset.y) / self.scale,
        )
    }

    /// One zoom step per wheel notch, clamped, solved so the world point under
    /// the cursor stays put on screen.
    pub fn apply_wheel_zoom(&mut self, wheel_y: f32, cursor: (f32, f32), viewport: Rect) {
        if wheel_y == 0.0 {
            return;
        }

        let step = if wheel_y > 0.0 { ZOOM_STEP } else { -ZOOM_STEP };
        let new_scale = (self.scale + step).clamp(MIN_ZOOM, MAX_ZOOM);
        if new_scale == self.scale {
            return;
        }

        let anchor = self.screen_to_world(cursor.0, cursor.1, viewport);
        let (cx, cy) = viewport.center();
        self.offset.x = cursor.0 - cx as f32 - anchor.x * new_scale;
        self.offset.y = cursor.1 - cy as f32 - anchor.y * new_scale;
        self.scale = new_scale;
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset.x += dx;
        self.offset.y += dy;
    }
}

/// Pointer-drag tracker. A press over a node never arms a drag, and panning
/// only begins once the pointer has moved past a small threshold, so node
/// clicks stay clicks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DragState {
    anchor: Option<(f32, f32)>,
    last: (f32, f32),
    dragging: bool,
}

impl DragState {
    pub fn on_press(&mut self, pos: (f32, f32), over_node: bool) {
        if over_node {
            return;
        }
        self.anchor = Some(pos);
        self.last = pos;
        self.dragging = false;
    }

    pub fn on_move(&mut self, pos: (f32, f32), camera: &mut Camera) {
        let Some(anchor) = self.anchor else {
            return;
        };

        if !self.dragging {
            let dx = pos.0 - anchor.0;
            let dy = pos.1 - anchor.1;
            if dx * dx + dy * dy >= DRAG_THRESHOLD_PX * DRAG_THRESHOLD_PX {
                self.dragging = true;
            }
        }

        if self.dragging {
            camera.pan_by(pos.0 - self.last.0, pos.1 - self.last.1);
        }
        self.last = pos;
    }

    /// Ends the gesture; returns true if it was a drag (so the release should
    /// not count as a click).
    pub fn on_release(&mut self) -> bool {
        let was_drag = self.dragging;
        self.anchor = None;
        self.dragging = false;
        was_drag
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}
