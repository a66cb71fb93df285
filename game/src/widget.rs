//! The consolidated skill-tree widget: owns the store, layout, camera and
//! scene cache, translates pointer input into actions, and batches rebuilds
//! behind a dirty flag (at most one scene rebuild per frame).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use engine::ui::Rect;

use crate::camera::{Camera, DragState};
use crate::layout::{LayoutConfig, Vec2f, compute_positions};
use crate::scene::{Scene, build_scene, node_radius};
use crate::store::{EffectSink, NodeState, ProgressData, SkillTreeStore};
use crate::sync::{LoadOutcome, SyncBridge};
use crate::toast::Toasts;
use crate::tree::SkillTreeDef;

pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(350);

/// In-process pub/sub: drained by the host each frame and forwarded to
/// whichever sibling panel cares.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    NodeSelected { node_id: String },
    FilterChanged { specialization_id: Option<String> },
    DataLoaded,
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Loading,
    Ready,
    /// Terminal: initial load exhausted its retries. The tree is not drawn.
    Failed,
}

pub struct SkillTreeWidget {
    positions: HashMap<String, Vec2f>,
    store: SkillTreeStore,
    camera: Camera,
    drag: DragState,
    toasts: Toasts,
    effects: Box<dyn EffectSink>,
    sync: Option<SyncBridge>,

    selected: Option<String>,
    hovered: Option<String>,
    filter: Option<String>,

    scene: Scene,
    dirty: bool,
    rebuilds: u64,

    phase: LoadPhase,
    events: Vec<WidgetEvent>,
    last_empty_click: Option<Instant>,
}

impl SkillTreeWidget {
    pub fn new(
        def: SkillTreeDef,
        layout: &LayoutConfig,
        mut sync: Option<SyncBridge>,
        effects: Box<dyn EffectSink>,
    ) -> Self {
        let positions = compute_positions(&def, layout);
        let phase = match sync.as_mut() {
            Some(bridge) => {
                bridge.begin_load();
                LoadPhase::Loading
            }
            None => LoadPhase::Ready,
        };

        Self {
            positions,
            store: SkillTreeStore::new(def, ProgressData::default()),
            camera: Camera::default(),
            drag: DragState::default(),
            toasts: Toasts::default(),
            effects,
            sync,
            selected: None,
            hovered: None,
            filter: None,
            scene: Scene::default(),
            dirty: true,
            rebuilds: 0,
            phase,
            events: vec![],
            last_empty_click: None,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn store(&self) -> &SkillTreeStore {
        &self.store
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn drain_events(&mut self) -> Vec<WidgetEvent> {
        std::mem::take(&mut self.events)
    }

    /// Replaces progress wholesale (session load / reset) and marks dirty.
    /// A reset is a state mutation like any other, so it is persisted too;
    /// server-initiated loads go through `poll_sync` instead and are not
    /// echoed back.
    pub fn reset_progress(&mut self, progress: ProgressData) {
        self.store.reset(progress);
        self.dirty = true;
        self.save_progress();
    }

    pub fn set_filter(&mut self, specialization_id: Option<String>) {
        if self.filter == specialization_id {
            return;
        }
        self.filter = specialization_id.clone();
        self.dirty = true;
        self.events.push(WidgetEvent::FilterChanged {
            specialization_id,
        });
    }

    /// Screen-space node hit test against the current camera transform.
    pub fn node_at(&self, pos: (f32, f32), viewport: Rect) -> Option<&str> {
        let mut best: Option<(&str, f32)> = None;
        for node in &self.store.def().nodes {
            let Some(&world) = self.positions.get(&node.id) else {
                continue;
            };
            let (sx, sy) = self.camera.world_to_screen(world, viewport);
            let radius = node_radius(node.tier) as f32 * self.camera.scale;
            let dx = pos.0 - sx;
            let dy = pos.1 - sy;
            let d2 = dx * dx + dy * dy;
            if d2 <= radius * radius && best.map(|(_, b)| d2 < b).unwrap_or(true) {
                best = Some((node.id.as_str(), d2));
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn pointer_pressed(&mut self, pos: (f32, f32), viewport: Rect) {
        let over_node = self.node_at(pos, viewport).is_some();
        self.drag.on_press(pos, over_node);
    }

    pub fn pointer_moved(&mut self, pos: (f32, f32), viewport: Rect) {
        self.drag.on_move(pos, &mut self.camera);

        let hovered = self.node_at(pos, viewport).map(str::to_string);
        if hovered != self.hovered {
            self.hovered = hovered;
            self.dirty = true;
        }
    }

    pub fn pointer_released(&mut self, pos: (f32, f32), viewport: Rect) {
        let was_drag = self.drag.on_release();
        if was_drag {
            return;
        }

        if let Some(id) = self.node_at(pos, viewport).map(str::to_string) {
            self.last_empty_click = None;
            self.click_node(&id);
            return;
        }

        // Double-click on empty canvas resets the view.
        let now = Instant::now();
        if self
            .last_empty_click
            .is_some_and(|t| now.duration_since(t) <= DOUBLE_CLICK_WINDOW)
        {
            self.camera.reset();
            self.last_empty_click = None;
        } else {
            self.last_empty_click = Some(now);
        }
    }

    pub fn wheel(&mut self, wheel_y: f32, cursor: (f32, f32), viewport: Rect) {
        // Camera transforms apply at draw time; no scene rebuild needed.
        self.camera.apply_wheel_zoom(wheel_y, cursor, viewport);
    }

    /// Selects the node and attempts its contextual transition: unlockable
    /// nodes unlock, unlocked activate, active deactivate. Precondition
    /// failures surface as toasts, never as state changes.
    fn click_node(&mut self, id: &str) {
        if self.selected.as_deref() != Some(id) {
            self.selected = Some(id.to_string());
            self.dirty = true;
        }
        self.events.push(WidgetEvent::NodeSelected {
            node_id: id.to_string(),
        });

        let Some(state) = self.store.state_of(id) else {
            return;
        };

        let result = match state {
            NodeState::Locked => return,
            NodeState::Unlockable => self.store.unlock(id),
            NodeState::Unlocked => self.store.activate(id, self.effects.as_mut()),
            NodeState::Active => self.store.deactivate(id, self.effects.as_mut()),
        };

        match result {
            Ok(()) => {
                let name = self
                    .store
                    .node(id)
                    .map(|n| n.name.clone())
                    .unwrap_or_else(|| id.to_string());
                let verb = match state {
                    NodeState::Unlockable => "UNLOCKED",
                    NodeState::Unlocked => "ACTIVATED",
                    _ => "DEACTIVATED",
                };
                self.toasts.info(format!("{verb} {name}"));
                self.dirty = true;
                self.save_progress();
            }
            Err(err) => {
                self.toasts.error(err.to_string());
            }
        }
    }

    fn save_progress(&mut self) {
        if let Some(bridge) = &self.sync {
            bridge.save(self.store.progress().clone());
        }
    }

    fn poll_sync(&mut self) {
        let Some(bridge) = self.sync.as_mut() else {
            return;
        };

        if self.phase == LoadPhase::Loading {
            match bridge.poll_load() {
                Some(LoadOutcome::Loaded(progress)) => {
                    self.store.reset(progress);
                    self.phase = LoadPhase::Ready;
                    self.dirty = true;
                    self.events.push(WidgetEvent::DataLoaded);
                }
                Some(LoadOutcome::Failed(message)) => {
                    self.phase = LoadPhase::Failed;
                    self.toasts.error("FAILED TO LOAD PROGRESS");
                    self.events.push(WidgetEvent::Error { message });
                }
                None => {}
            }
        }

        for message in bridge.poll_save_failures() {
            self.toasts.error("SAVE FAILED");
            self.events.push(WidgetEvent::Error { message });
        }
    }

    /// Per-frame upkeep. However many mutations happened since the last call,
    /// the scene is rebuilt at most once here.
    pub fn frame(&mut self, dt: Duration) {
        self.poll_sync();
        self.toasts.tick(dt);

        if self.dirty {
            self.scene = build_scene(
                self.store.def(),
                &self.positions,
                &self.store.snapshot(),
                self.selected.as_deref(),
                self.hovered.as_deref(),
                self.filter.as_deref(),
            );
            self.dirty = false;
            self.rebuilds += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NullEffectSink;
    use crate::tree::{ConnectionDef, NodeCost, SkillNodeDef, SpecializationDef,
        normalize_and_validate};

    fn viewport() -> Rect {
        Rect::from_size(800, 600)
    }

    fn node(id: &str, tier: u32, spec: &str, reputation: u32, skill_points: u32) -> SkillNodeDef {
        SkillNodeDef {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: String::new(),
            tier,
            specialization: Some(spec.to_string()),
            cost: NodeCost {
                reputation,
                skill_points,
            },
            effects: vec![],
        }
    }

    fn test_def() -> SkillTreeDef {
        let mut def = SkillTreeDef {
            version: 1,
            specializations: vec![SpecializationDef {
                id: "theory".to_string(),
                name: "TREATMENT PLANNING".to_string(),
                color: [80, 160, 255, 255],
                base_angle_deg: 45.0,
                span_deg: 90.0,
            }],
            nodes: vec![node("core", 0, "core", 0, 0), node("a", 1, "theory", 5, 2)],
            connections: vec![ConnectionDef {
                source: "core".to_string(),
                target: "a".to_string(),
            }],
        };
        normalize_and_validate(&mut def);
        def
    }

    fn test_widget(reputation: u32, skill_points: u32) -> SkillTreeWidget {
        let mut widget = SkillTreeWidget::new(
            test_def(),
            &LayoutConfig::default(),
            None,
            Box::new(NullEffectSink),
        );
        widget.reset_progress(ProgressData {
            version: 1,
            reputation,
            skill_points_available: skill_points,
            unlocked_skills: vec!["core".to_string()],
            active_skills: vec!["core".to_string()],
        });
        widget.drain_events();
        widget
    }

    fn screen_pos(widget: &SkillTreeWidget, id: &str) -> (f32, f32) {
        let world = widget.positions[id];
        widget.camera.world_to_screen(world, viewport())
    }

    fn click(widget: &mut SkillTreeWidget, pos: (f32, f32)) {
        widget.pointer_pressed(pos, viewport());
        widget.pointer_released(pos, viewport());
    }

    #[test]
    fn many_mutations_rebuild_the_scene_once_per_frame() {
        let mut widget = test_widget(10, 5);
        widget.set_filter(Some("theory".to_string()));
        widget.set_filter(None);
        let pos = screen_pos(&widget, "a");
        widget.pointer_moved(pos, viewport());

        widget.frame(Duration::from_millis(16));
        assert_eq!(widget.rebuild_count(), 1);

        // Nothing changed: no rebuild on the next frame.
        widget.frame(Duration::from_millis(16));
        assert_eq!(widget.rebuild_count(), 1);
    }

    #[test]
    fn clicking_an_unlockable_node_unlocks_it_and_emits_selection() {
        let mut widget = test_widget(10, 5);
        let pos = screen_pos(&widget, "a");
        click(&mut widget, pos);

        assert_eq!(widget.store().state_of("a"), Some(NodeState::Unlocked));
        assert_eq!(widget.store().progress().reputation, 5);
        assert!(widget.drain_events().contains(&WidgetEvent::NodeSelected {
            node_id: "a".to_string()
        }));
        assert!(!widget.toasts().is_empty());
    }

    #[test]
    fn clicking_with_insufficient_reputation_only_toasts() {
        let mut widget = test_widget(1, 0);
        let pos = screen_pos(&widget, "a");
        click(&mut widget, pos);

        assert_eq!(widget.store().state_of("a"), Some(NodeState::Unlockable));
        assert_eq!(widget.store().progress().reputation, 1);
        assert!(!widget.toasts().is_empty());
    }

    #[test]
    fn clicking_a_core_node_never_deactivates_it() {
        let mut widget = test_widget(0, 0);
        let pos = screen_pos(&widget, "core");
        click(&mut widget, pos);

        assert_eq!(widget.store().state_of("core"), Some(NodeState::Active));
    }

    #[test]
    fn double_click_on_empty_canvas_resets_the_camera() {
        let mut widget = test_widget(0, 0);
        widget.wheel(1.0, (100.0, 100.0), viewport());
        assert_ne!(*widget.camera(), Camera::default());

        let empty = (780.0, 20.0);
        click(&mut widget, empty);
        click(&mut widget, empty);
        assert_eq!(*widget.camera(), Camera::default());
    }

    #[test]
    fn dragging_from_empty_canvas_pans_instead_of_clicking() {
        let mut widget = test_widget(10, 0);
        widget.pointer_pressed((700.0, 500.0), viewport());
        widget.pointer_moved((650.0, 480.0), viewport());
        widget.pointer_released((650.0, 480.0), viewport());

        assert_eq!(widget.camera().offset, Vec2f::new(-50.0, -20.0));
        // The release ended a drag, so no node action happened.
        assert_eq!(widget.store().progress().reputation, 10);
    }

    #[test]
    fn drag_starting_on_a_node_does_not_pan() {
        let mut widget = test_widget(10, 0);
        let pos = screen_pos(&widget, "core");
        widget.pointer_pressed(pos, viewport());
        widget.pointer_moved((pos.0 + 60.0, pos.1 + 60.0), viewport());
        widget.pointer_released((pos.0 + 60.0, pos.1 + 60.0), viewport());

        assert_eq!(widget.camera().offset, Vec2f::new(0.0, 0.0));
    }

    #[test]
    fn filter_changes_are_announced_once() {
        let mut widget = test_widget(0, 0);
        widget.set_filter(Some("theory".to_string()));
        widget.set_filter(Some("theory".to_string()));

        let events = widget.drain_events();
        let filter_events = events
            .iter()
            .filter(|e| matches!(e, WidgetEvent::FilterChanged { .. }))
            .count();
        assert_eq!(filter_events, 1);
    }

    #[test]
    fn offline_widget_is_immediately_ready() {
        let widget = test_widget(0, 0);
        assert_eq!(widget.phase(), LoadPhase::Ready);
    }
}
