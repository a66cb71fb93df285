//! Write-only drawing of the widget through `Renderer2d`, plus the screen
//! layout for the HUD, filter tabs, tooltip and toasts.

use engine::graphics::{Color, Renderer2d, dim_color, line_advance_y, text_width};
use engine::ui::Rect;

use crate::camera::Camera;
use crate::layout::Vec2f;
use crate::scene::{ConnectionClass, SceneNode, Tooltip};
use crate::toast::ToastKind;
use crate::tree::{CONNECTOR_SPECIALIZATION, CORE_SPECIALIZATION, SkillTreeDef};
use crate::widget::{LoadPhase, SkillTreeWidget};

pub const BACKGROUND: Color = [12, 14, 22, 255];
pub const PANEL_BG: Color = [22, 26, 38, 255];
pub const PANEL_BORDER: Color = [70, 78, 104, 255];
pub const TEXT: Color = [225, 230, 240, 255];
pub const TEXT_DIM: Color = [140, 148, 168, 255];
pub const ERROR: Color = [235, 90, 90, 255];

const TAB_HEIGHT: u32 = 18;
const TAB_GAP: u32 = 6;
const HUD_MARGIN: u32 = 8;

pub fn connection_color(class: ConnectionClass) -> Color {
    match class {
        ConnectionClass::Active => [120, 235, 170, 255],
        ConnectionClass::Unlocked => [190, 205, 240, 255],
        ConnectionClass::Available => [240, 200, 110, 255],
        ConnectionClass::Locked => [58, 62, 80, 255],
    }
}

fn to_screen(camera: &Camera, world: Vec2f, viewport: Rect) -> (i32, i32) {
    let (sx, sy) = camera.world_to_screen(world, viewport);
    (sx.round() as i32, sy.round() as i32)
}

pub fn draw_widget(gfx: &mut dyn Renderer2d, widget: &SkillTreeWidget, viewport: Rect) {
    gfx.clear(BACKGROUND);

    match widget.phase() {
        LoadPhase::Loading => {
            draw_centered_text(gfx, viewport, "LOADING SKILL TREE...", TEXT_DIM);
            draw_toasts(gfx, widget, viewport);
            return;
        }
        LoadPhase::Failed => {
            draw_centered_text(gfx, viewport, "SKILL TREE UNAVAILABLE", ERROR);
            draw_toasts(gfx, widget, viewport);
            return;
        }
        LoadPhase::Ready => {}
    }

    let scene = widget.scene();
    let camera = widget.camera();

    for edge in &scene.edges {
        let (x0, y0) = to_screen(camera, edge.from, viewport);
        let (x1, y1) = to_screen(camera, edge.to, viewport);
        gfx.draw_line(x0, y0, x1, y1, connection_color(edge.class));
    }

    for node in &scene.nodes {
        draw_node(gfx, camera, node, viewport);
    }

    if let Some(tooltip) = &scene.tooltip {
        draw_tooltip(gfx, camera, tooltip, viewport);
    }

    draw_hud(gfx, widget, viewport);
    draw_filter_tabs(gfx, widget, viewport);
    draw_toasts(gfx, widget, viewport);
}

fn draw_node(gfx: &mut dyn Renderer2d, camera: &Camera, node: &SceneNode, viewport: Rect) {
    let (cx, cy) = to_screen(camera, node.pos, viewport);
    let radius = (node.visual.radius as f32 * camera.scale).round().max(2.0) as u32;

    if let Some(glow) = node.visual.glow {
        gfx.blend_circle(cx, cy, radius + 6, glow, 70);
    }
    gfx.fill_circle(cx, cy, radius, node.visual.fill);
    gfx.circle_outline(cx, cy, radius, node.visual.outline);

    if node.visual.label_opacity > 0 {
        // Opacity fades the label toward the background instead of popping
        // it in and out.
        let color = dim_color(TEXT, node.visual.label_opacity as f32 / 255.0);
        let w = text_width(&node.label, 1);
        let x = (cx - (w / 2) as i32).max(0) as u32;
        let y = (cy + radius as i32 + 4).max(0) as u32;
        gfx.draw_text_scaled(x, y, &node.label, color, 1);
    }
}

fn draw_tooltip(gfx: &mut dyn Renderer2d, camera: &Camera, tooltip: &Tooltip, viewport: Rect) {
    let mut lines: Vec<(&str, Color)> = vec![
        (tooltip.title.as_str(), TEXT),
        (tooltip.specialization.as_str(), TEXT_DIM),
    ];
    if !tooltip.description.is_empty() {
        lines.push((tooltip.description.as_str(), TEXT_DIM));
    }
    for effect in &tooltip.effect_lines {
        lines.push((effect.as_str(), TEXT));
    }
    lines.push((tooltip.cost_line.as_str(), TEXT));

    let pad = 6u32;
    let line_h = line_advance_y(1);
    let w = lines
        .iter()
        .map(|(line, _)| text_width(line, 1))
        .max()
        .unwrap_or(0)
        + pad * 2;
    let h = lines.len() as u32 * line_h + pad * 2;

    // Anchor beside the node, clamped fully into the viewport.
    let (ax, ay) = to_screen(camera, tooltip.anchor, viewport);
    let max_x = viewport.x + viewport.w.saturating_sub(w);
    let max_y = viewport.y + viewport.h.saturating_sub(h);
    let x = (ax + 18).clamp(viewport.x as i32, max_x.max(viewport.x) as i32) as u32;
    let y = (ay - h as i32 / 2).clamp(viewport.y as i32, max_y.max(viewport.y) as i32) as u32;

    let panel = Rect::new(x, y, w, h);
    gfx.fill_rect(panel, PANEL_BG);
    gfx.rect_outline(panel, PANEL_BORDER);

    for (i, (line, color)) in lines.iter().enumerate() {
        gfx.draw_text_scaled(x + pad, y + pad + i as u32 * line_h, line, *color, 1);
    }
}

fn draw_hud(gfx: &mut dyn Renderer2d, widget: &SkillTreeWidget, viewport: Rect) {
    let progress = widget.store().progress();
    let hud = format!(
        "REP {}  SP {}",
        progress.reputation, progress.skill_points_available
    );
    gfx.draw_text(viewport.x + HUD_MARGIN, viewport.y + HUD_MARGIN, &hud, TEXT);
}

/// Tab layout shared by drawing and hit-testing: an ALL tab plus one per
/// filterable specialization. `None` means no filter.
pub fn tab_rects(def: &SkillTreeDef, viewport: Rect) -> Vec<(Rect, Option<String>)> {
    let mut tabs = Vec::with_capacity(def.specializations.len() + 1);
    let y = viewport.y + HUD_MARGIN + line_advance_y(2) + 4;
    let mut x = viewport.x + HUD_MARGIN;

    let mut push = |x: &mut u32, label: &str, id: Option<String>, tabs: &mut Vec<_>| {
        let w = text_width(label, 1) + 12;
        tabs.push((Rect::new(*x, y, w, TAB_HEIGHT), id));
        *x += w + TAB_GAP;
    };

    push(&mut x, "ALL", None, &mut tabs);
    for spec in &def.specializations {
        if spec.id == CORE_SPECIALIZATION || spec.id == CONNECTOR_SPECIALIZATION {
            continue;
        }
        push(&mut x, &spec.name, Some(spec.id.clone()), &mut tabs);
    }
    tabs
}

/// The filter a click at `pos` selects, if it hits a tab.
pub fn tab_at(def: &SkillTreeDef, viewport: Rect, pos: (f32, f32)) -> Option<Option<String>> {
    if pos.0 < 0.0 || pos.1 < 0.0 {
        return None;
    }
    let (px, py) = (pos.0 as u32, pos.1 as u32);
    tab_rects(def, viewport)
        .into_iter()
        .find(|(rect, _)| rect.contains(px, py))
        .map(|(_, id)| id)
}

fn draw_filter_tabs(gfx: &mut dyn Renderer2d, widget: &SkillTreeWidget, viewport: Rect) {
    for (rect, id) in tab_rects(widget.store().def(), viewport) {
        let selected = widget.filter() == id.as_deref();
        gfx.fill_rect(rect, if selected { PANEL_BORDER } else { PANEL_BG });
        gfx.rect_outline(rect, PANEL_BORDER);

        let label = match &id {
            None => "ALL".to_string(),
            Some(spec_id) => widget
                .store()
                .def()
                .specializations
                .iter()
                .find(|s| &s.id == spec_id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| spec_id.clone()),
        };
        let ty = rect.y + (rect.h.saturating_sub(line_advance_y(1))) / 2 + 1;
        gfx.draw_text_scaled(rect.x + 6, ty, &label, if selected { TEXT } else { TEXT_DIM }, 1);
    }
}

fn draw_toasts(gfx: &mut dyn Renderer2d, widget: &SkillTreeWidget, viewport: Rect) {
    let pad = 6u32;
    let line_h = line_advance_y(1);
    let h = line_h + pad * 2;
    let (cx, _) = viewport.center();

    for (i, toast) in widget.toasts().iter().enumerate() {
        let w = text_width(&toast.text, 1) + pad * 2;
        let x = cx.saturating_sub(w / 2);
        let y = (viewport.y + viewport.h)
            .saturating_sub((i as u32 + 1) * (h + 4) + HUD_MARGIN);

        let panel = Rect::new(x, y, w, h);
        let border = match toast.kind {
            ToastKind::Info => PANEL_BORDER,
            ToastKind::Error => ERROR,
        };
        gfx.fill_rect(panel, PANEL_BG);
        gfx.rect_outline(panel, border);
        gfx.draw_text_scaled(x + pad, y + pad, &toast.text, TEXT, 1);
    }
}

fn draw_centered_text(gfx: &mut dyn Renderer2d, viewport: Rect, text: &str, color: Color) {
    let (cx, cy) = viewport.center();
    let w = text_width(text, 2);
    gfx.draw_text(cx.saturating_sub(w / 2), cy, text, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tree::SpecializationDef;

    fn def_with_specs() -> SkillTreeDef {
        SkillTreeDef {
            version: 1,
            specializations: vec![
                SpecializationDef {
                    id: "theory".to_string(),
                    name: "TREATMENT PLANNING".to_string(),
                    color: [80, 160, 255, 255],
                    base_angle_deg: 45.0,
                    span_deg: 90.0,
                },
                SpecializationDef {
                    id: "connector".to_string(),
                    name: "BRIDGE".to_string(),
                    color: [160, 160, 160, 255],
                    base_angle_deg: 0.0,
                    span_deg: 0.0,
                },
            ],
            nodes: vec![],
            connections: vec![],
        }
    }

    #[test]
    fn tabs_include_all_plus_filterable_specializations() {
        let def = def_with_specs();
        let tabs = tab_rects(&def, Rect::from_size(800, 600));
        let ids: Vec<Option<String>> = tabs.into_iter().map(|(_, id)| id).collect();
        // The connector pseudo-specialization gets no tab.
        assert_eq!(ids, vec![None, Some("theory".to_string())]);
    }

    #[test]
    fn tab_hit_testing_matches_tab_layout() {
        let def = def_with_specs();
        let viewport = Rect::from_size(800, 600);
        let tabs = tab_rects(&def, viewport);

        let (rect, id) = &tabs[1];
        let hit = tab_at(
            &def,
            viewport,
            (rect.x as f32 + 2.0, rect.y as f32 + 2.0),
        );
        assert_eq!(hit.as_ref(), Some(id));
        assert_eq!(tab_at(&def, viewport, (799.0, 599.0)), None);
    }

    #[test]
    fn connection_colors_are_distinct_per_class() {
        let classes = [
            ConnectionClass::Locked,
            ConnectionClass::Available,
            ConnectionClass::Unlocked,
            ConnectionClass::Active,
        ];
        for (i, a) in classes.iter().enumerate() {
            for b in classes.iter().skip(i + 1) {
                assert_ne!(connection_color(*a), connection_color(*b));
            }
        }
    }
}
