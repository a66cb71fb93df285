//! Pure scene construction: laid-out nodes + store snapshot in, drawable
//! primitives out. Same inputs always produce the same scene; the render
//! layer is write-only on top of it.

use std::collections::HashMap;

use engine::graphics::{Color, brighten_color, dim_color};

use crate::layout::Vec2f;
use crate::store::{NodeState, StoreSnapshot};
use crate::tree::{NodeCost, SkillEffect, SkillTreeDef};

pub const CORE_NODE_RADIUS: u32 = 22;
pub const MAJOR_NODE_RADIUS: u32 = 16;
pub const MINOR_NODE_RADIUS: u32 = 12;

/// Size class by ring: core, major (first ring), minor (everything deeper).
pub fn node_radius(tier: u32) -> u32 {
    match tier {
        0 => CORE_NODE_RADIUS,
        1 => MAJOR_NODE_RADIUS,
        _ => MINOR_NODE_RADIUS,
    }
}

const FALLBACK_SPEC_COLOR: Color = [150, 150, 160, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionClass {
    Locked,
    Available,
    Unlocked,
    Active,
}

/// Visual class of an edge from its endpoint states, in precedence order:
/// both active, then both at least unlocked, then unlocked next to
/// unlockable, then locked.
pub fn connection_class(a: NodeState, b: NodeState) -> ConnectionClass {
    let reached = |s: NodeState| matches!(s, NodeState::Unlocked | NodeState::Active);

    if a == NodeState::Active && b == NodeState::Active {
        ConnectionClass::Active
    } else if reached(a) && reached(b) {
        ConnectionClass::Unlocked
    } else if (reached(a) && b == NodeState::Unlockable) || (reached(b) && a == NodeState::Unlockable)
    {
        ConnectionClass::Available
    } else {
        ConnectionClass::Locked
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeVisual {
    pub fill: Color,
    pub outline: Color,
    /// Soft halo behind active nodes; `None` draws no glow.
    pub glow: Option<Color>,
    pub radius: u32,
    pub label_opacity: u8,
}

/// Pure visual mapping; no hidden flags, so identical inputs always yield
/// identical visuals.
pub fn node_visual(
    spec_color: Color,
    state: NodeState,
    tier: u32,
    selected: bool,
    hovered: bool,
) -> NodeVisual {
    let mut fill = match state {
        NodeState::Locked => dim_color(spec_color, 0.25),
        NodeState::Unlockable => dim_color(spec_color, 0.55),
        NodeState::Unlocked => spec_color,
        NodeState::Active => brighten_color(spec_color, 0.25),
    };
    if hovered {
        fill = brighten_color(fill, 0.15);
    }

    let outline = if selected {
        [255, 255, 255, 255]
    } else {
        match state {
            NodeState::Locked => dim_color(spec_color, 0.4),
            NodeState::Unlockable => brighten_color(spec_color, 0.3),
            NodeState::Unlocked => brighten_color(spec_color, 0.1),
            NodeState::Active => brighten_color(spec_color, 0.6),
        }
    };

    let glow = (state == NodeState::Active).then(|| brighten_color(spec_color, 0.4));

    let radius = node_radius(tier);

    // Core/major labels are permanent; minor labels fade in on hover,
    // selection or activation instead of being inserted and removed.
    let label_opacity = if tier <= 1 || hovered || selected || state == NodeState::Active {
        255
    } else {
        0
    };

    NodeVisual {
        fill,
        outline,
        glow,
        radius,
        label_opacity,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: String,
    pub pos: Vec2f,
    pub label: String,
    pub visual: NodeVisual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneEdge {
    pub from: Vec2f,
    pub to: Vec2f,
    pub class: ConnectionClass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub node_id: String,
    pub anchor: Vec2f,
    pub title: String,
    pub specialization: String,
    pub description: String,
    pub effect_lines: Vec<String>,
    pub cost_line: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub edges: Vec<SceneEdge>,
    pub nodes: Vec<SceneNode>,
    pub tooltip: Option<Tooltip>,
}

/// Builds the full scene. Connections with a missing endpoint or position are
/// logged and skipped, never fatal.
pub fn build_scene(
    def: &SkillTreeDef,
    positions: &HashMap<String, Vec2f>,
    snapshot: &StoreSnapshot,
    selected: Option<&str>,
    hovered: Option<&str>,
    filter: Option<&str>,
) -> Scene {
    let spec_colors: HashMap<&str, Color> = def
        .specializations
        .iter()
        .map(|s| (s.id.as_str(), s.color))
        .collect();

    let mut edges = Vec::with_capacity(def.connections.len());
    for c in &def.connections {
        let (Some(&from), Some(&to)) = (positions.get(&c.source), positions.get(&c.target)) else {
            tracing::warn!(
                "skipping connection {:?} -> {:?}: endpoint has no position",
                c.source,
                c.target
            );
            continue;
        };
        let (Some(&sa), Some(&sb)) = (
            snapshot.states.get(&c.source),
            snapshot.states.get(&c.target),
        ) else {
            tracing::warn!(
                "skipping connection {:?} -> {:?}: endpoint has no state",
                c.source,
                c.target
            );
            continue;
        };
        edges.push(SceneEdge {
            from,
            to,
            class: connection_class(sa, sb),
        });
    }

    let mut nodes = Vec::with_capacity(def.nodes.len());
    let mut tooltip = None;

    for node in &def.nodes {
        let Some(&pos) = positions.get(&node.id) else {
            tracing::warn!("skipping node {:?}: no computed position", node.id);
            continue;
        };
        let Some(&state) = snapshot.states.get(&node.id) else {
            continue;
        };

        let spec = node.specialization.as_deref();
        let spec_color = spec
            .and_then(|s| spec_colors.get(s).copied())
            .unwrap_or(FALLBACK_SPEC_COLOR);

        let is_selected = selected == Some(node.id.as_str());
        let is_hovered = hovered == Some(node.id.as_str());
        let mut visual = node_visual(spec_color, state, node.tier, is_selected, is_hovered);

        // Filtering dims everything outside the chosen specialization; core
        // nodes stay visible as the tree's anchor.
        if let Some(filter_id) = filter {
            if spec != Some(filter_id) && !node.is_core() {
                visual.fill = dim_color(visual.fill, 0.35);
                visual.outline = dim_color(visual.outline, 0.35);
                visual.glow = None;
                if !is_hovered && !is_selected {
                    visual.label_opacity = 0;
                }
            }
        }

        if is_hovered {
            tooltip = Some(build_tooltip(def, node, pos, state));
        }

        nodes.push(SceneNode {
            id: node.id.clone(),
            pos,
            label: node.name.clone(),
            visual,
        });
    }

    Scene {
        edges,
        nodes,
        tooltip,
    }
}

fn build_tooltip(
    def: &SkillTreeDef,
    node: &crate::tree::SkillNodeDef,
    pos: Vec2f,
    state: NodeState,
) -> Tooltip {
    let specialization = node
        .specialization
        .as_deref()
        .and_then(|id| def.specializations.iter().find(|s| s.id == id))
        .map(|s| s.name.clone())
        .unwrap_or_else(|| "GENERAL".to_string());

    Tooltip {
        node_id: node.id.clone(),
        anchor: pos,
        title: node.name.clone(),
        specialization,
        description: node.description.clone(),
        effect_lines: node.effects.iter().map(effect_line).collect(),
        cost_line: cost_line(state, node.cost),
    }
}

/// Human-readable rendering of the otherwise opaque effect records.
pub fn effect_line(effect: &SkillEffect) -> String {
    fn suffix(condition: &Option<String>) -> String {
        condition
            .as_deref()
            .map(|c| format!(" ({c})"))
            .unwrap_or_default()
    }

    match effect {
        SkillEffect::InsightGainFlat { value, condition } => {
            format!("+{value} INSIGHT{}", suffix(condition))
        }
        SkillEffect::InsightGainMultiplier { value, condition } => {
            format!("INSIGHT X{value:.2}{}", suffix(condition))
        }
        SkillEffect::PatientOutcomeMultiplier { value, condition } => {
            format!("OUTCOMES X{value:.2}{}", suffix(condition))
        }
        SkillEffect::EquipmentCostReduction { value, condition } => {
            format!("-{:.0}% EQUIPMENT COST{}", value * 100.0, suffix(condition))
        }
        SkillEffect::RevealParameter { value, condition } => {
            format!("REVEALS {}{}", value.to_uppercase(), suffix(condition))
        }
        SkillEffect::Other => "UNKNOWN EFFECT".to_string(),
    }
}

/// What the next transition costs from the current state.
pub fn cost_line(state: NodeState, cost: NodeCost) -> String {
    match state {
        NodeState::Locked => "LOCKED".to_string(),
        NodeState::Unlockable => format!("UNLOCK: {} REP", cost.reputation),
        NodeState::Unlocked => format!("ACTIVATE: {} SP", cost.skill_points),
        NodeState::Active => "ACTIVE".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutConfig, compute_positions};
    use crate::store::{ProgressData, SkillTreeStore};
    use crate::tree::{ConnectionDef, SkillNodeDef, SpecializationDef, normalize_and_validate};

    fn node(id: &str, tier: u32, spec: &str) -> SkillNodeDef {
        SkillNodeDef {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: format!("{id} description"),
            tier,
            specialization: Some(spec.to_string()),
            cost: NodeCost {
                reputation: 5,
                skill_points: 2,
            },
            effects: vec![SkillEffect::InsightGainFlat {
                value: 3,
                condition: None,
            }],
        }
    }

    fn small_def() -> SkillTreeDef {
        let mut def = SkillTreeDef {
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
                    id: "clinical".to_string(),
                    name: "CLINICAL PRACTICE".to_string(),
                    color: [255, 140, 90, 255],
                    base_angle_deg: 135.0,
                    span_deg: 90.0,
                },
            ],
            nodes: vec![
                node("core", 0, "core"),
                node("a", 1, "theory"),
                node("b", 2, "theory"),
            ],
            connections: vec![
                ConnectionDef {
                    source: "core".to_string(),
                    target: "a".to_string(),
                },
                ConnectionDef {
                    source: "a".to_string(),
                    target: "b".to_string(),
                },
            ],
        };
        normalize_and_validate(&mut def);
        def
    }

    fn scene_inputs(def: &SkillTreeDef) -> (HashMap<String, Vec2f>, StoreSnapshot) {
        let positions = compute_positions(def, &LayoutConfig::default());
        let store = SkillTreeStore::new(
            def.clone(),
            ProgressData {
                version: 1,
                reputation: 10,
                skill_points_available: 5,
                unlocked_skills: vec!["core".to_string()],
                active_skills: vec!["core".to_string()],
            },
        );
        (positions, store.snapshot())
    }

    #[test]
    fn connection_class_precedence_table() {
        use ConnectionClass as C;
        use NodeState as N;

        assert_eq!(connection_class(N::Active, N::Active), C::Active);
        assert_eq!(connection_class(N::Active, N::Unlocked), C::Unlocked);
        assert_eq!(connection_class(N::Unlocked, N::Unlocked), C::Unlocked);
        assert_eq!(connection_class(N::Unlocked, N::Unlockable), C::Available);
        assert_eq!(connection_class(N::Unlockable, N::Active), C::Available);
        assert_eq!(connection_class(N::Locked, N::Locked), C::Locked);
        assert_eq!(connection_class(N::Locked, N::Unlocked), C::Locked);
        assert_eq!(connection_class(N::Unlockable, N::Unlockable), C::Locked);
    }

    #[test]
    fn build_scene_is_idempotent() {
        let def = small_def();
        let (positions, snapshot) = scene_inputs(&def);

        let a = build_scene(&def, &positions, &snapshot, Some("a"), Some("b"), None);
        let b = build_scene(&def, &positions, &snapshot, Some("a"), Some("b"), None);
        assert_eq!(a, b);
    }

    #[test]
    fn connections_with_missing_positions_are_skipped() {
        let def = small_def();
        let (mut positions, snapshot) = scene_inputs(&def);
        positions.remove("b");

        let scene = build_scene(&def, &positions, &snapshot, None, None, None);
        assert_eq!(scene.edges.len(), 1);
        assert_eq!(scene.nodes.len(), 2);
    }

    #[test]
    fn hovering_a_node_produces_its_tooltip() {
        let def = small_def();
        let (positions, snapshot) = scene_inputs(&def);

        let scene = build_scene(&def, &positions, &snapshot, None, Some("a"), None);
        let tip = scene.tooltip.expect("tooltip for hovered node");
        assert_eq!(tip.title, "A");
        assert_eq!(tip.specialization, "TREATMENT PLANNING");
        assert_eq!(tip.effect_lines, vec!["+3 INSIGHT".to_string()]);
        // a is unlockable with the core active.
        assert_eq!(tip.cost_line, "UNLOCK: 5 REP");
    }

    #[test]
    fn minor_labels_are_hidden_until_hover_or_activation() {
        let visual = node_visual([100, 100, 200, 255], NodeState::Unlocked, 2, false, false);
        assert_eq!(visual.label_opacity, 0);

        let hovered = node_visual([100, 100, 200, 255], NodeState::Unlocked, 2, false, true);
        assert_eq!(hovered.label_opacity, 255);

        let active = node_visual([100, 100, 200, 255], NodeState::Active, 2, false, false);
        assert_eq!(active.label_opacity, 255);

        let core = node_visual([100, 100, 200, 255], NodeState::Locked, 0, false, false);
        assert_eq!(core.label_opacity, 255);
    }

    #[test]
    fn filter_dims_other_specializations_but_not_core() {
        let def = small_def();
        let (positions, snapshot) = scene_inputs(&def);

        let plain = build_scene(&def, &positions, &snapshot, None, None, None);
        let filtered = build_scene(&def, &positions, &snapshot, None, None, Some("clinical"));

        let find = |scene: &Scene, id: &str| -> NodeVisual {
            scene.nodes.iter().find(|n| n.id == id).unwrap().visual
        };
        assert_ne!(find(&plain, "a").fill, find(&filtered, "a").fill);
        assert_eq!(find(&plain, "core").fill, find(&filtered, "core").fill);
    }

    #[test]
    fn cost_line_tracks_the_next_transition() {
        let cost = NodeCost {
            reputation: 7,
            skill_points: 3,
        };
        assert_eq!(cost_line(NodeState::Locked, cost), "LOCKED");
        assert_eq!(cost_line(NodeState::Unlockable, cost), "UNLOCK: 7 REP");
        assert_eq!(cost_line(NodeState::Unlocked, cost), "ACTIVATE: 3 SP");
        assert_eq!(cost_line(NodeState::Active, cost), "ACTIVE");
    }
}
