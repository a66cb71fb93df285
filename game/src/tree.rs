use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

pub const CORE_SPECIALIZATION: &str = "core";
pub const CONNECTOR_SPECIALIZATION: &str = "connector";

/// Static, designer-authored skill tree definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkillTreeDef {
    pub version: u32,
    pub specializations: Vec<SpecializationDef>,
    pub nodes: Vec<SkillNodeDef>,
    pub connections: Vec<ConnectionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkillNodeDef {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Orbital ring index; 0 is the core ring at the origin.
    #[serde(default)]
    pub tier: u32,

    /// Specialization id, or `None` for core nodes.
    #[serde(default)]
    pub specialization: Option<String>,

    #[serde(default)]
    pub cost: NodeCost,

    /// Opaque to the renderer; consumed by the effect-application collaborator.
    #[serde(default)]
    pub effects: Vec<SkillEffect>,
}

impl SkillNodeDef {
    /// Core skills are permanent once active and anchor the layout origin.
    pub fn is_core(&self) -> bool {
        self.tier == 0 || self.specialization.as_deref() == Some(CORE_SPECIALIZATION)
    }

    pub fn is_connector(&self) -> bool {
        self.specialization.as_deref() == Some(CONNECTOR_SPECIALIZATION)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeCost {
    /// Reputation spent to unlock.
    #[serde(default)]
    pub reputation: u32,
    /// Skill points spent to activate.
    #[serde(default)]
    pub skill_points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SkillEffect {
    InsightGainFlat {
        value: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
    },
    InsightGainMultiplier {
        value: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
    },
    PatientOutcomeMultiplier {
        value: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
    },
    EquipmentCostReduction {
        value: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
    },
    RevealParameter {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
    },
    /// Forward compatibility: unknown effect types deserialize instead of
    /// failing the whole tree load.
    #[serde(other)]
    Other,
}

/// Directed prerequisite edge: `source` must be unlocked before `target`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDef {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpecializationDef {
    pub id: String,
    pub name: String,
    pub color: [u8; 4],

    /// Center of this specialization's angular sector, degrees.
    pub base_angle_deg: f32,
    /// Full width of the sector, degrees.
    pub span_deg: f32,
}

impl Default for SkillTreeDef {
    fn default() -> Self {
        // Compile-time fallback so the widget still renders if the asset file
        // is missing or unreadable.
        serde_json::from_str(include_str!("../assets/skilltree.json")).unwrap_or_else(|_| {
            SkillTreeDef {
                version: 1,
                specializations: vec![],
                nodes: vec![SkillNodeDef {
                    id: "core".to_string(),
                    name: "RESIDENT".to_string(),
                    description: String::new(),
                    tier: 0,
                    specialization: Some(CORE_SPECIALIZATION.to_string()),
                    cost: NodeCost::default(),
                    effects: vec![],
                }],
                connections: vec![],
            }
        })
    }
}

pub fn load_default() -> (SkillTreeDef, Option<PathBuf>) {
    if let Ok(p) = std::env::var("MEDPHYS_SKILLTREE_PATH") {
        let path = PathBuf::from(p);
        match load_def(&path) {
            Ok(def) => return (def, Some(path)),
            Err(err) => tracing::warn!("failed to load skill tree from {path:?}: {err}"),
        }
    }

    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("assets")
        .join("skilltree.json");
    if let Ok(def) = load_def(&path) {
        return (def, Some(path));
    }

    let mut def = SkillTreeDef::default();
    normalize_and_validate(&mut def);
    (def, None)
}

pub fn load_def(path: &Path) -> Result<SkillTreeDef, std::io::Error> {
    let bytes = fs::read(path)?;
    let mut def: SkillTreeDef = serde_json::from_slice(&bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    normalize_and_validate(&mut def);
    Ok(def)
}

/// Repairs a loaded definition in place. Data problems are never fatal: a
/// single bad record is logged and dropped rather than blanking the tree.
pub fn normalize_and_validate(def: &mut SkillTreeDef) {
    if def.version == 0 {
        def.version = 1;
    }

    for node in &mut def.nodes {
        if node.id.trim().is_empty() {
            node.id = "unnamed".to_string();
        }
        if node.name.trim().is_empty() {
            node.name = node.id.clone();
        }
        // A missing category is treated as core at any tier; otherwise the
        // layout would have no sector for the node and it would never appear.
        if node.specialization.is_none() {
            node.specialization = Some(CORE_SPECIALIZATION.to_string());
        }
    }

    // Ensure stable, unique ids by de-duping with a suffix if needed.
    let mut used = HashSet::<String>::new();
    for node in &mut def.nodes {
        if used.insert(node.id.clone()) {
            continue;
        }
        let base = node.id.clone();
        for i in 2.. {
            let cand = format!("{base}_{i}");
            if used.insert(cand.clone()) {
                node.id = cand;
                break;
            }
        }
    }

    let mut seen_specs = HashSet::<String>::new();
    def.specializations.retain(|s| {
        if seen_specs.insert(s.id.clone()) {
            true
        } else {
            tracing::warn!("dropping duplicate specialization {:?}", s.id);
            false
        }
    });

    // Prune connections referencing unknown nodes and self-loops.
    let ids: HashSet<String> = def.nodes.iter().map(|n| n.id.clone()).collect();
    let mut seen_edges = HashSet::<(String, String)>::new();
    def.connections.retain(|c| {
        if !ids.contains(&c.source) || !ids.contains(&c.target) {
            tracing::warn!(
                "dropping connection {:?} -> {:?}: unknown node id",
                c.source,
                c.target
            );
            return false;
        }
        if c.source == c.target {
            tracing::warn!("dropping self-loop connection on {:?}", c.source);
            return false;
        }
        seen_edges.insert((c.source.clone(), c.target.clone()))
    });
}
