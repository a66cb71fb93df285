//! Node state machine and the authoritative in-memory progress copy.
//!
//! Legal transitions: locked -> unlockable (recomputed), unlockable ->
//! unlocked (spend reputation), unlocked -> active (spend skill points),
//! active -> unlocked (refund, guarded). Nothing else.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::{SkillNodeDef, SkillTreeDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeState {
    Locked,
    Unlockable,
    Unlocked,
    Active,
}

/// Server-owned progress record, cached and mutated optimistically here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
    pub version: u32,
    pub reputation: u32,
    pub skill_points_available: u32,
    pub unlocked_skills: Vec<String>,
    pub active_skills: Vec<String>,
}

impl Default for ProgressData {
    fn default() -> Self {
        Self {
            version: 1,
            reputation: 0,
            skill_points_available: 0,
            unlocked_skills: vec![],
            active_skills: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    UnknownNode(String),
    IllegalTransition { id: String, from: NodeState },
    InsufficientReputation { required: u32, available: u32 },
    InsufficientSkillPoints { required: u32, available: u32 },
    PrerequisiteNotActive { id: String },
    CoreNodePermanent { id: String },
    DependentActive { id: String, dependent: String },
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::UnknownNode(id) => write!(f, "unknown skill {id}"),
            ActionError::IllegalTransition { id, from } => {
                write!(f, "{id} cannot transition from {from:?}")
            }
            ActionError::InsufficientReputation {
                required,
                available,
            } => write!(f, "needs {required} reputation, have {available}"),
            ActionError::InsufficientSkillPoints {
                required,
                available,
            } => write!(f, "needs {required} skill points, have {available}"),
            ActionError::PrerequisiteNotActive { id } => {
                write!(f, "{id} requires an active prerequisite")
            }
            ActionError::CoreNodePermanent { id } => {
                write!(f, "{id} is a core skill and cannot be deactivated")
            }
            ActionError::DependentActive { id, dependent } => {
                write!(f, "{dependent} depends on {id} staying active")
            }
        }
    }
}

impl std::error::Error for ActionError {}

/// Receives activation side effects; the store never interprets `effects`
/// itself.
pub trait EffectSink {
    fn apply(&mut self, node: &SkillNodeDef);
    fn remove(&mut self, node: &SkillNodeDef);
}

pub struct NullEffectSink;

impl EffectSink for NullEffectSink {
    fn apply(&mut self, _node: &SkillNodeDef) {}
    fn remove(&mut self, _node: &SkillNodeDef) {}
}

/// Read-only view handed to the scene builder; rebuilt on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub states: HashMap<String, NodeState>,
    pub reputation: u32,
    pub skill_points_available: u32,
}

/// Sole owner of node states and the cached `ProgressData`.
pub struct SkillTreeStore {
    def: SkillTreeDef,
    progress: ProgressData,

    // Caches rebuilt on load/mutation.
    id_to_index: HashMap<String, usize>,
    unlocked_set: HashSet<String>,
    active_set: HashSet<String>,
    states: HashMap<String, NodeState>,
    prereqs: HashMap<String, Vec<String>>,
    dependents: HashMap<String, Vec<String>>,
}

impl SkillTreeStore {
    pub fn new(def: SkillTreeDef, progress: ProgressData) -> Self {
        let mut store = Self {
            def,
            progress,
            id_to_index: HashMap::new(),
            unlocked_set: HashSet::new(),
            active_set: HashSet::new(),
            states: HashMap::new(),
            prereqs: HashMap::new(),
            dependents: HashMap::new(),
        };
        store.rebuild_caches();
        store
    }

    pub fn def(&self) -> &SkillTreeDef {
        &self.def
    }

    pub fn progress(&self) -> &ProgressData {
        &self.progress
    }

    pub fn node(&self, id: &str) -> Option<&SkillNodeDef> {
        self.id_to_index.get(id).map(|&i| &self.def.nodes[i])
    }

    pub fn state_of(&self, id: &str) -> Option<NodeState> {
        self.states.get(id).copied()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            states: self.states.clone(),
            reputation: self.progress.reputation,
            skill_points_available: self.progress.skill_points_available,
        }
    }

    /// Replaces the cached progress wholesale (session load or reset).
    pub fn reset(&mut self, progress: ProgressData) {
        self.progress = progress;
        self.rebuild_caches();
    }

    fn rebuild_caches(&mut self) {
        if self.progress.version == 0 {
            self.progress.version = 1;
        }

        self.id_to_index = self
            .def
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        // Prune progress ids that no longer exist in the definition, and keep
        // the invariant that every active skill is also unlocked.
        let ids: HashSet<&String> = self.id_to_index.keys().collect();
        self.progress.unlocked_skills.retain(|id| ids.contains(id));
        self.progress.active_skills.retain(|id| ids.contains(id));
        let unlocked: HashSet<String> = self.progress.unlocked_skills.iter().cloned().collect();
        for id in &self.progress.active_skills {
            if !unlocked.contains(id) {
                self.progress.unlocked_skills.push(id.clone());
            }
        }

        self.unlocked_set = self.progress.unlocked_skills.iter().cloned().collect();
        self.active_set = self.progress.active_skills.iter().cloned().collect();

        self.prereqs.clear();
        self.dependents.clear();
        for c in &self.def.connections {
            self.prereqs
                .entry(c.target.clone())
                .or_default()
                .push(c.source.clone());
            self.dependents
                .entry(c.source.clone())
                .or_default()
                .push(c.target.clone());
        }

        self.recompute_states();
    }

    /// Re-derives every node's state from the unlocked/active sets.
    fn recompute_states(&mut self) {
        self.states = self
            .def
            .nodes
            .iter()
            .map(|node| {
                let state = if self.active_set.contains(&node.id) {
                    NodeState::Active
                } else if self.unlocked_set.contains(&node.id) {
                    NodeState::Unlocked
                } else if self.is_reachable(&node.id) {
                    NodeState::Unlockable
                } else {
                    NodeState::Locked
                };
                (node.id.clone(), state)
            })
            .collect();
    }

    /// A locked node is unlockable iff it has no prerequisites or at least one
    /// prerequisite is unlocked/active.
    fn is_reachable(&self, id: &str) -> bool {
        match self.prereqs.get(id) {
            None => true,
            Some(sources) if sources.is_empty() => true,
            Some(sources) => sources
                .iter()
                .any(|s| self.unlocked_set.contains(s) || self.active_set.contains(s)),
        }
    }

    pub fn unlock(&mut self, id: &str) -> Result<(), ActionError> {
        let Some(node) = self.node(id) else {
            return Err(ActionError::UnknownNode(id.to_string()));
        };
        let cost = node.cost.reputation;

        let state = self.states[id];
        if state != NodeState::Unlockable {
            return Err(ActionError::IllegalTransition {
                id: id.to_string(),
                from: state,
            });
        }
        // Fail outright rather than clamping to zero.
        if self.progress.reputation < cost {
            return Err(ActionError::InsufficientReputation {
                required: cost,
                available: self.progress.reputation,
            });
        }

        self.progress.reputation -= cost;
        self.progress.unlocked_skills.push(id.to_string());
        self.unlocked_set.insert(id.to_string());
        self.recompute_states();
        Ok(())
    }

    pub fn activate(&mut self, id: &str, effects: &mut dyn EffectSink) -> Result<(), ActionError> {
        let Some(node) = self.node(id) else {
            return Err(ActionError::UnknownNode(id.to_string()));
        };
        let cost = node.cost.skill_points;

        let state = self.states[id];
        if state != NodeState::Unlocked {
            return Err(ActionError::IllegalTransition {
                id: id.to_string(),
                from: state,
            });
        }
        if self.progress.skill_points_available < cost {
            return Err(ActionError::InsufficientSkillPoints {
                required: cost,
                available: self.progress.skill_points_available,
            });
        }

        // Nodes with prerequisites need at least one of them active.
        if let Some(sources) = self.prereqs.get(id) {
            if !sources.is_empty() && !sources.iter().any(|s| self.active_set.contains(s)) {
                return Err(ActionError::PrerequisiteNotActive { id: id.to_string() });
            }
        }

        self.progress.skill_points_available -= cost;
        self.progress.active_skills.push(id.to_string());
        self.active_set.insert(id.to_string());
        self.recompute_states();

        let idx = self.id_to_index[id];
        effects.apply(&self.def.nodes[idx]);
        Ok(())
    }

    pub fn deactivate(
        &mut self,
        id: &str,
        effects: &mut dyn EffectSink,
    ) -> Result<(), ActionError> {
        let Some(node) = self.node(id) else {
            return Err(ActionError::UnknownNode(id.to_string()));
        };
        let refund = node.cost.skill_points;
        let is_core = node.is_core();

        let state = self.states[id];
        if state != NodeState::Active {
            return Err(ActionError::IllegalTransition {
                id: id.to_string(),
                from: state,
            });
        }
        if is_core {
            return Err(ActionError::CoreNodePermanent { id: id.to_string() });
        }

        // One level of dependents only: refuse if some active dependent would
        // lose its last active prerequisite.
        if let Some(dependents) = self.dependents.get(id) {
            for dep in dependents {
                if !self.active_set.contains(dep) {
                    continue;
                }
                let has_other_active = self
                    .prereqs
                    .get(dep)
                    .map(|sources| {
                        sources
                            .iter()
                            .any(|s| s != id && self.active_set.contains(s))
                    })
                    .unwrap_or(false);
                if !has_other_active {
                    return Err(ActionError::DependentActive {
                        id: id.to_string(),
                        dependent: dep.clone(),
                    });
                }
            }
        }

        self.progress.skill_points_available =
            self.progress.skill_points_available.saturating_add(refund);
        self.progress.active_skills.retain(|a| a != id);
        self.active_set.remove(id);
        self.recompute_states();

        let idx = self.id_to_index[id];
        effects.remove(&self.def.nodes[idx]);
        Ok(())
    }
}
