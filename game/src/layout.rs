//! Orbital placement: tiers map to concentric rings, specializations to
//! angular sectors, connector nodes to the boundaries between sectors.

use std::collections::HashMap;
use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::tree::{SkillNodeDef, SkillTreeDef};

/// World-space position, origin at the tree center.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2f {
    pub x: f32,
    pub y: f32,
}

impl Vec2f {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Ring radius used when more than one core node exists.
    pub core_ring_radius: f32,
    /// Radius of the tier-1 orbit.
    pub base_orbit_radius: f32,
    /// Radius added per tier beyond the first.
    pub tier_radius_step: f32,
    /// Fraction of a specialization's sector actually used by its nodes,
    /// keeping siblings clear of neighboring sectors.
    pub span_narrowing: f32,
    /// Seed for the connector-overflow fallback. The random fallback is part
    /// of the contract; the seed only pins it for tests.
    pub seed: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            core_ring_radius: 40.0,
            base_orbit_radius: 130.0,
            tier_radius_step: 95.0,
            span_narrowing: 0.7,
            seed: 0,
        }
    }
}

/// Computes a world position for every node in `def`.
///
/// Deterministic for a fixed `def` and `config`: groups are ordered by id and
/// the connector fallback draws from a seeded generator.
pub fn compute_positions(def: &SkillTreeDef, config: &LayoutConfig) -> HashMap<String, Vec2f> {
    let mut positions = HashMap::with_capacity(def.nodes.len());

    place_core_nodes(def, config, &mut positions);
    place_sector_nodes(def, config, &mut positions);
    place_connector_nodes(def, config, &mut positions);

    positions
}

fn orbit_radius(config: &LayoutConfig, tier: u32) -> f32 {
    config.base_orbit_radius + tier.saturating_sub(1) as f32 * config.tier_radius_step
}

fn at_angle(radius: f32, angle_rad: f32) -> Vec2f {
    Vec2f::new(radius * angle_rad.cos(), radius * angle_rad.sin())
}

fn place_core_nodes(
    def: &SkillTreeDef,
    config: &LayoutConfig,
    positions: &mut HashMap<String, Vec2f>,
) {
    let mut core: Vec<&SkillNodeDef> = def.nodes.iter().filter(|n| n.is_core()).collect();
    core.sort_by(|a, b| a.id.cmp(&b.id));

    if core.len() == 1 {
        positions.insert(core[0].id.clone(), Vec2f::new(0.0, 0.0));
        return;
    }

    // Several core nodes share a small ring instead of stacking at the origin.
    let n = core.len() as f32;
    for (i, node) in core.iter().enumerate() {
        let angle = -TAU / 4.0 + TAU * i as f32 / n;
        positions.insert(node.id.clone(), at_angle(config.core_ring_radius, angle));
    }
}

fn place_sector_nodes(
    def: &SkillTreeDef,
    config: &LayoutConfig,
    positions: &mut HashMap<String, Vec2f>,
) {
    let sectors: HashMap<&str, (f32, f32)> = def
        .specializations
        .iter()
        .map(|s| (s.id.as_str(), (s.base_angle_deg, s.span_deg)))
        .collect();

    let mut groups: HashMap<(u32, &str), Vec<&SkillNodeDef>> = HashMap::new();
    for node in &def.nodes {
        if node.is_core() || node.is_connector() {
            continue;
        }
        let Some(spec) = node.specialization.as_deref() else {
            continue;
        };
        groups.entry((node.tier, spec)).or_default().push(node);
    }

    for ((tier, spec), mut nodes) in groups {
        let Some(&(base_deg, span_deg)) = sectors.get(spec) else {
            // Unknown specialization: park the group at the sector origin so
            // it stays visible rather than vanishing.
            tracing::warn!("specialization {spec:?} has no sector definition");
            nodes.sort_by(|a, b| a.id.cmp(&b.id));
            for node in nodes {
                positions.insert(node.id.clone(), at_angle(orbit_radius(config, tier), 0.0));
            }
            continue;
        };

        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let radius = orbit_radius(config, tier);
        let base = base_deg.to_radians();
        let span = span_deg.to_radians() * config.span_narrowing;
        let count = nodes.len();

        for (i, node) in nodes.iter().enumerate() {
            let angle = if count == 1 {
                base
            } else {
                base - span / 2.0 + span * i as f32 / (count - 1) as f32
            };
            positions.insert(node.id.clone(), at_angle(radius, angle));
        }
    }
}

/// Boundary slot between two adjacent specialization sectors.
struct BoundarySlot {
    angle_rad: f32,
    neighbors: [String; 2],
    taken: bool,
}

fn boundary_slots(def: &SkillTreeDef) -> Vec<BoundarySlot> {
    let mut sectors: Vec<(&str, f32)> = def
        .specializations
        .iter()
        .filter(|s| {
            s.id != crate::tree::CORE_SPECIALIZATION && s.id != crate::tree::CONNECTOR_SPECIALIZATION
        })
        .map(|s| (s.id.as_str(), s.base_angle_deg))
        .collect();
    sectors.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(b.0)));

    let n = sectors.len();
    if n < 2 {
        return vec![];
    }

    (0..n)
        .map(|i| {
            let (id_a, deg_a) = sectors[i];
            let (id_b, deg_b) = sectors[(i + 1) % n];
            let deg_b = if i + 1 == n { deg_b + 360.0 } else { deg_b };
            BoundarySlot {
                angle_rad: ((deg_a + deg_b) / 2.0).to_radians(),
                neighbors: [id_a.to_string(), id_b.to_string()],
                taken: false,
            }
        })
        .collect()
}

/// Shared-connection count between `node` and the two specializations a slot
/// borders; higher means a better visual fit for the bridge.
fn slot_affinity(node: &SkillNodeDef, slot: &BoundarySlot, def: &SkillTreeDef) -> usize {
    let spec_of: HashMap<&str, Option<&str>> = def
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.specialization.as_deref()))
        .collect();

    def.connections
        .iter()
        .filter(|c| c.source == node.id || c.target == node.id)
        .filter_map(|c| {
            let other = if c.source == node.id {
                c.target.as_str()
            } else {
                c.source.as_str()
            };
            spec_of.get(other).copied().flatten()
        })
        .filter(|spec| slot.neighbors.iter().any(|n| n == spec))
        .count()
}

fn place_connector_nodes(
    def: &SkillTreeDef,
    config: &LayoutConfig,
    positions: &mut HashMap<String, Vec2f>,
) {
    let mut connectors: Vec<&SkillNodeDef> = def
        .nodes
        .iter()
        .filter(|n| n.is_connector() && !n.is_core())
        .collect();
    connectors.sort_by(|a, b| a.id.cmp(&b.id));

    let mut slots = boundary_slots(def);
    let mut rng = Rng::new(config.seed);

    for node in connectors {
        let radius = orbit_radius(config, node.tier);

        let best = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.taken)
            .map(|(i, s)| (i, slot_affinity(node, s, def)))
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)));

        let angle = match best {
            Some((i, _)) => {
                slots[i].taken = true;
                slots[i].angle_rad
            }
            // Every slot is occupied: fall back to a random angle on the ring.
            None => rng.next_f32() * TAU,
        };

        positions.insert(node.id.clone(), at_angle(radius, angle));
    }
}

/// xorshift* generator; deterministic and dependency-free.
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        (x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 32) as u32
    }

    fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }
}
