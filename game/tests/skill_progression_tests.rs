use game::store::{ActionError, NodeState, NullEffectSink, ProgressData, SkillTreeStore};
use game::tree::{
    ConnectionDef, NodeCost, SkillNodeDef, SkillTreeDef, normalize_and_validate,
};

fn progress(reputation: u32, skill_points: u32) -> ProgressData {
    ProgressData {
        version: 1,
        reputation,
        skill_points_available: skill_points,
        unlocked_skills: vec!["core".to_string()],
        active_skills: vec!["core".to_string()],
    }
}

#[test]
fn unlocking_behind_an_active_core_spends_exact_reputation() {
    let mut def = SkillTreeDef {
        version: 1,
        specializations: vec![],
        nodes: vec![
            SkillNodeDef {
                id: "core".to_string(),
                name: "CORE".to_string(),
                description: String::new(),
                tier: 0,
                specialization: Some("core".to_string()),
                cost: NodeCost::default(),
                effects: vec![],
            },
            SkillNodeDef {
                id: "a".to_string(),
                name: "A".to_string(),
                description: String::new(),
                tier: 1,
                specialization: Some("theory".to_string()),
                cost: NodeCost {
                    reputation: 5,
                    skill_points: 0,
                },
                effects: vec![],
            },
        ],
        connections: vec![ConnectionDef {
            source: "core".to_string(),
            target: "a".to_string(),
        }],
    };
    normalize_and_validate(&mut def);

    let mut store = SkillTreeStore::new(def, progress(10, 0));
    assert_eq!(store.state_of("a"), Some(NodeState::Unlockable));

    store.unlock("a").unwrap();
    assert_eq!(store.state_of("a"), Some(NodeState::Unlocked));
    assert_eq!(store.progress().reputation, 5);
}

#[test]
fn default_tree_supports_a_full_unlock_and_activation_path() {
    let mut def = SkillTreeDef::default();
    normalize_and_validate(&mut def);
    let mut store = SkillTreeStore::new(def, progress(100, 20));
    let mut sink = NullEffectSink;

    // The shipped tree anchors everything on the active core.
    assert_eq!(store.state_of("core"), Some(NodeState::Active));
    assert_eq!(
        store.state_of("dosimetry_basics"),
        Some(NodeState::Unlockable)
    );
    assert_eq!(store.state_of("planning_3d"), Some(NodeState::Locked));

    store.unlock("dosimetry_basics").unwrap();
    assert_eq!(store.state_of("planning_3d"), Some(NodeState::Unlockable));

    store.activate("dosimetry_basics", &mut sink).unwrap();
    store.unlock("planning_3d").unwrap();
    store.activate("planning_3d", &mut sink).unwrap();
    assert_eq!(store.state_of("planning_3d"), Some(NodeState::Active));

    // The core can never be switched off, even with everything else active.
    let err = store.deactivate("core", &mut sink).unwrap_err();
    assert!(matches!(err, ActionError::CoreNodePermanent { .. }));

    // planning_3d's only active prerequisite is dosimetry_basics.
    let err = store.deactivate("dosimetry_basics", &mut sink).unwrap_err();
    assert!(matches!(err, ActionError::DependentActive { .. }));

    store.deactivate("planning_3d", &mut sink).unwrap();
    store.deactivate("dosimetry_basics", &mut sink).unwrap();
    assert_eq!(
        store.state_of("dosimetry_basics"),
        Some(NodeState::Unlocked)
    );
}

#[test]
fn reputation_is_conserved_across_a_failed_unlock() {
    let mut def = SkillTreeDef::default();
    normalize_and_validate(&mut def);
    let mut store = SkillTreeStore::new(def, progress(3, 0));

    let before = store.progress().clone();
    let err = store.unlock("dosimetry_basics").unwrap_err();
    assert!(matches!(err, ActionError::InsufficientReputation { .. }));
    assert_eq!(store.progress(), &before);
}
