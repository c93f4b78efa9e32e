//! Animation Graph Tests
//!
//! Tests for:
//! - GraphBuilder validation
//! - Immediate and crossfade transitions, weight conservation
//! - Interrupted crossfades (reversal and redirection)
//! - Transitional hand-offs through a bridging node
//! - Trigger policies driven by a seeded RNG
//! - Nested graphs running their own transitions concurrently

use std::sync::Arc;

use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;

use myth_anim::animation::clip::AnimationClip;
use myth_anim::animation::graph::{AnimationGraph, GraphBuilder};
use myth_anim::animation::node::{NodeKind, TriggerPolicy};
use myth_anim::animation::tracks::JointTrack;
use myth_anim::errors::AnimationError;
use myth_anim::pose::JointPose;

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn clip(name: &str, duration: f32) -> Arc<AnimationClip> {
    Arc::new(AnimationClip::new(
        name,
        vec![JointTrack::linear(
            2,
            [
                (0.0, JointPose::IDENTITY),
                (duration, JointPose::from_translation(Vec3::X)),
            ],
        )],
    ))
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5EED)
}

fn weight(graph: &AnimationGraph, name: &str) -> f32 {
    graph.weight_of(name).unwrap()
}

fn leaf_weight_sum(graph: &AnimationGraph) -> f32 {
    graph.collect_leaves().iter().map(|l| l.weight).sum()
}

fn idle_walk_run() -> AnimationGraph {
    GraphBuilder::new("Locomotion")
        .single_motion("Idle", clip("idle", 2.0))
        .single_motion("Walk", clip("walk", 1.0))
        .single_motion("Run", clip("run", 0.8))
        .crossfade("Idle", "Walk", 1.0)
        .crossfade("Walk", "Idle", 1.0)
        .crossfade("Walk", "Run", 1.0)
        .immediate("Run", "Idle")
        .build()
        .unwrap()
}

// ============================================================================
// Builder validation
// ============================================================================

#[test]
fn build_starts_on_entry_node() {
    let graph = idle_walk_run();

    assert_eq!(graph.active_name(), "Idle");
    assert_eq!(weight(&graph, "Idle"), 1.0);
    assert_eq!(weight(&graph, "Walk"), 0.0);
    assert!(!graph.is_transitioning());
    assert!(graph.can_transition_to("Walk"));
    assert!(!graph.can_transition_to("Run"));
}

#[test]
fn build_honours_explicit_entry() {
    let graph = GraphBuilder::new("G")
        .single_motion("A", clip("a", 1.0))
        .single_motion("B", clip("b", 1.0))
        .entry("B")
        .build()
        .unwrap();

    assert_eq!(graph.active_name(), "B");
    assert_eq!(weight(&graph, "A"), 0.0);
}

#[test]
fn build_rejects_empty_graph() {
    let err = GraphBuilder::new("Nothing").build().unwrap_err();
    assert_eq!(err, AnimationError::EmptyGraph("Nothing".to_string()));
}

#[test]
fn build_rejects_duplicate_nodes() {
    let err = GraphBuilder::new("G")
        .single_motion("A", clip("a", 1.0))
        .single_motion("A", clip("a2", 1.0))
        .build()
        .unwrap_err();
    assert_eq!(err, AnimationError::DuplicateNode("A".to_string()));
}

#[test]
fn build_rejects_unknown_edge_target() {
    let err = GraphBuilder::new("G")
        .single_motion("A", clip("a", 1.0))
        .crossfade("A", "Ghost", 0.2)
        .build()
        .unwrap_err();
    assert_eq!(err, AnimationError::NodeNotFound("Ghost".to_string()));
}

#[test]
fn build_rejects_negative_duration() {
    let err = GraphBuilder::new("G")
        .single_motion("A", clip("a", 1.0))
        .single_motion("B", clip("b", 1.0))
        .crossfade("A", "B", -0.5)
        .build()
        .unwrap_err();
    assert!(matches!(err, AnimationError::InvalidTransition { .. }), "{err}");
}

#[test]
fn build_rejects_duplicate_edge() {
    let err = GraphBuilder::new("G")
        .single_motion("A", clip("a", 1.0))
        .single_motion("B", clip("b", 1.0))
        .crossfade("A", "B", 0.5)
        .immediate("A", "B")
        .build()
        .unwrap_err();
    assert!(matches!(err, AnimationError::InvalidTransition { .. }), "{err}");
}

#[test]
fn build_rejects_bridge_equal_to_endpoint() {
    let err = GraphBuilder::new("G")
        .single_motion("A", clip("a", 1.0))
        .single_motion("B", clip("b", 1.0))
        .transitional("A", "A", "B", 0.2)
        .build()
        .unwrap_err();
    assert!(matches!(err, AnimationError::InvalidTransition { .. }), "{err}");
}

#[test]
fn build_rejects_trigger_without_edge() {
    let err = GraphBuilder::new("G")
        .single_motion("A", clip("a", 1.0))
        .single_motion("B", clip("b", 1.0))
        .trigger("A", TriggerPolicy::random_choice(1.0, &["B"]))
        .build()
        .unwrap_err();
    assert!(matches!(err, AnimationError::InvalidTransition { .. }), "{err}");
}

#[test]
fn build_rejects_trigger_on_undeclared_node() {
    let err = GraphBuilder::new("G")
        .trigger("Later", TriggerPolicy::random_choice(1.0, &[]))
        .single_motion("Later", clip("a", 1.0))
        .build()
        .unwrap_err();
    assert_eq!(err, AnimationError::NodeNotFound("Later".to_string()));
}

#[test]
fn build_rejects_non_positive_blend_cycle() {
    let err = GraphBuilder::new("G")
        .blend_space_with_cycle("Move", vec![(0.0, clip("a", 1.0))], 0.0)
        .build()
        .unwrap_err();
    assert!(matches!(err, AnimationError::InvalidBlendSpace { .. }), "{err}");
}

// ============================================================================
// Transition requests
// ============================================================================

#[test]
fn transition_to_unknown_node_fails() {
    let mut graph = idle_walk_run();
    assert_eq!(
        graph.transition_to("Swim"),
        Err(AnimationError::NodeNotFound("Swim".to_string()))
    );
}

#[test]
fn transition_without_edge_fails() {
    let mut graph = idle_walk_run();
    assert_eq!(
        graph.transition_to("Run"),
        Err(AnimationError::TransitionNotFound {
            from: "Idle".to_string(),
            to: "Run".to_string(),
        })
    );
    assert_eq!(graph.active_name(), "Idle");
}

#[test]
fn transition_to_active_node_is_noop() {
    let mut graph = idle_walk_run();
    graph.transition_to("Idle").unwrap();

    assert_eq!(graph.active_name(), "Idle");
    assert!(!graph.is_transitioning());
}

#[test]
fn immediate_transition_swaps_weights_at_once() {
    let mut graph = idle_walk_run();
    let mut rng = rng();

    graph.transition_to("Walk").unwrap();
    for _ in 0..10 {
        graph.update(0.1, &mut rng).unwrap();
    }
    graph.transition_to("Run").unwrap();
    for _ in 0..10 {
        graph.update(0.1, &mut rng).unwrap();
    }

    graph.transition_to("Idle").unwrap();
    assert_eq!(graph.active_name(), "Idle");
    assert_eq!(weight(&graph, "Idle"), 1.0);
    assert_eq!(weight(&graph, "Run"), 0.0);
    assert!(!graph.is_transitioning());
}

#[test]
fn zero_duration_crossfade_is_immediate() {
    let mut graph = GraphBuilder::new("G")
        .single_motion("A", clip("a", 1.0))
        .single_motion("B", clip("b", 1.0))
        .crossfade("A", "B", 0.0)
        .build()
        .unwrap();

    graph.transition_to("B").unwrap();
    assert_eq!(weight(&graph, "A"), 0.0);
    assert_eq!(weight(&graph, "B"), 1.0);
    assert!(!graph.is_transitioning());
}

#[test]
fn self_crossfade_restarts_the_node() {
    let mut graph = GraphBuilder::new("G")
        .single_motion("A", clip("a", 1.0))
        .crossfade("A", "A", 0.5)
        .build()
        .unwrap();
    let mut rng = rng();

    graph.update(0.3, &mut rng).unwrap();
    graph.transition_to("A").unwrap();

    assert!(!graph.is_transitioning());
    assert_eq!(weight(&graph, "A"), 1.0);
    let NodeKind::SingleMotion(state) = &graph.active_node().kind else {
        panic!("A is a single motion node");
    };
    assert_eq!(state.time, 0.0);
}

// ============================================================================
// Crossfades
// ============================================================================

#[test]
fn idle_to_walk_crossfade_halfway() {
    let mut graph = idle_walk_run();
    let mut rng = rng();

    graph.transition_to("Walk").unwrap();
    for _ in 0..5 {
        graph.update(0.1, &mut rng).unwrap();
    }

    assert!(approx(weight(&graph, "Idle"), 0.5));
    assert!(approx(weight(&graph, "Walk"), 0.5));
    assert!(graph.is_transitioning());
    assert_eq!(graph.active_name(), "Walk");
}

#[test]
fn idle_to_walk_blend_space_scenario() {
    let mut graph = GraphBuilder::new("Locomotion")
        .single_motion("Idle", clip("idle", 2.0))
        .blend_space(
            "Walk",
            vec![
                (0.0, clip("walk_slow", 1.0)),
                (0.5, clip("walk", 1.0)),
                (1.0, clip("walk_fast", 1.0)),
            ],
        )
        .crossfade("Idle", "Walk", 0.5)
        .build()
        .unwrap();
    let mut rng = rng();

    graph.transition_to("Walk").unwrap();
    for step in 1..=5 {
        graph.update(0.1, &mut rng).unwrap();
        let (idle, walk) = (weight(&graph, "Idle"), weight(&graph, "Walk"));
        if step < 5 {
            assert!(idle > 0.0 && idle < 1.0, "step {step}: idle {idle}");
            assert!(walk > 0.0 && walk < 1.0, "step {step}: walk {walk}");
            assert!(approx(idle + walk, 1.0));
        }
    }

    assert_eq!(weight(&graph, "Idle"), 0.0);
    assert_eq!(weight(&graph, "Walk"), 1.0);
    assert!(!graph.is_transitioning());
}

#[test]
fn crossfade_completes_with_exact_endpoints() {
    let mut graph = idle_walk_run();
    let mut rng = rng();

    graph.transition_to("Walk").unwrap();
    for _ in 0..10 {
        graph.update(0.1, &mut rng).unwrap();
    }

    assert_eq!(weight(&graph, "Idle"), 0.0);
    assert_eq!(weight(&graph, "Walk"), 1.0);
    assert!(!graph.is_transitioning());
    assert_eq!(graph.collect_leaves().len(), 1);
}

#[test]
fn crossfade_conserves_total_weight() {
    let mut graph = idle_walk_run();
    let mut rng = rng();

    graph.transition_to("Walk").unwrap();
    for frame in 0..16 {
        graph.update(1.0 / 15.0, &mut rng).unwrap();
        let sum = leaf_weight_sum(&graph);
        assert!(approx(sum, 1.0), "frame {frame}: sum {sum}");
        for node in graph.nodes() {
            assert!((0.0..=1.0).contains(&node.weight));
        }
    }
}

#[test]
fn crossfade_advances_both_endpoints() {
    let mut graph = idle_walk_run();
    let mut rng = rng();

    graph.transition_to("Walk").unwrap();
    graph.update(0.25, &mut rng).unwrap();

    for name in ["Idle", "Walk"] {
        let NodeKind::SingleMotion(state) = &graph.node(name).unwrap().kind else {
            panic!("{name} is a single motion node");
        };
        assert!(approx(state.time, 0.25), "{name} at {}", state.time);
    }
}

#[test]
fn reversed_crossfade_continues_from_current_weights() {
    let mut graph = idle_walk_run();
    let mut rng = rng();

    graph.transition_to("Walk").unwrap();
    graph.update(0.25, &mut rng).unwrap();
    assert!(approx(weight(&graph, "Idle"), 0.75));

    graph.transition_to("Idle").unwrap();
    assert!(approx(weight(&graph, "Idle"), 0.75));
    assert!(approx(weight(&graph, "Walk"), 0.25));

    graph.update(0.1, &mut rng).unwrap();
    assert!(approx(weight(&graph, "Idle"), 0.85));
    assert!(approx(weight(&graph, "Walk"), 0.15));
    assert_eq!(graph.active_name(), "Idle");
}

#[test]
fn redirected_crossfade_drops_fading_out_node() {
    let mut graph = idle_walk_run();
    let mut rng = rng();

    graph.transition_to("Walk").unwrap();
    graph.update(0.5, &mut rng).unwrap();

    graph.transition_to("Run").unwrap();
    assert_eq!(weight(&graph, "Idle"), 0.0);
    assert_eq!(weight(&graph, "Walk"), 1.0);

    graph.update(0.5, &mut rng).unwrap();
    assert!(approx(weight(&graph, "Walk"), 0.5));
    assert!(approx(weight(&graph, "Run"), 0.5));
    assert!(approx(leaf_weight_sum(&graph), 1.0));
}

// ============================================================================
// Transitional hand-off
// ============================================================================

#[test]
fn transitional_plays_bridge_before_target() {
    let mut graph = GraphBuilder::new("Stance")
        .single_motion("Crouch", clip("crouch", 1.0))
        .single_motion("StandUp", clip("stand_up", 0.5))
        .single_motion("Walk", clip("walk", 1.0))
        .transitional("Crouch", "StandUp", "Walk", 0.2)
        .build()
        .unwrap();
    let mut rng = rng();

    graph.transition_to("Walk").unwrap();
    assert_eq!(graph.active_name(), "StandUp");

    for _ in 0..4 {
        graph.update(0.1, &mut rng).unwrap();
    }
    // Fade into the bridge is done, the bridge has not played through
    assert_eq!(graph.active_name(), "StandUp");
    assert_eq!(weight(&graph, "Crouch"), 0.0);
    assert_eq!(weight(&graph, "StandUp"), 1.0);
    assert!(graph.is_transitioning());

    for _ in 0..2 {
        graph.update(0.1, &mut rng).unwrap();
    }
    assert_eq!(graph.active_name(), "Walk");

    for _ in 0..3 {
        graph.update(0.1, &mut rng).unwrap();
    }
    assert_eq!(weight(&graph, "StandUp"), 0.0);
    assert_eq!(weight(&graph, "Walk"), 1.0);
    assert!(!graph.is_transitioning());
}

// ============================================================================
// Trigger policies
// ============================================================================

fn idle_with_variants() -> AnimationGraph {
    GraphBuilder::new("Idle")
        .single_motion("Idle", clip("idle", 1.0))
        .single_motion("LookAround", clip("look", 1.0))
        .single_motion("Stretch", clip("stretch", 1.0))
        .crossfade("Idle", "LookAround", 0.3)
        .crossfade("Idle", "Stretch", 0.3)
        .trigger("Idle", TriggerPolicy::coin_flip(2.0, "LookAround", "Stretch"))
        .build()
        .unwrap()
}

#[test]
fn trigger_waits_for_its_delay() {
    let mut graph = idle_with_variants();
    let mut rng = rng();

    graph.update(1.0, &mut rng).unwrap();
    graph.update(0.5, &mut rng).unwrap();
    assert_eq!(graph.active_name(), "Idle");

    graph.update(0.5, &mut rng).unwrap();
    let active = graph.active_name();
    assert!(active == "LookAround" || active == "Stretch", "{active}");
}

#[test]
fn trigger_is_deterministic_for_a_seed() {
    let run = |seed: u64| {
        let mut graph = idle_with_variants();
        let mut rng = StdRng::seed_from_u64(seed);
        graph.update(2.0, &mut rng).unwrap();
        graph.active_name().to_string()
    };

    assert_eq!(run(42), run(42));
}

#[test]
fn coin_flip_picks_both_sides() {
    let policy = TriggerPolicy::coin_flip(1.0, "Heads", "Tails");

    assert_eq!(policy.select(0.1), Some("Heads"));
    assert_eq!(policy.select(0.9), Some("Tails"));
    assert_eq!(policy.select(0.999_999), Some("Tails"));
}

#[test]
fn declined_trigger_restarts_wait() {
    let mut graph = GraphBuilder::new("G")
        .single_motion("Idle", clip("idle", 1.0))
        .trigger(
            "Idle",
            TriggerPolicy::new(1.0, vec!["Idle".to_string()], |_, _| None),
        )
        .build()
        .unwrap();
    let mut rng = rng();

    graph.update(1.5, &mut rng).unwrap();
    assert_eq!(graph.active_name(), "Idle");
    assert_eq!(graph.active_node().time_in_state(), 0.0);
}

// ============================================================================
// Nested graphs
// ============================================================================

fn combat_graph() -> AnimationGraph {
    let upper = GraphBuilder::new("Combat")
        .single_motion("Aim", clip("aim", 1.0))
        .single_motion("Wave", clip("wave", 1.0))
        .crossfade("Aim", "Wave", 1.0)
        .build()
        .unwrap();

    GraphBuilder::new("Root")
        .single_motion("Idle", clip("idle", 1.0))
        .sub_graph("Combat", upper)
        .blend_space(
            "Move",
            vec![(0.0, clip("walk", 1.0)), (1.0, clip("run", 1.0))],
        )
        .crossfade("Idle", "Combat", 1.0)
        .build()
        .unwrap()
}

#[test]
fn nested_graphs_transition_concurrently() {
    let mut graph = combat_graph();
    let mut rng = rng();

    graph.transition_to("Combat").unwrap();
    graph.update(0.5, &mut rng).unwrap();

    graph
        .sub_graph_mut("Combat")
        .unwrap()
        .transition_to("Wave")
        .unwrap();
    graph.update(0.25, &mut rng).unwrap();

    assert!(approx(weight(&graph, "Idle"), 0.25));
    assert!(approx(weight(&graph, "Combat"), 0.75));

    let inner = graph.sub_graph_mut("Combat").unwrap();
    assert!(inner.is_transitioning());
    assert!(approx(weight(inner, "Aim"), 0.75));
    assert!(approx(weight(inner, "Wave"), 0.25));

    let leaves = graph.collect_leaves();
    let effective: Vec<(&str, f32)> = leaves
        .iter()
        .map(|l| (l.state.clip().name.as_str(), l.weight))
        .collect();
    assert_eq!(effective.len(), 3);
    assert!(effective.iter().any(|&(n, w)| n == "aim" && approx(w, 0.5625)));
    assert!(effective.iter().any(|&(n, w)| n == "wave" && approx(w, 0.1875)));
    assert!(approx(leaf_weight_sum(&graph), 1.0));
}

#[test]
fn disabled_sub_graph_reenters_at_entry() {
    let mut graph = combat_graph();
    let mut rng = rng();

    graph.transition_to("Combat").unwrap();
    graph.update(1.0, &mut rng).unwrap();
    graph
        .sub_graph_mut("Combat")
        .unwrap()
        .transition_to("Wave")
        .unwrap();

    graph.reset_to_entry();
    let inner = graph.sub_graph_mut("Combat").unwrap();
    assert_eq!(inner.active_name(), "Aim");
    assert_eq!(weight(inner, "Aim"), 0.0);
    assert!(!inner.is_transitioning());
}

#[test]
fn blend_parameter_reaches_nested_nodes() {
    let mut outer = GraphBuilder::new("Outer")
        .single_motion("Idle", clip("idle", 1.0))
        .sub_graph("Inner", combat_graph())
        .build()
        .unwrap();

    outer.set_blend_parameter("Move", 0.25).unwrap();
    let inner = outer.sub_graph_mut("Inner").unwrap();
    let NodeKind::BlendSpace(space) = &inner.node("Move").unwrap().kind else {
        panic!("Move is a blend space");
    };
    assert_eq!(space.parameter(), 0.25);

    assert_eq!(
        outer.set_blend_parameter("Idle", 0.5),
        Err(AnimationError::NodeNotFound("Idle".to_string()))
    );
}
