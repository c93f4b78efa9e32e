use std::fmt;
use std::sync::Arc;

use rand::RngExt;
use smallvec::SmallVec;

use crate::animation::blend_space::BlendSpace;
use crate::animation::graph::AnimationGraph;
use crate::animation::state::AnimationState;
use crate::errors::Result;
use crate::settings::NonLoopingPolicy;

/// Index of a node inside its owning [`AnimationGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

// ============================================================================
// Transitions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionKind {
    /// Swap source for target within the current frame.
    Immediate,
    /// Hand weight from source to target over `duration` seconds.
    Crossfade { duration: f32 },
    /// Crossfade into a bridging node, then on to the target once the bridge
    /// has played through.
    Transitional { via: NodeId, duration: f32 },
}

/// Directed edge, stored on its source node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub to: NodeId,
    pub kind: TransitionKind,
}

// ============================================================================
// TriggerPolicy
// ============================================================================

type ChooseFn = dyn Fn(f32, usize) -> Option<usize> + Send + Sync;

/// Node-local rule that picks a follow-up transition at random once the node
/// has been active for `after` seconds.
///
/// `choose` receives a roll in `[0, 1)` and the number of candidate targets,
/// and returns the index of the target to transition to (`None` keeps the
/// node playing and restarts the wait).
#[derive(Clone)]
pub struct TriggerPolicy {
    pub after: f32,
    pub targets: Vec<String>,
    choose: Arc<ChooseFn>,
}

impl TriggerPolicy {
    pub fn new<F>(after: f32, targets: Vec<String>, choose: F) -> Self
    where
        F: Fn(f32, usize) -> Option<usize> + Send + Sync + 'static,
    {
        Self {
            after,
            targets,
            choose: Arc::new(choose),
        }
    }

    /// Uniform pick among `targets`.
    #[must_use]
    pub fn random_choice(after: f32, targets: &[&str]) -> Self {
        Self::new(
            after,
            targets.iter().map(|t| (*t).to_string()).collect(),
            |roll, count| (count > 0).then(|| ((roll * count as f32) as usize).min(count - 1)),
        )
    }

    /// Fifty-fifty pick between two alternates, e.g. idle variations.
    #[must_use]
    pub fn coin_flip(after: f32, heads: &str, tails: &str) -> Self {
        Self::random_choice(after, &[heads, tails])
    }

    /// Resolves a roll to one of the candidate target names.
    #[must_use]
    pub fn select(&self, roll: f32) -> Option<&str> {
        (self.choose)(roll, self.targets.len())
            .and_then(|i| self.targets.get(i))
            .map(String::as_str)
    }
}

impl fmt::Debug for TriggerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerPolicy")
            .field("after", &self.after)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// AnimationNode
// ============================================================================

#[derive(Debug, Clone)]
pub enum NodeKind {
    SingleMotion(AnimationState),
    BlendSpace(BlendSpace),
    Graph(Box<AnimationGraph>),
}

/// A leaf cursor together with its effective weight.
#[derive(Debug, Clone, Copy)]
pub struct Leaf<'a> {
    pub state: &'a AnimationState,
    pub weight: f32,
}

pub type LeafList<'a> = SmallVec<[Leaf<'a>; 8]>;

#[derive(Debug, Clone)]
pub struct AnimationNode {
    pub name: String,
    /// Weight inside the owning graph, in `[0, 1]`.
    pub weight: f32,
    pub kind: NodeKind,
    pub transitions: Vec<Transition>,
    pub trigger: Option<TriggerPolicy>,
    time_in_state: f32,
}

impl AnimationNode {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            weight: 0.0,
            kind,
            transitions: Vec::new(),
            trigger: None,
            time_in_state: 0.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    pub(crate) fn restart_wait(&mut self) {
        self.time_in_state = 0.0;
    }

    #[must_use]
    pub fn transition_to(&self, target: NodeId) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.to == target)
    }

    /// Rewinds the node and, for nested graphs, re-enters the entry node.
    /// The caller assigns the weight.
    pub fn enable(&mut self) {
        self.time_in_state = 0.0;
        match &mut self.kind {
            NodeKind::SingleMotion(state) => {
                state.reset();
                state.weight = 1.0;
            }
            NodeKind::BlendSpace(space) => space.reset(),
            NodeKind::Graph(graph) => graph.reset_to_entry(),
        }
    }

    /// Zeroes the weight and rewinds the node, recursively for nested graphs.
    pub fn disable(&mut self) {
        self.weight = 0.0;
        self.time_in_state = 0.0;
        match &mut self.kind {
            NodeKind::SingleMotion(state) => state.reset(),
            NodeKind::BlendSpace(space) => space.reset(),
            NodeKind::Graph(graph) => graph.disable_all(),
        }
    }

    /// Advances the node's cursors by `delta`.
    pub fn update<R: RngExt>(&mut self, delta: f32, rng: &mut R) -> Result<()> {
        self.time_in_state += delta;
        match &mut self.kind {
            NodeKind::SingleMotion(state) => state.advance(delta),
            NodeKind::BlendSpace(space) => {
                let parameter = space.parameter();
                space.update(parameter, delta);
            }
            NodeKind::Graph(graph) => graph.update(delta, rng)?,
        }
        Ok(())
    }

    /// Played through once since it was enabled; gates transitional hand-offs.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.kind {
            NodeKind::SingleMotion(state) => state.is_finished(),
            NodeKind::BlendSpace(space) => space.is_finished(),
            NodeKind::Graph(graph) => graph.active_node().is_finished(),
        }
    }

    /// Pushes every leaf whose effective weight is positive.
    pub fn collect_leaves<'a>(&'a self, parent_weight: f32, out: &mut LeafList<'a>) {
        let weight = parent_weight * self.weight;
        if weight <= 0.0 {
            return;
        }

        match &self.kind {
            NodeKind::SingleMotion(state) => out.push(Leaf {
                state,
                weight: weight * state.weight,
            }),
            NodeKind::BlendSpace(space) => {
                for entry in space.entries() {
                    let leaf_weight = weight * entry.weight();
                    if leaf_weight > 0.0 {
                        out.push(Leaf {
                            state: &entry.state,
                            weight: leaf_weight,
                        });
                    }
                }
            }
            NodeKind::Graph(graph) => graph.collect_leaves_into(weight, out),
        }
    }

    pub(crate) fn set_non_looping_policy(&mut self, policy: NonLoopingPolicy) {
        match &mut self.kind {
            NodeKind::SingleMotion(state) => state.non_looping = policy,
            NodeKind::BlendSpace(space) => {
                for entry in space.entries_mut() {
                    entry.state.non_looping = policy;
                }
            }
            NodeKind::Graph(graph) => graph.set_non_looping_policy(policy),
        }
    }
}
