//! Animation Graph
//!
//! A state machine over [`AnimationNode`]s. Exactly one node is active per
//! graph level; while a crossfade is in flight the graph's [`Mixer`] holds
//! the outgoing and incoming node at complementary weights. Nested graphs
//! own their own mixer, so transitions at different levels of the hierarchy
//! can run concurrently.
//!
//! Graphs are declared once per model archetype through [`GraphBuilder`],
//! validated up front, and cloned per entity.
//!
//! ```rust,ignore
//! let graph = GraphBuilder::new("Locomotion")
//!     .single_motion("Idle", library.get("idle")?)
//!     .blend_space("Walk", vec![(0.0, walk_slow), (1.0, walk_fast)])
//!     .crossfade("Idle", "Walk", 0.25)
//!     .crossfade("Walk", "Idle", 0.25)
//!     .build()?;
//! ```

use std::sync::Arc;

use rand::RngExt;
use rustc_hash::FxHashMap;

use crate::animation::blend_space::BlendSpace;
use crate::animation::clip::AnimationClip;
use crate::animation::mixer::Mixer;
use crate::animation::node::{
    AnimationNode, LeafList, NodeId, NodeKind, Transition, TransitionKind, TriggerPolicy,
};
use crate::animation::state::AnimationState;
use crate::errors::{AnimationError, Result};
use crate::settings::NonLoopingPolicy;
use crate::skeleton::Skeleton;

#[derive(Debug, Clone, Copy)]
struct PendingTransition {
    via: NodeId,
    to: NodeId,
    duration: f32,
}

#[derive(Debug, Clone)]
pub struct AnimationGraph {
    name: String,
    nodes: Vec<AnimationNode>,
    lookup: FxHashMap<String, NodeId>,
    entry: NodeId,
    active: NodeId,
    mixer: Mixer,
    pending: Option<PendingTransition>,
}

impl AnimationGraph {
    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn nodes(&self) -> &[AnimationNode] {
        &self.nodes
    }

    #[must_use]
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.lookup.get(name).copied()
    }

    #[must_use]
    pub fn node(&self, name: &str) -> Option<&AnimationNode> {
        self.node_id(name).map(|id| &self.nodes[id.0])
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut AnimationNode> {
        let id = self.node_id(name)?;
        Some(&mut self.nodes[id.0])
    }

    #[must_use]
    pub fn weight_of(&self, name: &str) -> Option<f32> {
        self.node(name).map(|n| n.weight)
    }

    #[must_use]
    pub fn entry_id(&self) -> NodeId {
        self.entry
    }

    #[must_use]
    pub fn active_id(&self) -> NodeId {
        self.active
    }

    #[must_use]
    pub fn active_node(&self) -> &AnimationNode {
        &self.nodes[self.active.0]
    }

    #[must_use]
    pub fn active_name(&self) -> &str {
        &self.active_node().name
    }

    #[must_use]
    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    /// A crossfade or a transitional hand-off is in progress at this level.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.mixer.is_active() || self.pending.is_some()
    }

    /// Final target of a transitional hand-off whose bridge is still playing.
    #[must_use]
    pub fn pending_target(&self) -> Option<&str> {
        self.pending.map(|p| self.nodes[p.to.0].name.as_str())
    }

    /// Whether the active node has an edge to `target`.
    #[must_use]
    pub fn can_transition_to(&self, target: &str) -> bool {
        self.node_id(target)
            .is_some_and(|id| self.active_node().transition_to(id).is_some())
    }

    /// Depth-first search for a nested graph node called `name`.
    pub fn sub_graph_mut(&mut self, name: &str) -> Option<&mut AnimationGraph> {
        for node in &mut self.nodes {
            if let NodeKind::Graph(graph) = &mut node.kind {
                if node.name == name {
                    return Some(graph.as_mut());
                }
                if let Some(found) = graph.sub_graph_mut(name) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Fails if any clip reachable from this graph animates joints the
    /// skeleton does not have.
    pub fn validate_for(&self, skeleton: &Skeleton) -> Result<()> {
        self.nodes.iter().try_for_each(|node| match &node.kind {
            NodeKind::SingleMotion(state) => state.clip().validate_for(skeleton),
            NodeKind::BlendSpace(space) => space
                .entries()
                .iter()
                .try_for_each(|e| e.state.clip().validate_for(skeleton)),
            NodeKind::Graph(graph) => graph.validate_for(skeleton),
        })
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Starts the transition from the active node to `target`.
    ///
    /// Requesting the already-active node without a self edge is a no-op.
    pub fn transition_to(&mut self, target: &str) -> Result<()> {
        let to = self
            .node_id(target)
            .ok_or_else(|| AnimationError::NodeNotFound(target.to_string()))?;
        let from = self.active;

        let Some(transition) = self.nodes[from.0].transition_to(to).copied() else {
            if to == from {
                return Ok(());
            }
            return Err(AnimationError::TransitionNotFound {
                from: self.nodes[from.0].name.clone(),
                to: target.to_string(),
            });
        };

        log::debug!(
            "Graph '{}': '{}' -> '{}' ({:?})",
            self.name,
            self.nodes[from.0].name,
            target,
            transition.kind
        );
        self.start_transition(from, transition);
        Ok(())
    }

    /// Sets the parameter of the blend-space node called `name`, searching
    /// nested graphs as well.
    pub fn set_blend_parameter(&mut self, name: &str, value: f32) -> Result<()> {
        if self.try_set_blend_parameter(name, value) {
            Ok(())
        } else {
            Err(AnimationError::NodeNotFound(name.to_string()))
        }
    }

    fn try_set_blend_parameter(&mut self, name: &str, value: f32) -> bool {
        for node in &mut self.nodes {
            let named = node.name == name;
            match &mut node.kind {
                NodeKind::BlendSpace(space) if named => {
                    space.set_parameter(value);
                    return true;
                }
                NodeKind::Graph(graph) => {
                    if graph.try_set_blend_parameter(name, value) {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    // ========================================================================
    // Per-frame update
    // ========================================================================

    /// Advances weights first, then every weighted node, then node triggers
    /// and pending transitional hand-offs.
    pub fn update<R: RngExt>(&mut self, delta: f32, rng: &mut R) -> Result<()> {
        if let Some(finished) = self.mixer.update(delta, &mut self.nodes) {
            self.nodes[finished.0].disable();
        }

        for node in &mut self.nodes {
            if node.weight > 0.0 {
                node.update(delta, rng)?;
            }
        }

        self.fire_trigger(rng)?;
        self.resolve_pending();
        Ok(())
    }

    fn fire_trigger<R: RngExt>(&mut self, rng: &mut R) -> Result<()> {
        if self.is_transitioning() {
            return Ok(());
        }

        let node = &self.nodes[self.active.0];
        let Some(trigger) = &node.trigger else {
            return Ok(());
        };
        if node.time_in_state() < trigger.after {
            return Ok(());
        }

        let roll = rng.random_range(0.0..1.0f32);
        let target = trigger.select(roll).map(str::to_owned);
        let before = self.active;

        if let Some(target) = target {
            log::debug!(
                "Graph '{}': trigger on '{}' selected '{target}' (roll {roll:.3})",
                self.name,
                self.nodes[before.0].name
            );
            self.transition_to(&target)?;
        }
        if self.active == before {
            self.nodes[before.0].restart_wait();
        }
        Ok(())
    }

    fn resolve_pending(&mut self) {
        let Some(pending) = self.pending else {
            return;
        };
        if self.active != pending.via {
            self.pending = None;
            return;
        }
        if self.mixer.is_active() || !self.nodes[pending.via.0].is_finished() {
            return;
        }

        log::debug!(
            "Graph '{}': bridge '{}' finished, continuing to '{}'",
            self.name,
            self.nodes[pending.via.0].name,
            self.nodes[pending.to.0].name
        );
        self.pending = None;
        self.crossfade(pending.via, pending.to, pending.duration);
    }

    fn start_transition(&mut self, from: NodeId, transition: Transition) {
        self.pending = None;
        match transition.kind {
            TransitionKind::Immediate => self.switch_immediate(from, transition.to),
            TransitionKind::Crossfade { duration } => self.crossfade(from, transition.to, duration),
            TransitionKind::Transitional { via, duration } => {
                self.crossfade(from, via, duration);
                self.pending = Some(PendingTransition {
                    via,
                    to: transition.to,
                    duration,
                });
            }
        }
    }

    fn switch_immediate(&mut self, from: NodeId, to: NodeId) {
        if let Some((fading_out, _)) = self.mixer.endpoints() {
            if fading_out != to {
                self.nodes[fading_out.0].disable();
            }
            self.mixer.clear();
        }
        if from != to {
            self.nodes[from.0].disable();
        }

        let target = &mut self.nodes[to.0];
        target.enable();
        target.weight = 1.0;
        self.active = to;
    }

    /// Arms the mixer. An in-flight fade is resolved first: fading back to
    /// its source reverses it seamlessly, any other target snaps the
    /// outgoing node away and fades from the current one.
    fn crossfade(&mut self, from: NodeId, to: NodeId, duration: f32) {
        if duration <= 0.0 || from == to {
            self.switch_immediate(from, to);
            return;
        }

        let start_weight = match self.mixer.endpoints() {
            Some((fading_out, _)) if fading_out == to => self.nodes[to.0].weight,
            Some((fading_out, fading_in)) => {
                log::debug!(
                    "Graph '{}': crossfade into '{}' interrupted",
                    self.name,
                    self.nodes[fading_in.0].name
                );
                self.nodes[fading_out.0].disable();
                self.nodes[fading_in.0].weight = 1.0;
                self.enable_silent(to);
                0.0
            }
            None => {
                self.enable_silent(to);
                0.0
            }
        };

        self.mixer.arm(from, to, duration, start_weight);
        self.active = to;
    }

    fn enable_silent(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        node.enable();
        node.weight = 0.0;
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Returns to the entry node at full weight, cancelling any transition.
    pub fn reset_to_entry(&mut self) {
        self.disable_all();
        self.active = self.entry;
        let entry = &mut self.nodes[self.entry.0];
        entry.enable();
        entry.weight = 1.0;
    }

    /// Zeroes every node in this graph and below. The entry becomes the
    /// active node again, still at zero weight.
    pub fn disable_all(&mut self) {
        for node in &mut self.nodes {
            node.disable();
        }
        self.mixer.clear();
        self.pending = None;
        self.active = self.entry;
    }

    pub fn set_non_looping_policy(&mut self, policy: NonLoopingPolicy) {
        for node in &mut self.nodes {
            node.set_non_looping_policy(policy);
        }
    }

    // ========================================================================
    // Leaf collection
    // ========================================================================

    /// Every leaf cursor with a positive effective weight.
    #[must_use]
    pub fn collect_leaves(&self) -> LeafList<'_> {
        let mut out = LeafList::new();
        self.collect_leaves_into(1.0, &mut out);
        out
    }

    pub fn collect_leaves_into<'a>(&'a self, parent_weight: f32, out: &mut LeafList<'a>) {
        for node in &self.nodes {
            node.collect_leaves(parent_weight, out);
        }
    }
}

// ============================================================================
// GraphBuilder
// ============================================================================

#[derive(Debug)]
enum NodeSource {
    Single(Arc<AnimationClip>),
    Blend {
        entries: Vec<(f32, Arc<AnimationClip>)>,
        cycle: f32,
    },
    Graph(AnimationGraph),
}

#[derive(Debug)]
struct NodeDecl {
    name: String,
    source: NodeSource,
    trigger: Option<TriggerPolicy>,
}

#[derive(Debug)]
enum EdgeKind {
    Immediate,
    Crossfade(f32),
    Transitional { via: String, duration: f32 },
}

#[derive(Debug)]
struct EdgeDecl {
    from: String,
    to: String,
    kind: EdgeKind,
}

/// Declarative, name-based graph construction with up-front validation.
#[derive(Debug)]
pub struct GraphBuilder {
    name: String,
    nodes: Vec<NodeDecl>,
    edges: Vec<EdgeDecl>,
    entry: Option<String>,
    orphan_triggers: Vec<String>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            entry: None,
            orphan_triggers: Vec::new(),
        }
    }

    fn node(mut self, name: &str, source: NodeSource) -> Self {
        self.nodes.push(NodeDecl {
            name: name.to_string(),
            source,
            trigger: None,
        });
        self
    }

    #[must_use]
    pub fn single_motion(self, name: &str, clip: Arc<AnimationClip>) -> Self {
        self.node(name, NodeSource::Single(clip))
    }

    #[must_use]
    pub fn blend_space(self, name: &str, entries: Vec<(f32, Arc<AnimationClip>)>) -> Self {
        self.blend_space_with_cycle(name, entries, 1.0)
    }

    /// Blend space whose shared phase completes once every `cycle` seconds.
    #[must_use]
    pub fn blend_space_with_cycle(
        self,
        name: &str,
        entries: Vec<(f32, Arc<AnimationClip>)>,
        cycle: f32,
    ) -> Self {
        self.node(name, NodeSource::Blend { entries, cycle })
    }

    #[must_use]
    pub fn sub_graph(self, name: &str, graph: AnimationGraph) -> Self {
        self.node(name, NodeSource::Graph(graph))
    }

    /// Entry node; defaults to the first declared node.
    #[must_use]
    pub fn entry(mut self, name: &str) -> Self {
        self.entry = Some(name.to_string());
        self
    }

    fn edge(mut self, from: &str, to: &str, kind: EdgeKind) -> Self {
        self.edges.push(EdgeDecl {
            from: from.to_string(),
            to: to.to_string(),
            kind,
        });
        self
    }

    #[must_use]
    pub fn immediate(self, from: &str, to: &str) -> Self {
        self.edge(from, to, EdgeKind::Immediate)
    }

    /// Fades from `from` into `to` over `duration` seconds.
    ///
    /// A zero duration behaves like [`immediate`](Self::immediate). So does a
    /// self edge (`from == to`) of any duration: it restarts the node at
    /// full weight.
    #[must_use]
    pub fn crossfade(self, from: &str, to: &str, duration: f32) -> Self {
        self.edge(from, to, EdgeKind::Crossfade(duration))
    }

    #[must_use]
    pub fn transitional(self, from: &str, via: &str, to: &str, duration: f32) -> Self {
        self.edge(
            from,
            to,
            EdgeKind::Transitional {
                via: via.to_string(),
                duration,
            },
        )
    }

    /// Attaches a trigger policy to an already declared node.
    #[must_use]
    pub fn trigger(mut self, node: &str, policy: TriggerPolicy) -> Self {
        match self.nodes.iter_mut().find(|n| n.name == node) {
            Some(decl) => decl.trigger = Some(policy),
            None => self.orphan_triggers.push(node.to_string()),
        }
        self
    }

    pub fn build(self) -> Result<AnimationGraph> {
        if self.nodes.is_empty() {
            return Err(AnimationError::EmptyGraph(self.name));
        }
        if let Some(orphan) = self.orphan_triggers.first() {
            return Err(AnimationError::NodeNotFound(orphan.clone()));
        }

        let mut lookup = FxHashMap::default();
        for (index, decl) in self.nodes.iter().enumerate() {
            if lookup.insert(decl.name.clone(), NodeId(index)).is_some() {
                return Err(AnimationError::DuplicateNode(decl.name.clone()));
            }
        }

        let resolve = |name: &str| {
            lookup
                .get(name)
                .copied()
                .ok_or_else(|| AnimationError::NodeNotFound(name.to_string()))
        };

        let entry = match &self.entry {
            Some(name) => resolve(name)?,
            None => NodeId(0),
        };

        let mut nodes = Vec::with_capacity(self.nodes.len());
        for decl in self.nodes {
            let kind = match decl.source {
                NodeSource::Single(clip) => NodeKind::SingleMotion(AnimationState::new(clip)),
                NodeSource::Blend { entries, cycle } => {
                    if !(cycle.is_finite() && cycle > 0.0) {
                        return Err(AnimationError::InvalidBlendSpace {
                            node: decl.name,
                            reason: format!("cycle duration must be positive, got {cycle}"),
                        });
                    }
                    NodeKind::BlendSpace(
                        BlendSpace::new(&decl.name, entries)?.with_cycle_duration(cycle),
                    )
                }
                NodeSource::Graph(graph) => NodeKind::Graph(Box::new(graph)),
            };
            let mut node = AnimationNode::new(decl.name, kind);
            node.trigger = decl.trigger;
            nodes.push(node);
        }

        for edge in &self.edges {
            let from = resolve(&edge.from)?;
            let to = resolve(&edge.to)?;
            let invalid = |reason: String| AnimationError::InvalidTransition {
                from: edge.from.clone(),
                to: edge.to.clone(),
                reason,
            };
            let check_duration = |duration: f32| {
                if duration.is_finite() && duration >= 0.0 {
                    Ok(duration)
                } else {
                    Err(invalid(format!("duration must be non-negative, got {duration}")))
                }
            };

            let kind = match &edge.kind {
                EdgeKind::Immediate => TransitionKind::Immediate,
                EdgeKind::Crossfade(duration) => TransitionKind::Crossfade {
                    duration: check_duration(*duration)?,
                },
                EdgeKind::Transitional { via, duration } => {
                    let via_id = resolve(via)?;
                    if via_id == from || via_id == to {
                        return Err(invalid(format!(
                            "bridge '{via}' must differ from both endpoints"
                        )));
                    }
                    TransitionKind::Transitional {
                        via: via_id,
                        duration: check_duration(*duration)?,
                    }
                }
            };

            if nodes[from.0].transition_to(to).is_some() {
                return Err(invalid("duplicate edge".to_string()));
            }
            nodes[from.0].transitions.push(Transition { to, kind });
        }

        for (index, node) in nodes.iter().enumerate() {
            let Some(trigger) = &node.trigger else {
                continue;
            };
            for target in &trigger.targets {
                let id = resolve(target)?;
                // A self target without an edge just restarts the wait
                if id.0 != index && node.transition_to(id).is_none() {
                    return Err(AnimationError::InvalidTransition {
                        from: node.name.clone(),
                        to: target.clone(),
                        reason: "trigger target has no edge from this node".to_string(),
                    });
                }
            }
        }

        let mut graph = AnimationGraph {
            name: self.name,
            nodes,
            lookup,
            entry,
            active: entry,
            mixer: Mixer::new(),
            pending: None,
        };
        graph.reset_to_entry();

        log::debug!(
            "Built animation graph '{}' with {} nodes (entry '{}')",
            graph.name,
            graph.nodes.len(),
            graph.active_name()
        );
        Ok(graph)
    }
}
