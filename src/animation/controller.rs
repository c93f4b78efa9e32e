use bitflags::bitflags;

use crate::animation::graph::AnimationGraph;
use crate::errors::Result;

bitflags! {
    /// One-shot gameplay flags consumed by controllers each frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnimTriggers: u32 {
        const DANCE        = 1 << 0;
        const IDLE_VARIANT = 1 << 1;
        const JUMP         = 1 << 2;
        const ATTACK       = 1 << 3;
    }
}

/// Per-entity input consumed once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerParams {
    /// Movement magnitude in `[0, 1]`.
    pub movement: f32,
    pub triggers: AnimTriggers,
}

impl ControllerParams {
    #[must_use]
    pub fn moving(movement: f32) -> Self {
        Self {
            movement,
            triggers: AnimTriggers::empty(),
        }
    }

    #[must_use]
    pub fn with_triggers(mut self, triggers: AnimTriggers) -> Self {
        self.triggers |= triggers;
        self
    }
}

/// Per-archetype policy deciding which transitions to request.
///
/// Controllers only set parameters and call `transition_to`; weights and
/// cursors are advanced afterwards by [`AnimationGraph::update`].
pub trait AnimatorController: Send {
    fn drive(&mut self, graph: &mut AnimationGraph, params: &ControllerParams) -> Result<()>;
}

impl<F> AnimatorController for F
where
    F: FnMut(&mut AnimationGraph, &ControllerParams) -> Result<()> + Send,
{
    fn drive(&mut self, graph: &mut AnimationGraph, params: &ControllerParams) -> Result<()> {
        self(graph, params)
    }
}

/// Stock idle/locomotion controller for humanoid rigs.
///
/// The movement magnitude feeds the locomotion blend space and toggles
/// between the idle and locomotion nodes; optional dance and idle-variant
/// nodes are entered from idle when their trigger flag is raised.
#[derive(Debug, Clone)]
pub struct LocomotionController {
    pub idle: String,
    pub locomotion: String,
    pub dance: Option<String>,
    pub idle_variant: Option<String>,
    /// Movement magnitude above which the character counts as moving.
    pub move_threshold: f32,
}

impl LocomotionController {
    #[must_use]
    pub fn new(idle: &str, locomotion: &str) -> Self {
        Self {
            idle: idle.to_string(),
            locomotion: locomotion.to_string(),
            dance: None,
            idle_variant: None,
            move_threshold: 0.05,
        }
    }

    #[must_use]
    pub fn with_dance(mut self, dance: &str) -> Self {
        self.dance = Some(dance.to_string());
        self
    }

    #[must_use]
    pub fn with_idle_variant(mut self, variant: &str) -> Self {
        self.idle_variant = Some(variant.to_string());
        self
    }

    /// Requests `target` unless the graph is already on its way there.
    fn request(graph: &mut AnimationGraph, target: &str) -> Result<()> {
        if graph.active_name() == target || graph.pending_target() == Some(target) {
            return Ok(());
        }
        graph.transition_to(target)
    }
}

impl AnimatorController for LocomotionController {
    fn drive(&mut self, graph: &mut AnimationGraph, params: &ControllerParams) -> Result<()> {
        let movement = params.movement.clamp(0.0, 1.0);
        graph.set_blend_parameter(&self.locomotion, movement)?;

        let moving = movement > self.move_threshold;
        let active = graph.active_name().to_string();

        if moving {
            if active != self.locomotion {
                return Self::request(graph, &self.locomotion);
            }
            return Ok(());
        }

        if active == self.locomotion {
            return Self::request(graph, &self.idle);
        }

        if active == self.idle {
            if let Some(dance) = &self.dance
                && params.triggers.contains(AnimTriggers::DANCE)
            {
                return Self::request(graph, dance);
            }
            if let Some(variant) = &self.idle_variant
                && params.triggers.contains(AnimTriggers::IDLE_VARIANT)
            {
                return Self::request(graph, variant);
            }
        } else if self.dance.as_deref() == Some(active.as_str())
            && !params.triggers.contains(AnimTriggers::DANCE)
        {
            return Self::request(graph, &self.idle);
        }

        Ok(())
    }
}
