use crate::animation::node::{AnimationNode, NodeId};

// Remaining crossfade time below which the fade counts as complete
const COMPLETION_EPSILON: f32 = 1e-6;

/// Drives the single in-flight crossfade of one graph level.
///
/// Weights follow `from = max(0, (1 - start) - f)` and
/// `to = min(1, start + f)` with `f = time / duration`, so a fade that was
/// armed mid-way (reversing an interrupted fade) continues from the
/// target's current weight.
#[derive(Debug, Clone, Default)]
pub struct Mixer {
    from: Option<NodeId>,
    to: Option<NodeId>,
    time: f32,
    duration: f32,
    start_weight: f32,
}

impl Mixer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, from: NodeId, to: NodeId, duration: f32, start_weight: f32) {
        self.from = Some(from);
        self.to = Some(to);
        self.time = 0.0;
        self.duration = duration.max(0.0);
        self.start_weight = start_weight.clamp(0.0, 1.0);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    #[must_use]
    pub fn endpoints(&self) -> Option<(NodeId, NodeId)> {
        self.from.zip(self.to)
    }

    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Progress in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.duration > 0.0 {
            (self.time / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    /// Advances the fade and writes both endpoint weights.
    ///
    /// Returns the source node once the fade completes; the caller disables
    /// it. The mixer is idle afterwards.
    pub fn update(&mut self, delta: f32, nodes: &mut [AnimationNode]) -> Option<NodeId> {
        let (from, to) = self.endpoints()?;

        self.time = (self.time + delta).min(self.duration);
        if self.duration - self.time <= COMPLETION_EPSILON {
            self.time = self.duration;
        }

        let fraction = self.fraction();
        let from_weight = ((1.0 - self.start_weight) - fraction).max(0.0);
        let to_weight = (self.start_weight + fraction).min(1.0);
        nodes[from.0].weight = from_weight;
        nodes[to.0].weight = to_weight;

        if self.time < self.duration {
            return None;
        }

        debug_assert!(
            from_weight == 0.0 && to_weight == 1.0,
            "crossfade completed with leaking weights: from={from_weight}, to={to_weight}"
        );
        log::debug!(
            "Crossfade '{}' -> '{}' complete",
            nodes[from.0].name,
            nodes[to.0].name
        );
        self.clear();
        Some(from)
    }
}
