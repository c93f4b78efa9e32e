//! 1-D Blend Space
//!
//! Maps a scalar parameter (movement speed, typically) onto a mixture of
//! clips laid out along a line:
//!
//! ```text
//!  value:   0.0 (idle)      0.5 (walk)       1.0 (run)
//!             |----------------|----------------|
//!  p = 0.75                          ^ walk 0.5 / run 0.5
//! ```
//!
//! Brackets are half-open, `value[i] <= p < value[i + 1]`, so a parameter
//! sitting exactly on an entry selects that entry alone.
//!
//! All entries share one normalized phase. A weighted entry's cursor is
//! `phase * clip.duration`, which keeps footfalls aligned between clips of
//! different lengths.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::animation::clip::AnimationClip;
use crate::animation::state::{AnimationState, loop_count};
use crate::errors::{AnimationError, Result};

#[derive(Debug, Clone)]
pub struct BlendEntry {
    pub value: f32,
    pub state: AnimationState,
}

impl BlendEntry {
    #[inline]
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.state.weight
    }
}

#[derive(Debug, Clone)]
pub struct BlendSpace {
    entries: Vec<BlendEntry>,
    parameter: f32,
    normalized_time: f32,
    /// Seconds for one full phase cycle.
    pub cycle_duration: f32,
    // Phase cycles completed since the last reset
    cycles: f32,
}

impl BlendSpace {
    /// Builds a blend space from `(value, clip)` pairs.
    ///
    /// `node` only names the owner in error messages. Values must be finite
    /// and strictly increasing.
    pub fn new(node: &str, entries: Vec<(f32, Arc<AnimationClip>)>) -> Result<Self> {
        let invalid = |reason: &str| AnimationError::InvalidBlendSpace {
            node: node.to_string(),
            reason: reason.to_string(),
        };

        if entries.is_empty() {
            return Err(invalid("no entries"));
        }
        if entries.iter().any(|(v, _)| !v.is_finite()) {
            return Err(invalid("non-finite entry value"));
        }
        if entries.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(invalid("entry values must be strictly increasing"));
        }

        let entries: Vec<BlendEntry> = entries
            .into_iter()
            .map(|(value, clip)| BlendEntry {
                value,
                state: AnimationState::new(clip),
            })
            .collect();

        let mut space = Self {
            parameter: entries[0].value,
            entries,
            normalized_time: 0.0,
            cycle_duration: 1.0,
            cycles: 0.0,
        };
        space.reweight();
        Ok(space)
    }

    #[must_use]
    pub fn with_cycle_duration(mut self, seconds: f32) -> Self {
        self.cycle_duration = seconds;
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[BlendEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [BlendEntry] {
        &mut self.entries
    }

    #[must_use]
    pub fn min_value(&self) -> f32 {
        self.entries[0].value
    }

    #[must_use]
    pub fn max_value(&self) -> f32 {
        self.entries[self.entries.len() - 1].value
    }

    #[must_use]
    pub fn parameter(&self) -> f32 {
        self.parameter
    }

    #[must_use]
    pub fn normalized_time(&self) -> f32 {
        self.normalized_time
    }

    /// Weight of the entry authored at `value`, if any.
    #[must_use]
    pub fn weight_at(&self, value: f32) -> Option<f32> {
        self.entries
            .iter()
            .find(|e| e.value == value)
            .map(BlendEntry::weight)
    }

    /// Stores the parameter clamped to the authored value range and
    /// recomputes entry weights.
    pub fn set_parameter(&mut self, parameter: f32) {
        let clamped = if parameter.is_nan() {
            self.min_value()
        } else {
            parameter.clamp(self.min_value(), self.max_value())
        };
        if clamped != parameter {
            log::trace!(
                "Blend parameter {parameter} clamped to [{}, {}]",
                self.min_value(),
                self.max_value()
            );
        }
        self.parameter = clamped;
        self.reweight();
    }

    /// Applies `parameter`, then advances the shared phase by `delta`.
    pub fn update(&mut self, parameter: f32, delta: f32) {
        let previous: SmallVec<[bool; 8]> =
            self.entries.iter().map(|e| e.weight() > 0.0).collect();
        self.set_parameter(parameter);

        let step = if self.cycle_duration > 0.0 {
            delta / self.cycle_duration
        } else {
            0.0
        };
        let next = self.normalized_time + step;
        let loops = loop_count(next);
        self.normalized_time = next.rem_euclid(1.0);
        self.cycles += step;

        let phase = self.normalized_time;
        for (entry, was_weighted) in self.entries.iter_mut().zip(previous) {
            if entry.weight() > 0.0 {
                entry.state.set_phase(phase, loops, !was_weighted);
                entry.state.add_elapsed(delta);
            }
        }
    }

    pub fn reset(&mut self) {
        self.normalized_time = 0.0;
        self.cycles = 0.0;
        for entry in &mut self.entries {
            entry.state.reset();
        }
        self.reweight();
    }

    /// Completed at least one full phase cycle since the last reset.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.cycles >= 1.0
    }

    fn reweight(&mut self) {
        let p = self.parameter;
        let len = self.entries.len();

        // partition_point finds the first entry whose value exceeds p
        let upper = self.entries.partition_point(|e| e.value <= p);
        for entry in &mut self.entries {
            entry.state.weight = 0.0;
        }

        if upper == 0 {
            self.entries[0].state.weight = 1.0;
        } else if upper >= len {
            self.entries[len - 1].state.weight = 1.0;
        } else {
            let lower = upper - 1;
            let (v0, v1) = (self.entries[lower].value, self.entries[upper].value);
            let t = (p - v0) / (v1 - v0);
            self.entries[lower].state.weight = 1.0 - t;
            self.entries[upper].state.weight = t;
        }
    }
}
