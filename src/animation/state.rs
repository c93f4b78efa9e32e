use std::sync::Arc;

use glam::Vec3;

use crate::animation::clip::AnimationClip;
use crate::settings::NonLoopingPolicy;

/// Live cursor into one clip: the smallest unit the compositor blends.
#[derive(Debug, Clone)]
pub struct AnimationState {
    clip: Arc<AnimationClip>,

    pub time: f32,
    /// Local weight inside the owning node (blend-space share, 1.0 otherwise).
    pub weight: f32,
    pub non_looping: NonLoopingPolicy,

    // Cursor before the last advance, used for root-motion deltas
    prev_time: f32,
    // Loop seams crossed by the last advance
    loops: u32,
    // Total time played since the last reset
    elapsed: f32,
}

impl AnimationState {
    #[must_use]
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            weight: 1.0,
            non_looping: NonLoopingPolicy::default(),
            prev_time: 0.0,
            loops: 0,
            elapsed: 0.0,
        }
    }

    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
        self.prev_time = 0.0;
        self.loops = 0;
        self.elapsed = 0.0;
    }

    /// Advances the cursor by `dt`, wrapping looping clips.
    pub fn advance(&mut self, dt: f32) {
        self.prev_time = self.time;
        self.loops = 0;
        self.elapsed += dt;

        let duration = self.clip.duration;
        if duration <= 0.0 {
            return;
        }

        let next = self.time + dt;
        if self.clip.is_looping {
            if next >= duration {
                // A long frame can cross the seam more than once
                self.loops = loop_count(next / duration);
                self.time = next % duration;
            } else {
                self.time = next;
            }
            return;
        }

        match self.non_looping {
            NonLoopingPolicy::ClampToEnd => self.time = next.min(duration),
            NonLoopingPolicy::FreezeAndHold => {
                if next <= duration {
                    self.time = next;
                }
            }
        }
    }

    /// Places the cursor at a shared phase in `[0, 1)` after `loops` full
    /// cycles.
    ///
    /// `resync` starts a fresh root-motion interval instead of measuring
    /// from the previous cursor.
    pub fn set_phase(&mut self, phase: f32, loops: u32, resync: bool) {
        let time = phase * self.clip.duration;
        self.prev_time = if resync { time } else { self.time };
        self.loops = if resync { 0 } else { loops };
        self.time = time;
    }

    /// Loop seams crossed by the last advance.
    #[inline]
    #[must_use]
    pub fn loops(&self) -> u32 {
        self.loops
    }

    pub(crate) fn add_elapsed(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Played through at least one full clip length since the last reset.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.clip.duration
    }

    /// Raw horizontal motion of `joint` over the last advance.
    ///
    /// Only in-place clips report root motion; the others keep it in the pose.
    #[must_use]
    pub fn root_motion_delta(&self, joint: usize) -> Vec3 {
        if !self.clip.in_place {
            return Vec3::ZERO;
        }
        self.clip
            .root_motion_delta(joint, self.prev_time, self.time, self.loops)
    }
}

/// Whole cycles in a non-negative cycle count.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn loop_count(cycles: f32) -> u32 {
    cycles.floor().max(0.0) as u32
}
