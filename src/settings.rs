//! Animation Settings
//!
//! Runtime configuration shared by every [`Animator`](crate::animation::Animator)
//! driven by one [`AnimationSystem`](crate::animation::AnimationSystem).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_anim::settings::{AnimationSettings, NonLoopingPolicy};
//!
//! let settings = AnimationSettings {
//!     non_looping: NonLoopingPolicy::FreezeAndHold,
//!     ..Default::default()
//! };
//! ```
//!
//! Settings are plain serde data, so they can also be loaded from a JSON
//! file next to the model archetypes.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NonLoopingPolicy
// ---------------------------------------------------------------------------

/// What happens to a non-looping clip's cursor once it runs past the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NonLoopingPolicy {
    /// Time is clamped to `duration`; the last keyframe is held while the
    /// leaf keeps its weight.
    #[default]
    ClampToEnd,
    /// Time stops advancing at the first frame that would cross `duration`,
    /// holding the last sampled pose rather than snapping to the end key.
    FreezeAndHold,
}

// ---------------------------------------------------------------------------
// AnimationSettings
// ---------------------------------------------------------------------------

/// Configuration for graph evaluation and pose composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Allowed deviation of the summed leaf weights from 1.0 before the
    /// compositor reports a weight leak.
    pub weight_tolerance: f32,

    /// Initial capacity (in bytes) of the per-frame scratch arena.
    pub frame_arena_capacity: usize,

    /// Cursor policy for non-looping clips.
    pub non_looping: NonLoopingPolicy,

    /// Extract horizontal hip motion into the root-motion accumulator.
    pub root_motion: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            weight_tolerance: 1e-4,
            frame_arena_capacity: 64 * 1024,
            non_looping: NonLoopingPolicy::ClampToEnd,
            root_motion: true,
        }
    }
}
