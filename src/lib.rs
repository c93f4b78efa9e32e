//! Skeletal animation blending.
//!
//! Converts named clips, blend parameters and transition rules into one
//! pose per frame for a skinned model:
//!
//! ```text
//! ControllerParams ─► AnimationGraph::update ─► PoseCompositor::compose ─► SkeletonPose
//!                      (weights, cursors)         (sample, blend leaves)     (local, global)
//! ```
//!
//! Skeletons and clips are immutable and shared through `Arc`; graphs and
//! poses are owned by a single entity.

pub mod animation;
pub mod errors;
pub mod pose;
pub mod settings;
pub mod skeleton;

pub use animation::{
    AnimTriggers, AnimationClip, AnimationGraph, AnimationState, AnimationSystem, Animator,
    AnimatorController, ClipLibrary, ControllerParams, GraphBuilder, LocomotionController,
    PoseCompositor, TriggerPolicy,
};
pub use errors::{AnimationError, Result};
pub use pose::{JointPose, RootTransform, SkeletonPose};
pub use settings::{AnimationSettings, NonLoopingPolicy};
pub use skeleton::{Joint, Skeleton};
