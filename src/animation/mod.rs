pub mod values;
pub mod tracks;
pub mod clip;
pub mod state;
pub mod blend_space;
pub mod node;
pub mod mixer;
pub mod graph;
pub mod compositor;
pub mod controller;
pub mod system;

pub use clip::{AnimationClip, ClipLibrary};
pub use tracks::{InterpolationMode, JointTrack, KeyframeTrack};
pub use state::AnimationState;
pub use blend_space::{BlendEntry, BlendSpace};
pub use node::{AnimationNode, Leaf, NodeId, NodeKind, Transition, TransitionKind, TriggerPolicy};
pub use mixer::Mixer;
pub use graph::{AnimationGraph, GraphBuilder};
pub use compositor::{CompositionReport, PoseCompositor};
pub use controller::{AnimTriggers, AnimatorController, ControllerParams, LocomotionController};
pub use system::{AnimationSystem, Animator, AnimatorHandle};
