//! Pose Compositor
//!
//! Turns the weighted leaves of an [`AnimationGraph`] into one local pose,
//! then rebuilds the global joint matrices.
//!
//! # Blending
//!
//! Leaves are folded into a running result one at a time:
//!
//! ```text
//! result = leaf[0]
//! for leaf in leaf[1..]:
//!     t      = w_leaf / (w_acc + w_leaf)
//!     result = lerp(result, leaf, t)      // slerp for rotations
//!     w_acc += w_leaf
//! ```
//!
//! which equals the normalized weighted average regardless of leaf order and
//! never needs the weights to be normalized up front.
//!
//! # Scratch memory
//!
//! Every leaf samples into its own scratch pose, seeded with the destination
//! pose's current local poses and allocated from a frame arena. Joints no
//! clip animates therefore keep their previous value.
//! [`PoseCompositor::begin_frame`] resets the arena, so no scratch pose
//! outlives the frame it was composed in.
//!
//! # Root motion
//!
//! Two sources feed the report:
//!
//! - In-place clips have the hip's horizontal translation stripped while
//!   they are sampled. Their motion is measured per leaf as the raw hip
//!   displacement over the leaf's last advance and blended with the same
//!   normalized weights as the pose.
//! - Whatever horizontal hip translation is left in the composed pose is
//!   moved into the report and zeroed in the pose, so it is never applied
//!   twice.

use bumpalo::Bump;
use glam::Vec3;

use crate::animation::graph::AnimationGraph;
use crate::animation::node::Leaf;
use crate::errors::Result;
use crate::pose::{JointPose, RootTransform, SkeletonPose};
use crate::settings::AnimationSettings;

/// Per-composition diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompositionReport {
    /// Leaves blended into the pose.
    pub leaf_count: usize,
    /// Sum of effective leaf weights; 1.0 for a healthy graph.
    pub weight_sum: f32,
    /// Horizontal root motion produced this frame, in skeleton space.
    pub root_motion: Vec3,
}

pub struct PoseCompositor {
    arena: Bump,
    weight_tolerance: f32,
    root_motion: bool,
}

impl PoseCompositor {
    #[must_use]
    pub fn new(settings: &AnimationSettings) -> Self {
        Self {
            arena: Bump::with_capacity(settings.frame_arena_capacity),
            weight_tolerance: settings.weight_tolerance,
            root_motion: settings.root_motion,
        }
    }

    /// Releases every scratch pose of the previous frame.
    pub fn begin_frame(&mut self) {
        self.arena.reset();
    }

    /// Bytes currently held by the frame arena.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.arena.allocated_bytes()
    }

    /// Blends every weighted leaf of `graph` into `pose`.
    pub fn compose(
        &self,
        graph: &AnimationGraph,
        pose: &mut SkeletonPose,
        root: &RootTransform,
    ) -> Result<CompositionReport> {
        let leaves = graph.collect_leaves();
        self.compose_leaves(&leaves, pose, root)
    }

    /// Blends an explicit leaf list into `pose`.
    pub fn compose_leaves(
        &self,
        leaves: &[Leaf<'_>],
        pose: &mut SkeletonPose,
        root: &RootTransform,
    ) -> Result<CompositionReport> {
        pose.validate()?;
        let skeleton = pose.skeleton().clone();
        let weight_sum: f32 = leaves.iter().map(|l| l.weight).sum();

        if leaves.is_empty() {
            log::warn!("Skeleton '{}': no weighted animation leaves", skeleton.name);
        } else if (weight_sum - 1.0).abs() > self.weight_tolerance {
            log::error!(
                "Skeleton '{}': leaf weights sum to {weight_sum} across {} leaves, expected 1.0",
                skeleton.name,
                leaves.len()
            );
        }

        let hip = if self.root_motion {
            skeleton.root_motion_joint()
        } else {
            None
        };

        let mut root_motion = Vec3::ZERO;
        let mut result: Option<&mut [JointPose]> = None;
        let mut accumulated = 0.0_f32;

        for leaf in leaves {
            let scratch = self.arena.alloc_slice_copy(&pose.local);
            leaf.state.clip().sample_pose(&skeleton, leaf.state.time, scratch);

            if let Some(hip) = hip
                && weight_sum > 0.0
            {
                root_motion += leaf.state.root_motion_delta(hip) * (leaf.weight / weight_sum);
            }

            if result.is_none() {
                result = Some(scratch);
                accumulated = leaf.weight;
                continue;
            }
            if let Some(blended) = result.as_deref_mut() {
                let t = leaf.weight / (accumulated + leaf.weight);
                for (acc, next) in blended.iter_mut().zip(scratch.iter()) {
                    *acc = acc.lerp(next, t);
                }
                accumulated += leaf.weight;
            }
        }

        if let Some(blended) = result {
            pose.local.copy_from_slice(blended);
        }

        if let Some(slot) = hip.and_then(|hip| pose.local.get_mut(hip)) {
            let translation = &mut slot.translation;
            root_motion += Vec3::new(translation.x, 0.0, translation.z);
            translation.x = 0.0;
            translation.z = 0.0;
        }

        pose.write_root(root);
        pose.compute_global_matrices();

        Ok(CompositionReport {
            leaf_count: leaves.len(),
            weight_sum,
            root_motion,
        })
    }
}
