//! Pose Buffers
//!
//! [`JointPose`] is a single local TRS transform; [`SkeletonPose`] is the
//! per-entity buffer the compositor writes into every frame. Local poses are
//! authored by blending, global matrices are always derived from them.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::errors::{AnimationError, Result};
use crate::skeleton::Skeleton;

// ============================================================================
// JointPose
// ============================================================================

/// Local rigid + scale transform of a joint relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for JointPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl JointPose {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Linear translation/scale, spherical rotation.
    ///
    /// The endpoints are returned bit-exact so that sampling on a keyframe
    /// reproduces the authored pose.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return *other;
        }
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

// ============================================================================
// RootTransform
// ============================================================================

/// World transform of the entity that owns a skeleton pose.
///
/// It is written into joint 0 before global matrices are rebuilt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for RootTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl RootTransform {
    #[must_use]
    pub fn as_joint_pose(&self) -> JointPose {
        JointPose::new(self.translation, self.rotation, self.scale)
    }

    /// Converts a drained root-motion displacement (skeleton space) into a
    /// world-space displacement and applies it to the entity.
    pub fn apply_root_motion(&mut self, delta: Vec3) -> Vec3 {
        let world = self.rotation * (delta * self.scale);
        self.translation += world;
        world
    }
}

// ============================================================================
// SkeletonPose
// ============================================================================

/// Mutable per-entity pose: local joint transforms, derived global matrices
/// and the root-motion accumulator.
#[derive(Debug, Clone)]
pub struct SkeletonPose {
    skeleton: Arc<Skeleton>,
    pub local: Vec<JointPose>,
    pub global: Vec<Mat4>,
    root_motion: Vec3,
}

impl SkeletonPose {
    /// Creates a pose seeded with the skeleton's bind pose.
    #[must_use]
    pub fn new(skeleton: Arc<Skeleton>) -> Self {
        let count = skeleton.joint_count();
        Self {
            local: skeleton.rest_pose(),
            global: vec![Mat4::IDENTITY; count],
            root_motion: Vec3::ZERO,
            skeleton,
        }
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    #[inline]
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.local.len()
    }

    /// Fails when a pose buffer no longer matches the skeleton's joint count.
    pub fn validate(&self) -> Result<()> {
        let expected = self.skeleton.joint_count();
        for found in [self.local.len(), self.global.len()] {
            if found != expected {
                return Err(AnimationError::PoseMismatch { expected, found });
            }
        }
        Ok(())
    }

    /// Writes the owning entity's transform into the root joint.
    pub fn write_root(&mut self, root: &RootTransform) {
        if let Some(joint) = self.local.first_mut() {
            *joint = root.as_joint_pose();
        }
    }

    /// Rebuilds every global matrix from the local poses.
    ///
    /// Parents precede children, so one forward pass resolves the hierarchy.
    pub fn compute_global_matrices(&mut self) {
        for index in 0..self.local.len() {
            let local = self.local[index].to_matrix();
            self.global[index] = match self.skeleton.parent(index) {
                Some(parent) => self.global[parent] * local,
                None => local,
            };
        }
    }

    /// Writes `global * inverse_bind` for every joint into `out`.
    pub fn skinning_matrices(&self, out: &mut Vec<Mat4>) {
        out.clear();
        out.extend(
            self.global
                .iter()
                .zip(self.skeleton.joints())
                .map(|(global, joint)| *global * joint.inverse_bind),
        );
    }

    // === Root motion ===

    pub fn accumulate_root_motion(&mut self, delta: Vec3) {
        self.root_motion += delta;
    }

    /// Pending root motion without draining it.
    #[inline]
    #[must_use]
    pub fn root_motion(&self) -> Vec3 {
        self.root_motion
    }

    /// Drains the accumulator; called once per simulation step.
    pub fn take_root_motion(&mut self) -> Vec3 {
        std::mem::take(&mut self.root_motion)
    }
}
