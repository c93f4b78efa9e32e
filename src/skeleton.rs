use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::errors::{AnimationError, Result};
use crate::pose::JointPose;

/// One joint of the rigid hierarchy.
#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    /// `None` for a root joint. Always smaller than the joint's own index.
    pub parent: Option<usize>,
    /// Transforms mesh-space vertices into this joint's bind space.
    pub inverse_bind: Mat4,
    /// Local transform in the bind pose; seeds fresh skeleton poses.
    pub rest: JointPose,
}

impl Joint {
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            parent,
            inverse_bind: Mat4::IDENTITY,
            rest: JointPose::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_rest(mut self, rest: JointPose) -> Self {
        self.rest = rest;
        self
    }

    #[must_use]
    pub fn with_inverse_bind(mut self, inverse_bind: Mat4) -> Self {
        self.inverse_bind = inverse_bind;
        self
    }
}

/// Immutable joint hierarchy shared by every entity using a model.
///
/// Joints are stored in topological order: a parent always precedes its
/// children, so global transforms resolve in a single forward pass.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub name: String,
    joints: Vec<Joint>,
    name_to_index: FxHashMap<String, usize>,
    // Hip joint whose horizontal translation is treated as root motion
    root_motion_joint: Option<usize>,
}

impl Skeleton {
    /// Builds a skeleton, rejecting joints whose parent does not precede them.
    pub fn new(name: impl Into<String>, joints: Vec<Joint>) -> Result<Self> {
        let mut name_to_index = FxHashMap::default();

        for (index, joint) in joints.iter().enumerate() {
            if let Some(parent) = joint.parent
                && parent >= index
            {
                return Err(AnimationError::InvalidJointOrder {
                    joint: joint.name.clone(),
                    index,
                    parent,
                });
            }
            name_to_index.entry(joint.name.clone()).or_insert(index);
        }

        Ok(Self {
            name: name.into(),
            joints,
            name_to_index,
            root_motion_joint: None,
        })
    }

    /// Designates the joint whose X/Z translation is extracted as root motion.
    pub fn with_root_motion_joint(mut self, index: usize) -> Result<Self> {
        if index >= self.joints.len() {
            return Err(AnimationError::JointOutOfRange {
                index,
                count: self.joints.len(),
            });
        }
        self.root_motion_joint = Some(index);
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    #[must_use]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.joints.get(index).and_then(|j| j.parent)
    }

    #[inline]
    #[must_use]
    pub fn root_motion_joint(&self) -> Option<usize> {
        self.root_motion_joint
    }

    #[must_use]
    pub fn find_joint(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Local bind-pose transforms, indexed by joint.
    #[must_use]
    pub fn rest_pose(&self) -> Vec<JointPose> {
        self.joints.iter().map(|j| j.rest).collect()
    }
}
