use glam::{Quat, Vec3};

use crate::pose::JointPose;

/// A keyframe value that can be blended between two samples.
pub trait Interpolatable: Copy + Sized {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;
}

impl Interpolatable for f32 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start + (end - start) * t
    }
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.slerp(end, t)
    }
}

impl Interpolatable for JointPose {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(&end, t)
    }
}
