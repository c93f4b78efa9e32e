use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::animation::tracks::JointTrack;
use crate::errors::{AnimationError, Result};
use crate::pose::JointPose;
use crate::skeleton::Skeleton;

/// Immutable keyframe data for one motion, shared by every entity of a model.
///
/// Tracks are sparse: a joint without a track keeps whatever value the
/// destination buffer was seeded with.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub is_looping: bool,
    /// Horizontal translation of the skeleton's root-motion joint is removed
    /// from the sampled pose and reported as root motion instead.
    pub in_place: bool,
    // Indexed by joint
    tracks: Vec<Option<JointTrack>>,
    // First joint that was given a second track
    duplicate_track: Option<usize>,
}

impl AnimationClip {
    /// Creates a looping clip whose duration is the latest keyframe time.
    ///
    /// A joint given two tracks keeps the last one, and the clip then fails
    /// [`validate_for`](Self::validate_for).
    #[must_use]
    pub fn new(name: impl Into<String>, tracks: Vec<JointTrack>) -> Self {
        let name = name.into();
        let duration = tracks
            .iter()
            .map(|t| t.keys.last_time())
            .fold(0.0_f32, f32::max);

        let slots = tracks.iter().map(|t| t.joint + 1).max().unwrap_or(0);
        let mut indexed: Vec<Option<JointTrack>> = vec![None; slots];
        let mut duplicate_track = None;
        for track in tracks {
            let joint = track.joint;
            if indexed[joint].replace(track).is_some() {
                log::warn!("Animation clip '{name}': joint {joint} has more than one track");
                duplicate_track.get_or_insert(joint);
            }
        }

        Self {
            name,
            duration,
            is_looping: true,
            in_place: false,
            tracks: indexed,
            duplicate_track,
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn looping(mut self, is_looping: bool) -> Self {
        self.is_looping = is_looping;
        self
    }

    #[must_use]
    pub fn in_place(mut self, in_place: bool) -> Self {
        self.in_place = in_place;
        self
    }

    #[must_use]
    pub fn track(&self, joint: usize) -> Option<&JointTrack> {
        self.tracks.get(joint).and_then(Option::as_ref)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &JointTrack> {
        self.tracks.iter().flatten()
    }

    /// Fails if a joint was given two tracks or any track addresses a joint
    /// the skeleton does not have.
    pub fn validate_for(&self, skeleton: &Skeleton) -> Result<()> {
        if let Some(joint) = self.duplicate_track {
            return Err(AnimationError::DuplicateTrack {
                clip: self.name.clone(),
                joint,
            });
        }
        match self.tracks().map(|t| t.joint).max() {
            Some(index) if index >= skeleton.joint_count() => Err(AnimationError::JointOutOfRange {
                index,
                count: skeleton.joint_count(),
            }),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Sampling
    // ========================================================================

    /// Raw sample of one joint; `None` when the joint has fewer than two keys.
    #[must_use]
    pub fn sample_joint(&self, joint: usize, time: f32) -> Option<JointPose> {
        self.track(joint)?.keys.sample(time)
    }

    /// Samples every animated joint into `out`, leaving the others untouched.
    ///
    /// For in-place clips the root-motion joint keeps only its vertical
    /// translation.
    pub fn sample_pose(&self, skeleton: &Skeleton, time: f32, out: &mut [JointPose]) {
        for (joint, slot) in out.iter_mut().enumerate() {
            if let Some(pose) = self.sample_joint(joint, time) {
                *slot = pose;
            }
        }

        if self.in_place
            && let Some(hip) = skeleton.root_motion_joint()
            && let Some(slot) = out.get_mut(hip)
        {
            slot.translation.x = 0.0;
            slot.translation.z = 0.0;
        }
    }

    /// Horizontal displacement of `joint` between two cursor times.
    ///
    /// `loops` counts the loop seams crossed on the way: the motion is
    /// `from -> end`, then `loops - 1` whole cycles, then `start -> to`.
    #[must_use]
    pub fn root_motion_delta(&self, joint: usize, from: f32, to: f32, loops: u32) -> Vec3 {
        let horizontal = |time: f32| {
            self.sample_joint(joint, time)
                .map_or(Vec3::ZERO, |p| Vec3::new(p.translation.x, 0.0, p.translation.z))
        };

        if loops == 0 {
            return horizontal(to) - horizontal(from);
        }

        let start = horizontal(0.0);
        let end = horizontal(self.duration);
        #[allow(clippy::cast_precision_loss)]
        let full_cycles = (loops - 1) as f32;
        (end - horizontal(from)) + (end - start) * full_cycles + (horizontal(to) - start)
    }
}

// ============================================================================
// ClipLibrary
// ============================================================================

/// Name-addressed clips of one model.
#[derive(Debug, Clone, Default)]
pub struct ClipLibrary {
    clips: FxHashMap<String, Arc<AnimationClip>>,
}

impl ClipLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a clip under its own name, replacing any previous one.
    pub fn insert(&mut self, clip: AnimationClip) -> Arc<AnimationClip> {
        let clip = Arc::new(clip);
        if self.clips.insert(clip.name.clone(), clip.clone()).is_some() {
            log::warn!("Animation clip '{}' registered twice, replacing", clip.name);
        }
        clip
    }

    pub fn get(&self, name: &str) -> Result<Arc<AnimationClip>> {
        self.clips
            .get(name)
            .cloned()
            .ok_or_else(|| AnimationError::ClipNotFound(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Checks every clip against the skeleton it will be played on.
    pub fn validate_for(&self, skeleton: &Skeleton) -> Result<()> {
        self.clips.values().try_for_each(|clip| clip.validate_for(skeleton))
    }
}

impl FromIterator<AnimationClip> for ClipLibrary {
    fn from_iter<I: IntoIterator<Item = AnimationClip>>(iter: I) -> Self {
        let mut library = Self::new();
        for clip in iter {
            library.insert(clip);
        }
        library
    }
}
