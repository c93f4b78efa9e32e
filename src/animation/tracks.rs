use crate::animation::values::Interpolatable;
use crate::pose::JointPose;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Step,
}

/// Time-ordered keyframes of one animated value.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Self {
        debug_assert_eq!(times.len(), values.len(), "one value per keyframe time");
        debug_assert!(
            times.windows(2).all(|w| w[0] <= w[1]),
            "keyframe times must be sorted"
        );
        Self {
            times,
            values,
            interpolation,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[must_use]
    pub fn last_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Samples the track, or `None` when it has fewer than two keyframes.
    ///
    /// The bracketing pair satisfies `times[k] <= time < times[k + 1]`. A time
    /// outside every bracket pairs the last keyframe with the first, so the
    /// track behaves cyclically at both ends.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<T> {
        let len = self.times.len();
        if len < 2 {
            return None;
        }

        // partition_point finds the first index where t > time, i.e. next_index
        let next_idx = self.times.partition_point(|&t| t <= time);
        let (index, next) = if next_idx == 0 || next_idx >= len {
            (len - 1, 0)
        } else {
            (next_idx - 1, next_idx)
        };

        Some(self.sample_between(index, next, time))
    }

    fn sample_between(&self, index: usize, next: usize, time: f32) -> T {
        let t0 = self.times[index];
        let span = (self.times[next] - t0).abs();

        // Prevent division by zero
        let t = if span > 1e-6 { (time - t0) / span } else { 0.0 };
        let t = t.clamp(0.0, 1.0);

        match self.interpolation {
            InterpolationMode::Step => self.values[index],
            InterpolationMode::Linear => {
                T::interpolate_linear(self.values[index], self.values[next], t)
            }
        }
    }
}

/// Keyframes driving the local pose of a single joint.
#[derive(Debug, Clone)]
pub struct JointTrack {
    pub joint: usize,
    pub keys: KeyframeTrack<JointPose>,
}

impl JointTrack {
    #[must_use]
    pub fn new(joint: usize, keys: KeyframeTrack<JointPose>) -> Self {
        Self { joint, keys }
    }

    /// Convenience constructor for linear `(time, pose)` pairs.
    #[must_use]
    pub fn linear(joint: usize, keys: impl IntoIterator<Item = (f32, JointPose)>) -> Self {
        let (times, values) = keys.into_iter().unzip();
        Self::new(
            joint,
            KeyframeTrack::new(times, values, InterpolationMode::Linear),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_past_last_keyframe() {
        let track = KeyframeTrack::new(vec![0.0, 1.0], vec![0.0_f32, 10.0], InterpolationMode::Linear);
        // Past the end, the pair is (last, first) spanning |0 - 1| = 1
        assert!((track.sample(1.5).unwrap() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn single_keyframe_is_left_unsampled() {
        let track = KeyframeTrack::new(vec![0.0], vec![3.0_f32], InterpolationMode::Linear);
        assert!(track.sample(0.0).is_none());
    }
}
