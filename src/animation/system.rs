use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use slotmap::{SlotMap, new_key_type};

use crate::animation::compositor::{CompositionReport, PoseCompositor};
use crate::animation::controller::{AnimatorController, ControllerParams};
use crate::animation::graph::AnimationGraph;
use crate::errors::Result;
use crate::pose::{RootTransform, SkeletonPose};
use crate::settings::AnimationSettings;
use crate::skeleton::Skeleton;

new_key_type! {
    pub struct AnimatorHandle;
}

/// Everything one animated entity owns: its graph instance, its pose buffer
/// and the controller that drives the graph.
pub struct Animator {
    pub graph: AnimationGraph,
    pub pose: SkeletonPose,
    pub root: RootTransform,
    pub params: ControllerParams,
    controller: Option<Box<dyn AnimatorController>>,
    last_report: CompositionReport,
}

impl Animator {
    /// Validates `graph` against `skeleton` and applies the settings'
    /// cursor policy to every leaf.
    pub fn new(
        mut graph: AnimationGraph,
        skeleton: Arc<Skeleton>,
        settings: &AnimationSettings,
    ) -> Result<Self> {
        graph.validate_for(&skeleton)?;
        graph.set_non_looping_policy(settings.non_looping);

        Ok(Self {
            graph,
            pose: SkeletonPose::new(skeleton),
            root: RootTransform::default(),
            params: ControllerParams::default(),
            controller: None,
            last_report: CompositionReport::default(),
        })
    }

    #[must_use]
    pub fn with_controller(mut self, controller: impl AnimatorController + 'static) -> Self {
        self.controller = Some(Box::new(controller));
        self
    }

    #[must_use]
    pub fn last_report(&self) -> &CompositionReport {
        &self.last_report
    }

    /// Controller, then graph update, then composition. Weight mutation
    /// always precedes leaf collection.
    ///
    /// A rejected controller request does not stall the frame: the graph
    /// still advances and the pose is composed before the controller's
    /// error is returned.
    pub fn update<R: RngExt>(
        &mut self,
        dt: f32,
        compositor: &PoseCompositor,
        rng: &mut R,
    ) -> Result<CompositionReport> {
        let driven = match self.controller.as_mut() {
            Some(controller) => controller.drive(&mut self.graph, &self.params),
            None => Ok(()),
        };

        self.graph.update(dt, rng)?;

        let report = compositor.compose(&self.graph, &mut self.pose, &self.root)?;
        self.pose.accumulate_root_motion(report.root_motion);
        self.last_report = report;
        driven.map(|()| report)
    }
}

/// Animation system.
///
/// Owns every [`Animator`] together with the frame-scoped compositor and
/// the random source handed to node trigger policies.
pub struct AnimationSystem {
    animators: SlotMap<AnimatorHandle, Animator>,
    compositor: PoseCompositor,
    rng: StdRng,
}

impl AnimationSystem {
    #[must_use]
    pub fn new(settings: &AnimationSettings, seed: u64) -> Self {
        Self {
            animators: SlotMap::with_key(),
            compositor: PoseCompositor::new(settings),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn add(&mut self, animator: Animator) -> AnimatorHandle {
        self.animators.insert(animator)
    }

    pub fn remove(&mut self, handle: AnimatorHandle) -> Option<Animator> {
        self.animators.remove(handle)
    }

    #[must_use]
    pub fn get(&self, handle: AnimatorHandle) -> Option<&Animator> {
        self.animators.get(handle)
    }

    pub fn get_mut(&mut self, handle: AnimatorHandle) -> Option<&mut Animator> {
        self.animators.get_mut(handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.animators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.animators.is_empty()
    }

    /// Stores the controller input for the next update.
    pub fn set_params(&mut self, handle: AnimatorHandle, params: ControllerParams) {
        match self.animators.get_mut(handle) {
            Some(animator) => animator.params = params,
            None => log::warn!("set_params on a removed animator {handle:?}"),
        }
    }

    /// Drains the root motion accumulated since the last physics step.
    pub fn take_root_motion(&mut self, handle: AnimatorHandle) -> Option<glam::Vec3> {
        self.animators
            .get_mut(handle)
            .map(|a| a.pose.take_root_motion())
    }

    /// Advances every animator by `dt` seconds.
    ///
    /// A failing animator is logged and counted; the others still update.
    /// Returns the number of animators that failed.
    pub fn update(&mut self, dt: f32) -> usize {
        self.compositor.begin_frame();

        let mut failures = 0;
        for (handle, animator) in &mut self.animators {
            if let Err(err) = animator.update(dt, &self.compositor, &mut self.rng) {
                log::error!("Animator {handle:?} update failed: {err}");
                failures += 1;
            }
        }
        failures
    }
}
