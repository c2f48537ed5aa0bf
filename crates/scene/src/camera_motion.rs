//! Camera rig and time-boxed camera motions.
//!
//! [`CameraRig`] is the one camera model of the scene: the eye position, the
//! orbit target user controls pivot around, and the point the eye currently
//! looks at. The rendering crate copies it onto the `Camera3d` transform.
//!
//! [`CameraMotions`] drives at most one position motion and one target motion
//! at a time. Issuing a motion on a busy channel supersedes the running one:
//! its completion is resolved right away (its `on_complete` hook fires and
//! its ticket is reported completed on the next advance) instead of being
//! dropped.

use std::f32::consts::TAU;
use std::time::Duration;

use bevy::prelude::*;

use crate::config::{
    CAMERA_SPHERE_RADIUS, CAMERA_TOLERANCE, MAX_POLAR_ANGLE, RESET_DEPTH_FACTOR,
    RESET_HEIGHT_FACTOR,
};
use crate::model::Bounds;

const ORBIT_SENSITIVITY: f32 = 0.005;
const MIN_DISTANCE: f32 = 5.0;

// =============================================================================
// Rig
// =============================================================================

/// Limits applied to user-driven camera movement while the scene is entered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConstraints {
    pub sphere_radius: f32,
    pub altitude: f32,
    pub max_polar_angle: f32,
}

impl CameraConstraints {
    pub fn with_altitude(altitude: f32) -> Self {
        Self {
            sphere_radius: CAMERA_SPHERE_RADIUS,
            altitude,
            max_polar_angle: MAX_POLAR_ANGLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraRig {
    pub position: Vec3,
    /// Orbit pivot for user controls.
    pub target: Vec3,
    /// Point the eye faces.
    pub look_at: Vec3,
    pub controls_enabled: bool,
    pub constraints: Option<CameraConstraints>,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 400.0, 1200.0),
            target: Vec3::ZERO,
            look_at: Vec3::ZERO,
            controls_enabled: true,
            constraints: None,
        }
    }
}

impl CameraRig {
    /// Normalised viewing direction, `-Z` when degenerate.
    pub fn view_direction(&self) -> Vec3 {
        (self.look_at - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z)
    }

    pub fn transform(&self) -> Transform {
        let up = if self.view_direction().cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Transform::from_translation(self.position).looking_at(self.look_at, up)
    }

    /// Clamp position and target into the active constraints, if any.
    pub fn constrain(&mut self) {
        let Some(c) = self.constraints else {
            return;
        };
        for point in [&mut self.position, &mut self.target] {
            if point.length() > c.sphere_radius {
                *point = point.normalize() * c.sphere_radius;
            }
            point.y = point.y.max(c.altitude);
        }

        let offset = self.position - self.target;
        let radius = offset.length();
        if radius > f32::EPSILON && offset.angle_between(Vec3::Y) > c.max_polar_angle {
            let horizontal = Vec3::new(offset.x, 0.0, offset.z)
                .try_normalize()
                .unwrap_or(Vec3::Z);
            self.position = self.target
                + horizontal * radius * c.max_polar_angle.sin()
                + Vec3::Y * radius * c.max_polar_angle.cos();
        }
    }

    /// Rotate the eye around the target (mouse drag, in pixels).
    pub fn orbit_by(&mut self, delta: Vec2) {
        if !self.controls_enabled {
            return;
        }
        let offset = self.position - self.target;
        let yaw = Quat::from_rotation_y(-delta.x * ORBIT_SENSITIVITY);
        let right = offset.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let pitch = Quat::from_axis_angle(right, delta.y * ORBIT_SENSITIVITY);
        self.position = self.target + pitch * (yaw * offset);
        self.settle_user_move();
    }

    /// Slide eye and target together along the ground plane.
    pub fn pan_by(&mut self, delta: Vec2) {
        if !self.controls_enabled {
            return;
        }
        let forward = Vec3::new(self.view_direction().x, 0.0, self.view_direction().z)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y);
        let shift = right * delta.x + forward * delta.y;
        self.position += shift;
        self.target += shift;
        self.settle_user_move();
    }

    /// Move toward (`factor < 1`) or away from (`factor > 1`) the target.
    pub fn zoom_by(&mut self, factor: f32) {
        if !self.controls_enabled {
            return;
        }
        let offset = self.position - self.target;
        let distance = (offset.length() * factor).max(MIN_DISTANCE);
        self.position = self.target + offset.normalize_or_zero() * distance;
        self.settle_user_move();
    }

    fn settle_user_move(&mut self) {
        self.constrain();
        self.look_at = self.target;
    }
}

// =============================================================================
// Framing
// =============================================================================

/// Default overview of the campus: `(position, target)` for the ground bounds.
pub fn reset_framing(ground: &Bounds) -> (Vec3, Vec3) {
    let r = ground.radius();
    let center = Vec3::ZERO;
    let position = center + Vec3::new(0.0, r * RESET_HEIGHT_FACTOR, r * RESET_DEPTH_FACTOR);
    (position, center)
}

/// Close-up of `point`: the target moves to `point + offset`, the eye backs
/// off `distance` along the current viewing direction.
pub fn focus_framing(rig: &CameraRig, point: Vec3, distance: f32, offset: Vec3) -> (Vec3, Vec3) {
    let target = point + offset;
    (target - rig.view_direction() * distance, target)
}

// =============================================================================
// Motions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionChannel {
    Position,
    Target,
}

/// Side effect a motion applies to the rig at one of its lifecycle points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionHook {
    DisableControls,
    EnableControls,
    LookAtTarget,
}

impl MotionHook {
    fn apply(self, rig: &mut CameraRig) {
        match self {
            MotionHook::DisableControls => rig.controls_enabled = false,
            MotionHook::EnableControls => rig.controls_enabled = true,
            MotionHook::LookAtTarget => rig.look_at = rig.target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MotionTicket(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct CameraMotionRequest {
    pub channel: MotionChannel,
    pub start: Vec3,
    pub end: Vec3,
    pub duration: Duration,
    pub start_hook: Option<MotionHook>,
    pub update_hook: Option<MotionHook>,
    pub complete_hook: Option<MotionHook>,
}

impl CameraMotionRequest {
    pub fn new(channel: MotionChannel, start: Vec3, end: Vec3, duration: Duration) -> Self {
        Self {
            channel,
            start,
            end,
            duration,
            start_hook: None,
            update_hook: None,
            complete_hook: None,
        }
    }

    pub fn position(start: Vec3, end: Vec3, duration: Duration) -> Self {
        Self::new(MotionChannel::Position, start, end, duration)
    }

    pub fn target(start: Vec3, end: Vec3, duration: Duration) -> Self {
        Self::new(MotionChannel::Target, start, end, duration)
    }

    pub fn on_start(mut self, hook: MotionHook) -> Self {
        self.start_hook = Some(hook);
        self
    }

    pub fn on_update(mut self, hook: MotionHook) -> Self {
        self.update_hook = Some(hook);
        self
    }

    pub fn on_complete(mut self, hook: MotionHook) -> Self {
        self.complete_hook = Some(hook);
        self
    }

    pub fn within(&self, tolerance: f32) -> bool {
        self.start.distance(self.end) < tolerance
    }

    fn sample(&self, t: f32) -> Vec3 {
        if t >= 1.0 {
            return self.end;
        }
        self.start.lerp(self.end, ease_in_out_quad(t))
    }
}

/// The standard framing pair: the position motion owns control hand-off,
/// the target motion keeps the eye facing the moving target.
pub fn framing_requests(
    rig: &CameraRig,
    position: Vec3,
    target: Vec3,
    duration: Duration,
) -> (CameraMotionRequest, CameraMotionRequest) {
    (
        CameraMotionRequest::position(rig.position, position, duration)
            .on_start(MotionHook::DisableControls)
            .on_complete(MotionHook::EnableControls),
        CameraMotionRequest::target(rig.target, target, duration)
            .on_update(MotionHook::LookAtTarget),
    )
}

fn ease_in_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) * 0.5
    }
}

/// Completion signal of an issued camera move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Nothing to animate; already resolved.
    Resolved,
    /// Resolves when the motion with this ticket completes.
    Pending(MotionTicket),
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveMotion {
    ticket: MotionTicket,
    request: CameraMotionRequest,
    elapsed: Duration,
    started: bool,
}

/// What happened since the previous advance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionReport {
    pub completed: Vec<MotionTicket>,
    pub hooks: Vec<(MotionTicket, MotionHook)>,
}

#[derive(Debug, Default)]
pub struct CameraMotions {
    position: Option<ActiveMotion>,
    target: Option<ActiveMotion>,
    next_ticket: u64,
    settled: MotionReport,
}

impl CameraMotions {
    /// Schedule `request`, superseding whatever drives its channel.
    pub fn animate(&mut self, request: CameraMotionRequest, rig: &mut CameraRig) -> MotionTicket {
        self.next_ticket += 1;
        let ticket = MotionTicket(self.next_ticket);
        let slot = match request.channel {
            MotionChannel::Position => &mut self.position,
            MotionChannel::Target => &mut self.target,
        };
        if let Some(old) = slot.take() {
            debug!("CameraMotions: {:?} superseded by {:?}", old.ticket, ticket);
            if let Some(hook) = old.request.complete_hook {
                hook.apply(rig);
                self.settled.hooks.push((old.ticket, hook));
            }
            self.settled.completed.push(old.ticket);
        }
        *slot = Some(ActiveMotion {
            ticket,
            request,
            elapsed: Duration::ZERO,
            started: false,
        });
        ticket
    }

    /// Schedule a position/target pair, or resolve at once when both are
    /// already within `tolerance` of their destination. The returned signal
    /// follows the position motion.
    pub fn animate_pair(
        &mut self,
        position: CameraMotionRequest,
        target: CameraMotionRequest,
        tolerance: f32,
        rig: &mut CameraRig,
    ) -> Completion {
        if position.within(tolerance) && target.within(tolerance) {
            return Completion::Resolved;
        }
        let ticket = self.animate(position, rig);
        self.animate(target, rig);
        Completion::Pending(ticket)
    }

    /// [`CameraMotions::animate_pair`] with the scene's default tolerance.
    pub fn frame(
        &mut self,
        rig: &mut CameraRig,
        position: Vec3,
        target: Vec3,
        duration: Duration,
    ) -> Completion {
        let (pos_req, target_req) = framing_requests(rig, position, target, duration);
        self.animate_pair(pos_req, target_req, CAMERA_TOLERANCE, rig)
    }

    /// Step every running motion by `dt` and write the result into `rig`.
    pub fn advance(&mut self, dt: Duration, rig: &mut CameraRig) -> MotionReport {
        let mut report = std::mem::take(&mut self.settled);
        for slot in [&mut self.position, &mut self.target] {
            let Some(motion) = slot.as_mut() else {
                continue;
            };
            if !motion.started {
                motion.started = true;
                if let Some(hook) = motion.request.start_hook {
                    hook.apply(rig);
                    report.hooks.push((motion.ticket, hook));
                }
            }

            motion.elapsed += dt;
            let t = if motion.request.duration.is_zero() {
                1.0
            } else {
                (motion.elapsed.as_secs_f32() / motion.request.duration.as_secs_f32()).min(1.0)
            };
            let value = motion.request.sample(t);
            match motion.request.channel {
                MotionChannel::Position => rig.position = value,
                MotionChannel::Target => rig.target = value,
            }
            if let Some(hook) = motion.request.update_hook {
                hook.apply(rig);
                report.hooks.push((motion.ticket, hook));
            }

            if t >= 1.0 {
                if let Some(hook) = motion.request.complete_hook {
                    hook.apply(rig);
                    report.hooks.push((motion.ticket, hook));
                }
                report.completed.push(motion.ticket);
                *slot = None;
            }
        }
        report
    }

    pub fn is_idle(&self) -> bool {
        self.position.is_none() && self.target.is_none()
    }

    pub fn is_driving(&self, channel: MotionChannel) -> bool {
        match channel {
            MotionChannel::Position => self.position.is_some(),
            MotionChannel::Target => self.target.is_some(),
        }
    }
}

// =============================================================================
// Roam
// =============================================================================

/// Slow unattended orbit of the eye around the target.
#[derive(Debug, Clone, Default)]
pub struct CameraRoam {
    active: bool,
    period_secs: f32,
}

impl CameraRoam {
    pub fn start(&mut self, period_secs: f32) {
        self.active = period_secs > 0.0;
        self.period_secs = period_secs;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn advance(&self, dt: Duration, rig: &mut CameraRig) {
        if !self.active {
            return;
        }
        let angle = TAU * dt.as_secs_f32() / self.period_secs;
        let offset = rig.position - rig.target;
        rig.position = rig.target + Quat::from_rotation_y(angle) * offset;
        rig.look_at = rig.target;
    }
}
