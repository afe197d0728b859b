//! Orbit camera controller.
//!
//! Input handlers only accumulate deltas on the [`CameraRig`]; the camera is
//! moved exclusively by [`OrbitControls::update`], which the render loop calls
//! once per frame.

use crate::camera::Camera;
use crate::config::CameraSettings;
use crate::constants::{MIN_RADIUS, POLAR_EPSILON, ZOOM_STEP};
use glam::{Vec2, Vec3};
use std::f32::consts::PI;

/// Spherical coordinates around the rig target, y-up.
///
/// `theta` is the azimuth measured from +z towards +x, `phi` the polar angle
/// measured from +y.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Spherical {
    pub fn from_offset(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(self) -> Vec3 {
        let sin_phi_r = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_r * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_r * self.theta.cos(),
        )
    }
}

/// All mutable orbit state. Owned by [`OrbitControls`] and nothing else.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraRig {
    pub target: Vec3,
    pub spherical: Spherical,
    pub spherical_delta: Spherical,
    /// Per-frame multiplicative zoom impulse, reset to 1 after each update.
    pub scale: f32,
    pub pan_offset: Vec3,
    /// Screen-space pan not yet converted to a world offset.
    pub pending_pan_px: Vec2,
    pub damping_enabled: bool,
    pub damping_factor: f32,
    pub min_radius: f32,
}

impl CameraRig {
    pub fn new(damping_enabled: bool, damping_factor: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            spherical: Spherical::default(),
            spherical_delta: Spherical::default(),
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            pending_pan_px: Vec2::ZERO,
            damping_enabled,
            damping_factor,
            min_radius: MIN_RADIUS,
        }
    }

    fn clear_motion(&mut self) {
        self.spherical_delta = Spherical::default();
        self.scale = 1.0;
        self.pan_offset = Vec3::ZERO;
        self.pending_pan_px = Vec2::ZERO;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct DragSession {
    mode: DragMode,
    last: Vec2,
}

#[derive(Clone, Debug)]
pub struct OrbitControls {
    rig: CameraRig,
    pub enabled: bool,
    pub enable_zoom: bool,
    pub enable_rotate: bool,
    pub enable_pan: bool,
    viewport: Vec2,
    drag: Option<DragSession>,
}

impl OrbitControls {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            rig: CameraRig::new(settings.damping_enabled, settings.damping_factor),
            enabled: true,
            enable_zoom: settings.enable_zoom,
            enable_rotate: settings.enable_rotate,
            enable_pan: settings.enable_pan,
            viewport: Vec2::new(1.0, 1.0),
            drag: None,
        }
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn target(&self) -> Vec3 {
        self.rig.target
    }

    pub fn set_damping(&mut self, enabled: bool, factor: f32) {
        self.rig.damping_enabled = enabled;
        self.rig.damping_factor = factor;
    }

    /// Size of the element receiving input, in CSS pixels.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.viewport = Vec2::new(width, height);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Begin a drag session. Returns false when the gesture is ignored.
    pub fn pointer_down(&mut self, mode: DragMode, position: Vec2) -> bool {
        if !self.enabled {
            return false;
        }
        let allowed = match mode {
            DragMode::Rotate => self.enable_rotate,
            DragMode::Pan => self.enable_pan,
        };
        if !allowed {
            return false;
        }
        self.drag = Some(DragSession {
            mode,
            last: position,
        });
        true
    }

    pub fn pointer_move(&mut self, position: Vec2) {
        if !self.enabled {
            return;
        }
        let Some(session) = self.drag.as_mut() else {
            return;
        };
        let delta = position - session.last;
        session.last = position;
        match session.mode {
            DragMode::Rotate => {
                let rotate_speed = 2.0 * PI / self.viewport.y;
                self.rig.spherical_delta.theta -= rotate_speed * delta.x;
                self.rig.spherical_delta.phi -= rotate_speed * delta.y;
            }
            DragMode::Pan => {
                self.rig.pending_pan_px += delta;
            }
        }
    }

    /// End the drag session. Returns whether one was active.
    pub fn pointer_up(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        self.drag.take().is_some()
    }

    /// Wheel input; `delta_y < 0` zooms out by one step, anything else zooms in.
    pub fn wheel(&mut self, delta_y: f32) {
        if !self.enabled || !self.enable_zoom {
            return;
        }
        if delta_y < 0.0 {
            self.rig.scale /= ZOOM_STEP;
        } else {
            self.rig.scale *= ZOOM_STEP;
        }
    }

    /// Recompute the camera position from the rig. Always reports a change.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let rig = &mut self.rig;
        let offset = camera.eye - rig.target;
        rig.spherical = Spherical::from_offset(offset);

        if rig.pending_pan_px != Vec2::ZERO {
            let pan = pan_offset_for(camera, offset, rig.pending_pan_px, self.viewport.y);
            rig.pan_offset += pan;
            rig.pending_pan_px = Vec2::ZERO;
        }

        let step = if rig.damping_enabled {
            rig.damping_factor
        } else {
            1.0
        };
        rig.spherical.theta += rig.spherical_delta.theta * step;
        rig.spherical.phi += rig.spherical_delta.phi * step;
        rig.spherical.phi = rig.spherical.phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        rig.spherical.radius = (rig.spherical.radius * rig.scale).max(rig.min_radius);
        rig.target += rig.pan_offset * step;

        camera.target = rig.target;
        camera.eye = rig.target + rig.spherical.to_offset();

        if rig.damping_enabled {
            let keep = 1.0 - rig.damping_factor;
            rig.spherical_delta.theta *= keep;
            rig.spherical_delta.phi *= keep;
            rig.pan_offset *= keep;
        } else {
            rig.spherical_delta = Spherical::default();
            rig.pan_offset = Vec3::ZERO;
        }
        rig.scale = 1.0;
        true
    }

    /// Drop accumulated motion and aim the camera at `target` from `eye`.
    pub fn reset_to(&mut self, camera: &mut Camera, eye: Vec3, target: Vec3) {
        self.rig.clear_motion();
        self.rig.target = target;
        self.drag = None;
        camera.eye = eye;
        camera.target = target;
        self.rig.spherical = Spherical::from_offset(eye - target);
    }

    /// Stop reacting to input; any drag in progress is abandoned.
    pub fn dispose(&mut self) {
        self.drag = None;
        self.rig.clear_motion();
        self.enabled = false;
    }
}

// Screen-space pan scaled so the point under the cursor tracks it at the target distance.
fn pan_offset_for(camera: &Camera, offset: Vec3, pixels: Vec2, viewport_height: f32) -> Vec3 {
    let target_distance = offset.length() * (camera.fovy_radians * 0.5).tan();
    let forward = (-offset).normalize_or_zero();
    let right = forward.cross(camera.up).normalize_or_zero();
    let up = right.cross(forward);
    let scale = 2.0 * target_distance / viewport_height;
    -right * (pixels.x * scale) + up * (pixels.y * scale)
}
