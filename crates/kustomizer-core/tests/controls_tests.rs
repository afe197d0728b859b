mod common;

use common::assert_close;
use glam::{Vec2, Vec3};
use kustomizer_core::config::CameraSettings;
use kustomizer_core::constants::{MIN_RADIUS, POLAR_EPSILON};
use kustomizer_core::controls::Spherical;
use kustomizer_core::{Camera, DragMode, OrbitControls};
use std::f32::consts::PI;

fn undamped() -> CameraSettings {
    CameraSettings {
        damping_enabled: false,
        ..CameraSettings::default()
    }
}

fn rig(settings: &CameraSettings) -> (OrbitControls, Camera) {
    let mut controls = OrbitControls::new(settings);
    controls.set_viewport(800.0, 500.0);
    let mut camera = Camera::default();
    controls.reset_to(&mut camera, Vec3::new(0.0, 0.0, 60.0), Vec3::ZERO);
    (controls, camera)
}

fn phi_of(camera: &Camera) -> f32 {
    Spherical::from_offset(camera.eye - camera.target).phi
}

#[test]
fn vertical_drag_changes_polar_angle_immediately_without_damping() {
    let (mut controls, mut camera) = rig(&undamped());
    let before = phi_of(&camera);

    assert!(controls.pointer_down(DragMode::Rotate, Vec2::new(100.0, 100.0)));
    controls.pointer_move(Vec2::new(100.0, 50.0));
    assert!(controls.update(&mut camera));

    let expected = (2.0 * PI / 500.0) * 50.0;
    assert_close(phi_of(&camera) - before, expected, 1e-4);

    // No inertia: the next update leaves the camera where it is.
    let eye = camera.eye;
    controls.update(&mut camera);
    assert!(camera.eye.distance(eye) < 1e-4);
}

#[test]
fn horizontal_drag_rotates_azimuth_with_the_same_speed() {
    let (mut controls, mut camera) = rig(&undamped());
    controls.pointer_down(DragMode::Rotate, Vec2::new(100.0, 100.0));
    controls.pointer_move(Vec2::new(150.0, 100.0));
    controls.update(&mut camera);

    let theta = Spherical::from_offset(camera.eye).theta;
    assert_close(theta, -(2.0 * PI / 500.0) * 50.0, 1e-4);
    assert_close(camera.eye.length(), 60.0, 1e-3);
}

#[test]
fn two_wheel_up_events_zoom_out_by_inverse_step_squared() {
    let (mut controls, mut camera) = rig(&undamped());
    controls.wheel(-120.0);
    controls.wheel(-120.0);
    controls.update(&mut camera);
    assert_close(camera.eye.length(), 60.0 / (0.95 * 0.95), 1e-3);

    // Accumulator resets after each update.
    controls.update(&mut camera);
    assert_close(camera.eye.length(), 60.0 / (0.95 * 0.95), 1e-3);
}

#[test]
fn wheel_down_zooms_in() {
    let (mut controls, mut camera) = rig(&undamped());
    controls.wheel(120.0);
    controls.update(&mut camera);
    assert_close(camera.eye.length(), 60.0 * 0.95, 1e-3);
}

#[test]
fn damping_eases_rotation_over_several_frames() {
    let settings = CameraSettings {
        damping_enabled: true,
        damping_factor: 0.1,
        ..CameraSettings::default()
    };
    let (mut controls, mut camera) = rig(&settings);
    let start = phi_of(&camera);
    controls.pointer_down(DragMode::Rotate, Vec2::new(0.0, 100.0));
    controls.pointer_move(Vec2::new(0.0, 90.0));
    controls.pointer_up();
    let total = (2.0 * PI / 500.0) * 10.0;

    controls.update(&mut camera);
    let first = phi_of(&camera) - start;
    assert_close(first, total * 0.1, 1e-4);

    controls.update(&mut camera);
    let second = phi_of(&camera) - start - first;
    assert_close(second, total * 0.9 * 0.1, 1e-4);

    for _ in 0..400 {
        controls.update(&mut camera);
    }
    // Geometric series converges to the full drag.
    assert_close(phi_of(&camera) - start, total, 1e-3);
}

#[test]
fn polar_angle_is_clamped_away_from_the_poles() {
    let (mut controls, mut camera) = rig(&undamped());
    controls.pointer_down(DragMode::Rotate, Vec2::new(0.0, 0.0));
    controls.pointer_move(Vec2::new(0.0, 2000.0));
    controls.update(&mut camera);
    assert!(controls.rig().spherical.phi >= POLAR_EPSILON);
    assert!(camera.eye.y > 59.0);

    controls.pointer_move(Vec2::new(0.0, -4000.0));
    controls.update(&mut camera);
    assert!(controls.rig().spherical.phi <= PI - POLAR_EPSILON);
    assert!(camera.eye.y < -59.0);
}

#[test]
fn radius_never_drops_below_minimum() {
    let (mut controls, mut camera) = rig(&undamped());
    for _ in 0..500 {
        controls.wheel(1.0);
    }
    controls.update(&mut camera);
    assert!(camera.eye.distance(camera.target) >= MIN_RADIUS * 0.999);
}

#[test]
fn moves_outside_a_drag_session_are_ignored() {
    let (mut controls, mut camera) = rig(&undamped());
    let eye = camera.eye;
    controls.pointer_move(Vec2::new(300.0, 300.0));
    controls.update(&mut camera);
    assert!(camera.eye.distance(eye) < 1e-4);

    controls.pointer_down(DragMode::Rotate, Vec2::new(0.0, 0.0));
    assert!(controls.pointer_up());
    assert!(!controls.pointer_up());
    controls.pointer_move(Vec2::new(50.0, 50.0));
    controls.update(&mut camera);
    assert!(camera.eye.distance(eye) < 1e-4);
}

#[test]
fn disabled_controls_ignore_all_input() {
    let (mut controls, mut camera) = rig(&undamped());
    controls.enabled = false;
    let eye = camera.eye;
    assert!(!controls.pointer_down(DragMode::Rotate, Vec2::ZERO));
    controls.pointer_move(Vec2::new(40.0, 40.0));
    controls.wheel(-1.0);
    controls.update(&mut camera);
    assert!(camera.eye.distance(eye) < 1e-4);
}

#[test]
fn zoom_and_rotate_can_be_switched_off_separately() {
    let settings = CameraSettings {
        damping_enabled: false,
        enable_zoom: false,
        enable_rotate: false,
        ..CameraSettings::default()
    };
    let (mut controls, mut camera) = rig(&settings);
    controls.wheel(-1.0);
    assert!(!controls.pointer_down(DragMode::Rotate, Vec2::ZERO));
    assert!(controls.pointer_down(DragMode::Pan, Vec2::ZERO));
    controls.update(&mut camera);
    assert_close(camera.eye.length(), 60.0, 1e-3);
}

#[test]
fn pan_moves_target_and_eye_together() {
    let (mut controls, mut camera) = rig(&undamped());
    controls.pointer_down(DragMode::Pan, Vec2::new(200.0, 200.0));
    controls.pointer_move(Vec2::new(100.0, 200.0));
    controls.update(&mut camera);

    // Dragging left moves the view to the right.
    assert!(controls.target().x > 0.0);
    assert_close(controls.target().y, 0.0, 1e-4);
    assert_close((camera.eye - camera.target).length(), 60.0, 1e-3);
    assert_close(camera.eye.x, controls.target().x, 1e-3);
}

#[test]
fn dispose_abandons_the_drag() {
    let (mut controls, mut camera) = rig(&undamped());
    controls.pointer_down(DragMode::Rotate, Vec2::ZERO);
    controls.dispose();
    assert!(!controls.is_dragging());
    let eye = camera.eye;
    controls.pointer_move(Vec2::new(10.0, 10.0));
    controls.update(&mut camera);
    assert!(camera.eye.distance(eye) < 1e-4);
}
