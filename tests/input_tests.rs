// Host-side tests for pure input functions.
// The main crate is wasm-only, so we include the pure-Rust modules directly.

#![allow(dead_code)]
mod constants {
    include!("../src/constants.rs");
}
mod input {
    include!("../src/input.rs");
}

use glam::Vec2;
use input::*;
use kustomizer_core::DragMode;

#[test]
fn primary_button_rotates_secondary_pans() {
    assert_eq!(drag_mode_for_button(0), Some(DragMode::Rotate));
    assert_eq!(drag_mode_for_button(2), Some(DragMode::Pan));
}

#[test]
fn middle_and_extra_buttons_are_ignored() {
    for button in [1, 3, 4, -1] {
        assert_eq!(drag_mode_for_button(button), None, "button {button}");
    }
}

#[test]
fn css_offset_is_relative_to_rect() {
    let p = css_offset(Vec2::new(150.0, 80.0), Vec2::new(100.0, 50.0));
    assert_eq!(p, Vec2::new(50.0, 30.0));
    // pointer captured outside the canvas gives negative offsets
    let outside = css_offset(Vec2::new(10.0, 10.0), Vec2::new(100.0, 50.0));
    assert!(outside.x < 0.0 && outside.y < 0.0);
}

#[test]
fn zoom_delta_passes_sign_through() {
    assert_eq!(zoom_delta(-120.0), Some(-120.0));
    assert_eq!(zoom_delta(3.0), Some(3.0));
}

#[test]
fn zero_or_non_finite_wheel_is_not_a_zoom() {
    assert_eq!(zoom_delta(0.0), None);
    assert_eq!(zoom_delta(f64::NAN), None);
    assert_eq!(zoom_delta(f64::INFINITY), None);
}

#[test]
fn backing_size_scales_by_device_pixel_ratio() {
    assert_eq!(backing_size(400.0, 300.0, 2.0, 1, 8192), (800, 600));
    assert_eq!(backing_size(333.3, 100.0, 1.5, 1, 8192), (500, 150));
}

#[test]
fn backing_size_clamps_to_limits() {
    // collapsed container still yields a valid surface
    assert_eq!(backing_size(0.0, 0.0, 2.0, 1, 8192), (1, 1));
    assert_eq!(backing_size(-5.0, 10.0, 1.0, 1, 8192), (1, 10));
    assert_eq!(backing_size(6000.0, 100.0, 2.0, 1, 8192), (8192, 200));
}

#[test]
fn invalid_pixel_ratio_falls_back_to_one() {
    assert_eq!(backing_size(640.0, 480.0, 0.0, 1, 8192), (640, 480));
    assert_eq!(backing_size(640.0, 480.0, f64::NAN, 1, 8192), (640, 480));
    assert_eq!(backing_size(640.0, 480.0, -2.0, 1, 8192), (640, 480));
}
