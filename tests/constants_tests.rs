// Host-side tests for constants and their relationships.
// The main crate is wasm-only, so we include the pure-Rust modules directly.

#![allow(dead_code)]
mod constants {
    include!("../src/constants.rs");
}

use constants::*;

#[test]
#[allow(clippy::assertions_on_constants)]
fn backing_limits_are_ordered() {
    assert!(MIN_BACKING_PX >= 1);
    assert!(MIN_BACKING_PX < MAX_BACKING_PX);
    // must fit the default wgpu 2D texture limit
    assert!(MAX_BACKING_PX <= wgpu::Limits::default().max_texture_dimension_2d);
}

#[test]
fn pointer_buttons_are_distinct() {
    assert_ne!(BUTTON_PRIMARY, BUTTON_SECONDARY);
    assert_eq!(BUTTON_PRIMARY, 0);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn shadow_bias_is_positive() {
    assert!(SHADOW_DEPTH_BIAS_CONSTANT > 0);
    assert!(SHADOW_DEPTH_BIAS_SLOPE > 0.0);
}

#[test]
fn canvas_style_allows_custom_gestures() {
    // touch-action:none keeps the browser from scrolling during drags
    assert!(CANVAS_STYLE.contains("touch-action:none"));
    assert!(CANVAS_STYLE.contains("width:100%"));
}

#[test]
fn dom_names_are_stable() {
    assert_eq!(MODEL_LOADED_EVENT, "kustomizerModelLoaded");
    assert!(!CANVAS_CLASS.contains(' '));
}
