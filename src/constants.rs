// Browser-side tuning constants.
//
// Scene and camera numbers live in `kustomizer_core::constants`; this file
// only holds what the DOM, input and GPU wiring need.

// DOM
pub const CANVAS_CLASS: &str = "kustomizer-canvas";
pub const MODEL_LOADED_EVENT: &str = "kustomizerModelLoaded";
pub const CANVAS_STYLE: &str = "display:block;width:100%;height:100%;touch-action:none;";

// Pointer buttons as reported by `PointerEvent.button`
pub const BUTTON_PRIMARY: i16 = 0;
pub const BUTTON_SECONDARY: i16 = 2;

// Drawing buffer limits in physical pixels; 8192 is the default wgpu 2D texture limit
pub const MIN_BACKING_PX: u32 = 1;
pub const MAX_BACKING_PX: u32 = 8192;

// GPU
pub const SHADOW_DEPTH_BIAS_CONSTANT: i32 = 2;
pub const SHADOW_DEPTH_BIAS_SLOPE: f32 = 2.0;
