use glam::Vec3;

// Shared scene/camera tuning constants used by the core and the web frontend.

// Camera
pub const CAMERA_FOV_DEGREES: f32 = 75.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 1000.0;
pub const INITIAL_CAMERA_Z: f32 = 100.0; // eye distance before any model is framed
pub const FRAMING_DISTANCE_FACTOR: f32 = 1.5; // eye distance = factor * largest bbox dimension

// Orbit controls
pub const ZOOM_STEP: f32 = 0.95; // per wheel notch scale factor
pub const POLAR_EPSILON: f32 = 1e-6; // keeps phi away from the poles
pub const MIN_RADIUS: f32 = 0.01;
pub const DEFAULT_DAMPING_FACTOR: f32 = 0.05;

// Lighting
pub const AMBIENT_INTENSITY: f32 = 0.6;
pub const KEY_LIGHT_INTENSITY: f32 = 0.8;
pub const KEY_LIGHT_POSITION: [f32; 3] = [50.0, 50.0, 100.0];
pub const SHADOW_MAP_SIZE: u32 = 2048;

// Colors (linear 0..1 unless noted)
pub const BACKGROUND_RGB: u32 = 0xf0f0f0;
pub const FALLBACK_BASE_RGB: u32 = 0x00aaff; // flat material when no texture is configured
pub const DEFAULT_SHININESS: f32 = 30.0;

// Decorations
pub const DEFAULT_TEXT_SIZE: f32 = 10.0;
pub const DEFAULT_TEXT_DEPTH: f32 = 1.0;
pub const DEFAULT_TEXT_POSITION: [f32; 3] = [0.0, 0.0, 10.0];
pub const DEFAULT_GRAPHIC_SCALE: f32 = 1.0;
pub const DEFAULT_GRAPHIC_DEPTH: f32 = 1.0;
pub const DEFAULT_GRAPHIC_POSITION: [f32; 3] = [0.0, 0.0, 5.0];
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 100;

// Curve flattening tolerances
pub const GLYPH_TOLERANCE_PER_UNIT: f32 = 0.01; // relative to the text size
pub const SVG_TOLERANCE: f64 = 0.1; // in SVG user units

#[inline]
pub fn key_light_position() -> Vec3 {
    Vec3::from_array(KEY_LIGHT_POSITION)
}
