//! Construction-time configuration handed over by the hosting page.
//!
//! The host serializes its options as JSON; unknown keys are ignored so the
//! surrounding plugin can pass its own bookkeeping (product id, nonce, ...)
//! through the same object.

use crate::constants::{CAMERA_FOV_DEGREES, DEFAULT_DAMPING_FACTOR, DEFAULT_MAX_TEXT_LENGTH};
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_CONTAINER_ID: &str = "kustomizer-viewer";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    #[serde(default = "default_container")]
    pub container: String,
    #[serde(default, alias = "stlFile")]
    pub base_model_source: String,
    #[serde(default, alias = "defaultTexture")]
    pub default_texture_source: Option<String>,
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    #[serde(default = "default_fonts")]
    pub available_fonts: Vec<String>,
    /// Font id -> URI of a TrueType/OpenType file.
    #[serde(default)]
    pub font_sources: BTreeMap<String, String>,
    /// Used for any font without an entry in `font_sources`.
    #[serde(default)]
    pub fallback_font_source: Option<String>,
    #[serde(default, flatten)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub camera: CameraSettings,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    #[serde(default = "enabled", alias = "allowTextCustomization", alias = "allowText")]
    pub text_enabled: bool,
    #[serde(default = "enabled", alias = "allowSVGUpload", alias = "allowSVG")]
    pub graphics_enabled: bool,
    #[serde(default = "enabled", alias = "allowTextureUpload", alias = "allowTexture")]
    pub texture_upload_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            text_enabled: true,
            graphics_enabled: true,
            texture_upload_enabled: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub damping_enabled: bool,
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub enable_rotate: bool,
    pub enable_pan: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: CAMERA_FOV_DEGREES,
            damping_enabled: true,
            damping_factor: DEFAULT_DAMPING_FACTOR,
            enable_zoom: true,
            enable_rotate: true,
            enable_pan: true,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
            base_model_source: String::new(),
            default_texture_source: None,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            available_fonts: default_fonts(),
            font_sources: BTreeMap::new(),
            fallback_font_source: None,
            features: FeatureFlags::default(),
            camera: CameraSettings::default(),
        }
    }
}

impl ViewerConfig {
    /// Parse the host's JSON options and validate them.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let config: ViewerConfig = serde_json::from_str(json)
            .map_err(|e| ConfigurationError::Invalid(format!("options: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.container.trim().is_empty() {
            return Err(ConfigurationError::MissingContainer(self.container.clone()));
        }
        if self.max_text_length == 0 {
            return Err(ConfigurationError::Invalid(
                "maxTextLength must be greater than zero".into(),
            ));
        }
        if self.features.text_enabled && self.available_fonts.is_empty() {
            return Err(ConfigurationError::Invalid(
                "availableFonts is empty while text customization is enabled".into(),
            ));
        }
        let cam = &self.camera;
        if !(0.0..1.0).contains(&cam.damping_factor) {
            return Err(ConfigurationError::Invalid(format!(
                "camera.dampingFactor must be in [0, 1), got {}",
                cam.damping_factor
            )));
        }
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return Err(ConfigurationError::Invalid(format!(
                "camera.fovDegrees must be in (0, 180), got {}",
                cam.fov_degrees
            )));
        }
        Ok(())
    }

    /// Default texture URI, treating an empty string as "none".
    pub fn default_texture(&self) -> Option<&str> {
        self.default_texture_source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Where to fetch the outlines for `font`, if anywhere.
    pub fn font_source(&self, font: &str) -> Option<&str> {
        self.font_sources
            .get(font)
            .or(self.fallback_font_source.as_ref())
            .map(String::as_str)
    }

    pub fn has_font(&self, font: &str) -> bool {
        self.available_fonts.iter().any(|f| f == font)
    }
}

fn default_container() -> String {
    DEFAULT_CONTAINER_ID.to_string()
}

fn default_max_text_length() -> usize {
    DEFAULT_MAX_TEXT_LENGTH
}

fn default_fonts() -> Vec<String> {
    ["Arial", "Helvetica", "Times New Roman"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn enabled() -> bool {
    true
}
