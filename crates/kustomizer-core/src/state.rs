//! Customization data: what the customer applied, independent of rendering.

use crate::color::Rgb;
use crate::constants::{
    DEFAULT_GRAPHIC_DEPTH, DEFAULT_GRAPHIC_POSITION, DEFAULT_GRAPHIC_SCALE, DEFAULT_TEXT_DEPTH,
    DEFAULT_TEXT_POSITION, DEFAULT_TEXT_SIZE,
};
use crate::error::ValidationError;
use crate::extrude::PlanarPath;
use crate::layout::LayoutSnapshot;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Caller-supplied options for a new text element; every field is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextOptions {
    /// `None` picks the first available font.
    pub font: Option<String>,
    pub size: f32,
    #[serde(alias = "height", alias = "extrude")]
    pub depth: f32,
    pub color: Rgb,
    pub position: Vec3,
    /// Euler angles in radians, XYZ order.
    pub rotation: Vec3,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            font: None,
            size: DEFAULT_TEXT_SIZE,
            depth: DEFAULT_TEXT_DEPTH,
            color: Rgb::BLACK,
            position: Vec3::from_array(DEFAULT_TEXT_POSITION),
            rotation: Vec3::ZERO,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphicOptions {
    pub scale: f32,
    #[serde(alias = "extrude")]
    pub depth: f32,
    pub color: Rgb,
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Default for GraphicOptions {
    fn default() -> Self {
        Self {
            scale: DEFAULT_GRAPHIC_SCALE,
            depth: DEFAULT_GRAPHIC_DEPTH,
            color: Rgb::BLACK,
            position: Vec3::from_array(DEFAULT_GRAPHIC_POSITION),
            rotation: Vec3::ZERO,
        }
    }
}

fn check_placement(position: Vec3, rotation: Vec3) -> Result<(), ValidationError> {
    if !position.is_finite() {
        return Err(ValidationError::OutOfRange {
            field: "position",
            expected: "finite",
            value: f32::NAN,
        });
    }
    if !rotation.is_finite() {
        return Err(ValidationError::OutOfRange {
            field: "rotation",
            expected: "finite",
            value: f32::NAN,
        });
    }
    Ok(())
}

fn check_depth(depth: f32) -> Result<(), ValidationError> {
    if !(depth >= 0.0 && depth.is_finite()) {
        return Err(ValidationError::OutOfRange {
            field: "depth",
            expected: ">= 0",
            value: depth,
        });
    }
    Ok(())
}

impl TextOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.size > 0.0 && self.size.is_finite()) {
            return Err(ValidationError::OutOfRange {
                field: "size",
                expected: "> 0",
                value: self.size,
            });
        }
        check_depth(self.depth)?;
        check_placement(self.position, self.rotation)
    }
}

impl GraphicOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(ValidationError::OutOfRange {
                field: "scale",
                expected: "> 0",
                value: self.scale,
            });
        }
        check_depth(self.depth)?;
        check_placement(self.position, self.rotation)
    }
}

/// Extruded text, immutable once added.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub text: String,
    pub font: String,
    pub size: f32,
    pub depth: f32,
    pub color: Rgb,
    pub position: Vec3,
    pub rotation: Vec3,
}

impl TextElement {
    pub fn new(text: impl Into<String>, font: impl Into<String>, options: &TextOptions) -> Self {
        Self {
            text: text.into(),
            font: font.into(),
            size: options.size,
            depth: options.depth,
            color: options.color,
            position: options.position,
            rotation: options.rotation,
        }
    }

    pub fn options(&self) -> TextOptions {
        TextOptions {
            font: Some(self.font.clone()),
            size: self.size,
            depth: self.depth,
            color: self.color,
            position: self.position,
            rotation: self.rotation,
        }
    }
}

/// Extruded vector graphic, immutable once added.
///
/// The parsed outlines are kept in memory only; the markup is what gets
/// persisted and is re-parsed on restore.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphicElement {
    pub svg_markup: String,
    #[serde(skip)]
    pub source_paths: Vec<PlanarPath>,
    pub scale: f32,
    pub depth: f32,
    pub color: Rgb,
    pub position: Vec3,
    pub rotation: Vec3,
}

impl GraphicElement {
    pub fn new(svg_markup: String, source_paths: Vec<PlanarPath>, options: &GraphicOptions) -> Self {
        Self {
            svg_markup,
            source_paths,
            scale: options.scale,
            depth: options.depth,
            color: options.color,
            position: options.position,
            rotation: options.rotation,
        }
    }

    pub fn options(&self) -> GraphicOptions {
        GraphicOptions {
            scale: self.scale,
            depth: self.depth,
            color: self.color,
            position: self.position,
            rotation: self.rotation,
        }
    }
}

/// Authoritative record of one customization session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomizationState {
    #[serde(alias = "texture", skip_serializing_if = "Option::is_none")]
    pub texture_data_uri: Option<String>,
    pub text_elements: Vec<TextElement>,
    #[serde(alias = "svgElements")]
    pub graphic_elements: Vec<GraphicElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<Box<LayoutSnapshot>>,
}

impl CustomizationState {
    /// Deep copy without the stored layout, so snapshots never nest.
    pub fn without_layout(&self) -> CustomizationState {
        CustomizationState {
            texture_data_uri: self.texture_data_uri.clone(),
            text_elements: self.text_elements.clone(),
            graphic_elements: self.graphic_elements.clone(),
            layout: None,
        }
    }

    pub fn clear(&mut self) {
        *self = CustomizationState::default();
    }

    pub fn is_empty(&self) -> bool {
        self.texture_data_uri.is_none()
            && self.text_elements.is_empty()
            && self.graphic_elements.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
