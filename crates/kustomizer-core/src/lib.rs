//! Platform-free core of the kustomizer 3D product customizer.
//!
//! The browser crate supplies a WebGPU [`scene::RenderBackend`] and a
//! `fetch()`-based [`loaders::AssetFetcher`]; everything else lives here.

pub mod camera;
pub mod color;
pub mod config;
pub mod constants;
pub mod controls;
pub mod customizer;
pub mod error;
pub mod extrude;
pub mod geometry;
pub mod layout;
pub mod loaders;
pub mod scene;
pub mod state;
pub mod viewer;

pub static SCENE_WGSL: &str = include_str!("../shaders/scene.wgsl");

pub use camera::Camera;
pub use color::Rgb;
pub use config::{CameraSettings, FeatureFlags, ViewerConfig};
pub use controls::{CameraRig, DragMode, OrbitControls};
pub use customizer::Customizer;
pub use error::*;
pub use layout::LayoutSnapshot;
pub use loaders::{AssetFetcher, AssetSource, LoadProgress};
pub use scene::{FrameDescription, ModelFraming, NodeKind, RenderBackend, SceneManager};
pub use state::{CustomizationState, GraphicElement, GraphicOptions, TextElement, TextOptions};
pub use viewer::Viewer;
