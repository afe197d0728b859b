//! Scene manager: camera, lights, the base mesh and decoration nodes.
//!
//! GPU work goes through [`RenderBackend`]; the manager itself only keeps
//! handles and transforms, and builds one [`FrameDescription`] per frame.

use crate::camera::Camera;
use crate::color::Rgb;
use crate::config::ViewerConfig;
use crate::constants::{
    key_light_position, AMBIENT_INTENSITY, BACKGROUND_RGB, DEFAULT_SHININESS, FALLBACK_BASE_RGB,
    FRAMING_DISTANCE_FACTOR, KEY_LIGHT_INTENSITY, SHADOW_MAP_SIZE,
};
use crate::controls::OrbitControls;
use crate::error::{AssetLoadError, CaptureError, RenderError};
use crate::extrude::extrude;
use crate::geometry::{Aabb, MeshData};
use crate::loaders::font::Typeface;
use crate::loaders::texture::TextureImage;
use crate::state::{GraphicElement, TextElement};
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Phong surface description.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: Rgb,
    pub texture: Option<TextureHandle>,
    pub shininess: f32,
}

impl Material {
    pub fn flat(color: Rgb) -> Self {
        Self {
            color,
            texture: None,
            shininess: DEFAULT_SHININESS,
        }
    }

    pub fn textured(texture: TextureHandle) -> Self {
        Self {
            color: Rgb(255, 255, 255),
            texture: Some(texture),
            shininess: DEFAULT_SHININESS,
        }
    }
}

/// Position, XYZ Euler rotation (radians) and uniform scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z),
            self.position,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshHandle,
    pub model: Mat4,
    pub material: Material,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lighting {
    pub ambient_intensity: f32,
    pub key_position: Vec3,
    pub key_intensity: f32,
    pub shadow_view_proj: Mat4,
    pub shadow_map_size: u32,
}

/// Everything a backend needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameDescription {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub lighting: Lighting,
    pub clear_color: Rgb,
    pub items: Vec<DrawItem>,
}

/// GPU side of the scene. Implemented with wgpu in the browser.
pub trait RenderBackend {
    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, RenderError>;
    fn release_mesh(&mut self, handle: MeshHandle);
    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureHandle, RenderError>;
    fn release_texture(&mut self, handle: TextureHandle);
    /// Drawing-buffer size in physical pixels.
    fn resize(&mut self, width: u32, height: u32);
    fn render(&mut self, frame: &FrameDescription) -> Result<(), RenderError>;
    /// Render `frame` and return the color buffer encoded as PNG.
    fn capture_png(&mut self, frame: &FrameDescription) -> Result<Vec<u8>, RenderError>;
    fn dispose(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Graphic,
}

/// Camera placement computed when the base model finished loading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelFraming {
    pub eye: Vec3,
    pub target: Vec3,
    pub bounds: Aabb,
}

#[derive(Clone, Debug)]
struct SceneNode {
    mesh: MeshHandle,
    transform: Transform,
    material: Material,
}

#[derive(Clone, Debug)]
struct BaseModel {
    mesh: MeshHandle,
    bounds: Aabb,
}

pub struct SceneManager<B: RenderBackend> {
    backend: B,
    camera: Camera,
    controls: OrbitControls,
    base: Option<BaseModel>,
    framing: Option<ModelFraming>,
    default_texture: Option<TextureHandle>,
    user_texture: Option<TextureHandle>,
    text_nodes: Vec<SceneNode>,
    graphic_nodes: Vec<SceneNode>,
    viewport: (u32, u32),
    disposed: bool,
}

impl<B: RenderBackend> SceneManager<B> {
    /// Camera, lights and controls; the base mesh arrives later.
    pub fn initialize(backend: B, config: &ViewerConfig) -> Self {
        let camera = Camera::with_fov(config.camera.fov_degrees);
        let controls = OrbitControls::new(&config.camera);
        log::info!(
            "[scene] initialized fov={} damping={}({})",
            config.camera.fov_degrees,
            config.camera.damping_enabled,
            config.camera.damping_factor
        );
        Self {
            backend,
            camera,
            controls,
            base: None,
            framing: None,
            default_texture: None,
            user_texture: None,
            text_nodes: Vec::new(),
            graphic_nodes: Vec::new(),
            viewport: (0, 0),
            disposed: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    pub fn is_model_ready(&self) -> bool {
        self.base.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn framing(&self) -> Option<ModelFraming> {
        self.framing
    }

    pub fn base_bounds(&self) -> Option<Aabb> {
        self.base.as_ref().map(|b| b.bounds)
    }

    pub fn has_user_texture(&self) -> bool {
        self.user_texture.is_some()
    }

    pub fn node_count(&self, kind: NodeKind) -> usize {
        self.nodes(kind).len()
    }

    fn nodes(&self, kind: NodeKind) -> &Vec<SceneNode> {
        match kind {
            NodeKind::Text => &self.text_nodes,
            NodeKind::Graphic => &self.graphic_nodes,
        }
    }

    fn nodes_mut(&mut self, kind: NodeKind) -> &mut Vec<SceneNode> {
        match kind {
            NodeKind::Text => &mut self.text_nodes,
            NodeKind::Graphic => &mut self.graphic_nodes,
        }
    }

    /// Viewport size in physical pixels plus the device pixel ratio, so drag
    /// speed can be computed in CSS pixels.
    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) {
        if width == 0 || height == 0 || self.viewport == (width, height) {
            return;
        }
        self.viewport = (width, height);
        self.camera.set_viewport(width, height);
        let ratio = if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
        self.controls
            .set_viewport(width as f32 / ratio, height as f32 / ratio);
        self.backend.resize(width, height);
        log::debug!("[scene] resize {}x{}", width, height);
    }

    /// Center `mesh` on the origin, give it normals and UVs, and frame the camera on it.
    ///
    /// `default_texture` is applied as the base surface map; without one the
    /// flat fallback material is used. A previously loaded base model is replaced.
    pub fn load_base_model(
        &mut self,
        mut mesh: MeshData,
        default_texture: Option<&TextureImage>,
    ) -> Result<ModelFraming, AssetLoadError> {
        mesh.center_on_origin();
        mesh.compute_vertex_normals();
        let bounds = mesh
            .bounding_box()
            .ok_or_else(|| AssetLoadError::Mesh("mesh has no vertices".into()))?;
        let max_dim = bounds.max_dimension();
        mesh.generate_box_uvs(max_dim.max(f32::EPSILON));

        let handle = self.backend.upload_mesh(&mesh)?;
        let texture = match default_texture {
            Some(img) => match self.backend.upload_texture(img) {
                Ok(t) => Some(t),
                Err(e) => {
                    self.backend.release_mesh(handle);
                    return Err(e.into());
                }
            },
            None => None,
        };

        if let Some(old) = self.base.take() {
            self.backend.release_mesh(old.mesh);
        }
        if let Some(old) = std::mem::replace(&mut self.default_texture, texture) {
            self.backend.release_texture(old);
        }
        self.base = Some(BaseModel {
            mesh: handle,
            bounds,
        });

        let framing = ModelFraming {
            eye: Vec3::new(0.0, 0.0, FRAMING_DISTANCE_FACTOR * max_dim),
            target: Vec3::ZERO,
            bounds,
        };
        self.controls
            .reset_to(&mut self.camera, framing.eye, framing.target);
        self.framing = Some(framing);
        log::info!(
            "[scene] base model {} triangles, size=({:.2},{:.2},{:.2}) camera z={:.2}",
            mesh.triangle_count(),
            bounds.size().x,
            bounds.size().y,
            bounds.size().z,
            framing.eye.z
        );
        Ok(framing)
    }

    /// Extrude `element` with `typeface`, centered horizontally on its anchor.
    pub fn add_text_node(
        &mut self,
        element: &TextElement,
        typeface: &dyn Typeface,
    ) -> Result<(), AssetLoadError> {
        let mut outline = typeface.outline(&element.text, element.size)?;
        let (lo, hi) = outline
            .bounds()
            .ok_or_else(|| AssetLoadError::Font(format!("no glyph outlines for `{}`", element.text)))?;
        outline.translate(Vec2::new(-(lo.x + hi.x) * 0.5, 0.0));
        let mesh = extrude(&outline, element.depth).map_err(AssetLoadError::Font)?;
        self.push_node(
            NodeKind::Text,
            &mesh,
            Transform {
                position: element.position,
                rotation: element.rotation,
                scale: 1.0,
            },
            Material::flat(element.color),
        )
    }

    pub fn add_graphic_node(&mut self, element: &GraphicElement) -> Result<(), AssetLoadError> {
        let mut mesh = MeshData::default();
        for path in &element.source_paths {
            mesh.merge(&extrude(path, element.depth).map_err(AssetLoadError::Vector)?);
        }
        self.push_node(
            NodeKind::Graphic,
            &mesh,
            Transform {
                position: element.position,
                rotation: element.rotation,
                scale: element.scale,
            },
            Material::flat(element.color),
        )
    }

    fn push_node(
        &mut self,
        kind: NodeKind,
        mesh: &MeshData,
        transform: Transform,
        material: Material,
    ) -> Result<(), AssetLoadError> {
        if mesh.is_empty() {
            return Err(match kind {
                NodeKind::Text => AssetLoadError::Font("text produced no geometry".into()),
                NodeKind::Graphic => AssetLoadError::Vector("graphic produced no geometry".into()),
            });
        }
        let handle = self.backend.upload_mesh(mesh)?;
        self.nodes_mut(kind).push(SceneNode {
            mesh: handle,
            transform,
            material,
        });
        log::debug!(
            "[scene] added {:?} node ({} triangles)",
            kind,
            mesh.triangle_count()
        );
        Ok(())
    }

    /// Detach the node at `index`. Out-of-range indices are ignored.
    pub fn remove_node_at(&mut self, kind: NodeKind, index: usize) -> bool {
        if index >= self.nodes(kind).len() {
            return false;
        }
        let node = self.nodes_mut(kind).remove(index);
        self.backend.release_mesh(node.mesh);
        true
    }

    pub fn clear_nodes(&mut self) {
        let nodes: Vec<SceneNode> = self
            .text_nodes
            .drain(..)
            .chain(self.graphic_nodes.drain(..))
            .collect();
        for node in nodes {
            self.backend.release_mesh(node.mesh);
        }
    }

    /// Swap the base surface map. The mesh itself is left alone.
    pub fn apply_texture(&mut self, image: &TextureImage) -> Result<(), AssetLoadError> {
        let handle = self.backend.upload_texture(image)?;
        if let Some(old) = self.user_texture.replace(handle) {
            self.backend.release_texture(old);
        }
        log::debug!("[scene] texture applied {}x{}", image.width, image.height);
        Ok(())
    }

    /// Drop the user texture; the default texture or flat material shows again.
    pub fn clear_texture(&mut self) {
        if let Some(old) = self.user_texture.take() {
            self.backend.release_texture(old);
        }
    }

    pub fn base_material(&self) -> Material {
        match self.user_texture.or(self.default_texture) {
            Some(t) => Material::textured(t),
            None => Material::flat(Rgb::from_hex(FALLBACK_BASE_RGB)),
        }
    }

    pub fn reset_view(&mut self) {
        if let Some(f) = self.framing {
            self.controls.reset_to(&mut self.camera, f.eye, f.target);
        }
    }

    pub fn update_controls(&mut self) -> bool {
        self.controls.update(&mut self.camera)
    }

    pub fn describe_frame(&self) -> FrameDescription {
        let mut items = Vec::with_capacity(1 + self.text_nodes.len() + self.graphic_nodes.len());
        if let Some(base) = &self.base {
            items.push(DrawItem {
                mesh: base.mesh,
                model: Mat4::IDENTITY,
                material: self.base_material(),
            });
        }
        for node in self.text_nodes.iter().chain(&self.graphic_nodes) {
            items.push(DrawItem {
                mesh: node.mesh,
                model: node.transform.matrix(),
                material: node.material,
            });
        }
        FrameDescription {
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(),
            camera_position: self.camera.eye,
            lighting: self.lighting(),
            clear_color: Rgb::from_hex(BACKGROUND_RGB),
            items,
        }
    }

    fn lighting(&self) -> Lighting {
        // Orthographic shadow frustum around the base model, looking from the key light.
        let radius = self
            .base
            .as_ref()
            .map(|b| b.bounds.size().length() * 0.5)
            .unwrap_or(50.0)
            .max(1.0)
            * 1.5;
        let key = key_light_position();
        let dir = key.normalize_or_zero();
        let distance = key.length().max(radius * 2.0);
        let eye = dir * distance;
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::orthographic_rh(-radius, radius, -radius, radius, 0.1, distance + radius);
        Lighting {
            ambient_intensity: AMBIENT_INTENSITY,
            key_position: key,
            key_intensity: KEY_LIGHT_INTENSITY,
            shadow_view_proj: proj * view,
            shadow_map_size: SHADOW_MAP_SIZE,
        }
    }

    /// One render-loop step: advance the controls, then draw.
    pub fn frame(&mut self) -> Result<(), RenderError> {
        if self.disposed {
            return Ok(());
        }
        self.update_controls();
        let frame = self.describe_frame();
        self.backend.render(&frame)
    }

    /// Render the current frame and return it as PNG bytes.
    pub fn capture(&mut self) -> Result<Vec<u8>, CaptureError> {
        if self.disposed {
            return Err(CaptureError::Disposed);
        }
        if self.base.is_none() {
            return Err(CaptureError::ModelNotReady);
        }
        let frame = self.describe_frame();
        Ok(self.backend.capture_png(&frame)?)
    }

    /// Release every GPU resource. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.clear_nodes();
        self.clear_texture();
        if let Some(t) = self.default_texture.take() {
            self.backend.release_texture(t);
        }
        if let Some(base) = self.base.take() {
            self.backend.release_mesh(base.mesh);
        }
        self.controls.dispose();
        self.backend.dispose();
        self.disposed = true;
        log::info!("[scene] disposed");
    }
}
