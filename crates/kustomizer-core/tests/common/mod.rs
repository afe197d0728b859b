// Shared fixtures for the core integration tests: an in-memory fetcher, a
// render backend that records what it was asked to do, a block typeface and
// byte builders for STL / PNG / SVG inputs.

#![allow(dead_code)]

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use glam::{Vec2, Vec3};
use kustomizer_core::error::{AssetLoadError, RenderError};
use kustomizer_core::extrude::PlanarPath;
use kustomizer_core::geometry::MeshData;
use kustomizer_core::loaders::font::Typeface;
use kustomizer_core::loaders::texture::TextureImage;
use kustomizer_core::scene::{FrameDescription, MeshHandle, RenderBackend, TextureHandle};
use kustomizer_core::{AssetFetcher, LoadProgress, Viewer, ViewerConfig};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Cursor;
use std::rc::Rc;

pub const MODEL_URI: &str = "https://shop.test/models/mug.stl";
pub const TEXTURE_URI: &str = "https://shop.test/textures/wood.png";
pub const FONT_URI: &str = "https://shop.test/fonts/sans.ttf";

#[derive(Default)]
pub struct RecordingBackend {
    next_id: u64,
    pub meshes: HashMap<u64, MeshData>,
    pub textures: HashMap<u64, (u32, u32)>,
    pub released_meshes: usize,
    pub released_textures: usize,
    pub frames: Vec<FrameDescription>,
    pub captures: usize,
    /// Returned by the next capture instead of an image.
    pub capture_failure: Option<RenderError>,
    pub viewport: (u32, u32),
    pub disposed: u32,
}

impl RecordingBackend {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }
}

impl RenderBackend for RecordingBackend {
    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, RenderError> {
        let id = self.next();
        self.meshes.insert(id, mesh.clone());
        Ok(MeshHandle(id))
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        if self.meshes.remove(&handle.0).is_some() {
            self.released_meshes += 1;
        }
    }

    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureHandle, RenderError> {
        let id = self.next();
        self.textures.insert(id, (image.width, image.height));
        Ok(TextureHandle(id))
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        if self.textures.remove(&handle.0).is_some() {
            self.released_textures += 1;
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn render(&mut self, frame: &FrameDescription) -> Result<(), RenderError> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn capture_png(&mut self, frame: &FrameDescription) -> Result<Vec<u8>, RenderError> {
        if let Some(e) = self.capture_failure.take() {
            return Err(e);
        }
        self.render(frame)?;
        self.captures += 1;
        let c = frame.clear_color;
        Ok(png_bytes(4, 3, [c.0, c.1, c.2, 255]))
    }

    fn dispose(&mut self) {
        self.disposed += 1;
    }
}

/// Serves registered URIs from memory; anything else is a 404.
///
/// A gated URI holds its response until the paired sender fires (or drops).
#[derive(Default)]
pub struct MapFetcher {
    files: HashMap<String, Vec<u8>>,
    gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
    pub requests: RefCell<Vec<String>>,
}

impl MapFetcher {
    pub fn with(mut self, uri: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(uri.to_string(), bytes);
        self
    }

    pub fn gated(self, uri: &str) -> (Self, oneshot::Sender<()>) {
        let (release, gate) = oneshot::channel();
        self.gates.borrow_mut().insert(uri.to_string(), gate);
        (self, release)
    }
}

impl AssetFetcher for MapFetcher {
    fn fetch<'a>(
        &'a self,
        uri: &'a str,
        progress: &'a dyn Fn(LoadProgress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, AssetLoadError>> {
        self.requests.borrow_mut().push(uri.to_string());
        let result = match self.files.get(uri) {
            Some(bytes) => {
                let len = bytes.len() as u64;
                progress(LoadProgress {
                    loaded: len / 2,
                    total: Some(len),
                });
                progress(LoadProgress {
                    loaded: len,
                    total: Some(len),
                });
                Ok(bytes.clone())
            }
            None => Err(AssetLoadError::Fetch {
                uri: uri.to_string(),
                reason: "HTTP 404".into(),
            }),
        };
        match self.gates.borrow_mut().remove(uri) {
            Some(gate) => Box::pin(async move {
                let _ = gate.await;
                result
            }),
            None => Box::pin(futures::future::ready(result)),
        }
    }
}

/// Every visible character is a solid block 0.6em wide; the pen advances 0.8em.
#[derive(Default)]
pub struct BlockTypeface {
    pub calls: Cell<usize>,
}

impl Typeface for BlockTypeface {
    fn outline(&self, text: &str, size: f32) -> Result<PlanarPath, AssetLoadError> {
        self.calls.set(self.calls.get() + 1);
        let mut path = PlanarPath::default();
        let mut x = 0.0;
        for ch in text.chars() {
            if !ch.is_whitespace() {
                let w = 0.6 * size;
                path.push_contour(vec![
                    Vec2::new(x, 0.0),
                    Vec2::new(x + w, 0.0),
                    Vec2::new(x + w, size),
                    Vec2::new(x, size),
                ]);
            }
            x += 0.8 * size;
        }
        Ok(path)
    }
}

pub fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
        .expect("encode png");
    buf
}

/// Twelve triangles of an axis-aligned box.
pub fn box_triangles(min: Vec3, max: Vec3) -> Vec<[Vec3; 3]> {
    let c = |x: bool, y: bool, z: bool| {
        Vec3::new(
            if x { max.x } else { min.x },
            if y { max.y } else { min.y },
            if z { max.z } else { min.z },
        )
    };
    let quads = [
        [c(false, false, true), c(true, false, true), c(true, true, true), c(false, true, true)],
        [c(true, false, false), c(false, false, false), c(false, true, false), c(true, true, false)],
        [c(true, false, true), c(true, false, false), c(true, true, false), c(true, true, true)],
        [c(false, false, false), c(false, false, true), c(false, true, true), c(false, true, false)],
        [c(false, true, true), c(true, true, true), c(true, true, false), c(false, true, false)],
        [c(false, false, false), c(true, false, false), c(true, false, true), c(false, false, true)],
    ];
    quads
        .iter()
        .flat_map(|q| [[q[0], q[1], q[2]], [q[0], q[2], q[3]]])
        .collect()
}

pub fn binary_stl(triangles: &[[Vec3; 3]]) -> Vec<u8> {
    let mut out = vec![0u8; 80];
    out[..12].copy_from_slice(b"test fixture");
    out.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for tri in triangles {
        for _ in 0..3 {
            out.extend_from_slice(&0f32.to_le_bytes());
        }
        for v in tri {
            for c in v.to_array() {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

pub fn ascii_stl(triangles: &[[Vec3; 3]]) -> String {
    let mut s = String::from("solid fixture\n");
    for tri in triangles {
        s.push_str("  facet normal 0 0 0\n    outer loop\n");
        for v in tri {
            s.push_str(&format!("      vertex {} {} {}\n", v.x, v.y, v.z));
        }
        s.push_str("    endloop\n  endfacet\n");
    }
    s.push_str("endsolid fixture\n");
    s
}

pub const STAR_SVG: &str = r##"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
  <polygon points="50,5 61,40 98,40 68,62 79,95 50,75 21,95 32,62 2,40 39,40" fill="#333"/>
</svg>"##;

pub const SQUARE_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect x="0" y="0" width="10" height="10"/></svg>"#;

/// A 10x10x40 box offset away from the origin, so centering is observable.
pub fn model_bytes() -> Vec<u8> {
    binary_stl(&box_triangles(Vec3::new(10.0, 20.0, 30.0), Vec3::new(20.0, 30.0, 70.0)))
}

pub fn test_config() -> ViewerConfig {
    ViewerConfig {
        base_model_source: MODEL_URI.to_string(),
        available_fonts: vec!["Sans".to_string(), "Serif".to_string()],
        ..ViewerConfig::default()
    }
}

pub type TestViewer = Viewer<RecordingBackend, MapFetcher>;

/// Viewer with the box model served and a block typeface registered for every font.
pub fn viewer_with(config: ViewerConfig, fetcher: MapFetcher) -> TestViewer {
    let fonts = config.available_fonts.clone();
    let viewer = Viewer::new(config, RecordingBackend::default(), fetcher).expect("valid config");
    for font in fonts {
        viewer.register_font(&font, Rc::new(BlockTypeface::default()));
    }
    viewer
}

pub fn loaded_viewer(config: ViewerConfig) -> TestViewer {
    let viewer = viewer_with(config, MapFetcher::default().with(MODEL_URI, model_bytes()));
    pollster::block_on(viewer.load_base_model(&|_| {})).expect("model loads");
    viewer
}

pub fn assert_close(a: f32, b: f32, tol: f32) {
    assert!((a - b).abs() <= tol, "expected {b}, got {a} (tolerance {tol})");
}
