//! Async front of the engine.
//!
//! [`Viewer`] is a cheap clonable handle shared by the host API, input
//! handlers and the render loop. Each operation validates under a short
//! borrow, awaits its loads with no borrow held, then applies the result to
//! scene and state under one mutable borrow.

use crate::config::ViewerConfig;
use crate::controls::OrbitControls;
use crate::customizer::Customizer;
use crate::error::{AssetLoadError, CaptureError, ConfigurationError, KustomizerError, RenderError};
use crate::layout::LayoutSnapshot;
use crate::loaders::font::{TrueTypeFont, Typeface};
use crate::loaders::mesh::parse_stl;
use crate::loaders::texture::{decode_texture, TextureImage};
use crate::loaders::vector::parse_svg;
use crate::loaders::{read_source, sniff_image_mime, to_data_uri, AssetFetcher, AssetSource, LoadProgress};
use crate::scene::{ModelFraming, NodeKind, RenderBackend};
use crate::state::{CustomizationState, GraphicElement, GraphicOptions, TextOptions};
use instant::Instant;
use std::cell::RefCell;
use std::rc::Rc;

type ModelReadyListener = Rc<dyn Fn(&ModelFraming)>;

fn no_progress(_: LoadProgress) {}

pub struct Viewer<B: RenderBackend, F: AssetFetcher> {
    inner: Rc<RefCell<Customizer<B>>>,
    fetcher: Rc<F>,
    listeners: Rc<RefCell<Vec<ModelReadyListener>>>,
}

impl<B: RenderBackend, F: AssetFetcher> Clone for Viewer<B, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            fetcher: self.fetcher.clone(),
            listeners: self.listeners.clone(),
        }
    }
}

impl<B: RenderBackend + 'static, F: AssetFetcher + 'static> Viewer<B, F> {
    pub fn new(config: ViewerConfig, backend: B, fetcher: F) -> Result<Self, ConfigurationError> {
        Ok(Self {
            inner: Rc::new(RefCell::new(Customizer::new(config, backend)?)),
            fetcher: Rc::new(fetcher),
            listeners: Rc::new(RefCell::new(Vec::new())),
        })
    }

    /// Run `f` against the store. Must not be called from inside another `with`.
    pub fn with<R>(&self, f: impl FnOnce(&mut Customizer<B>) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    pub fn with_controls<R>(&self, f: impl FnOnce(&mut OrbitControls) -> R) -> R {
        f(self.inner.borrow_mut().scene_mut().controls_mut())
    }

    pub fn config(&self) -> ViewerConfig {
        self.inner.borrow().config().clone()
    }

    pub fn is_model_ready(&self) -> bool {
        self.inner.borrow().scene().is_model_ready()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().scene().is_disposed()
    }

    /// Called once per successful base model load, after the camera is framed.
    pub fn on_model_ready(&self, listener: impl Fn(&ModelFraming) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Load the configured base model (and default texture).
    pub async fn load_base_model(
        &self,
        progress: &dyn Fn(LoadProgress),
    ) -> Result<ModelFraming, KustomizerError> {
        let source = AssetSource::Uri(self.inner.borrow().config().base_model_source.clone());
        self.load_model_from(&source, progress).await
    }

    pub async fn load_model_from(
        &self,
        source: &AssetSource,
        progress: &dyn Fn(LoadProgress),
    ) -> Result<ModelFraming, KustomizerError> {
        let started = Instant::now();
        let default_texture = self.inner.borrow().config().default_texture().map(String::from);

        let bytes = read_source(self.fetcher.as_ref(), source, progress).await?;
        let mesh = parse_stl(&bytes)?;
        let texture = match default_texture {
            Some(uri) => match self.load_image(&AssetSource::Uri(uri.clone())).await {
                Ok((img, _)) => Some(img),
                Err(e) => {
                    log::warn!("[loader] default texture {} unusable, using flat material: {}", uri, e);
                    None
                }
            },
            None => None,
        };

        let framing = self
            .inner
            .borrow_mut()
            .scene_mut()
            .load_base_model(mesh, texture.as_ref())?;
        log::info!(
            "[loader] base model {} ready in {:?}",
            source.describe(),
            started.elapsed()
        );

        let listeners: Vec<ModelReadyListener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(&framing);
        }
        Ok(framing)
    }

    async fn load_image(&self, source: &AssetSource) -> Result<(TextureImage, Vec<u8>), AssetLoadError> {
        let bytes = read_source(self.fetcher.as_ref(), source, &no_progress).await?;
        let image = decode_texture(&bytes)?;
        Ok((image, bytes))
    }

    /// Load, decode and apply a surface texture. Returns the texture generation.
    ///
    /// Concurrent calls apply in completion order; the recorded data URI
    /// always matches the texture on screen.
    pub async fn set_texture(&self, source: AssetSource) -> Result<u64, KustomizerError> {
        let request = {
            let mut inner = self.inner.borrow_mut();
            inner.validate_texture()?;
            inner.begin_texture_request()
        };
        let started = Instant::now();
        let (image, bytes) = self.load_image(&source).await?;
        let data_uri = match &source {
            AssetSource::Uri(u) if u.starts_with("data:") => u.clone(),
            _ => to_data_uri(sniff_image_mime(&bytes), &bytes),
        };
        let generation = self
            .inner
            .borrow_mut()
            .apply_texture(&image, data_uri, request)?;
        log::info!(
            "[loader] texture {} {}x{} applied in {:?}",
            source.describe(),
            image.width,
            image.height,
            started.elapsed()
        );
        Ok(generation)
    }

    pub fn clear_texture(&self) {
        self.inner.borrow_mut().clear_texture();
    }

    /// Add extruded text. The element is recorded only once its node exists.
    pub async fn add_text(&self, text: &str, options: &TextOptions) -> Result<usize, KustomizerError> {
        let element = self.inner.borrow().validate_text(text, options)?;
        let typeface = self.typeface(&element.font).await?;
        let index = self
            .inner
            .borrow_mut()
            .insert_text(element, typeface.as_ref())?;
        Ok(index)
    }

    /// Cached typeface for `font`, fetching and parsing its file on first use.
    async fn typeface(&self, font: &str) -> Result<Rc<dyn Typeface>, AssetLoadError> {
        let source = {
            let inner = self.inner.borrow();
            if let Some(t) = inner.fonts().get(font) {
                return Ok(t);
            }
            inner
                .config()
                .font_source(font)
                .map(String::from)
                .ok_or_else(|| AssetLoadError::Font(format!("no source configured for `{font}`")))?
        };
        let started = Instant::now();
        let bytes = read_source(self.fetcher.as_ref(), &AssetSource::Uri(source), &no_progress).await?;
        let typeface: Rc<dyn Typeface> = Rc::new(TrueTypeFont::from_bytes(bytes)?);
        // A concurrent load of the same font may have finished first; either copy works.
        self.inner
            .borrow_mut()
            .register_font(font, typeface.clone());
        log::info!("[loader] font {} ready in {:?}", font, started.elapsed());
        Ok(typeface)
    }

    pub fn register_font(&self, font: &str, typeface: Rc<dyn Typeface>) {
        self.inner.borrow_mut().register_font(font, typeface);
    }

    /// Read SVG markup, parse it and add the extruded graphic.
    pub async fn add_graphic(
        &self,
        source: AssetSource,
        options: &GraphicOptions,
    ) -> Result<usize, KustomizerError> {
        self.inner.borrow().validate_graphic(options)?;
        let bytes = read_source(self.fetcher.as_ref(), &source, &no_progress).await?;
        let markup = String::from_utf8(bytes)
            .map_err(|_| AssetLoadError::Vector("SVG is not valid UTF-8".into()))?;
        let paths = parse_svg(&markup)?;
        let element = GraphicElement::new(markup, paths, options);
        let index = self.inner.borrow_mut().insert_graphic(element)?;
        Ok(index)
    }

    pub fn remove_text(&self, index: usize) -> bool {
        self.inner.borrow_mut().remove_text(index)
    }

    pub fn remove_graphic(&self, index: usize) -> bool {
        self.inner.borrow_mut().remove_graphic(index)
    }

    pub fn node_count(&self, kind: NodeKind) -> usize {
        self.inner.borrow().scene().node_count(kind)
    }

    pub fn reset(&self) {
        self.inner.borrow_mut().reset();
    }

    pub fn reset_view(&self) {
        self.inner.borrow_mut().scene_mut().reset_view();
    }

    pub fn customization_data(&self) -> CustomizationState {
        self.inner.borrow().customization_data().clone()
    }

    pub fn generate_layout(&self) -> Result<LayoutSnapshot, CaptureError> {
        self.inner.borrow_mut().generate_layout()
    }

    /// Rebuild texture, text and graphics from a saved payload.
    ///
    /// Current decorations are cleared first. Elements are re-added in order;
    /// the first failure stops the restore and is returned.
    pub async fn restore(&self, saved: &CustomizationState) -> Result<(), KustomizerError> {
        self.reset();
        if let Some(uri) = &saved.texture_data_uri {
            self.set_texture(AssetSource::Uri(uri.clone())).await?;
        }
        for text in &saved.text_elements {
            self.add_text(&text.text, &text.options()).await?;
        }
        for graphic in &saved.graphic_elements {
            self.add_graphic(AssetSource::Bytes(graphic.svg_markup.clone().into_bytes()), &graphic.options())
                .await?;
        }
        if let Some(layout) = &saved.layout {
            self.inner.borrow_mut().restore_layout((**layout).clone());
        }
        log::info!(
            "[store] restored {} texts, {} graphics",
            saved.text_elements.len(),
            saved.graphic_elements.len()
        );
        Ok(())
    }

    pub fn resize(&self, width: u32, height: u32, pixel_ratio: f32) {
        self.inner
            .borrow_mut()
            .scene_mut()
            .resize(width, height, pixel_ratio);
    }

    /// One render-loop step.
    pub fn frame(&self) -> Result<(), RenderError> {
        self.inner.borrow_mut().scene_mut().frame()
    }

    pub fn dispose(&self) {
        self.inner.borrow_mut().dispose();
        self.listeners.borrow_mut().clear();
    }
}
