//! Customization store: keeps [`CustomizationState`] and the scene in lockstep.
//!
//! Every mutation goes through here. Scene nodes are built first and state is
//! only recorded once the node exists, so index `i` of `text_elements` always
//! describes text node `i` in the scene (same for graphics).

use crate::config::ViewerConfig;
use crate::error::{CaptureError, ConfigurationError, Feature, KustomizerError, ValidationError};
use crate::layout::LayoutSnapshot;
use crate::loaders::font::{FontCache, Typeface};
use crate::loaders::texture::TextureImage;
use crate::scene::{NodeKind, RenderBackend, SceneManager};
use crate::state::{CustomizationState, GraphicElement, GraphicOptions, TextElement, TextOptions};
use std::rc::Rc;

pub struct Customizer<B: RenderBackend> {
    config: ViewerConfig,
    scene: SceneManager<B>,
    state: CustomizationState,
    fonts: FontCache,
    texture_generation: u64,
    texture_requests: u64,
}

impl<B: RenderBackend> Customizer<B> {
    pub fn new(config: ViewerConfig, backend: B) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let scene = SceneManager::initialize(backend, &config);
        Ok(Self {
            config,
            scene,
            state: CustomizationState::default(),
            fonts: FontCache::default(),
            texture_generation: 0,
            texture_requests: 0,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneManager<B> {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneManager<B> {
        &mut self.scene
    }

    /// Live customization data.
    pub fn customization_data(&self) -> &CustomizationState {
        &self.state
    }

    pub fn fonts(&self) -> &FontCache {
        &self.fonts
    }

    pub fn register_font(&mut self, font: impl Into<String>, typeface: Rc<dyn Typeface>) {
        self.fonts.insert(font, typeface);
    }

    fn require(&self, feature: Feature) -> Result<(), ValidationError> {
        let flags = &self.config.features;
        let enabled = match feature {
            Feature::Text => flags.text_enabled,
            Feature::Graphics => flags.graphics_enabled,
            Feature::TextureUpload => flags.texture_upload_enabled,
        };
        if enabled {
            Ok(())
        } else {
            Err(ValidationError::FeatureDisabled(feature))
        }
    }

    /// Check a text request and resolve its defaults. Touches nothing.
    pub fn validate_text(
        &self,
        text: &str,
        options: &TextOptions,
    ) -> Result<TextElement, ValidationError> {
        self.require(Feature::Text)?;
        let len = text.chars().count();
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if len > self.config.max_text_length {
            return Err(ValidationError::TextTooLong {
                len,
                max: self.config.max_text_length,
            });
        }
        let font = match &options.font {
            Some(f) if self.config.has_font(f) => f.clone(),
            Some(f) => return Err(ValidationError::UnknownFont(f.clone())),
            None => self
                .config
                .available_fonts
                .first()
                .cloned()
                .ok_or_else(|| ValidationError::UnknownFont(String::new()))?,
        };
        options.validate()?;
        Ok(TextElement::new(text, font, options))
    }

    pub fn validate_graphic(&self, options: &GraphicOptions) -> Result<(), ValidationError> {
        self.require(Feature::Graphics)?;
        options.validate()
    }

    pub fn validate_texture(&self) -> Result<(), ValidationError> {
        self.require(Feature::TextureUpload)
    }

    /// Ticket for an in-flight texture load, compared against the latest on apply.
    pub fn begin_texture_request(&mut self) -> u64 {
        self.texture_requests += 1;
        self.texture_requests
    }

    /// Number of textures applied so far; bumps on every successful apply.
    pub fn texture_generation(&self) -> u64 {
        self.texture_generation
    }

    /// Apply a decoded texture and record its data URI. Last applied wins.
    pub fn apply_texture(
        &mut self,
        image: &TextureImage,
        data_uri: String,
        request: u64,
    ) -> Result<u64, KustomizerError> {
        self.scene.apply_texture(image)?;
        self.state.texture_data_uri = Some(data_uri);
        self.texture_generation += 1;
        if request < self.texture_requests {
            log::debug!(
                "[store] texture request {} applied after newer request {}",
                request,
                self.texture_requests
            );
        }
        Ok(self.texture_generation)
    }

    pub fn clear_texture(&mut self) {
        self.scene.clear_texture();
        self.state.texture_data_uri = None;
    }

    /// Build the node, then record the element. Returns its index.
    pub fn insert_text(
        &mut self,
        element: TextElement,
        typeface: &dyn Typeface,
    ) -> Result<usize, KustomizerError> {
        self.scene.add_text_node(&element, typeface)?;
        self.state.text_elements.push(element);
        Ok(self.state.text_elements.len() - 1)
    }

    pub fn insert_graphic(&mut self, element: GraphicElement) -> Result<usize, KustomizerError> {
        self.scene.add_graphic_node(&element)?;
        self.state.graphic_elements.push(element);
        Ok(self.state.graphic_elements.len() - 1)
    }

    /// Remove text `index` from scene and state together; out of range is a no-op.
    pub fn remove_text(&mut self, index: usize) -> bool {
        if index >= self.state.text_elements.len() {
            return false;
        }
        self.scene.remove_node_at(NodeKind::Text, index);
        self.state.text_elements.remove(index);
        true
    }

    pub fn remove_graphic(&mut self, index: usize) -> bool {
        if index >= self.state.graphic_elements.len() {
            return false;
        }
        self.scene.remove_node_at(NodeKind::Graphic, index);
        self.state.graphic_elements.remove(index);
        true
    }

    /// Drop every decoration and the user texture. The base mesh stays.
    pub fn reset(&mut self) {
        self.scene.clear_nodes();
        self.scene.clear_texture();
        self.state.clear();
        log::info!("[store] reset");
    }

    /// Capture the current frame and store it with a copy of the state.
    /// A new call replaces the previous snapshot.
    pub fn generate_layout(&mut self) -> Result<LayoutSnapshot, CaptureError> {
        let png = self.scene.capture()?;
        let snapshot = LayoutSnapshot::capture(png, &self.state);
        self.state.layout = Some(Box::new(snapshot.clone()));
        log::info!(
            "[layout] captured {} bytes, {} texts, {} graphics",
            snapshot.raster_image.len(),
            snapshot.source_data.text_elements.len(),
            snapshot.source_data.graphic_elements.len()
        );
        Ok(snapshot)
    }

    /// Put back a previously generated snapshot without re-rendering.
    pub fn restore_layout(&mut self, snapshot: LayoutSnapshot) {
        self.state.layout = Some(Box::new(snapshot));
    }

    pub fn dispose(&mut self) {
        self.scene.dispose();
    }
}
