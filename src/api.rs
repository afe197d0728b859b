//! JavaScript surface of a mounted viewer.
//!
//! Structured values cross the boundary as JSON (`serde_json` on this side,
//! `JSON.parse`/`JSON.stringify` on the other). Failures reject with a JS
//! `Error` whose `name` is the error class, e.g. `"ValidationError"`.

use crate::events::{resize::ResizeGuard, ListenerGuard};
use crate::fetch;
use crate::frame::RenderLoop;
use crate::{dom, WebViewer};
use kustomizer_core::loaders::font::TrueTypeFont;
use kustomizer_core::{
    AssetSource, CustomizationState, GraphicOptions, KustomizerError, LoadProgress, ModelFraming,
    NodeKind, TextOptions,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys as web;

/// DOM resources owned by a live viewer. Dropping it detaches everything.
pub(crate) struct Session {
    pub(crate) render_loop: RenderLoop,
    pub(crate) input: Vec<ListenerGuard>,
    pub(crate) resize: ResizeGuard,
    pub(crate) canvas: web::HtmlCanvasElement,
    pub(crate) claim: dom::ContainerClaim,
}

#[wasm_bindgen]
pub struct KustomizerViewer {
    viewer: WebViewer,
    session: RefCell<Option<Session>>,
}

impl KustomizerViewer {
    pub(crate) fn new(viewer: WebViewer, session: Session) -> Self {
        Self {
            viewer,
            session: RefCell::new(Some(session)),
        }
    }
}

pub(crate) fn js_error(name: &str, message: &str) -> JsValue {
    let err = js_sys::Error::new(message);
    err.set_name(name);
    err.into()
}

pub(crate) fn to_js_error(e: impl Into<KustomizerError>) -> JsValue {
    let e = e.into();
    js_error(e.kind(), &e.to_string())
}

/// `JSON.stringify` of an arbitrary JS value; `undefined` becomes `None`.
pub(crate) fn stringify(value: &JsValue) -> Option<String> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    if let Some(s) = value.as_string() {
        return Some(s);
    }
    js_sys::JSON::stringify(value).ok().and_then(|s| s.as_string())
}

fn options_from_js<T: DeserializeOwned + Default>(value: &JsValue) -> Result<T, JsValue> {
    match stringify(value) {
        None => Ok(T::default()),
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| js_error("ValidationError", &format!("malformed options: {e}"))),
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(|e| js_error("Error", &e.to_string()))?;
    js_sys::JSON::parse(&json)
}

fn framing_to_js(framing: &ModelFraming) -> Result<JsValue, JsValue> {
    to_js(&serde_json::json!({
        "eye": framing.eye.to_array(),
        "target": framing.target.to_array(),
        "size": framing.bounds.size().to_array(),
    }))
}

fn report_progress(callback: Option<&js_sys::Function>, p: LoadProgress) {
    let Some(f) = callback else {
        return;
    };
    let total = p.total.map(|t| JsValue::from_f64(t as f64)).unwrap_or(JsValue::UNDEFINED);
    if let Err(e) = f.call2(&JsValue::NULL, &JsValue::from_f64(p.loaded as f64), &total) {
        log::warn!("[loader] progress callback threw: {:?}", e);
    }
}

fn index_result(r: Result<usize, KustomizerError>) -> Result<JsValue, JsValue> {
    r.map(|i| JsValue::from_f64(i as f64)).map_err(to_js_error)
}

#[wasm_bindgen]
impl KustomizerViewer {
    #[wasm_bindgen(getter, js_name = containerId)]
    pub fn container_id(&self) -> Option<String> {
        self.session
            .borrow()
            .as_ref()
            .map(|s| s.claim.id().to_string())
    }

    #[wasm_bindgen(js_name = isModelReady)]
    pub fn is_model_ready(&self) -> bool {
        self.viewer.is_model_ready()
    }

    /// Load `url`, or the configured base model when omitted. Resolves with
    /// the camera framing.
    #[wasm_bindgen(js_name = loadModel)]
    pub fn load_model(&self, url: Option<String>, on_progress: Option<js_sys::Function>) -> js_sys::Promise {
        let viewer = self.viewer.clone();
        future_to_promise(async move {
            let report = move |p: LoadProgress| report_progress(on_progress.as_ref(), p);
            let framing = match url {
                Some(u) => viewer.load_model_from(&AssetSource::Uri(u), &report).await,
                None => viewer.load_base_model(&report).await,
            }
            .map_err(to_js_error)?;
            framing_to_js(&framing)
        })
    }

    /// `callback(framing)` after every successful model load. Runs right
    /// away when a model is already showing.
    #[wasm_bindgen(js_name = onModelReady)]
    pub fn on_model_ready(&self, callback: js_sys::Function) {
        let current = self.viewer.with(|c| c.scene().framing());
        let notify = move |framing: &ModelFraming| {
            let arg = framing_to_js(framing).unwrap_or(JsValue::UNDEFINED);
            if let Err(e) = callback.call1(&JsValue::NULL, &arg) {
                log::warn!("[scene] model-ready callback threw: {:?}", e);
            }
        };
        if let Some(framing) = current.filter(|_| self.viewer.is_model_ready()) {
            notify(&framing);
        }
        self.viewer.on_model_ready(notify);
    }

    /// Resolves with the texture generation.
    #[wasm_bindgen(js_name = setTextureUrl)]
    pub fn set_texture_url(&self, url: String) -> js_sys::Promise {
        let viewer = self.viewer.clone();
        future_to_promise(async move {
            let generation = viewer
                .set_texture(AssetSource::Uri(url))
                .await
                .map_err(to_js_error)?;
            Ok(JsValue::from_f64(generation as f64))
        })
    }

    #[wasm_bindgen(js_name = setTextureFile)]
    pub fn set_texture_file(&self, file: web::File) -> js_sys::Promise {
        let viewer = self.viewer.clone();
        future_to_promise(async move {
            let bytes = fetch::read_blob(&file).await.map_err(to_js_error)?;
            let generation = viewer
                .set_texture(AssetSource::Bytes(bytes))
                .await
                .map_err(to_js_error)?;
            Ok(JsValue::from_f64(generation as f64))
        })
    }

    #[wasm_bindgen(js_name = clearTexture)]
    pub fn clear_texture(&self) {
        self.viewer.clear_texture();
    }

    #[wasm_bindgen(js_name = textureGeneration)]
    pub fn texture_generation(&self) -> f64 {
        self.viewer.with(|c| c.texture_generation()) as f64
    }

    /// Resolves with the new element's index.
    #[wasm_bindgen(js_name = addText)]
    pub fn add_text(&self, text: String, options: JsValue) -> js_sys::Promise {
        let viewer = self.viewer.clone();
        let options = options_from_js::<TextOptions>(&options);
        future_to_promise(async move {
            let options = options?;
            index_result(viewer.add_text(&text, &options).await)
        })
    }

    #[wasm_bindgen(js_name = addGraphicFile)]
    pub fn add_graphic_file(&self, file: web::File, options: JsValue) -> js_sys::Promise {
        let viewer = self.viewer.clone();
        let options = options_from_js::<GraphicOptions>(&options);
        future_to_promise(async move {
            let options = options?;
            let bytes = fetch::read_blob(&file).await.map_err(to_js_error)?;
            index_result(viewer.add_graphic(AssetSource::Bytes(bytes), &options).await)
        })
    }

    #[wasm_bindgen(js_name = addGraphicUrl)]
    pub fn add_graphic_url(&self, url: String, options: JsValue) -> js_sys::Promise {
        let viewer = self.viewer.clone();
        let options = options_from_js::<GraphicOptions>(&options);
        future_to_promise(async move {
            let options = options?;
            index_result(viewer.add_graphic(AssetSource::Uri(url), &options).await)
        })
    }

    #[wasm_bindgen(js_name = addGraphicMarkup)]
    pub fn add_graphic_markup(&self, markup: String, options: JsValue) -> js_sys::Promise {
        let viewer = self.viewer.clone();
        let options = options_from_js::<GraphicOptions>(&options);
        future_to_promise(async move {
            let options = options?;
            index_result(
                viewer
                    .add_graphic(AssetSource::Bytes(markup.into_bytes()), &options)
                    .await,
            )
        })
    }

    /// `false` when `index` is out of range.
    #[wasm_bindgen(js_name = removeText)]
    pub fn remove_text(&self, index: u32) -> bool {
        self.viewer.remove_text(index as usize)
    }

    #[wasm_bindgen(js_name = removeGraphic)]
    pub fn remove_graphic(&self, index: u32) -> bool {
        self.viewer.remove_graphic(index as usize)
    }

    #[wasm_bindgen(js_name = textCount)]
    pub fn text_count(&self) -> u32 {
        self.viewer.node_count(NodeKind::Text) as u32
    }

    #[wasm_bindgen(js_name = graphicCount)]
    pub fn graphic_count(&self) -> u32 {
        self.viewer.node_count(NodeKind::Graphic) as u32
    }

    pub fn reset(&self) {
        self.viewer.reset();
    }

    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view(&self) {
        self.viewer.reset_view();
    }

    #[wasm_bindgen(js_name = registerFont)]
    pub fn register_font(&self, font: String, bytes: Vec<u8>) -> Result<(), JsValue> {
        let typeface = TrueTypeFont::from_bytes(bytes).map_err(to_js_error)?;
        self.viewer.register_font(&font, Rc::new(typeface));
        Ok(())
    }

    #[wasm_bindgen(js_name = getCustomizationData)]
    pub fn get_customization_data(&self) -> Result<JsValue, JsValue> {
        to_js(&self.viewer.customization_data())
    }

    #[wasm_bindgen(js_name = generateLayout)]
    pub fn generate_layout(&self) -> Result<JsValue, JsValue> {
        let snapshot = self.viewer.generate_layout().map_err(to_js_error)?;
        log::info!("[layout] snapshot {} bytes", snapshot.raster_image.len());
        to_js(&snapshot)
    }

    /// Accepts the object from `getCustomizationData` or its JSON text.
    pub fn restore(&self, saved: JsValue) -> js_sys::Promise {
        let viewer = self.viewer.clone();
        let parsed = stringify(&saved)
            .ok_or_else(|| js_error("ValidationError", "nothing to restore"))
            .and_then(|json| {
                CustomizationState::from_json(&json)
                    .map_err(|e| js_error("ValidationError", &format!("malformed state: {e}")))
            });
        future_to_promise(async move {
            let state = parsed?;
            viewer.restore(&state).await.map_err(to_js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Stop rendering, detach listeners, remove the canvas and free GPU
    /// resources. Later calls do nothing.
    pub fn dispose(&self) {
        let Some(session) = self.session.borrow_mut().take() else {
            return;
        };
        let Session {
            render_loop,
            input,
            resize,
            canvas,
            claim,
        } = session;
        render_loop.stop();
        drop(input);
        drop(resize);
        self.viewer.dispose();
        dom::remove_canvas(&canvas);
        log::info!("[scene] viewer on #{} disposed", claim.id());
    }
}
