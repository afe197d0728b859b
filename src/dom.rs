use crate::constants::{CANVAS_CLASS, CANVAS_STYLE, MAX_BACKING_PX, MIN_BACKING_PX, MODEL_LOADED_EVENT};
use crate::input;
use kustomizer_core::ConfigurationError;
use std::cell::RefCell;
use std::collections::HashSet;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

thread_local! {
    // Container ids currently hosting a live viewer.
    static CLAIMED: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

/// Exclusive hold on a container element; released on drop.
pub struct ContainerClaim {
    id: String,
    element: web::HtmlElement,
}

impl ContainerClaim {
    pub fn acquire(id: &str) -> Result<Self, ConfigurationError> {
        let element = window_document()
            .and_then(|d| d.get_element_by_id(id))
            .and_then(|el| el.dyn_into::<web::HtmlElement>().ok())
            .ok_or_else(|| ConfigurationError::MissingContainer(id.to_string()))?;
        let fresh = CLAIMED.with(|c| c.borrow_mut().insert(id.to_string()));
        if !fresh {
            return Err(ConfigurationError::ContainerInUse(id.to_string()));
        }
        Ok(Self {
            id: id.to_string(),
            element,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn element(&self) -> &web::HtmlElement {
        &self.element
    }
}

impl Drop for ContainerClaim {
    fn drop(&mut self) {
        CLAIMED.with(|c| c.borrow_mut().remove(&self.id));
    }
}

/// Append a canvas that fills `container`.
pub fn create_canvas(container: &web::HtmlElement) -> Result<web::HtmlCanvasElement, ConfigurationError> {
    let dom_err = |e: JsValue| ConfigurationError::MissingCapability(format!("DOM: {:?}", e));
    let document = window_document()
        .ok_or_else(|| ConfigurationError::MissingCapability("no document".into()))?;
    let canvas: web::HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(dom_err)?
        .dyn_into()
        .map_err(|_| ConfigurationError::MissingCapability("canvas element".into()))?;
    canvas.set_class_name(CANVAS_CLASS);
    canvas.set_attribute("style", CANVAS_STYLE).map_err(dom_err)?;
    container.append_child(&canvas).map_err(dom_err)?;
    Ok(canvas)
}

pub fn remove_canvas(canvas: &web::HtmlCanvasElement) {
    canvas.remove();
}

/// Match the drawing buffer to the CSS box times `devicePixelRatio`.
/// Returns the buffer size and the ratio used.
pub fn sync_canvas_backing_size(canvas: &web::HtmlCanvasElement) -> (u32, u32, f32) {
    let dpr = web::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0);
    let rect = canvas.get_bounding_client_rect();
    let (w, h) = input::backing_size(rect.width(), rect.height(), dpr, MIN_BACKING_PX, MAX_BACKING_PX);
    if canvas.width() != w {
        canvas.set_width(w);
    }
    if canvas.height() != h {
        canvas.set_height(h);
    }
    (w, h, dpr as f32)
}

/// Fire `kustomizerModelLoaded` on `document`; `detail` is the container id.
pub fn dispatch_model_loaded(container_id: &str) {
    let Some(document) = window_document() else {
        return;
    };
    let init = web::CustomEventInit::new();
    init.set_detail(&JsValue::from_str(container_id));
    match web::CustomEvent::new_with_event_init_dict(MODEL_LOADED_EVENT, &init) {
        Ok(event) => {
            _ = document.dispatch_event(&event);
        }
        Err(e) => log::warn!("[dom] could not create {}: {:?}", MODEL_LOADED_EVENT, e),
    }
}
