use crate::dom;
use crate::WebViewer;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

/// Keeps the drawing buffer, camera aspect and drag speed in step with the
/// container's size. Disconnects on drop.
pub struct ResizeGuard {
    observer: web::ResizeObserver,
    _closure: Closure<dyn FnMut(js_sys::Array, web::ResizeObserver)>,
}

impl ResizeGuard {
    pub fn observe(
        container: &web::HtmlElement,
        canvas: &web::HtmlCanvasElement,
        viewer: &WebViewer,
    ) -> Result<Self, JsValue> {
        let canvas = canvas.clone();
        let viewer = viewer.clone();
        let closure = Closure::wrap(Box::new(move |_entries: js_sys::Array, _obs: web::ResizeObserver| {
            let (w, h, dpr) = dom::sync_canvas_backing_size(&canvas);
            viewer.resize(w, h, dpr);
        }) as Box<dyn FnMut(js_sys::Array, web::ResizeObserver)>);
        let observer = web::ResizeObserver::new(closure.as_ref().unchecked_ref())?;
        observer.observe(container);
        Ok(Self {
            observer,
            _closure: closure,
        })
    }
}

impl Drop for ResizeGuard {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}
