use super::ListenerGuard;
use crate::input;
use crate::WebViewer;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

/// Orbit controls on the canvas: drag to rotate (primary) or pan
/// (secondary), wheel to zoom. The context menu is suppressed so the
/// secondary button can pan.
pub fn wire_orbit_input(
    canvas: &web::HtmlCanvasElement,
    viewer: &WebViewer,
) -> Result<Vec<ListenerGuard>, JsValue> {
    let target: &web::EventTarget = canvas.as_ref();
    let mut guards = Vec::with_capacity(6);

    {
        let viewer = viewer.clone();
        let canvas = canvas.clone();
        guards.push(ListenerGuard::new(target, "pointerdown", move |ev| {
            let Some(ev) = ev.dyn_ref::<web::PointerEvent>() else {
                return;
            };
            let Some(mode) = input::drag_mode_for_button(ev.button()) else {
                return;
            };
            let pos = input::pointer_css_px(ev, &canvas);
            if viewer.with_controls(|c| c.pointer_down(mode, pos)) {
                _ = canvas.set_pointer_capture(ev.pointer_id());
                ev.prevent_default();
                log::debug!("[mouse] drag {:?} at ({:.0},{:.0})", mode, pos.x, pos.y);
            }
        })?);
    }

    {
        let viewer = viewer.clone();
        let canvas = canvas.clone();
        guards.push(ListenerGuard::new(target, "pointermove", move |ev| {
            let Some(ev) = ev.dyn_ref::<web::PointerEvent>() else {
                return;
            };
            let pos = input::pointer_css_px(ev, &canvas);
            viewer.with_controls(|c| c.pointer_move(pos));
        })?);
    }

    for event in ["pointerup", "pointercancel"] {
        let viewer = viewer.clone();
        let canvas = canvas.clone();
        guards.push(ListenerGuard::new(target, event, move |ev| {
            if viewer.with_controls(|c| c.pointer_up()) {
                if let Some(ev) = ev.dyn_ref::<web::PointerEvent>() {
                    _ = canvas.release_pointer_capture(ev.pointer_id());
                }
            }
        })?);
    }

    {
        let viewer = viewer.clone();
        guards.push(ListenerGuard::active(target, "wheel", move |ev| {
            let Some(ev) = ev.dyn_ref::<web::WheelEvent>() else {
                return;
            };
            ev.prevent_default();
            if let Some(delta) = input::zoom_delta(ev.delta_y()) {
                viewer.with_controls(|c| c.wheel(delta));
            }
        })?);
    }

    guards.push(ListenerGuard::new(target, "contextmenu", |ev| ev.prevent_default())?);

    Ok(guards)
}
