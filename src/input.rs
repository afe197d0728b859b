use crate::constants::{BUTTON_PRIMARY, BUTTON_SECONDARY};
use glam::Vec2;
use kustomizer_core::DragMode;
use web_sys as web;

/// Which orbit gesture a pointer button starts. Middle button and extra
/// buttons are left to the page.
#[inline]
pub fn drag_mode_for_button(button: i16) -> Option<DragMode> {
    match button {
        BUTTON_PRIMARY => Some(DragMode::Rotate),
        BUTTON_SECONDARY => Some(DragMode::Pan),
        _ => None,
    }
}

/// Pointer position relative to an element's top-left corner, in CSS pixels.
#[inline]
pub fn css_offset(client: Vec2, rect_origin: Vec2) -> Vec2 {
    client - rect_origin
}

#[inline]
pub fn pointer_css_px(ev: &web::MouseEvent, canvas: &web::HtmlCanvasElement) -> Vec2 {
    let rect = canvas.get_bounding_client_rect();
    css_offset(
        Vec2::new(ev.client_x() as f32, ev.client_y() as f32),
        Vec2::new(rect.left() as f32, rect.top() as f32),
    )
}

/// Zoom input for one wheel event. Purely horizontal scrolling is ignored.
#[inline]
pub fn zoom_delta(delta_y: f64) -> Option<f32> {
    (delta_y != 0.0 && delta_y.is_finite()).then_some(delta_y as f32)
}

/// Drawing-buffer size for a CSS box at `dpr`, clamped to what the GPU accepts.
#[inline]
pub fn backing_size(css_width: f64, css_height: f64, dpr: f64, min_px: u32, max_px: u32) -> (u32, u32) {
    let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
    let px = |css: f64| ((css.max(0.0) * dpr).round() as u32).clamp(min_px, max_px);
    (px(css_width), px(css_height))
}
