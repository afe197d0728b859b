#![cfg(target_arch = "wasm32")]
//! Browser front-end: mounts a WebGPU canvas into a container element and
//! exposes the customization API to the hosting page.
//!
//! ```js
//! const viewer = await createViewer({ container: "kustomizer-viewer", stlFile: "/mug.stl" });
//! await viewer.addText("Hello", { size: 8, color: "#ff0000" });
//! const layout = viewer.generateLayout();
//! ```

use instant::Instant;
use kustomizer_core::{ConfigurationError, KustomizerError, Viewer, ViewerConfig};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

mod api;
mod constants;
mod dom;
mod events;
mod fetch;
mod frame;
mod input;
mod render;

pub use api::KustomizerViewer;

pub(crate) type WebViewer = Viewer<render::GpuRenderer, fetch::WebFetcher>;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("kustomizer-web loaded");
    Ok(())
}

/// Mount a viewer. `options` is the host's configuration object (or its
/// JSON text); the base model starts loading immediately.
#[wasm_bindgen(js_name = createViewer)]
pub async fn create_viewer(options: JsValue) -> Result<KustomizerViewer, JsValue> {
    let json = api::stringify(&options).unwrap_or_else(|| "{}".to_string());
    let config = ViewerConfig::from_json(&json).map_err(api::to_js_error)?;
    mount(config).await.map_err(api::to_js_error)
}

async fn mount(config: ViewerConfig) -> Result<KustomizerViewer, KustomizerError> {
    let claim = dom::ContainerClaim::acquire(&config.container)?;
    let canvas = dom::create_canvas(claim.element())?;
    let (viewer, input, resize) = match attach(config, &canvas, claim.element()).await {
        Ok(parts) => parts,
        Err(e) => {
            dom::remove_canvas(&canvas);
            return Err(e.into());
        }
    };

    let container_id = claim.id().to_string();
    viewer.on_model_ready(move |framing| {
        log::info!(
            "[scene] model ready, camera at ({:.1},{:.1},{:.1})",
            framing.eye.x,
            framing.eye.y,
            framing.eye.z
        );
        dom::dispatch_model_loaded(&container_id);
    });
    let render_loop = frame::RenderLoop::start(viewer.clone());

    if !viewer.config().base_model_source.trim().is_empty() {
        let loader = viewer.clone();
        spawn_local(async move {
            let progress = |p: kustomizer_core::LoadProgress| {
                if let Some(f) = p.fraction() {
                    log::debug!("[loader] base model {:.0}%", f * 100.0);
                }
            };
            if let Err(e) = loader.load_base_model(&progress).await {
                log::error!("[loader] base model failed: {}", e);
            }
        });
    }

    log::info!("[scene] viewer mounted on #{}", claim.id());
    Ok(KustomizerViewer::new(
        viewer,
        api::Session {
            render_loop,
            input,
            resize,
            canvas,
            claim,
        },
    ))
}

async fn attach(
    config: ViewerConfig,
    canvas: &web::HtmlCanvasElement,
    container: &web::HtmlElement,
) -> Result<(WebViewer, Vec<events::ListenerGuard>, events::resize::ResizeGuard), ConfigurationError> {
    let (width, height, dpr) = dom::sync_canvas_backing_size(canvas);
    let started = Instant::now();
    let renderer = render::GpuRenderer::new(canvas)
        .await
        .map_err(|e| ConfigurationError::MissingCapability(format!("WebGPU: {e:#}")))?;
    log::info!("[gpu] renderer ready in {:?}", started.elapsed());
    let viewer = Viewer::new(config, renderer, fetch::WebFetcher)?;
    viewer.resize(width, height, dpr);

    let dom_err = |e: JsValue| ConfigurationError::MissingCapability(format!("DOM: {:?}", e));
    let input = events::pointer::wire_orbit_input(canvas, &viewer).map_err(dom_err)?;
    let resize = events::resize::ResizeGuard::observe(container, canvas, &viewer).map_err(dom_err)?;
    Ok((viewer, input, resize))
}
