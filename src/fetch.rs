use futures::future::LocalBoxFuture;
use kustomizer_core::{AssetFetcher, AssetLoadError, LoadProgress};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

/// `fetch()`-backed asset source.
#[derive(Default)]
pub struct WebFetcher;

impl AssetFetcher for WebFetcher {
    fn fetch<'a>(
        &'a self,
        uri: &'a str,
        progress: &'a dyn Fn(LoadProgress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, AssetLoadError>> {
        Box::pin(fetch_bytes(uri, progress))
    }
}

fn reason(e: &JsValue) -> String {
    e.dyn_ref::<js_sys::Error>()
        .map(|err| String::from(err.message()))
        .or_else(|| e.as_string())
        .unwrap_or_else(|| format!("{:?}", e))
}

async fn fetch_bytes(uri: &str, progress: &dyn Fn(LoadProgress)) -> Result<Vec<u8>, AssetLoadError> {
    let fail = |why: String| AssetLoadError::Fetch {
        uri: uri.to_string(),
        reason: why,
    };
    let window = web::window().ok_or_else(|| fail("no window".into()))?;
    let response: web::Response = JsFuture::from(window.fetch_with_str(uri))
        .await
        .map_err(|e| fail(reason(&e)))?
        .dyn_into()
        .map_err(|_| fail("not a Response".into()))?;
    if !response.ok() {
        return Err(fail(format!("HTTP {}", response.status())));
    }
    let total = response
        .headers()
        .get("content-length")
        .ok()
        .flatten()
        .and_then(|v| v.parse::<u64>().ok());
    progress(LoadProgress { loaded: 0, total });

    let buffer = JsFuture::from(response.array_buffer().map_err(|e| fail(reason(&e)))?)
        .await
        .map_err(|e| fail(reason(&e)))?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    let loaded = bytes.len() as u64;
    progress(LoadProgress {
        loaded,
        total: Some(total.unwrap_or(loaded)),
    });
    Ok(bytes)
}

/// Contents of a user-supplied `File`/`Blob`.
pub async fn read_blob(blob: &web::Blob) -> Result<Vec<u8>, AssetLoadError> {
    let buffer = JsFuture::from(blob.array_buffer())
        .await
        .map_err(|e| AssetLoadError::Fetch {
            uri: "<file>".into(),
            reason: reason(&e),
        })?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}
